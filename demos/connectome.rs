use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use connalysis::{
    degree::{self, RichClubOptions},
    edge::Edge,
    graph::{Connectome, Direction},
    modelling::{self, ModelBuildingConfig, ModelOrder},
    neurons::{Neuron, NeuronTable},
    randomization,
};

// Neurons scattered in a 500um cube, depth being the distance from the top.
const N: usize = 200;
const SIDE: f64 = 500.0;

fn main() -> connalysis::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut rng = StdRng::seed_from_u64(42);

    let neurons: NeuronTable = (0..N)
        .map(|_| {
            let (x, y, z) = (
                rng.random::<f64>() * SIDE,
                rng.random::<f64>() * SIDE,
                rng.random::<f64>() * SIDE,
            );
            Neuron::new(x, y, z).with_depth(SIDE - y)
        })
        .collect();

    // Connect with a probability decaying with distance, more likely towards the surface.
    let positions = neurons.positions();
    let distances = modelling::compute_dist_matrix(&positions, &positions);
    let mut connectome = Connectome::new(N);
    for i in 0..N {
        for j in 0..N {
            let d = distances[(i, j)];
            if d.is_nan() {
                continue;
            }

            let p = if positions[j][1] > positions[i][1] {
                0.4 * (-0.008 * d).exp()
            } else {
                0.2 * (-0.008 * d).exp()
            };
            if rng.random::<f64>() < p {
                connectome.insert(Edge::new(i, j))?;
            }
        }
    }

    println!(
        "\nGenerated {} neurons with {} connections, density: {:.4}",
        connectome.vertex_count(),
        connectome.edge_count(),
        connectome.density()
    );

    // Degree statistics.
    for direction in [Direction::Efferent, Direction::Afferent] {
        println!(
            "{direction:?} Gini coefficient: {:.4}, normalized: {:.4}",
            degree::gini_coefficient(&connectome, direction)?,
            degree::normalized_gini_coefficient(&connectome, direction)?
        );
    }

    let options = RichClubOptions {
        direction: Direction::Efferent,
        ..Default::default()
    };
    let normalized = degree::normalized_rich_club_curve(&connectome, &options, &mut rng)?;
    println!("Normalized rich-club curve (degree, z-score):");
    for (x, y) in normalized.points().filter(|(_, y)| y.is_finite()) {
        println!("  {x:>4} {y:>8.3}");
    }

    // A shuffled control keeps the out-degrees but loses the spatial structure.
    let control =
        randomization::generate_degree_based_control(&connectome, Direction::Efferent, &mut rng)?;
    println!(
        "Control connections: {}, control Gini coefficient: {:.4}",
        control.edge_count(),
        degree::gini_coefficient(&control, Direction::Afferent)?
    );

    // Centralities, on four worker threads.
    let betweenness = connectome.betweenness_centrality(4, true)?;
    let hub = betweenness
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i);
    println!("Neuron with the highest betweenness: {hub:?}");

    // Connectivity models.
    let config = ModelBuildingConfig {
        bin_size_um: 50.0,
        ..Default::default()
    };
    for order in [ModelOrder::Second, ModelOrder::Third] {
        let (_, model) =
            modelling::run_model_building(&connectome, &neurons, "demo", order, &config, &mut rng)?;
        println!("{order:?} order model: {model}");
    }

    Ok(())
}
