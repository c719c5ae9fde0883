//! A module for performing the multi-threaded computation of betweenness

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use tracing::debug;

use crate::{
    error::{Error, Result},
    graph::{MAX_NUM_THREADS, MIN_NUM_THREADS},
};

/// this is an implementation of Ulrik Brandes's
/// A Faster Algorithm for Betweenness Centrality
/// http://snap.stanford.edu/class/cs224w-readings/brandes01centrality.pdf
/// page 10, "Algorithm 1: Betweenness centrality in unweighted graphs"
/// following outgoing connections only.
fn betweenness_for_node(index: usize, indices: &[Vec<usize>], betweenness_count: &mut [f64]) {
    let num_nodes = indices.len();

    let mut sigma: Vec<f64> = vec![0.0; num_nodes];
    let mut distance: Vec<Option<usize>> = vec![None; num_nodes];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
    let mut delta: Vec<f64> = vec![0.0; num_nodes];
    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut stack: Vec<usize> = Vec::new();

    sigma[index] = 1.0;
    distance[index] = Some(0);
    queue.push_back(index);

    while let Some(v) = queue.pop_front() {
        stack.push(v);

        // Every queued vertex has its distance set.
        let next = distance[v].map(|d| d + 1);
        for &w in &indices[v] {
            if distance[w].is_none() {
                distance[w] = next;
                queue.push_back(w);
            }
            if distance[w] == next {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    while let Some(w) = stack.pop() {
        for &v in &predecessors[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != index {
            betweenness_count[w] += delta[w];
        }
    }
}

/// This function is the thread task, grabbing the
/// next unprocessed node.  If no more nodes, we exit,
/// returning betweenness values.
fn betweenness_task(counter: Arc<AtomicUsize>, indices: Arc<Vec<Vec<usize>>>) -> Vec<f64> {
    let num_nodes = indices.len();

    // each worker thread keeps its own cache of data
    // these are returned when the thread finishes
    // and then summed by the caller
    let mut betweenness_count: Vec<f64> = vec![0.0; num_nodes];

    loop {
        let index = counter.fetch_add(1, Ordering::Relaxed);
        if index >= num_nodes {
            break;
        }
        if index % 100 == 0 {
            debug!(node = index, "betweenness progress");
        }
        betweenness_for_node(index, &indices, &mut betweenness_count);
    }

    betweenness_count
}

/// Called by `Connectome::betweenness_centrality`, sets up the shared adjacency lists, spawns the
/// workers and sums their partial results.
pub fn compute_betweenness(
    indices: Vec<Vec<usize>>,
    num_threads: usize,
    normalize: bool,
) -> Result<Vec<f64>> {
    let num_threads = num_threads.clamp(MIN_NUM_THREADS, MAX_NUM_THREADS);
    let num_nodes = indices.len();
    debug!(num_threads, num_nodes, "computing betweenness");

    let mut betweenness_count: Vec<f64> = vec![0.0; num_nodes];

    let mut handles = Vec::with_capacity(num_threads);
    let wrapped_indices = Arc::new(indices);
    let wrapped_counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..num_threads {
        let counter = Arc::clone(&wrapped_counter);
        let indices = Arc::clone(&wrapped_indices);
        handles.push(thread::spawn(move || betweenness_task(counter, indices)));
    }

    // Directed paths are counted once per ordered pair, normalisation divides by the number of
    // ordered pairs that exclude the vertex itself.
    let divisor = if normalize && num_nodes > 2 {
        ((num_nodes - 1) * (num_nodes - 2)) as f64
    } else {
        1.0
    };

    for handle in handles {
        let partial = handle.join().map_err(|_| Error::WorkerPanicked)?;
        for (total, b) in betweenness_count.iter_mut().zip(partial) {
            *total += b / divisor;
        }
    }

    Ok(betweenness_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_center_carries_all_paths() {
        // 1 -> 0 -> {2, 3}
        let indices = vec![vec![2, 3], vec![0], vec![], vec![]];

        assert_eq!(
            compute_betweenness(indices, 4, false).unwrap(),
            vec![2.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn empty() {
        assert!(compute_betweenness(vec![], 2, true).unwrap().is_empty());
    }

    #[test]
    fn thread_count_does_not_change_result() {
        let indices = vec![vec![1, 2], vec![3], vec![3], vec![4], vec![0]];

        let single = compute_betweenness(indices.clone(), 1, false).unwrap();
        let many = compute_betweenness(indices, 200, false).unwrap();

        assert_eq!(single, many);
    }
}
