//! A module for performing the multi-threaded computation of closeness

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

use tracing::debug;

use crate::{
    error::{Error, Result},
    graph::{MAX_NUM_THREADS, MIN_NUM_THREADS},
};

/// Breadth-first search from `index` along outgoing connections, returns the number of reachable
/// nodes and the sum of their distances.
fn closeness_for_node(index: usize, indices: &[Vec<usize>]) -> (usize, usize) {
    let num_nodes = indices.len();

    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut deltas: Vec<Option<usize>> = vec![None; num_nodes];

    deltas[index] = Some(0);
    queue.push_back(index);

    let mut reachable = 0;
    let mut total_path_length = 0;

    while let Some(current) = queue.pop_front() {
        let next = deltas[current].unwrap_or_default() + 1;
        for &j in &indices[current] {
            if deltas[j].is_none() {
                deltas[j] = Some(next);
                queue.push_back(j);
                reachable += 1;
                total_path_length += next;
            }
        }
    }

    (reachable, total_path_length)
}

/// this function is the thread task
/// grabs next unprocessed node
/// if no more nodes, exits
/// returning the closeness of the nodes it processed
fn closeness_task(counter: Arc<AtomicUsize>, indices: Arc<Vec<Vec<usize>>>) -> Vec<(usize, f64)> {
    let start = Instant::now();
    let num_nodes = indices.len();

    let mut closeness = Vec::new();

    loop {
        let index = counter.fetch_add(1, Ordering::Relaxed);
        if index >= num_nodes {
            break;
        }
        if index % 100 == 0 {
            debug!(node = index, elapsed = ?start.elapsed(), "closeness progress");
        }

        let (reachable, total_path_length) = closeness_for_node(index, &indices);
        let value = if total_path_length == 0 {
            0.0
        } else {
            reachable as f64 / total_path_length as f64
        };
        closeness.push((index, value));
    }

    closeness
}

pub fn compute_closeness(indices: Vec<Vec<usize>>, num_threads: usize) -> Result<Vec<f64>> {
    let start = Instant::now();
    let num_threads = num_threads.clamp(MIN_NUM_THREADS, MAX_NUM_THREADS);
    debug!(num_threads, "computing closeness");

    let num_nodes = indices.len();

    let mut closeness: Vec<f64> = vec![0.0; num_nodes];

    let mut handles = Vec::with_capacity(num_threads);
    let wrapped_indices = Arc::new(indices);
    let wrapped_counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..num_threads {
        let counter = Arc::clone(&wrapped_counter);
        let indices = Arc::clone(&wrapped_indices);
        handles.push(thread::spawn(move || closeness_task(counter, indices)));
    }

    for handle in handles {
        for (index, value) in handle.join().map_err(|_| Error::WorkerPanicked)? {
            closeness[index] = value;
        }
    }

    debug!(elapsed = ?start.elapsed(), "closeness done");

    Ok(closeness)
}
