use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

pub const DEFAULT_WORKERS: usize = 5;

/// Runs `task` over `items` on at most `width` threads and returns the
/// results in input order.
///
/// Workers pull the next unclaimed index, so completion order is arbitrary;
/// each task writes exactly one entry keyed by its index. There is no
/// cancellation: every task runs to completion.
pub fn run_bounded<T, R, F>(items: &[T], width: usize, task: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let width = width.clamp(1, items.len());
    let next = AtomicUsize::new(0);
    let results = Mutex::new(HashMap::with_capacity(items.len()));

    thread::scope(|scope| {
        for _ in 0..width {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(index) else { break };
                    let result = task(item);
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(index, result);
                }
            });
        }
    });

    let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    (0..items.len())
        .filter_map(|index| results.remove(&index))
        .collect()
}
