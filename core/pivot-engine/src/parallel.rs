//! FILENAME: core/pivot-engine/src/parallel.rs
//! Partitioned execution for large record sets.
//!
//! Records are split into contiguous partitions, each partition builds its own
//! partial state, and partials are merged pairwise. Merging is where cross-
//! partition conflicts (duplicate cells, inconsistent metadata) are caught, so
//! the result never depends on how the input was partitioned.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use rayon::ThreadPool;
#[cfg(feature = "parallel")]
use std::sync::OnceLock;

/// A partial result that can absorb another partial.
pub(crate) trait Mergeable: Sized + Send {
    type Error: Send;

    fn merge(self, other: Self) -> Result<Self, Self::Error>;
}

#[cfg(feature = "parallel")]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(feature = "parallel")]
fn desired_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// Crate-local pool. If it cannot be created, callers run single-threaded.
#[cfg(feature = "parallel")]
fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL
        .get_or_init(|| {
            let requested = desired_threads().max(1);
            let try_build = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build();
            match try_build(requested) {
                Ok(pool) => Some(pool),
                Err(_) if requested > 1 => try_build(1).ok(),
                Err(_) => None,
            }
        })
        .as_ref()
}

/// Builds a partial per chunk of `items` with `build`, then merges them.
///
/// Runs serially (one chunk) when `items` is shorter than `threshold`, when
/// the `parallel` feature is off, or when no thread pool is available.
pub(crate) fn partitioned<T, P, F>(items: &[T], threshold: usize, build: F) -> Result<P, P::Error>
where
    T: Sync,
    P: Mergeable,
    F: Fn(&[T]) -> Result<P, P::Error> + Sync,
{
    #[cfg(feature = "parallel")]
    {
        if items.len() >= threshold.max(2) {
            if let Some(pool) = rayon_pool() {
                let partitions = pool.current_num_threads().max(1) * 4;
                let chunk_size = items.len().div_ceil(partitions).max(1);
                log::debug!(
                    target: "PIVOT",
                    "partitioned run: {} items in chunks of {}",
                    items.len(),
                    chunk_size
                );
                return pool.install(|| {
                    items
                        .par_chunks(chunk_size)
                        .map(|chunk| build(chunk))
                        .try_reduce_with(|a, b| a.merge(b))
                        .unwrap_or_else(|| build(&[]))
                });
            }
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = threshold;

    build(items)
}
