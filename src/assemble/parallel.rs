//! Crate-local rayon pool used to decode record batches.
//!
//! The pool is built once. Its size comes from `PDSTABLE_THREADS`, then
//! `RAYON_NUM_THREADS`, then the available parallelism. When no pool can be built,
//! [`rayon_pool`] returns `None` and assembly decodes batches on the calling thread.
use std::sync::OnceLock;

use rayon::ThreadPool;

/// Environment variable overriding the decode pool size.
pub const THREADS_VAR: &str = "PDSTABLE_THREADS";

static DECODE_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// First positive thread count among `settings`, in order.
fn thread_setting<'a>(settings: impl IntoIterator<Item = Option<&'a str>>) -> Option<usize> {
    settings
        .into_iter()
        .flatten()
        .filter_map(|s| s.trim().parse::<usize>().ok())
        .find(|&n| n > 0)
}

fn desired_threads() -> usize {
    let own = std::env::var(THREADS_VAR).ok();
    let rayon = std::env::var("RAYON_NUM_THREADS").ok();
    thread_setting([own.as_deref(), rayon.as_deref()]).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

fn build_pool() -> Option<ThreadPool> {
    let requested = desired_threads();
    log::debug!("Building a {requested}-thread decode pool");
    let try_build = |n| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("pdstable-decode-{i}"))
            .build()
    };

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::warn!("Cannot build a {requested}-thread decode pool ({err}), retrying with one thread");
            try_build(1).ok()
        }
        Err(err) => {
            log::warn!("Cannot build a decode pool ({err}), decoding on the calling thread");
            None
        }
    }
}

/// The shared decode pool, if one could be created.
pub(crate) fn rayon_pool() -> Option<&'static ThreadPool> {
    DECODE_POOL.get_or_init(build_pool).as_ref()
}
