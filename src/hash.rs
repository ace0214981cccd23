use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HASH_CODE: AtomicU64 = AtomicU64::new(1);

/// Allocate an engine-wide unique identity. Never returns 0.
pub(crate) fn next_hash_code() -> u64 {
    NEXT_HASH_CODE.fetch_add(1, Ordering::Relaxed)
}
