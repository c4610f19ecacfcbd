//! Warn-once logging for conditions that repeat on every kernel call.
//!
//! The first occurrence of a key logs at WARN; later occurrences of the same
//! key drop to DEBUG.
//!
//! ```
//! use marigold_common::warn_once;
//!
//! fn step() {
//!     warn_once!("adam.weight_decay", "weight_decay {} is not applied", 0.01);
//! }
//!
//! step(); // WARN
//! step(); // DEBUG
//! ```

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, OnceLock};

static WARN_REGISTRY: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn registry() -> MutexGuard<'static, HashSet<String>> {
    let registry = WARN_REGISTRY.get_or_init(|| Mutex::new(HashSet::new()));
    // A panic while holding the lock leaves the set usable.
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Log `message` at WARN the first time `key` is seen, at DEBUG afterwards.
pub fn warn_once_fn(key: &str, message: &str) {
    if registry().insert(key.to_string()) {
        tracing::warn!(key = %key, "{}", message);
    } else {
        tracing::debug!(key = %key, "(rate-limited) {}", message);
    }
}

/// Whether `key` has already been reported.
#[must_use]
pub fn has_warned(key: &str) -> bool {
    registry().contains(key)
}

/// `format!`-style front end for [`warn_once_fn`].
#[macro_export]
macro_rules! warn_once {
    ($key:expr, $($arg:tt)*) => {
        $crate::warn_once::warn_once_fn($key, &format!($($arg)*))
    };
}

/// Forget every key seen so far.
#[doc(hidden)]
pub fn clear_registry() {
    registry().clear();
}
