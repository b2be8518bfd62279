//! Deduplicated warnings.
//!
//! Provides deduplication to avoid spamming the same warning multiple times.
//! Used by the parser and the document container to report input that was
//! accepted in a degraded way, such as an unknown charset label.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Log a warning once per unique component and message.
///
/// # Example
/// ```ignore
/// warn_once("Encoding", "unknown charset label 'x-foo'");
/// ```
pub fn warn_once(component: &str, message: &str) {
    let key = format!("[{component}] {message}");
    let first = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if first {
        log::warn!(target: "bramble", "[{component}] {message}");
    }
}

/// Clear all recorded warnings (call when loading a new document)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
