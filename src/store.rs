//! Thread-safe per-key hit counts.
//!
//! [`CounterStore`] maps arbitrary string keys to `u64` counts behind a
//! single mutex. Every operation is a short critical section, and the lock
//! is cache-line padded so it never shares a line with the persistence
//! watermark.
//!
//! Counts never decrease: the only mutation besides increment is
//! [`CounterStore::restore_from`], which runs once at startup.

use crossbeam_utils::CachePadded;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A mapping from key to hit count.
///
/// # Examples
///
/// ```rust
/// use hitcounter::CounterStore;
/// use std::sync::Arc;
/// use std::thread;
///
/// let store = Arc::new(CounterStore::new());
/// let mut handles = vec![];
///
/// for _ in 0..4 {
///     let s = Arc::clone(&store);
///     handles.push(thread::spawn(move || {
///         for _ in 0..100 {
///             s.increment_and_get("/index.html");
///         }
///     }));
/// }
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(store.get("/index.html"), Some(400));
/// ```
#[derive(Default)]
pub struct CounterStore {
    counts: CachePadded<Mutex<HashMap<String, u64>>>,
}

impl CounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `counts`.
    pub fn with_counts(counts: HashMap<String, u64>) -> Self {
        Self {
            counts: CachePadded::new(Mutex::new(counts)),
        }
    }

    /// Increments the count for `key` and returns the new value.
    ///
    /// Unseen keys start at zero, so the first hit returns 1. Concurrent
    /// callers on the same key each observe a distinct value, and together
    /// the returned values form a gap-free sequence.
    ///
    /// The count saturates at `u64::MAX`.
    pub fn increment_and_get(&self, key: &str) -> u64 {
        let mut counts = self.lock();
        match counts.get_mut(key) {
            Some(count) => {
                *count = count.saturating_add(1);
                *count
            }
            None => {
                counts.insert(key.to_owned(), 1);
                1
            }
        }
    }

    /// Returns the current count for `key`, if it has ever been hit.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.lock().get(key).copied()
    }

    /// Returns a consistent copy of the whole mapping.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.lock().clone()
    }

    /// Replaces the whole mapping with `counts`.
    pub fn restore_from(&self, counts: HashMap<String, u64>) {
        *self.lock() = counts;
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no key has been hit yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for CounterStore {
    /// Output format: `CounterStore{ key:count key:count ... }`, sorted by key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.lock();
        let mut entries: Vec<_> = counts.iter().collect();
        entries.sort();

        write!(f, "CounterStore{{")?;
        for (key, count) in entries {
            write!(f, " {key}:{count}")?;
        }
        write!(f, " }}")
    }
}
