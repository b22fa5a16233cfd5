//! Throttled persistence and startup restore.
//!
//! [`Persister`] decides when the [`CounterStore`] is written to durable
//! storage and reloads it at startup.
//!
//! # Lifecycle
//!
//! A persister starts **cold**. [`Persister::restore`] loads the last
//! snapshot (if any) and makes it **warm**. Writes only happen while warm,
//! so a persister that never restored cannot clobber an existing snapshot
//! with an empty store.
//!
//! ```text
//!   Cold ──restore()──► Warm ──persist()──► Warm ...
//! ```
//!
//! # Write coalescing
//!
//! [`Persister::persist`] is meant to be called after every hit. It only
//! writes when at least the cooldown (30 seconds by default) has passed
//! since the last write attempt. The watermark is moved forward *before*
//! the write, so a failing disk is still hit at most once per cooldown.
//!
//! The watermark has its own lock, separate from the store's, so deciding
//! whether to persist never blocks increments. The store lock is only taken
//! briefly to copy the mapping for a write.
//!
//! # Examples
//!
//! ```rust
//! use hitcounter::persistence::{ManualClock, PersistOutcome, Persister};
//! use hitcounter::persistence::snapshot::JsonFileStore;
//! use hitcounter::CounterStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let clock = Arc::new(ManualClock::default());
//! let persister = Persister::new(JsonFileStore::new(dir.path().join("hits.json")))
//!     .with_clock(clock.clone());
//! let store = CounterStore::new();
//!
//! persister.restore(&store).unwrap();
//! store.increment_and_get("/");
//! assert_eq!(persister.persist(&store).unwrap(), PersistOutcome::Written);
//! assert_eq!(persister.persist(&store).unwrap(), PersistOutcome::Throttled);
//!
//! clock.advance(Duration::from_secs(30));
//! assert_eq!(persister.persist(&store).unwrap(), PersistOutcome::Written);
//! ```

pub mod snapshot;

use chrono::{DateTime, Utc};
use crossbeam_utils::CachePadded;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::store::CounterStore;
use snapshot::{PersistedSnapshot, SnapshotStore};

/// Minimum time between two write attempts.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Lets tests exercise the cooldown without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock stopped at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock forward by `by`.
    ///
    /// Advances that would overflow the representable range are ignored.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|by| now.checked_add_signed(by))
        {
            *now = next;
        }
    }

    /// Sets the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Default for ManualClock {
    /// Creates a clock stopped at the current system time.
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What a call to [`Persister::persist`] or [`Persister::flush`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// A snapshot was written.
    Written,
    /// The cooldown has not elapsed yet; nothing was written.
    Throttled,
    /// [`Persister::restore`] has not run yet; nothing was written.
    Cold,
}

/// Writes and restores [`CounterStore`] snapshots.
pub struct Persister {
    target: Box<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    warm: AtomicBool,
    /// Time of the last write attempt. `None` until the first one.
    last_store: CachePadded<Mutex<Option<DateTime<Utc>>>>,
}

impl Persister {
    /// Creates a cold persister writing to `target`, using the system clock
    /// and [`DEFAULT_COOLDOWN`].
    pub fn new(target: impl SnapshotStore + 'static) -> Self {
        Self {
            target: Box::new(target),
            clock: Arc::new(SystemClock),
            cooldown: DEFAULT_COOLDOWN,
            warm: AtomicBool::new(false),
            last_store: CachePadded::new(Mutex::new(None)),
        }
    }

    /// Replaces the clock, returning `self` for method chaining.
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { clock, ..self }
    }

    /// Sets the minimum time between write attempts.
    pub fn with_cooldown(self, cooldown: Duration) -> Self {
        Self { cooldown, ..self }
    }

    /// Minimum time between two write attempts.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Where snapshots are written, if the target is a file.
    pub fn location(&self) -> Option<&std::path::Path> {
        self.target.location()
    }

    /// Returns `true` once [`restore`](Self::restore) has run.
    pub fn is_warm(&self) -> bool {
        self.warm.load(Ordering::Acquire)
    }

    /// Time of the last write attempt, or of the restored snapshot.
    pub fn last_persisted(&self) -> Option<DateTime<Utc>> {
        *self.watermark()
    }

    /// Loads the latest snapshot into `counters` and makes the persister warm.
    ///
    /// A missing snapshot is not an error: `counters` is left untouched.
    /// On success the snapshot timestamp becomes the watermark, so a freshly
    /// restored service does not write again right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceRead`] if a snapshot exists but cannot be
    /// read. The persister still becomes warm and the watermark stays unset,
    /// so the next [`persist`](Self::persist) replaces the unreadable file.
    pub fn restore(&self, counters: &CounterStore) -> Result<()> {
        let result = match self.target.load() {
            Ok(Some(PersistedSnapshot { timestamp, counts })) => {
                let entries = counts.len();
                counters.restore_from(counts);
                *self.watermark() = Some(timestamp);
                tracing::info!(entries, %timestamp, "restored hit counters");
                Ok(())
            }
            Ok(None) => {
                tracing::info!("no hit counter snapshot found, starting empty");
                Ok(())
            }
            Err(err) => Err(Error::PersistenceRead(err)),
        };

        self.warm.store(true, Ordering::Release);
        result
    }

    /// Writes a snapshot of `counters` if the cooldown has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceWrite`] if the write fails. The failed
    /// attempt still counts against the cooldown, so there is no retry
    /// until the next window.
    pub fn persist(&self, counters: &CounterStore) -> Result<PersistOutcome> {
        if !self.is_warm() {
            tracing::trace!("hit counters not restored yet, skipping persist");
            return Ok(PersistOutcome::Cold);
        }

        let now = self.clock.now();
        {
            let mut last_store = self.watermark();
            if let Some(last) = *last_store {
                let elapsed = now
                    .signed_duration_since(last)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                if elapsed < self.cooldown {
                    tracing::trace!(?elapsed, "hit counter persist throttled");
                    return Ok(PersistOutcome::Throttled);
                }
            }
            *last_store = Some(now);
        }

        self.write(counters, now)?;
        Ok(PersistOutcome::Written)
    }

    /// Writes a snapshot of `counters` regardless of the cooldown.
    ///
    /// Intended for shutdown hooks. Like [`persist`](Self::persist), this is
    /// a no-op while cold.
    pub fn flush(&self, counters: &CounterStore) -> Result<PersistOutcome> {
        if !self.is_warm() {
            return Ok(PersistOutcome::Cold);
        }

        let now = self.clock.now();
        *self.watermark() = Some(now);

        self.write(counters, now)?;
        Ok(PersistOutcome::Written)
    }

    fn write(&self, counters: &CounterStore, now: DateTime<Utc>) -> Result<()> {
        let snapshot = PersistedSnapshot::new(now, counters.snapshot());
        self.target
            .save(&snapshot)
            .map_err(Error::PersistenceWrite)?;
        tracing::debug!(entries = snapshot.counts.len(), "persisted hit counters");
        Ok(())
    }

    fn watermark(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        self.last_store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for Persister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persister")
            .field("cooldown", &self.cooldown)
            .field("warm", &self.is_warm())
            .field("last_store", &self.last_persisted())
            .finish_non_exhaustive()
    }
}
