//! The hit counter service.
//!
//! [`HitCounter`] owns one [`CounterStore`], one [`Persister`] and one
//! [`GlyphTable`]. A host creates it once with [`HitCounter::provision`],
//! shares it (typically behind an `Arc`) with its request handlers, and
//! calls [`HitCounter::hit`] once per rendered page.

use std::sync::Arc;

use crate::config::DisplayConfig;
use crate::error::Result;
use crate::glyphs::{render_html, AssetSource, GlyphTable};
use crate::persistence::snapshot::SnapshotStore;
use crate::persistence::{Clock, PersistOutcome, Persister};
use crate::store::CounterStore;

/// A provisioned hit counter, ready to render.
///
/// # Examples
///
/// ```rust
/// use hitcounter::glyphs::MemoryAssets;
/// use hitcounter::persistence::snapshot::JsonFileStore;
/// use hitcounter::{DisplayConfig, HitCounter};
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = DisplayConfig::new().with_pad_digits(4);
/// let assets = MemoryAssets::placeholder(config.style);
///
/// let counter = HitCounter::provision(
///     config,
///     &assets,
///     JsonFileStore::new(dir.path().join("hitcounters.json")),
/// )
/// .unwrap();
///
/// let html = counter.hit("/index.html").unwrap();
/// assert_eq!(html.matches("<img").count(), 4);
/// assert_eq!(counter.count("/index.html"), Some(1));
/// ```
#[derive(Debug)]
pub struct HitCounter {
    config: DisplayConfig,
    glyphs: GlyphTable,
    counters: CounterStore,
    persister: Persister,
}

impl HitCounter {
    /// Builds the glyph table for the configured style, then restores the
    /// last snapshot from `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetLoad`](crate::Error::AssetLoad) if any digit
    /// image is missing. A snapshot that fails to restore is logged and the
    /// counter starts empty.
    pub fn provision(
        config: DisplayConfig,
        assets: &dyn AssetSource,
        target: impl SnapshotStore + 'static,
    ) -> Result<Self> {
        Self::provision_with(config, assets, Persister::new(target))
    }

    /// Like [`provision`](Self::provision), with a caller-configured
    /// [`Persister`].
    pub fn provision_with(
        config: DisplayConfig,
        assets: &dyn AssetSource,
        persister: Persister,
    ) -> Result<Self> {
        let glyphs = GlyphTable::build(assets, config.style)?;
        tracing::info!(
            style = %config.style,
            pad_digits = config.pad_digits,
            snapshot = ?persister.location(),
            "loaded hit counter digits"
        );

        let counters = CounterStore::new();
        if let Err(err) = persister.restore(&counters) {
            tracing::error!(error = %err, "restoring hit counters");
        }

        Ok(Self {
            config,
            glyphs,
            counters,
            persister,
        })
    }

    /// Same as [`provision`](Self::provision) with an injected clock.
    pub fn provision_with_clock(
        config: DisplayConfig,
        assets: &dyn AssetSource,
        target: impl SnapshotStore + 'static,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::provision_with(config, assets, Persister::new(target).with_clock(clock))
    }

    /// Records one hit on `key` and returns the new count as HTML.
    ///
    /// Persistence failures are logged and never change the result.
    pub fn hit(&self, key: &str) -> Result<String> {
        let count = self.counters.increment_and_get(key);

        if let Err(err) = self.persister.persist(&self.counters) {
            tracing::error!(error = %err, "persisting hit counter data");
        }

        Ok(render_html(count, self.config.pad_digits, &self.glyphs))
    }

    /// Current count for `key` without recording a hit.
    pub fn count(&self, key: &str) -> Option<u64> {
        self.counters.get(key)
    }

    /// Writes the counts now, ignoring the cooldown.
    ///
    /// Call from the host's shutdown hook so the last window of hits is not
    /// lost.
    pub fn flush(&self) -> Result<PersistOutcome> {
        self.persister.flush(&self.counters)
    }

    /// The display configuration the counter was provisioned with.
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// The glyph table built at provisioning.
    pub fn glyphs(&self) -> &GlyphTable {
        &self.glyphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Style;
    use crate::error::Error;
    use crate::glyphs::MemoryAssets;
    use crate::persistence::snapshot::{JsonFileStore, PersistedSnapshot};
    use crate::persistence::ManualClock;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    fn provision(dir: &std::path::Path, config: DisplayConfig) -> (HitCounter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let counter = HitCounter::provision_with_clock(
            config,
            &MemoryAssets::placeholder(config.style),
            JsonFileStore::new(dir.join("hitcounters.json")),
            clock.clone(),
        )
        .unwrap();
        (counter, clock)
    }

    #[test]
    fn test_hit_renders_count() {
        let dir = tempfile::tempdir().unwrap();
        let (counter, _) = provision(dir.path(), DisplayConfig::new().with_pad_digits(3));

        counter.hit("a").unwrap();
        let html = counter.hit("a").unwrap();

        let table = counter.glyphs();
        assert_eq!(
            html,
            format!("{}{}{}", table.glyph(0), table.glyph(0), table.glyph(2))
        );
    }

    #[test]
    fn test_hit_unpadded() {
        let dir = tempfile::tempdir().unwrap();
        let (counter, _) = provision(dir.path(), DisplayConfig::new());

        assert_eq!(counter.hit("").unwrap(), counter.glyphs().glyph(1));
        assert_eq!(counter.count(""), Some(1));
        assert_eq!(counter.count("other"), None);
    }

    #[test]
    fn test_hit_wide_padding() {
        let dir = tempfile::tempdir().unwrap();
        let config = DisplayConfig::from_directives("pad_digits 70000").unwrap();
        let (counter, _) = provision(dir.path(), config);

        let html = counter.hit("a").unwrap();
        assert_eq!(html.matches("<img").count(), 70_000);
        assert!(html.ends_with(counter.glyphs().glyph(1)));
    }

    #[test]
    fn test_missing_assets_abort() {
        let dir = tempfile::tempdir().unwrap();
        let result = HitCounter::provision(
            DisplayConfig::new().with_style(Style::Yellow),
            &MemoryAssets::placeholder(Style::Green),
            JsonFileStore::new(dir.path().join("hitcounters.json")),
        );
        assert!(matches!(
            result,
            Err(Error::AssetLoad {
                style: Style::Yellow,
                ..
            })
        ));
    }

    #[test]
    fn test_corrupt_snapshot_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hitcounters.json"), "{{{").unwrap();

        let (counter, _) = provision(dir.path(), DisplayConfig::new());
        counter.hit("a").unwrap();
        assert_eq!(counter.count("a"), Some(1));
    }

    #[test]
    fn test_restores_previous_counts() {
        let dir = tempfile::tempdir().unwrap();
        JsonFileStore::new(dir.path().join("hitcounters.json"))
            .save(&PersistedSnapshot::new(
                chrono::Utc::now(),
                HashMap::from([("a".to_string(), 5)]),
            ))
            .unwrap();

        let (counter, _) = provision(dir.path(), DisplayConfig::new());
        counter.hit("a").unwrap();
        assert_eq!(counter.count("a"), Some(6));
        assert_eq!(counter.count("b"), None);
    }

    #[test]
    fn test_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (counter, clock) = provision(dir.path(), DisplayConfig::new());
            counter.hit("/").unwrap();
            clock.advance(Duration::from_secs(5));
            counter.hit("/").unwrap();
            // the second hit is still inside the cooldown window
            counter.flush().unwrap();
        }

        let (counter, _) = provision(dir.path(), DisplayConfig::new());
        assert_eq!(counter.count("/"), Some(2));
    }

    #[test]
    fn test_hits_within_cooldown_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hitcounters.json");
        let (counter, clock) = provision(dir.path(), DisplayConfig::new());

        counter.hit("a").unwrap();
        counter.hit("a").unwrap();
        let on_disk = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(on_disk.counts.get("a"), Some(&1));

        clock.advance(Duration::from_secs(30));
        counter.hit("a").unwrap();
        let on_disk = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(on_disk.counts.get("a"), Some(&3));
    }

    #[test]
    fn test_write_failure_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let counter = HitCounter::provision(
            DisplayConfig::new(),
            &MemoryAssets::placeholder(Style::Green),
            JsonFileStore::new(blocker.join("hitcounters.json")),
        )
        .unwrap();

        assert_eq!(counter.hit("a").unwrap(), counter.glyphs().glyph(1));
        assert!(counter.flush().is_err());
    }

    #[test]
    fn test_concurrent_hits() {
        let dir = tempfile::tempdir().unwrap();
        let (counter, _) = provision(dir.path(), DisplayConfig::new().with_pad_digits(4));
        let counter = Arc::new(counter);

        let mut handles = vec![];
        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            handles.push(std::thread::spawn(move || {
                (0..50)
                    .map(|_| counter.hit("page").unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut rendered = HashSet::new();
        for handle in handles {
            for html in handle.join().unwrap() {
                assert!(rendered.insert(html));
            }
        }
        assert_eq!(rendered.len(), 200);
        assert_eq!(counter.count("page"), Some(200));
    }
}
