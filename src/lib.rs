//! # Hitcounter - Durable Hit Counters Rendered as Digit Glyphs
//!
//! A Rust library implementing the classic early-Web page hit counter: every
//! time a page is rendered its counter goes up by one, and the new total is
//! displayed as a row of digit images.
//!
//! ## The Problem
//!
//! A hit counter looks trivial, but a useful one has to get three things
//! right at once:
//!
//! - Concurrent requests for the same page must never see the same number.
//! - Counts must survive a restart.
//! - Persisting must not turn every page view into a disk write.
//!
//! ## The Solution
//!
//! The library is split into three components:
//!
//! ```text
//!   ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//!   │  Glyph Renderer  │ ◄── │  Counter Store   │ ◄── │    Persister     │
//!   │  (glyphs)        │     │  (store)         │     │  (persistence)   │
//!   │  stateless       │     │  Mutex<HashMap>  │     │  Mutex<watermark>│
//!   └──────────────────┘     └──────────────────┘     └──────────────────┘
//! ```
//!
//! 1. **Counter Store**: [`CounterStore`] keeps a `HashMap<String, u64>`
//!    behind a single mutex. [`CounterStore::increment_and_get`] is
//!    linearizable: N concurrent hits on one key return exactly `1..=N`.
//!
//! 2. **Persister**: [`Persister`](persistence::Persister) writes a JSON
//!    snapshot at most once per cooldown (30 seconds by default). The
//!    watermark is advanced *before* writing, so a broken disk is retried at
//!    most once per window instead of on every request. The watermark has
//!    its own lock, so throttling decisions never block increments.
//!
//! 3. **Glyph Renderer**: a [`GlyphTable`](glyphs::GlyphTable) holds ten
//!    `<img>` tags with base64 `data:` URIs, built once at startup.
//!    [`render_count`](glyphs::render_count) turns a count into glyphs,
//!    optionally zero-padded.
//!
//! [`HitCounter`] wires the three together for a host.
//!
//! ## Quick Start
//!
//! ```rust
//! use hitcounter::glyphs::MemoryAssets;
//! use hitcounter::persistence::snapshot::JsonFileStore;
//! use hitcounter::{DisplayConfig, HitCounter};
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # std::env::set_var("HITCOUNTER_DATA_DIR", dir.path());
//! let config = DisplayConfig::from_directives("style green\npad_digits 6")?;
//!
//! // Digit images normally come from `DirAssets`; placeholders work too.
//! let assets = MemoryAssets::placeholder(config.style);
//!
//! let counter = HitCounter::provision(config, &assets, JsonFileStore::at_default_location())?;
//!
//! // One call per rendered page.
//! let html = counter.hit("/guestbook.html")?;
//! assert_eq!(html.matches("<img").count(), 6);
//!
//! // On shutdown, write whatever the cooldown held back.
//! counter.flush()?;
//! # Ok::<(), hitcounter::Error>(())
//! ```
//!
//! ## Snapshot File
//!
//! By default the snapshot lives at
//! [`default_snapshot_path`](persistence::snapshot::default_snapshot_path),
//! which honours `HITCOUNTER_DATA_DIR`, then `XDG_DATA_HOME`, then `HOME`.
//! It is plain JSON:
//!
//! ```json
//! {"timestamp":"2024-05-01T12:00:00Z","counts":{"/guestbook.html":1337}}
//! ```
//!
//! A missing file means "no prior data". A file that cannot be parsed is
//! logged, the counters start from zero, and the next write replaces it.
//!
//! ## Logging
//!
//! The library emits [`tracing`] events but never installs a subscriber.
//! Restores and failures are logged at `info` and `error`, each performed
//! write at `debug`, and throttled writes at `trace`.
//!
//! ## Limitations
//!
//! - One process per snapshot file. Several instances sharing a file will
//!   overwrite each other's counts.
//! - Hits recorded after the last write are lost on a crash. Call
//!   [`HitCounter::flush`] from a shutdown hook to narrow that window.
//! - Counters are never expired.

pub mod config;
pub mod error;
pub mod glyphs;
pub mod hit_counter;
pub mod persistence;
pub mod store;

pub use config::{DisplayConfig, Style};
pub use error::{Error, Result, SnapshotError};
pub use hit_counter::HitCounter;
pub use store::CounterStore;
