//! Digit glyphs and count rendering.
//!
//! A [`GlyphTable`] holds ten pre-rendered `<img>` tags, one per decimal
//! digit. Image bytes are inlined as base64 `data:` URIs when the table is
//! built, so rendered output stays valid even if the asset store goes away
//! later.
//!
//! ```rust
//! use hitcounter::glyphs::{render_count, GlyphTable, MemoryAssets};
//! use hitcounter::Style;
//!
//! let assets = MemoryAssets::placeholder(Style::Green);
//! let table = GlyphTable::build(&assets, Style::Green).unwrap();
//!
//! assert_eq!(render_count(42, 3, &table).len(), 3);
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Style;
use crate::error::{Error, Result};

/// A source of digit images.
///
/// Implementations return the raw image bytes together with a file name,
/// whose extension determines the MIME type of the generated `data:` URI.
pub trait AssetSource {
    /// Loads the image for `digit` (0 to 9) in the given style.
    fn load(&self, style: Style, digit: u8) -> io::Result<(Vec<u8>, String)>;
}

/// Reads digit images from a directory tree laid out as `ROOT/STYLE/D.png`.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    /// Creates a source reading from the directory `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory the style subdirectories live in.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirAssets {
    fn load(&self, style: Style, digit: u8) -> io::Result<(Vec<u8>, String)> {
        let file_name = format!("{digit}.png");
        let bytes = std::fs::read(self.root.join(style.as_str()).join(&file_name))?;
        Ok((bytes, file_name))
    }
}

/// Digit images held in memory, keyed by style and digit.
///
/// Useful for embedding assets with `include_bytes!` or for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    images: HashMap<(Style, u8), (Vec<u8>, String)>,
}

impl MemoryAssets {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one image, returning `self` for method chaining.
    pub fn with_image(
        mut self,
        style: Style,
        digit: u8,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.images
            .insert((style, digit), (bytes.into(), file_name.into()));
        self
    }

    /// A full set of tiny SVG placeholders for `style`, each containing its
    /// digit as text.
    pub fn placeholder(style: Style) -> Self {
        (0..=9).fold(Self::new(), |assets, digit| {
            let svg = format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="12" height="16"><text y="14">{digit}</text></svg>"#
            );
            assets.with_image(style, digit, format!("{digit}.svg"), svg)
        })
    }
}

impl AssetSource for MemoryAssets {
    fn load(&self, style: Style, digit: u8) -> io::Result<(Vec<u8>, String)> {
        self.images.get(&(style, digit)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no image for digit {digit} in style {style}"),
            )
        })
    }
}

/// Ten self-contained `<img>` tags indexed by digit value.
///
/// Built once at startup and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphTable {
    style: Style,
    tags: [String; 10],
}

impl GlyphTable {
    /// Loads all ten digit images for `style` and encodes them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetLoad`] for the first digit whose image cannot be
    /// loaded. No fallback style is tried.
    pub fn build(source: &dyn AssetSource, style: Style) -> Result<Self> {
        let mut tags: [String; 10] = Default::default();

        for (digit, tag) in (0u8..).zip(tags.iter_mut()) {
            let (bytes, file_name) = source
                .load(style, digit)
                .map_err(|source| Error::AssetLoad {
                    style,
                    digit,
                    source,
                })?;
            *tag = format!(
                r#"<img src="data:{};base64,{}">"#,
                mime_type(&file_name),
                STANDARD.encode(bytes)
            );
        }

        Ok(Self { style, tags })
    }

    /// The style the table was built from.
    pub fn style(&self) -> Style {
        self.style
    }

    /// Returns the glyph for a single digit.
    ///
    /// # Panics
    ///
    /// Panics if `digit > 9`.
    pub fn glyph(&self, digit: u8) -> &str {
        &self.tags[usize::from(digit)]
    }
}

/// Renders `count` as glyphs, most significant digit first.
///
/// When `pad_digits > 0` the count is left-padded with zeros to at least
/// that many digits. Wider counts are never truncated.
pub fn render_count(count: u64, pad_digits: usize, table: &GlyphTable) -> Vec<&str> {
    let digits = count.to_string();
    let padding = pad_digits.saturating_sub(digits.len());

    std::iter::repeat(table.glyph(0))
        .take(padding)
        .chain(digits.bytes().map(|b| table.glyph(b - b'0')))
        .collect()
}

/// Renders `count` as one HTML string of concatenated `<img>` tags.
pub fn render_html(count: u64, pad_digits: usize, table: &GlyphTable) -> String {
    render_count(count, pad_digits, table).concat()
}

fn mime_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
