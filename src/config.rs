//! Display configuration.
//!
//! Two options are recognized:
//!
//! | Option | Argument | Default |
//! |--------|----------|---------|
//! | `style` | one of `green`, `bright_green`, `odometer`, `yellow` | `green` |
//! | `pad_digits` | non-negative integer, `0` disables padding | `0` |
//!
//! Configuration can be read either as a directive block (one `name value`
//! pair per line) or as TOML. Both loaders reject unknown options.
//!
//! ```rust
//! use hitcounter::{DisplayConfig, Style};
//!
//! let config = DisplayConfig::from_directives("style odometer\npad_digits 6").unwrap();
//! assert_eq!(config.style, Style::Odometer);
//! assert_eq!(config.pad_digits, 6);
//!
//! let config = DisplayConfig::from_toml("style = \"yellow\"").unwrap();
//! assert_eq!(config.style, Style::Yellow);
//! assert_eq!(config.pad_digits, 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::{Error, Result};

/// The visual theme of the digit glyphs.
///
/// Style names are also the asset directory names, see
/// [`DirAssets`](crate::glyphs::DirAssets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Green,
    BrightGreen,
    Odometer,
    Yellow,
}

impl Style {
    /// All known styles.
    pub const ALL: [Style; 4] = [
        Style::Green,
        Style::BrightGreen,
        Style::Odometer,
        Style::Yellow,
    ];

    /// Returns the configuration name of the style.
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Green => "green",
            Style::BrightGreen => "bright_green",
            Style::Odometer => "odometer",
            Style::Yellow => "yellow",
        }
    }
}

impl Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Style::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown style '{s}'")))
    }
}

/// Options controlling how a count is rendered.
///
/// Supplied once at startup and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// The glyph style to render with.
    pub style: Style,
    /// Minimum number of digits; shorter counts are zero-padded.
    pub pad_digits: usize,
}

impl DisplayConfig {
    /// Creates a configuration with the default style and no padding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the style, returning `self` for method chaining.
    pub fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }

    /// Sets the padding width, returning `self` for method chaining.
    pub fn with_pad_digits(self, pad_digits: usize) -> Self {
        Self { pad_digits, ..self }
    }

    /// Parses a directive block.
    ///
    /// Each non-empty line holds an option name followed by exactly one
    /// argument. Lines starting with `#` are comments. When an option is
    /// repeated the last occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unrecognized option, a missing or
    /// extra argument, an unknown style, or a padding value that is not a
    /// non-negative integer.
    pub fn from_directives(input: &str) -> Result<Self> {
        let mut config = Self::default();

        for (lineno, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            // a non-empty trimmed line always has a first token
            let Some(name) = tokens.next() else { continue };
            let args: Vec<&str> = tokens.collect();

            match name {
                "style" => config.style = single_arg(name, &args, lineno)?.parse()?,
                "pad_digits" => {
                    let value = single_arg(name, &args, lineno)?;
                    config.pad_digits = value.parse().map_err(|err| {
                        Error::Config(format!("invalid digit padding number '{value}': {err}"))
                    })?;
                }
                other => {
                    return Err(Error::Config(format!(
                        "unrecognized hit counter config property: {other}"
                    )))
                }
            }
        }

        Ok(config)
    }

    /// Parses a TOML document with optional `style` and `pad_digits` keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed, contains an
    /// unknown key, or a value has the wrong type.
    pub fn from_toml(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }
}

fn single_arg<'a>(name: &str, args: &[&'a str], lineno: usize) -> Result<&'a str> {
    match args {
        [value] => Ok(value),
        _ => Err(Error::Config(format!(
            "wrong argument count for '{name}' on line {}: expected 1, got {}",
            lineno + 1,
            args.len()
        ))),
    }
}
