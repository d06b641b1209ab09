use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Text encoding of a database, as reported by `PRAGMA encoding`.
///
/// The [`ValueEnum`] names (`utf-8`, `utf-16le`, ...) let a downstream CLI
/// accept `--encoding`; `Unknown` is not offered there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum Encoding {
    #[default]
    #[serde(rename = "UNKNOWN")]
    #[value(skip)]
    Unknown,
    #[serde(rename = "UTF-8")]
    #[value(name = "utf-8")]
    Utf8,
    #[serde(rename = "UTF-16LE")]
    #[value(name = "utf-16le")]
    Utf16le,
    #[serde(rename = "UTF-16BE")]
    #[value(name = "utf-16be")]
    Utf16be,
    #[serde(rename = "UTF-16")]
    #[value(name = "utf-16")]
    Utf16,
}

static ENCODING_NAMES: [&str; 5] = ["UNKNOWN", "UTF-8", "UTF-16LE", "UTF-16BE", "UTF-16"];

const ALL: [Encoding; 5] = [
    Encoding::Unknown,
    Encoding::Utf8,
    Encoding::Utf16le,
    Encoding::Utf16be,
    Encoding::Utf16,
];

impl Encoding {
    /// Canonical engine name, e.g. `"UTF-16LE"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        ENCODING_NAMES[self as usize]
    }

    /// Case-insensitive lookup by canonical name. Anything else is `Unknown`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        ENCODING_NAMES
            .iter()
            .zip(ALL)
            .skip(1)
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map_or(Encoding::Unknown, |(_, encoding)| encoding)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Encoding::parse(s))
    }
}
