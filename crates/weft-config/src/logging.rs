//! Log output selection.
//!
//! Hosts write dispatch events to stderr either as flattened JSON records
//! for collectors or as short text lines for a developer terminal. The
//! format is chosen by name from configuration; `text` is accepted as a
//! synonym for `compact`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

/// How the telemetry layer renders each event.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Machine-readable records; the default for deployed hosts.
    #[default]
    Json,
    /// Terminal lines, coloured when stderr is a TTY.
    #[serde(alias = "text")]
    #[strum(to_string = "compact", serialize = "text")]
    Compact,
}

impl LogFormat {
    /// Whether ANSI escapes may be emitted.
    #[must_use]
    pub const fn allows_colour(self) -> bool {
        matches!(self, Self::Compact)
    }

    /// Canonical names in declaration order, for help text and diagnostics.
    #[must_use]
    pub const fn names() -> &'static [&'static str] {
        Self::VARIANTS
    }
}

/// Parse failure for an unrecognised format name.
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", Some(LogFormat::Json))]
    #[case("JSON", Some(LogFormat::Json))]
    #[case("compact", Some(LogFormat::Compact))]
    #[case("Text", Some(LogFormat::Compact))]
    #[case("pretty", None)]
    fn resolves_format_names(#[case] name: &str, #[case] expected: Option<LogFormat>) {
        assert_eq!(LogFormat::from_str(name).ok(), expected);
    }

    #[test]
    fn text_synonym_renders_as_compact() {
        let format: LogFormat = serde_json::from_str("\"text\"").expect("alias");
        assert_eq!(format, LogFormat::Compact);
        assert_eq!(format.to_string(), "compact");
    }

    #[test]
    fn colour_follows_format() {
        assert!(LogFormat::Compact.allows_colour());
        assert!(!LogFormat::Json.allows_colour());
    }

    #[test]
    fn lists_canonical_names() {
        assert_eq!(LogFormat::names(), ["json", "compact"]);
    }
}
