//! `${name}` / `${name:default}` expressions embedded in scalar values.

use regex::{Captures, Regex};
use std::sync::OnceLock;

static PLACEHOLDER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> &'static Regex {
    PLACEHOLDER_PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z0-9_-]+)(?::(.+?))?\}").expect("placeholder pattern is valid")
    })
}

/// A parsed placeholder expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Dotted key to look up.
    pub name: &'a str,
    /// Raw default text after the first `:`, if any.
    pub default: Option<&'a str>,
}

impl<'a> Placeholder<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        Some(Self {
            name: caps.get(1)?.as_str(),
            default: caps.get(2).map(|m| m.as_str()),
        })
    }

    /// Parse a single expression such as `${HOST:localhost}`.
    pub fn parse(expr: &'a str) -> Option<Self> {
        let caps = pattern().captures(expr)?;
        if caps.get(0)?.as_str().len() != expr.len() {
            return None;
        }
        Self::from_captures(&caps)
    }

    /// All non-overlapping placeholders in `text`, left to right.
    pub fn find_all(text: &'a str) -> Vec<Self> {
        pattern()
            .captures_iter(text)
            .filter_map(|caps| Self::from_captures(&caps))
            .collect()
    }

    /// Returns `true` if `text` contains at least one placeholder.
    pub fn contains_any(text: &str) -> bool {
        pattern().is_match(text)
    }

    /// Replace every placeholder in `text` with the result of `lookup`.
    ///
    /// Replacement text is emitted verbatim and never scanned again.
    pub fn substitute<F>(text: &str, mut lookup: F) -> String
    where
        F: FnMut(&Placeholder<'_>) -> String,
    {
        pattern()
            .replace_all(text, |caps: &Captures<'_>| {
                Placeholder::from_captures(caps)
                    .map(|placeholder| lookup(&placeholder))
                    .unwrap_or_default()
            })
            .into_owned()
    }
}
