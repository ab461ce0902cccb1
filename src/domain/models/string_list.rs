//! Lists given either as a sequence or as one comma-separated string.
//!
//! Environment overrides and placeholders always produce strings, so a list
//! setting such as `hosts: [a, b]` may arrive as `"a,b"`.
//!
//! Use with `#[serde(deserialize_with = "crate::domain::models::string_list::deserialize")]`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList {
    Items(Vec<String>),
    Joined(String),
}

/// Split a comma-separated string, dropping blank entries.
pub fn split(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serde deserializer accepting a sequence of strings or a joined string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawList::deserialize(deserializer)? {
        RawList::Items(items) => items,
        RawList::Joined(raw) => split(&raw),
    })
}
