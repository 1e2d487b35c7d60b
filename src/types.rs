//! Shared types used across all pipeline stages.
//!
//! [`ContentRecord`] is the unit persisted in `challenges.json` and the only
//! input of the site synthesizer. Field names on disk follow the store format
//! that predates this crate (`name` for the title, `docs` for links), so the
//! JSON stays diffable against older history.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Difficulty tier of a challenge. Ordered `Easy < Medium < Hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Every tier, in ascending order.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Display label, also the wire value in the output contract.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Parse a wire label. Matching is exact: the contract is an enum.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == label)
    }

    /// Case-insensitive parse for labels read back from the store.
    pub fn parse_loose(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A documentation link attached to a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLink {
    /// Link label
    pub title: String,
    pub url: String,
}

/// One generated challenge. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Calendar day, `YYYY-MM-DD`. Unique within the store.
    pub date: String,
    #[serde(rename = "name")]
    pub title: String,
    pub difficulty: Difficulty,
    pub description: String,
    /// Short code preview rendered verbatim (escaped) on the card.
    pub snippet: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub docs: Vec<DocLink>,
}

impl ContentRecord {
    /// Decode one raw store entry.
    ///
    /// Older or hand-edited entries may spell the tier in any case
    /// (`"easy"`); that is normalized before decoding.
    pub fn from_entry(entry: &Value) -> Result<Self, serde_json::Error> {
        let mut entry = entry.clone();
        let normalized = entry
            .get("difficulty")
            .and_then(Value::as_str)
            .and_then(Difficulty::parse_loose);
        if let (Some(difficulty), Some(obj)) = (normalized, entry.as_object_mut()) {
            obj.insert("difficulty".to_string(), Value::from(difficulty.as_str()));
        }
        serde_json::from_value(entry)
    }
}
