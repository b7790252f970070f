//! Rendered fragment records and their cache keys.

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::BeliefMap;

// == Variant ==
/// Personalization mode a fragment was rendered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum PaneVariant {
    Default,
    /// Rendered for a specific set of held/withheld beliefs. Values are kept
    /// sorted and deduplicated so equal combinations compare equal.
    BeliefGated {
        held: BeliefMap,
        withheld: BeliefMap,
    },
    Hidden,
}

impl PaneVariant {
    /// Canonical belief-gated variant for the given belief combination.
    pub fn belief_gated(held: &BeliefMap, withheld: &BeliefMap) -> Self {
        Self::BeliefGated {
            held: normalize(held),
            withheld: normalize(withheld),
        }
    }
}

fn normalize(beliefs: &BeliefMap) -> BeliefMap {
    beliefs
        .iter()
        .map(|(slug, values)| {
            let mut values = values.clone();
            values.sort();
            values.dedup();
            (slug.clone(), values)
        })
        .collect()
}

/// Percent-escapes the separators used in rendered keys.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' | '|' | ',' | '=' | '[' | ']' | ':' => {
                let _ = write!(out, "%{:02X}", u32::from(c));
            }
            _ => out.push(c),
        }
    }
    out
}

fn write_beliefs(f: &mut fmt::Formatter<'_>, beliefs: &BeliefMap) -> fmt::Result {
    for (i, (slug, values)) in beliefs.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}=", escape(slug))?;
        for (j, value) in values.iter().enumerate() {
            if j > 0 {
                f.write_str("|")?;
            }
            f.write_str(&escape(value))?;
        }
    }
    Ok(())
}

impl fmt::Display for PaneVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneVariant::Default => f.write_str("default"),
            PaneVariant::Hidden => f.write_str("hidden"),
            PaneVariant::BeliefGated { held, withheld } => {
                f.write_str("held[")?;
                write_beliefs(f, held)?;
                f.write_str("]withheld[")?;
                write_beliefs(f, withheld)?;
                f.write_str("]")
            }
        }
    }
}

// == Fragment Key ==
/// Cache key of a rendered fragment: (content id, variant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub content_id: String,
    pub variant: PaneVariant,
}

impl FragmentKey {
    pub fn new(content_id: impl Into<String>, variant: PaneVariant) -> Self {
        Self {
            content_id: content_id.into(),
            variant,
        }
    }

    pub fn default_for(content_id: impl Into<String>) -> Self {
        Self::new(content_id, PaneVariant::Default)
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", escape(&self.content_id), self.variant)
    }
}

// == HTML Chunk ==
/// Rendered output and the content ids it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlChunk {
    pub html: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub last_updated: DateTime<Utc>,
}
