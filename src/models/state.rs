//! Visitor and session records held by the per-tenant user-state store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// belief slug -> values held (or required)
pub type BeliefMap = BTreeMap<String, Vec<String>>;

// == Fingerprint ==
/// Durable pseudo-identity of a visitor and the beliefs it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintState {
    pub fingerprint_id: String,
    pub lead_id: Option<String>,
    #[serde(default)]
    pub held_beliefs: BeliefMap,
    #[serde(default)]
    pub held_badges: BTreeMap<String, String>,
    pub last_activity: DateTime<Utc>,
}

impl FingerprintState {
    pub fn new(fingerprint_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            fingerprint_id: fingerprint_id.into(),
            lead_id: None,
            held_beliefs: BeliefMap::new(),
            held_badges: BTreeMap::new(),
            last_activity: now,
        }
    }
}

// == Visit ==
/// One browsing-session attempt, scoped to exactly one fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitState {
    pub visit_id: String,
    pub fingerprint_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub current_page: Option<String>,
}

impl VisitState {
    pub fn new(
        visit_id: impl Into<String>,
        fingerprint_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            visit_id: visit_id.into(),
            fingerprint_id: fingerprint_id.into(),
            started_at: now,
            last_activity: now,
            current_page: None,
        }
    }
}

// == Session ==
/// Links a live session to its fingerprint and visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub session_id: String,
    pub fingerprint_id: String,
    pub visit_id: String,
    pub lead_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// == Belief Registry ==
/// Held and withheld belief requirements of one pane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneBeliefRequirements {
    #[serde(default)]
    pub held: BeliefMap,
    #[serde(default)]
    pub withheld: BeliefMap,
}

impl PaneBeliefRequirements {
    pub fn is_empty(&self) -> bool {
        self.held.is_empty() && self.withheld.is_empty()
    }
}

/// Precomputed personalization requirements of one story fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefRegistry {
    pub story_fragment_id: String,
    #[serde(default)]
    pub required_beliefs: BTreeSet<String>,
    #[serde(default)]
    pub required_badges: BTreeSet<String>,
    /// pane id -> its requirements
    #[serde(default)]
    pub pane_requirements: HashMap<String, PaneBeliefRequirements>,
    pub last_updated: DateTime<Utc>,
}

impl BeliefRegistry {
    /// Builds a registry and derives `required_beliefs` from the panes.
    pub fn from_panes(
        story_fragment_id: impl Into<String>,
        pane_requirements: HashMap<String, PaneBeliefRequirements>,
        required_badges: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let required_beliefs = pane_requirements
            .values()
            .flat_map(|req| req.held.keys().chain(req.withheld.keys()))
            .cloned()
            .collect();

        Self {
            story_fragment_id: story_fragment_id.into(),
            required_beliefs,
            required_badges,
            pane_requirements,
            last_updated: now,
        }
    }
}

/// Beliefs in effect for one session while rendering one story fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBeliefContext {
    pub session_id: String,
    pub story_fragment_id: String,
    #[serde(default)]
    pub user_beliefs: BeliefMap,
    pub last_evaluation: DateTime<Utc>,
}

// == Snapshot ==
/// One row of the session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub fingerprint_id: String,
    pub visit_id: String,
    pub has_lead: bool,
    pub belief_count: usize,
    pub last_activity: DateTime<Utc>,
}

/// Read-only view of a tenant's live sessions for dashboard consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub taken_at: DateTime<Utc>,
    pub session_count: usize,
    pub visit_count: usize,
    pub fingerprint_count: usize,
    pub known_fingerprint_count: usize,
    pub sessions: Vec<SessionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_collects_required_beliefs() {
        let mut panes = HashMap::new();
        panes.insert(
            "pane-1".to_string(),
            PaneBeliefRequirements {
                held: BeliefMap::from([("color".to_string(), vec!["red".to_string()])]),
                withheld: BeliefMap::from([("size".to_string(), vec!["xl".to_string()])]),
            },
        );
        panes.insert("pane-2".to_string(), PaneBeliefRequirements::default());

        let registry = BeliefRegistry::from_panes("sf-1", panes, BTreeSet::new(), Utc::now());
        let expected: BTreeSet<String> = ["color", "size"].iter().map(|s| s.to_string()).collect();
        assert_eq!(registry.required_beliefs, expected);
    }

    #[test]
    fn test_session_expiry_boundary() {
        let now = Utc::now();
        let session = SessionData {
            session_id: "s".to_string(),
            fingerprint_id: "f".to_string(),
            visit_id: "v".to_string(),
            lead_id: None,
            created_at: now,
            last_activity: now,
            expires_at: now,
        };
        assert!(session.is_expired(now));
    }
}
