//! User State Store Module
//!
//! Per-tenant fingerprints, visits, sessions, known-fingerprint flags,
//! belief registries and per-session belief contexts, all behind one lock.
//!
//! Invariant: at most one visit per fingerprint is current. Storing a visit
//! removes every other visit of the same fingerprint.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::warn;

use crate::cache::clock::{is_stale, Clock};
use crate::cache::stats::{CacheCounters, CacheStats};
use crate::models::state::{
    BeliefRegistry, FingerprintState, SessionBeliefContext, SessionData, SessionSnapshot,
    SessionSummary, VisitState,
};

/// Share of sessions dropped when the per-tenant ceiling is hit.
const SESSION_EVICTION_DIVISOR: usize = 5;

fn context_key(session_id: &str, story_fragment_id: &str) -> String {
    format!("{}:{}", session_id, story_fragment_id)
}

#[derive(Debug, Default)]
struct UserStateInner {
    fingerprints: HashMap<String, FingerprintState>,
    visits: HashMap<String, VisitState>,
    sessions: HashMap<String, SessionData>,
    known_fingerprints: HashMap<String, bool>,
    belief_registries: HashMap<String, BeliefRegistry>,
    belief_contexts: HashMap<String, SessionBeliefContext>,
}

impl UserStateInner {
    fn len(&self) -> usize {
        self.fingerprints.len()
            + self.visits.len()
            + self.sessions.len()
            + self.known_fingerprints.len()
            + self.belief_registries.len()
            + self.belief_contexts.len()
    }

    /// Drops the oldest sessions by last activity. Returns how many went.
    fn evict_oldest_sessions(&mut self, count: usize) -> usize {
        let mut by_age: Vec<(DateTime<Utc>, String)> = self
            .sessions
            .values()
            .map(|s| (s.last_activity, s.session_id.clone()))
            .collect();
        by_age.sort();

        let victims: Vec<String> = by_age.into_iter().take(count).map(|(_, id)| id).collect();
        for id in &victims {
            self.sessions.remove(id);
            self.belief_contexts
                .retain(|_, ctx| &ctx.session_id != id);
        }
        victims.len()
    }
}

// == User State Store ==
/// One tenant's visitor and session state.
#[derive(Debug)]
pub struct UserStateStore {
    inner: RwLock<UserStateInner>,
    ttl: Duration,
    session_ttl: Duration,
    max_sessions: usize,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
}

impl UserStateStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `ttl` - Staleness window for fingerprints, visits, registries and contexts
    /// * `session_ttl` - Longest a session lives after creation, whatever its `expires_at`
    /// * `max_sessions` - Session ceiling before the oldest fifth is evicted
    /// * `clock` - Time source for every staleness decision
    pub fn new(
        ttl: Duration,
        session_ttl: Duration,
        max_sessions: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: RwLock::new(UserStateInner::default()),
            ttl,
            session_ttl,
            max_sessions: max_sessions.max(1),
            clock,
            counters: CacheCounters::new(),
        }
    }

    // == Fingerprints ==
    pub fn get_fingerprint_state(&self, fingerprint_id: &str) -> Option<FingerprintState> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .fingerprints
            .get(fingerprint_id)
            .filter(|fp| !is_stale(fp.last_activity, self.ttl, now))
            .cloned();
        self.counters.record(found)
    }

    pub fn set_fingerprint_state(&self, state: FingerprintState) {
        self.inner
            .write()
            .fingerprints
            .insert(state.fingerprint_id.clone(), state);
    }

    /// Sets (or with empty `values`, clears) one held belief, creating the
    /// fingerprint on first sighting. Returns the updated state.
    pub fn update_held_belief(
        &self,
        fingerprint_id: &str,
        belief_slug: &str,
        values: Vec<String>,
    ) -> FingerprintState {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        let fingerprint = inner
            .fingerprints
            .entry(fingerprint_id.to_string())
            .or_insert_with(|| FingerprintState::new(fingerprint_id, now));

        if is_stale(fingerprint.last_activity, self.ttl, now) {
            *fingerprint = FingerprintState::new(fingerprint_id, now);
        }
        if values.is_empty() {
            fingerprint.held_beliefs.remove(belief_slug);
        } else {
            fingerprint.held_beliefs.insert(belief_slug.to_string(), values);
        }
        fingerprint.last_activity = now;
        fingerprint.clone()
    }

    pub fn invalidate_fingerprint(&self, fingerprint_id: &str) -> bool {
        self.inner.write().fingerprints.remove(fingerprint_id).is_some()
    }

    // == Known Fingerprints ==
    /// Whether the fingerprint belongs to a known lead. Unseen ids are unknown.
    pub fn is_known_fingerprint(&self, fingerprint_id: &str) -> bool {
        self.inner
            .read()
            .known_fingerprints
            .get(fingerprint_id)
            .copied()
            .unwrap_or(false)
    }

    pub fn set_known_fingerprint(&self, fingerprint_id: &str, known: bool) {
        self.inner
            .write()
            .known_fingerprints
            .insert(fingerprint_id.to_string(), known);
    }

    /// Marks every id as known in one lock acquisition. Returns how many were loaded.
    pub fn load_known_fingerprints<I, S>(&self, fingerprint_ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.write();
        let mut loaded = 0;
        for id in fingerprint_ids {
            inner.known_fingerprints.insert(id.into(), true);
            loaded += 1;
        }
        loaded
    }

    // == Visits ==
    pub fn get_visit_state(&self, visit_id: &str) -> Option<VisitState> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .visits
            .get(visit_id)
            .filter(|v| !is_stale(v.last_activity, self.ttl, now))
            .cloned();
        self.counters.record(found)
    }

    /// The current visit of a fingerprint, if any.
    pub fn get_visit_for_fingerprint(&self, fingerprint_id: &str) -> Option<VisitState> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .visits
            .values()
            .find(|v| v.fingerprint_id == fingerprint_id)
            .filter(|v| !is_stale(v.last_activity, self.ttl, now))
            .cloned();
        self.counters.record(found)
    }

    /// Stores a visit after removing every other visit of the same fingerprint.
    pub fn set_visit_state(&self, visit: VisitState) {
        let mut inner = self.inner.write();
        inner
            .visits
            .retain(|id, v| v.fingerprint_id != visit.fingerprint_id || *id == visit.visit_id);
        inner.visits.insert(visit.visit_id.clone(), visit);
    }

    pub fn invalidate_visit(&self, visit_id: &str) -> bool {
        self.inner.write().visits.remove(visit_id).is_some()
    }

    // == Sessions ==
    pub fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .sessions
            .get(session_id)
            .filter(|s| self.session_live(s, now))
            .cloned();
        self.counters.record(found)
    }

    /// Stores a session. At the ceiling, the oldest fifth of sessions (by
    /// last activity) is evicted first so the newest survive.
    pub fn set_session(&self, session: SessionData) {
        let mut inner = self.inner.write();
        if !inner.sessions.contains_key(&session.session_id)
            && inner.sessions.len() >= self.max_sessions
        {
            let target = (inner.sessions.len() / SESSION_EVICTION_DIVISOR).max(1);
            let evicted = inner.evict_oldest_sessions(target);
            self.counters.record_evictions(evicted as u64);
            warn!(
                "Session ceiling of {} reached, evicted {} oldest sessions",
                self.max_sessions, evicted
            );
        }
        inner.sessions.insert(session.session_id.clone(), session);
    }

    /// Bumps a session's last activity. Returns false when it is absent.
    pub fn touch_session(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        match self.inner.write().sessions.get_mut(session_id) {
            Some(session) => {
                session.last_activity = now;
                true
            }
            None => false,
        }
    }

    pub fn invalidate_session(&self, session_id: &str) -> bool {
        let mut inner = self.inner.write();
        inner.belief_contexts.retain(|_, ctx| ctx.session_id != session_id);
        inner.sessions.remove(session_id).is_some()
    }

    /// A session ends at the earlier of its own `expires_at` and
    /// `created_at + session_ttl`.
    fn session_live(&self, session: &SessionData, now: DateTime<Utc>) -> bool {
        !session.is_expired(now) && !is_stale(session.created_at, self.session_ttl, now)
    }

    pub fn session_count(&self) -> usize {
        self.inner.read().sessions.len()
    }

    // == Belief Registries ==
    pub fn get_belief_registry(&self, story_fragment_id: &str) -> Option<BeliefRegistry> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .belief_registries
            .get(story_fragment_id)
            .filter(|r| !is_stale(r.last_updated, self.ttl, now))
            .cloned();
        self.counters.record(found)
    }

    pub fn set_belief_registry(&self, registry: BeliefRegistry) {
        self.inner
            .write()
            .belief_registries
            .insert(registry.story_fragment_id.clone(), registry);
    }

    pub fn invalidate_belief_registry(&self, story_fragment_id: &str) -> bool {
        self.inner
            .write()
            .belief_registries
            .remove(story_fragment_id)
            .is_some()
    }

    // == Session Belief Contexts ==
    pub fn get_session_belief_context(
        &self,
        session_id: &str,
        story_fragment_id: &str,
    ) -> Option<SessionBeliefContext> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .belief_contexts
            .get(&context_key(session_id, story_fragment_id))
            .filter(|c| !is_stale(c.last_evaluation, self.ttl, now))
            .cloned();
        self.counters.record(found)
    }

    pub fn set_session_belief_context(&self, context: SessionBeliefContext) {
        let key = context_key(&context.session_id, &context.story_fragment_id);
        self.inner.write().belief_contexts.insert(key, context);
    }

    pub fn invalidate_session_belief_context(&self, session_id: &str, story_fragment_id: &str) -> bool {
        self.inner
            .write()
            .belief_contexts
            .remove(&context_key(session_id, story_fragment_id))
            .is_some()
    }

    /// Drops every context of one session, e.g. after its beliefs changed.
    pub fn invalidate_session_belief_contexts(&self, session_id: &str) -> usize {
        let mut inner = self.inner.write();
        let before = inner.belief_contexts.len();
        inner.belief_contexts.retain(|_, ctx| ctx.session_id != session_id);
        before - inner.belief_contexts.len()
    }

    // == Snapshot ==
    /// Consistent read-only view of live sessions, taken under one read lock.
    pub fn session_snapshot(&self) -> SessionSnapshot {
        let now = self.clock.now();
        let inner = self.inner.read();

        let mut sessions: Vec<SessionSummary> = inner
            .sessions
            .values()
            .filter(|s| self.session_live(s, now))
            .map(|s| SessionSummary {
                session_id: s.session_id.clone(),
                fingerprint_id: s.fingerprint_id.clone(),
                visit_id: s.visit_id.clone(),
                has_lead: s.lead_id.is_some(),
                belief_count: inner
                    .fingerprints
                    .get(&s.fingerprint_id)
                    .map_or(0, |fp| fp.held_beliefs.len()),
                last_activity: s.last_activity,
            })
            .collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        SessionSnapshot {
            taken_at: now,
            session_count: sessions.len(),
            visit_count: inner.visits.len(),
            fingerprint_count: inner.fingerprints.len(),
            known_fingerprint_count: inner.known_fingerprints.values().filter(|k| **k).count(),
            sessions,
        }
    }

    // == Maintenance ==
    /// Physically drops expired sessions and stale records. Known-fingerprint
    /// flags are kept. Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut inner = self.inner.write();
        let before = inner.len();

        inner.sessions.retain(|_, s| self.session_live(s, now));
        inner.fingerprints.retain(|_, fp| !is_stale(fp.last_activity, ttl, now));
        inner.visits.retain(|_, v| !is_stale(v.last_activity, ttl, now));
        inner.belief_registries.retain(|_, r| !is_stale(r.last_updated, ttl, now));

        let live_sessions: HashSet<String> = inner.sessions.keys().cloned().collect();
        inner.belief_contexts.retain(|_, c| {
            !is_stale(c.last_evaluation, ttl, now) && live_sessions.contains(&c.session_id)
        });

        before - inner.len()
    }

    pub fn invalidate_all(&self) {
        *self.inner.write() = UserStateInner::default();
    }

    /// Entries physically held, stale or not.
    pub fn entry_count(&self) -> usize {
        self.inner.read().len()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}
