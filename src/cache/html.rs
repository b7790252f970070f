//! HTML Fragment Store Module
//!
//! Per-tenant cache of rendered fragments keyed by (content id, variant),
//! plus a reverse index from content id to the fragment keys built from it.
//!
//! Invariant: the reverse index is the exact inverse of the per-fragment
//! `depends_on` lists. Each fragment's own list doubles as the forward
//! adjacency, so removing a fragment only touches its own dependencies.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::clock::{is_stale, Clock};
use crate::cache::stats::{CacheCounters, CacheStats};
use crate::models::html::{FragmentKey, HtmlChunk, PaneVariant};
use crate::models::state::{BeliefMap, PaneBeliefRequirements};

// == Variant Selection ==
/// Picks the variant a visitor sees for a pane with the given requirements.
///
/// Without requirements, or without any visitor state, the default variant
/// applies. Otherwise every held requirement must intersect the visitor's
/// values for that belief and no withheld requirement may; any failure hides
/// the pane.
pub fn determine_variant(
    user_beliefs: Option<&BeliefMap>,
    requirements: &PaneBeliefRequirements,
) -> PaneVariant {
    if requirements.is_empty() {
        return PaneVariant::Default;
    }
    let Some(beliefs) = user_beliefs else {
        return PaneVariant::Default;
    };

    let holds_any = |slug: &str, allowed: &[String]| {
        beliefs
            .get(slug)
            .is_some_and(|held| held.iter().any(|value| allowed.contains(value)))
    };

    let held_ok = requirements
        .held
        .iter()
        .all(|(slug, allowed)| holds_any(slug.as_str(), allowed.as_slice()));
    let withheld_ok = requirements
        .withheld
        .iter()
        .all(|(slug, disallowed)| !holds_any(slug.as_str(), disallowed.as_slice()));

    if held_ok && withheld_ok {
        PaneVariant::Default
    } else {
        PaneVariant::Hidden
    }
}

/// Fragment key for `content_id` as seen by a visitor with `user_beliefs`.
pub fn variant_key(
    content_id: &str,
    user_beliefs: Option<&BeliefMap>,
    requirements: &PaneBeliefRequirements,
) -> FragmentKey {
    FragmentKey::new(content_id, determine_variant(user_beliefs, requirements))
}

#[derive(Debug, Default)]
struct HtmlInner {
    chunks: HashMap<FragmentKey, HtmlChunk>,
    /// content id -> keys of fragments depending on it, never empty
    dependents: HashMap<String, HashSet<FragmentKey>>,
}

impl HtmlInner {
    fn link(&mut self, key: &FragmentKey, depends_on: &[String]) {
        for dep in depends_on {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    fn unlink(&mut self, key: &FragmentKey, depends_on: &[String]) {
        for dep in depends_on {
            if let Some(keys) = self.dependents.get_mut(dep) {
                keys.remove(key);
                if keys.is_empty() {
                    self.dependents.remove(dep);
                }
            }
        }
    }

    fn remove_chunk(&mut self, key: &FragmentKey) -> Option<HtmlChunk> {
        let chunk = self.chunks.remove(key)?;
        self.unlink(key, &chunk.depends_on);
        Some(chunk)
    }

    fn remove_matching(
        &mut self,
        mut matches: impl FnMut(&FragmentKey, &HtmlChunk) -> bool,
    ) -> usize {
        let victims: Vec<FragmentKey> = self
            .chunks
            .iter()
            .filter(|(key, chunk)| matches(*key, *chunk))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &victims {
            self.remove_chunk(key);
        }
        victims.len()
    }
}

/// `prefix*` matches by prefix; anything else matches as a substring.
fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key.contains(pattern),
    }
}

// == HTML Chunk Store ==
/// One tenant's rendered fragments.
#[derive(Debug)]
pub struct HtmlChunkStore {
    inner: RwLock<HtmlInner>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
}

impl HtmlChunkStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(HtmlInner::default()),
            ttl,
            clock,
            counters: CacheCounters::new(),
        }
    }

    // == Get ==
    pub fn get_html_chunk(&self, key: &FragmentKey) -> Option<HtmlChunk> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .chunks
            .get(key)
            .filter(|chunk| !is_stale(chunk.last_updated, self.ttl, now))
            .cloned();
        self.counters.record(found)
    }

    // == Set ==
    /// Stores a fragment and registers it under each of its dependencies.
    /// Overwriting a key first detaches the old dependency list.
    pub fn set_html_chunk(&self, key: &FragmentKey, html: String, depends_on: Vec<String>) {
        let mut deps = Vec::with_capacity(depends_on.len());
        for dep in depends_on {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        let key = key.clone();
        let chunk = HtmlChunk {
            html,
            depends_on: deps,
            last_updated: self.clock.now(),
        };

        let mut inner = self.inner.write();
        inner.remove_chunk(&key);
        inner.link(&key, &chunk.depends_on);
        inner.chunks.insert(key, chunk);
    }

    // == Invalidation ==
    pub fn invalidate_html_chunk(&self, key: &FragmentKey) -> bool {
        self.inner.write().remove_chunk(key).is_some()
    }

    /// Drops every fragment built from `node_id`, along with all of their
    /// reverse-index references. Returns the number of fragments removed.
    pub fn invalidate_by_dependency(&self, node_id: &str) -> usize {
        let mut inner = self.inner.write();
        let Some(keys) = inner.dependents.remove(node_id) else {
            return 0;
        };

        let mut removed = 0;
        for key in &keys {
            if inner.remove_chunk(key).is_some() {
                removed += 1;
            }
        }
        debug!("Invalidated {} fragments depending on '{}'", removed, node_id);
        removed
    }

    /// Drops every fragment whose rendered key matches `pattern` (`prefix*`
    /// or substring).
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.inner
            .write()
            .remove_matching(|key, _| pattern_matches(pattern, &key.to_string()))
    }

    /// Drops every variant rendered for one content id.
    pub fn invalidate_content(&self, content_id: &str) -> usize {
        self.inner
            .write()
            .remove_matching(|key, _| key.content_id == content_id)
    }

    pub fn invalidate_all(&self) {
        *self.inner.write() = HtmlInner::default();
    }

    /// Rendered keys of fragments currently registered under `node_id`.
    pub fn dependents_of(&self, node_id: &str) -> Vec<String> {
        self.inner
            .read()
            .dependents
            .get(node_id)
            .map(|keys| keys.iter().map(FragmentKey::to_string).collect())
            .unwrap_or_default()
    }

    // == Maintenance ==
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        self.inner
            .write()
            .remove_matching(|_, chunk| is_stale(chunk.last_updated, ttl, now))
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.len()
    }

    pub fn dependency_node_count(&self) -> usize {
        self.inner.read().dependents.len()
    }

    /// Fragments plus reverse-index nodes, stale or not.
    pub fn entry_count(&self) -> usize {
        let inner = self.inner.read();
        inner.chunks.len() + inner.dependents.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn check_dependency_consistency(&self) -> Result<(), String> {
        let inner = self.inner.read();
        for (key, chunk) in &inner.chunks {
            for dep in &chunk.depends_on {
                if !inner.dependents.get(dep).is_some_and(|keys| keys.contains(key)) {
                    return Err(format!("{} depends on {} but is not indexed", key, dep));
                }
            }
        }
        for (dep, keys) in &inner.dependents {
            if keys.is_empty() {
                return Err(format!("empty reverse entry for {}", dep));
            }
            for key in keys {
                let listed = inner
                    .chunks
                    .get(key)
                    .is_some_and(|chunk| chunk.depends_on.contains(dep));
                if !listed {
                    return Err(format!("{} indexes {} which does not list it", dep, key));
                }
            }
        }
        Ok(())
    }
}
