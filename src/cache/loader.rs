//! Cold Rebuild Module
//!
//! Contract for the backing store and the routines that repopulate a
//! tenant from it. Loading happens before any cache lock is taken.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::cache::manager::CacheManager;
use crate::models::content::ContentSnapshot;

/// Tenant-scoped bulk reader over the persistent store.
///
/// Implementations must be idempotent: loading the same tenant twice
/// returns the same data if nothing changed underneath.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Every content entity of the tenant plus its full content map.
    async fn load_content(&self, tenant_id: &str) -> Result<ContentSnapshot>;

    /// Ids of fingerprints linked to a lead.
    async fn load_known_fingerprints(&self, _tenant_id: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// What a rebuild put into the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebuildReport {
    pub tenant_id: String,
    pub entities: usize,
    pub full_content_map_items: usize,
    pub known_fingerprints: usize,
}

fn entity_count(snapshot: &ContentSnapshot) -> usize {
    snapshot.containers.len()
        + snapshot.story_fragments.len()
        + snapshot.panes.len()
        + snapshot.menus.len()
        + snapshot.resources.len()
        + snapshot.epinets.len()
        + snapshot.beliefs.len()
        + snapshot.files.len()
}

/// Replaces a tenant's content maps and full content map with a fresh
/// snapshot from `source`, in one store lock acquisition.
pub async fn rebuild_content<S>(
    manager: &CacheManager,
    tenant_id: &str,
    source: &S,
) -> Result<RebuildReport>
where
    S: ContentSource + ?Sized,
{
    let snapshot = source
        .load_content(tenant_id)
        .await
        .with_context(|| format!("loading content for tenant '{}'", tenant_id))?;

    let report = RebuildReport {
        tenant_id: tenant_id.to_string(),
        entities: entity_count(&snapshot),
        full_content_map_items: snapshot.full_content_map.len(),
        known_fingerprints: 0,
    };

    let bundle = manager.ensure_tenant(tenant_id)?;
    bundle.content.replace_all(snapshot);

    info!(
        "Rebuilt content for tenant '{}': {} entities, {} map items",
        tenant_id, report.entities, report.full_content_map_items
    );
    Ok(report)
}

/// Full warm-up: content plus the known-fingerprint flags.
pub async fn warm_tenant<S>(
    manager: &CacheManager,
    tenant_id: &str,
    source: &S,
) -> Result<RebuildReport>
where
    S: ContentSource + ?Sized,
{
    let mut report = rebuild_content(manager, tenant_id, source).await?;

    let known = source
        .load_known_fingerprints(tenant_id)
        .await
        .with_context(|| format!("loading known fingerprints for tenant '{}'", tenant_id))?;
    let bundle = manager.ensure_tenant(tenant_id)?;
    report.known_fingerprints = bundle.user_state.load_known_fingerprints(known);

    Ok(report)
}
