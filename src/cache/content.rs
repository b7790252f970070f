//! Content Store Module
//!
//! Per-tenant maps of content entities with slug and category secondary
//! indices and a denormalized full content map.
//!
//! The whole store shares one `last_updated` stamp: once it is older than
//! the content TTL every read is a miss, even though the entries are still
//! physically present until the sweep or the next write clears them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::cache::clock::{is_stale, Clock};
use crate::cache::stats::{CacheCounters, CacheStats};
use crate::models::content::{
    Belief, ContentKind, ContentSnapshot, Epinet, FullContentMapItem, ImageFile, Menu,
    PageContainer, Pane, Resource, StoryFragment,
};

// == Content Entity ==
/// A record type the content store can index.
pub trait ContentEntity: Clone + Send + Sync + 'static {
    const KIND: ContentKind;

    fn id(&self) -> &str;

    fn slug(&self) -> Option<&str> {
        None
    }

    fn category(&self) -> Option<&str> {
        None
    }

    #[doc(hidden)]
    fn slot(maps: &ContentMaps) -> &HashMap<String, Self>;

    #[doc(hidden)]
    fn slot_mut(maps: &mut ContentMaps) -> &mut HashMap<String, Self>;
}

/// Primary id -> entity maps, one per content kind.
#[derive(Debug, Default)]
pub struct ContentMaps {
    containers: HashMap<String, PageContainer>,
    story_fragments: HashMap<String, StoryFragment>,
    panes: HashMap<String, Pane>,
    menus: HashMap<String, Menu>,
    resources: HashMap<String, Resource>,
    epinets: HashMap<String, Epinet>,
    beliefs: HashMap<String, Belief>,
    files: HashMap<String, ImageFile>,
}

impl ContentMaps {
    fn len(&self) -> usize {
        self.containers.len()
            + self.story_fragments.len()
            + self.panes.len()
            + self.menus.len()
            + self.resources.len()
            + self.epinets.len()
            + self.beliefs.len()
            + self.files.len()
    }
}

macro_rules! impl_content_entity {
    ($ty:ty, $kind:expr, $field:ident $(, slug = $slug:ident)? $(, category = $cat:ident)?) => {
        impl ContentEntity for $ty {
            const KIND: ContentKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            $(
                fn slug(&self) -> Option<&str> {
                    Some(&self.$slug)
                }
            )?

            $(
                fn category(&self) -> Option<&str> {
                    self.$cat.as_deref()
                }
            )?

            fn slot(maps: &ContentMaps) -> &HashMap<String, Self> {
                &maps.$field
            }

            fn slot_mut(maps: &mut ContentMaps) -> &mut HashMap<String, Self> {
                &mut maps.$field
            }
        }
    };
}

impl_content_entity!(PageContainer, ContentKind::PageContainer, containers, slug = slug);
impl_content_entity!(StoryFragment, ContentKind::StoryFragment, story_fragments, slug = slug);
impl_content_entity!(Pane, ContentKind::Pane, panes, slug = slug);
impl_content_entity!(Menu, ContentKind::Menu, menus);
impl_content_entity!(Resource, ContentKind::Resource, resources, slug = slug, category = category);
impl_content_entity!(Epinet, ContentKind::Epinet, epinets);
impl_content_entity!(Belief, ContentKind::Belief, beliefs, slug = slug);
impl_content_entity!(ImageFile, ContentKind::ImageFile, files);

// == Inner State ==
#[derive(Debug, Default)]
struct ContentInner {
    maps: ContentMaps,
    /// `kind:slug` -> id
    slug_index: HashMap<String, String>,
    /// `kind:category` -> ids, never empty
    category_index: HashMap<String, Vec<String>>,
    last_updated: Option<DateTime<Utc>>,
    full_content_map: Option<Vec<FullContentMapItem>>,
    full_content_map_updated: Option<DateTime<Utc>>,
}

impl ContentInner {
    fn insert<T: ContentEntity>(&mut self, entity: T) {
        let id = entity.id().to_string();
        if let Some(previous) = T::slot_mut(&mut self.maps).remove(&id) {
            self.unindex(&previous);
        }

        if let Some(slug) = entity.slug() {
            self.slug_index.insert(T::KIND.slug_key(slug), id.clone());
        }
        if let Some(category) = entity.category() {
            let members = self
                .category_index
                .entry(T::KIND.category_key(category))
                .or_default();
            if !members.contains(&id) {
                members.push(id.clone());
            }
        }

        T::slot_mut(&mut self.maps).insert(id, entity);
    }

    fn remove<T: ContentEntity>(&mut self, id: &str) -> Option<T> {
        let removed = T::slot_mut(&mut self.maps).remove(id)?;
        self.unindex(&removed);
        Some(removed)
    }

    fn unindex<T: ContentEntity>(&mut self, entity: &T) {
        let id = entity.id();
        if let Some(slug) = entity.slug() {
            let key = T::KIND.slug_key(slug);
            if self.slug_index.get(&key).map(String::as_str) == Some(id) {
                self.slug_index.remove(&key);
            }
        }
        if let Some(category) = entity.category() {
            let key = T::KIND.category_key(category);
            if let Some(members) = self.category_index.get_mut(&key) {
                members.retain(|member| member != id);
                if members.is_empty() {
                    self.category_index.remove(&key);
                }
            }
        }
    }

    fn clear_kind<T: ContentEntity>(&mut self) {
        let entities: Vec<T> = T::slot_mut(&mut self.maps).drain().map(|(_, e)| e).collect();
        for entity in &entities {
            self.unindex(entity);
        }
    }

    fn clear_entities(&mut self) -> usize {
        let removed = self.maps.len();
        self.maps = ContentMaps::default();
        self.slug_index.clear();
        self.category_index.clear();
        self.last_updated = None;
        removed
    }

    fn clear_full_content_map(&mut self) -> usize {
        let removed = self.full_content_map.take().map_or(0, |items| items.len());
        self.full_content_map_updated = None;
        removed
    }
}

// == Content Store ==
/// One tenant's content working set.
#[derive(Debug)]
pub struct ContentStore {
    inner: RwLock<ContentInner>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
}

impl ContentStore {
    // == Constructor ==
    /// Creates an empty store whose entries go stale `ttl` after the last write.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(ContentInner::default()),
            ttl,
            clock,
            counters: CacheCounters::new(),
        }
    }

    fn fresh(&self, stamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        stamp.is_some_and(|t| !is_stale(t, self.ttl, now))
    }

    // == Generic Accessors ==
    /// Looks up an entity by id.
    pub fn get<T: ContentEntity>(&self, id: &str) -> Option<T> {
        let now = self.clock.now();
        let inner = self.inner.read();
        let found = if self.fresh(inner.last_updated, now) {
            T::slot(&inner.maps).get(id).cloned()
        } else {
            None
        };
        self.counters.record(found)
    }

    /// Looks up several entities, returning the hits and the ids that missed.
    pub fn get_many<T: ContentEntity>(&self, ids: &[String]) -> (Vec<T>, Vec<String>) {
        let now = self.clock.now();
        let inner = self.inner.read();
        let fresh = self.fresh(inner.last_updated, now);

        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            match T::slot(&inner.maps).get(id).filter(|_| fresh) {
                Some(entity) => {
                    self.counters.record_hit();
                    found.push(entity.clone());
                }
                None => {
                    self.counters.record_miss();
                    missing.push(id.clone());
                }
            }
        }
        (found, missing)
    }

    /// Looks up an entity through the slug index of its own kind.
    pub fn get_by_slug<T: ContentEntity>(&self, slug: &str) -> Option<T> {
        let now = self.clock.now();
        let inner = self.inner.read();
        let found = if self.fresh(inner.last_updated, now) {
            inner
                .slug_index
                .get(&T::KIND.slug_key(slug))
                .and_then(|id| T::slot(&inner.maps).get(id))
                .cloned()
        } else {
            None
        };
        self.counters.record(found)
    }

    /// Ids of every cached entity of kind `T`, or `None` when the store is stale.
    pub fn get_all_ids<T: ContentEntity>(&self) -> Option<Vec<String>> {
        let now = self.clock.now();
        let inner = self.inner.read();
        let found = if self.fresh(inner.last_updated, now) {
            Some(T::slot(&inner.maps).keys().cloned().collect())
        } else {
            None
        };
        self.counters.record(found)
    }

    /// Ids filed under `category` for kind `T`.
    pub fn get_ids_by_category<T: ContentEntity>(&self, category: &str) -> Option<Vec<String>> {
        let now = self.clock.now();
        let inner = self.inner.read();
        let found = if self.fresh(inner.last_updated, now) {
            inner
                .category_index
                .get(&T::KIND.category_key(category))
                .cloned()
        } else {
            None
        };
        self.counters.record(found)
    }

    /// Stores an entity and refreshes both indices in one lock acquisition.
    ///
    /// Writing into a stale store first drops the stale contents so they
    /// cannot be revived by the refreshed timestamp.
    pub fn set<T: ContentEntity>(&self, entity: T) {
        self.set_many(std::iter::once(entity));
    }

    /// Stores several entities of one kind under a single lock acquisition.
    pub fn set_many<T: ContentEntity>(&self, entities: impl IntoIterator<Item = T>) {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        if inner.last_updated.is_some() && !self.fresh(inner.last_updated, now) {
            let dropped = inner.clear_entities();
            debug!("Dropped {} stale content entries before write", dropped);
        }
        for entity in entities {
            inner.insert(entity);
        }
        inner.last_updated = Some(now);
    }

    /// Removes one entity and its index entries. Returns whether it existed.
    pub fn invalidate<T: ContentEntity>(&self, id: &str) -> bool {
        self.inner.write().remove::<T>(id).is_some()
    }

    /// Removes every entity of kind `T`.
    pub fn invalidate_kind<T: ContentEntity>(&self) {
        self.inner.write().clear_kind::<T>();
    }

    /// Empties the store, including the full content map.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.write();
        inner.clear_entities();
        inner.clear_full_content_map();
    }

    // == Full Content Map ==
    pub fn get_full_content_map(&self) -> Option<Vec<FullContentMapItem>> {
        let now = self.clock.now();
        let inner = self.inner.read();
        let found = if self.fresh(inner.full_content_map_updated, now) {
            inner.full_content_map.clone()
        } else {
            None
        };
        self.counters.record(found)
    }

    /// Replaces the full content map wholesale.
    pub fn set_full_content_map(&self, items: Vec<FullContentMapItem>) {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        inner.full_content_map = Some(items);
        inner.full_content_map_updated = Some(now);
    }

    pub fn invalidate_full_content_map(&self) {
        self.inner.write().clear_full_content_map();
    }

    // == Bulk Load ==
    /// Replaces every map, index and the full content map with `snapshot`.
    pub fn replace_all(&self, snapshot: ContentSnapshot) {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        inner.clear_entities();

        for entity in snapshot.containers {
            inner.insert(entity);
        }
        for entity in snapshot.story_fragments {
            inner.insert(entity);
        }
        for entity in snapshot.panes {
            inner.insert(entity);
        }
        for entity in snapshot.menus {
            inner.insert(entity);
        }
        for entity in snapshot.resources {
            inner.insert(entity);
        }
        for entity in snapshot.epinets {
            inner.insert(entity);
        }
        for entity in snapshot.beliefs {
            inner.insert(entity);
        }
        for entity in snapshot.files {
            inner.insert(entity);
        }

        inner.last_updated = Some(now);
        inner.full_content_map = Some(snapshot.full_content_map);
        inner.full_content_map_updated = Some(now);
    }

    // == Maintenance ==
    /// Physically drops stale contents. Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        let mut removed = 0;
        if inner.last_updated.is_some() && !self.fresh(inner.last_updated, now) {
            removed += inner.clear_entities();
        }
        if inner.full_content_map_updated.is_some()
            && !self.fresh(inner.full_content_map_updated, now)
        {
            removed += inner.clear_full_content_map();
        }
        removed
    }

    /// Entries physically held, stale or not.
    pub fn entry_count(&self) -> usize {
        let inner = self.inner.read();
        inner.maps.len() + inner.full_content_map.as_ref().map_or(0, Vec::len)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.read().last_updated
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn check_index_consistency(&self) -> Result<(), String> {
        fn check<T: ContentEntity>(inner: &ContentInner) -> Result<(), String> {
            for (id, entity) in T::slot(&inner.maps) {
                if let Some(slug) = entity.slug() {
                    let key = T::KIND.slug_key(slug);
                    if inner.slug_index.get(&key) != Some(id) {
                        return Err(format!("slug {} does not point at {}", key, id));
                    }
                }
                if let Some(category) = entity.category() {
                    let key = T::KIND.category_key(category);
                    if !inner.category_index.get(&key).is_some_and(|m| m.contains(id)) {
                        return Err(format!("category {} is missing {}", key, id));
                    }
                }
            }
            Ok(())
        }

        let inner = self.inner.read();
        check::<PageContainer>(&inner)?;
        check::<StoryFragment>(&inner)?;
        check::<Pane>(&inner)?;
        check::<Resource>(&inner)?;
        check::<Belief>(&inner)?;

        for (key, id) in &inner.slug_index {
            let present = match key.split_once(':').map(|(kind, _)| kind) {
                Some("container") => inner.maps.containers.contains_key(id),
                Some("storyfragment") => inner.maps.story_fragments.contains_key(id),
                Some("pane") => inner.maps.panes.contains_key(id),
                Some("resource") => inner.maps.resources.contains_key(id),
                Some("belief") => inner.maps.beliefs.contains_key(id),
                _ => false,
            };
            if !present {
                return Err(format!("slug {} points at missing {}", key, id));
            }
        }
        for (key, members) in &inner.category_index {
            if members.is_empty() {
                return Err(format!("category {} is empty", key));
            }
            for id in members {
                if !inner.maps.resources.contains_key(id) {
                    return Err(format!("category {} lists missing {}", key, id));
                }
            }
        }
        Ok(())
    }
}

// == Named Accessors ==
macro_rules! content_accessors {
    ($ty:ty => $get:ident, $set:ident, $all_ids:ident, $invalidate:ident) => {
        pub fn $get(&self, id: &str) -> Option<$ty> {
            self.get::<$ty>(id)
        }

        pub fn $set(&self, entity: $ty) {
            self.set(entity)
        }

        pub fn $all_ids(&self) -> Option<Vec<String>> {
            self.get_all_ids::<$ty>()
        }

        pub fn $invalidate(&self, id: &str) -> bool {
            self.invalidate::<$ty>(id)
        }
    };
}

impl ContentStore {
    content_accessors!(PageContainer => get_page_container, set_page_container, get_all_page_container_ids, invalidate_page_container);
    content_accessors!(StoryFragment => get_story_fragment, set_story_fragment, get_all_story_fragment_ids, invalidate_story_fragment);
    content_accessors!(Pane => get_pane, set_pane, get_all_pane_ids, invalidate_pane);
    content_accessors!(Menu => get_menu, set_menu, get_all_menu_ids, invalidate_menu);
    content_accessors!(Resource => get_resource, set_resource, get_all_resource_ids, invalidate_resource);
    content_accessors!(Epinet => get_epinet, set_epinet, get_all_epinet_ids, invalidate_epinet);
    content_accessors!(Belief => get_belief, set_belief, get_all_belief_ids, invalidate_belief);
    content_accessors!(ImageFile => get_file, set_file, get_all_file_ids, invalidate_file);

    pub fn get_page_container_by_slug(&self, slug: &str) -> Option<PageContainer> {
        self.get_by_slug(slug)
    }

    pub fn get_story_fragment_by_slug(&self, slug: &str) -> Option<StoryFragment> {
        self.get_by_slug(slug)
    }

    pub fn get_pane_by_slug(&self, slug: &str) -> Option<Pane> {
        self.get_by_slug(slug)
    }

    pub fn get_resource_by_slug(&self, slug: &str) -> Option<Resource> {
        self.get_by_slug(slug)
    }

    pub fn get_belief_by_slug(&self, slug: &str) -> Option<Belief> {
        self.get_by_slug(slug)
    }

    pub fn get_resource_ids_by_category(&self, category: &str) -> Option<Vec<String>> {
        self.get_ids_by_category::<Resource>(category)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use chrono::TimeZone;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn store() -> (ContentStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        (ContentStore::new(DAY, clock.clone()), clock)
    }

    fn fragment(id: &str, slug: &str) -> StoryFragment {
        StoryFragment {
            id: id.to_string(),
            title: format!("Title {}", id),
            slug: slug.to_string(),
            container_id: "tc-1".to_string(),
            pane_ids: vec![],
            menu_id: None,
            changed: None,
        }
    }

    fn resource(id: &str, category: Option<&str>) -> Resource {
        Resource {
            id: id.to_string(),
            title: id.to_string(),
            slug: format!("{}-slug", id),
            category: category.map(str::to_string),
            options: serde_json::Value::Null,
        }
    }

    fn belief(id: &str, slug: &str) -> Belief {
        Belief {
            id: id.to_string(),
            title: slug.to_string(),
            slug: slug.to_string(),
            scale: "yn".to_string(),
            custom_values: vec![],
        }
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let (store, _) = store();
        let sf = fragment("sf-1", "home");
        store.set_story_fragment(sf.clone());

        assert_eq!(store.get_story_fragment("sf-1"), Some(sf.clone()));
        assert_eq!(store.get_story_fragment_by_slug("home"), Some(sf));
        store.check_index_consistency().unwrap();
    }

    #[test]
    fn test_invalidate_removes_slug_index() {
        let (store, _) = store();
        store.set_story_fragment(fragment("sf-1", "home"));

        assert!(store.invalidate_story_fragment("sf-1"));
        assert!(store.get_story_fragment("sf-1").is_none());
        assert!(store.get_story_fragment_by_slug("home").is_none());
        assert!(!store.invalidate_story_fragment("sf-1"));
        store.check_index_consistency().unwrap();
    }

    #[test]
    fn test_slug_change_drops_old_slug() {
        let (store, _) = store();
        store.set_story_fragment(fragment("sf-1", "home"));
        store.set_story_fragment(fragment("sf-1", "landing"));

        assert!(store.get_story_fragment_by_slug("home").is_none());
        assert_eq!(store.get_story_fragment_by_slug("landing").unwrap().id, "sf-1");
        store.check_index_consistency().unwrap();
    }

    #[test]
    fn test_slugs_do_not_collide_across_kinds() {
        let (store, _) = store();
        store.set_story_fragment(fragment("sf-1", "shared"));
        store.set_belief(belief("b-1", "shared"));

        assert_eq!(store.get_story_fragment_by_slug("shared").unwrap().id, "sf-1");
        assert_eq!(store.get_belief_by_slug("shared").unwrap().id, "b-1");

        store.invalidate_belief("b-1");
        assert_eq!(store.get_story_fragment_by_slug("shared").unwrap().id, "sf-1");
    }

    #[test]
    fn test_category_index_drops_empty_categories() {
        let (store, _) = store();
        store.set_resource(resource("r-1", Some("people")));
        store.set_resource(resource("r-2", Some("people")));

        let mut ids = store.get_resource_ids_by_category("people").unwrap();
        ids.sort();
        assert_eq!(ids, vec!["r-1", "r-2"]);

        store.invalidate_resource("r-1");
        assert_eq!(store.get_resource_ids_by_category("people").unwrap(), vec!["r-2"]);

        store.invalidate_resource("r-2");
        assert!(store.get_resource_ids_by_category("people").is_none());
        store.check_index_consistency().unwrap();
    }

    #[test]
    fn test_category_change_moves_membership() {
        let (store, _) = store();
        store.set_resource(resource("r-1", Some("people")));
        store.set_resource(resource("r-1", Some("places")));

        assert!(store.get_resource_ids_by_category("people").is_none());
        assert_eq!(store.get_resource_ids_by_category("places").unwrap(), vec!["r-1"]);
    }

    #[test]
    fn test_stale_store_misses_but_keeps_entries() {
        let (store, clock) = store();
        store.set_story_fragment(fragment("sf-1", "home"));

        clock.advance(DAY);

        assert!(store.get_story_fragment("sf-1").is_none());
        assert!(store.get_story_fragment_by_slug("home").is_none());
        assert!(store.get_all_story_fragment_ids().is_none());
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_write_into_stale_store_does_not_revive_old_entries() {
        let (store, clock) = store();
        store.set_story_fragment(fragment("sf-1", "home"));
        clock.advance(DAY + Duration::from_secs(1));

        store.set_story_fragment(fragment("sf-2", "about"));

        assert!(store.get_story_fragment("sf-1").is_none());
        assert!(store.get_story_fragment("sf-2").is_some());
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_cleanup_expired_removes_stale_entries() {
        let (store, clock) = store();
        store.set_story_fragment(fragment("sf-1", "home"));
        store.set_full_content_map(vec![]);
        assert_eq!(store.cleanup_expired(), 0);

        clock.advance(DAY);
        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.entry_count(), 0);
        store.check_index_consistency().unwrap();
    }

    #[test]
    fn test_get_many_partitions_ids() {
        let (store, _) = store();
        store.set_story_fragment(fragment("sf-1", "a"));
        store.set_story_fragment(fragment("sf-2", "b"));

        let ids = vec!["sf-1".to_string(), "sf-9".to_string(), "sf-2".to_string()];
        let (found, missing) = store.get_many::<StoryFragment>(&ids);

        assert_eq!(found.len(), 2);
        assert_eq!(missing, vec!["sf-9"]);
    }

    #[test]
    fn test_invalidate_kind_leaves_other_kinds() {
        let (store, _) = store();
        store.set_story_fragment(fragment("sf-1", "home"));
        store.set_belief(belief("b-1", "color"));

        store.invalidate_kind::<StoryFragment>();

        assert!(store.get_story_fragment("sf-1").is_none());
        assert!(store.get_belief("b-1").is_some());
        store.check_index_consistency().unwrap();
    }

    #[test]
    fn test_full_content_map_is_independent() {
        let (store, _) = store();
        assert!(store.get_full_content_map().is_none());

        let item = FullContentMapItem {
            id: "sf-1".to_string(),
            title: "Home".to_string(),
            slug: Some("home".to_string()),
            kind: ContentKind::StoryFragment,
            category: None,
            parent_id: None,
        };
        store.set_full_content_map(vec![item.clone()]);
        assert_eq!(store.get_full_content_map(), Some(vec![item]));
        assert!(store.get_story_fragment("sf-1").is_none());

        store.invalidate_full_content_map();
        assert!(store.get_full_content_map().is_none());
    }

    #[test]
    fn test_replace_all_loads_snapshot() {
        let (store, _) = store();
        store.set_story_fragment(fragment("old", "old"));

        store.replace_all(ContentSnapshot {
            story_fragments: vec![fragment("sf-1", "home")],
            resources: vec![resource("r-1", Some("people"))],
            ..ContentSnapshot::default()
        });

        assert!(store.get_story_fragment("old").is_none());
        assert!(store.get_story_fragment_by_slug("home").is_some());
        assert_eq!(store.get_resource_ids_by_category("people").unwrap(), vec!["r-1"]);
        assert_eq!(store.get_full_content_map(), Some(vec![]));
        store.check_index_consistency().unwrap();
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let (store, _) = store();
        store.set_story_fragment(fragment("sf-1", "home"));
        store.get_story_fragment("sf-1");
        store.get_story_fragment("nope");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
