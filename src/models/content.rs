//! Content entity records held by the per-tenant content store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Content Kind ==
/// Discriminates the entity types sharing the slug and category indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    PageContainer,
    StoryFragment,
    Pane,
    Menu,
    Resource,
    Epinet,
    Belief,
    ImageFile,
}

impl ContentKind {
    pub const ALL: [ContentKind; 8] = [
        ContentKind::PageContainer,
        ContentKind::StoryFragment,
        ContentKind::Pane,
        ContentKind::Menu,
        ContentKind::Resource,
        ContentKind::Epinet,
        ContentKind::Belief,
        ContentKind::ImageFile,
    ];

    /// Short tag used to namespace index keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::PageContainer => "container",
            ContentKind::StoryFragment => "storyfragment",
            ContentKind::Pane => "pane",
            ContentKind::Menu => "menu",
            ContentKind::Resource => "resource",
            ContentKind::Epinet => "epinet",
            ContentKind::Belief => "belief",
            ContentKind::ImageFile => "file",
        }
    }

    /// Slug index key, e.g. `belief:color-preference`.
    pub fn slug_key(&self, slug: &str) -> String {
        format!("{}:{}", self.as_str(), slug)
    }

    /// Category index key, e.g. `resource:people`.
    pub fn category_key(&self, category: &str) -> String {
        format!("{}:{}", self.as_str(), category)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Entities ==
/// Top-level container grouping story fragments into one site section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContainer {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub social_image_path: Option<String>,
}

/// A page: an ordered list of panes under one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryFragment {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub container_id: String,
    #[serde(default)]
    pub pane_ids: Vec<String>,
    pub menu_id: Option<String>,
    pub changed: Option<DateTime<Utc>>,
}

/// A content panel, optionally gated on visitor beliefs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pane {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub is_decorative: bool,
    /// belief slug -> values the visitor must hold one of
    #[serde(default)]
    pub held_beliefs: BTreeMap<String, Vec<String>>,
    /// belief slug -> values the visitor must not hold
    #[serde(default)]
    pub withheld_beliefs: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuLink {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: String,
    pub title: String,
    pub theme: String,
    #[serde(default)]
    pub links: Vec<MenuLink>,
}

/// Structured record (person, product, event...) with free-form options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: Option<String>,
    #[serde(default)]
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpinetStep {
    pub gate_type: String,
    pub title: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub object_ids: Vec<String>,
}

/// A user-journey definition that analytics are aggregated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epinet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub promoted: bool,
    #[serde(default)]
    pub steps: Vec<EpinetStep>,
}

/// Definition of a user-settable belief.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Belief {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub scale: String,
    #[serde(default)]
    pub custom_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFile {
    pub id: String,
    pub filename: String,
    pub alt_description: String,
    pub url: String,
    pub src_set: Option<String>,
}

// == Full Content Map ==
/// One row of the denormalized listing used by editor UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullContentMapItem {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub category: Option<String>,
    pub parent_id: Option<String>,
}

// == Snapshot ==
/// Everything a backing store returns when a tenant's content is rebuilt cold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    #[serde(default)]
    pub containers: Vec<PageContainer>,
    #[serde(default)]
    pub story_fragments: Vec<StoryFragment>,
    #[serde(default)]
    pub panes: Vec<Pane>,
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub epinets: Vec<Epinet>,
    #[serde(default)]
    pub beliefs: Vec<Belief>,
    #[serde(default)]
    pub files: Vec<ImageFile>,
    #[serde(default)]
    pub full_content_map: Vec<FullContentMapItem>,
}
