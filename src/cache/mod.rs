//! Cache Module
//!
//! Per-tenant in-memory stores (content, user state, HTML fragments,
//! analytics) bundled per tenant and owned by the [`CacheManager`].
//!
//! Store modules never import the manager; only the manager reaches down.

pub mod analytics;
pub mod bundle;
pub mod clock;
pub mod content;
pub mod html;
pub mod loader;
pub mod manager;
pub mod stats;
pub mod user_state;
pub mod warming;


// Re-export public types
pub use analytics::{AnalyticsReader, AnalyticsStore, AnalyticsWriter, BinRange};
pub use bundle::{TenantCacheBundle, TenantStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{ContentEntity, ContentStore};
pub use html::{determine_variant, variant_key, HtmlChunkStore};
pub use loader::{rebuild_content, warm_tenant, ContentSource, RebuildReport};
pub use manager::{CacheManager, ManagerStats, SweepReport};
pub use stats::CacheStats;
pub use user_state::UserStateStore;
pub use warming::{warming_key, WarmingGuard, WarmingLock};
