//! Tenant-scoped caching for back-office entity reads.
//!
//! Every key embeds the owning organization, and every mutation of an
//! entity clears that tenant's collection entries through
//! [`EntityCache::invalidate`]. Stores plug in through [`KeyValueStore`].

pub mod domain;
pub mod entity;
pub mod events;
pub mod index;
pub mod keys;
pub mod pattern;
pub mod ports;
pub mod service;

// Re-export commonly used types
pub use domain::{CacheKey, EntityType, KeyOperation, ListQuery, OrgId};
pub use entity::{EntityCache, EntityScope, InvalidationReport, Mutation};
pub use events::{CacheEvent, KeySource};
pub use index::KeyIndex;
pub use keys::{build_detail_key, build_dropdown_key, build_list_key, build_stats_key};
pub use pattern::InvalidationPattern;
pub use ports::KeyValueStore;
pub use service::TenantCache;
pub use shared::config::CacheSettings;
pub use shared::{Error, Result};
