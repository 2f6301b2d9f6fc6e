//! Key construction for every cached read.
//!
//! Producers and invalidators must go through these functions so the keys
//! they see are byte-for-byte identical.

use crate::domain::{CacheKey, EntityType, KeyOperation, ListQuery, OrgId, SEGMENT_SEPARATOR};
use crate::pattern::InvalidationPattern;
use std::fmt::Display;

/// `{entity}:list:{org}:{page}:{pageSize}:{search}:{sortField}:{sortDirection}[:{extra}...]`
pub fn build_list_key(
    entity: &EntityType,
    org: &OrgId,
    query: &ListQuery<'_>,
    extra: &[Option<&dyn Display>],
) -> CacheKey {
    let mut key = CacheKey::scoped(entity, KeyOperation::List, org);
    key.push(Some(&query.page));
    key.push(Some(&query.page_size));
    key.push(query.search.as_ref().map(|s| s as &dyn Display));
    key.push(query.sort_field.as_ref().map(|s| s as &dyn Display));
    key.push(query.sort_direction.as_ref().map(|s| s as &dyn Display));
    for segment in extra {
        key.push(*segment);
    }
    key
}

pub fn build_dropdown_key(entity: &EntityType, org: &OrgId) -> CacheKey {
    CacheKey::scoped(entity, KeyOperation::Dropdown, org)
}

pub fn build_stats_key(entity: &EntityType, org: &OrgId) -> CacheKey {
    CacheKey::scoped(entity, KeyOperation::Stats, org)
}

pub fn build_detail_key(entity: &EntityType, org: &OrgId, id: &dyn Display) -> CacheKey {
    let mut key = CacheKey::scoped(entity, KeyOperation::Detail, org);
    key.push(Some(id));
    key
}

/// Every list variant of one tenant.
pub fn list_pattern(entity: &EntityType, org: &OrgId) -> InvalidationPattern {
    InvalidationPattern::PrefixSuffix(
        format!(
            "{}{sep}{}{sep}{}{sep}",
            entity,
            KeyOperation::List,
            org,
            sep = SEGMENT_SEPARATOR
        ),
        String::new(),
    )
}

pub fn dropdown_pattern(entity: &EntityType, org: &OrgId) -> InvalidationPattern {
    InvalidationPattern::Prefix(build_dropdown_key(entity, org).into_string())
}

pub fn stats_pattern(entity: &EntityType, org: &OrgId) -> InvalidationPattern {
    InvalidationPattern::Prefix(build_stats_key(entity, org).into_string())
}

/// Detail entries of every tenant; cleared broadly rather than per id.
pub fn detail_pattern(entity: &EntityType) -> InvalidationPattern {
    InvalidationPattern::PrefixSuffix(
        format!("{}{sep}{}{sep}", entity, KeyOperation::Detail, sep = SEGMENT_SEPARATOR),
        String::new(),
    )
}
