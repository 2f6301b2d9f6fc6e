use crate::domain::{CacheKey, EntityType, ListQuery, OrgId};
use crate::keys;
use crate::pattern::InvalidationPattern;
use crate::service::TenantCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{Error, Result};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Whether an entity's cache entries are keyed per tenant or system-wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityScope {
    Tenant,
    /// Shared by every tenant (menus); always keyed by `OrgId::system()`.
    System,
}

/// A write that makes an entity's cached collections stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
    BulkDelete,
    Clone,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::Create => "create",
            Mutation::Update => "update",
            Mutation::Delete => "delete",
            Mutation::BulkDelete => "bulk_delete",
            Mutation::Clone => "clone",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Patterns in the order they were attempted.
    pub patterns: Vec<String>,
    pub keys_removed: usize,
}

/// Cache access for one entity type, following the read-through and
/// invalidate-on-write protocol every entity service uses.
#[derive(Clone, Debug)]
pub struct EntityCache {
    cache: TenantCache,
    entity: EntityType,
    scope: EntityScope,
}

impl EntityCache {
    pub fn new(cache: TenantCache, entity: EntityType) -> Self {
        Self {
            cache,
            entity,
            scope: EntityScope::Tenant,
        }
    }

    pub fn system_wide(cache: TenantCache, entity: EntityType) -> Self {
        Self {
            cache,
            entity,
            scope: EntityScope::System,
        }
    }

    pub fn entity(&self) -> &EntityType {
        &self.entity
    }

    pub fn scope(&self) -> EntityScope {
        self.scope
    }

    pub fn cache(&self) -> &TenantCache {
        &self.cache
    }

    fn resolve_org(&self, org: &OrgId) -> OrgId {
        match self.scope {
            EntityScope::Tenant => org.clone(),
            EntityScope::System => OrgId::system(),
        }
    }

    pub fn list_key(
        &self,
        org: &OrgId,
        query: &ListQuery<'_>,
        extra: &[Option<&dyn Display>],
    ) -> CacheKey {
        keys::build_list_key(&self.entity, &self.resolve_org(org), query, extra)
    }

    pub fn dropdown_key(&self, org: &OrgId) -> CacheKey {
        keys::build_dropdown_key(&self.entity, &self.resolve_org(org))
    }

    pub fn stats_key(&self, org: &OrgId) -> CacheKey {
        keys::build_stats_key(&self.entity, &self.resolve_org(org))
    }

    pub fn detail_key(&self, org: &OrgId, id: &dyn Display) -> CacheKey {
        keys::build_detail_key(&self.entity, &self.resolve_org(org), id)
    }

    // Keys are built before the returned future so it does not borrow the
    // (non-Sync) display segments.
    pub fn list<T, E, F, Fut>(
        &self,
        org: &OrgId,
        query: &ListQuery<'_>,
        extra: &[Option<&dyn Display>],
        compute: F,
    ) -> impl Future<Output = std::result::Result<T, E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.list_key(org, query, extra);
        async move { self.cache.get_or_compute(&key, None, compute).await }
    }

    pub async fn dropdown<T, E, F, Fut>(&self, org: &OrgId, compute: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.dropdown_key(org);
        self.cache.get_or_compute(&key, None, compute).await
    }

    pub async fn stats<T, E, F, Fut>(&self, org: &OrgId, compute: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.stats_key(org);
        self.cache.get_or_compute(&key, None, compute).await
    }

    pub fn detail<T, E, F, Fut>(
        &self,
        org: &OrgId,
        id: &dyn Display,
        compute: F,
    ) -> impl Future<Output = std::result::Result<T, E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.detail_key(org, id);
        async move { self.cache.get_or_compute(&key, None, compute).await }
    }

    /// Patterns cleared after any mutation of this entity in `org`.
    pub fn invalidation_patterns(&self, org: &OrgId) -> [InvalidationPattern; 4] {
        let org = self.resolve_org(org);
        [
            keys::list_pattern(&self.entity, &org),
            keys::dropdown_pattern(&self.entity, &org),
            keys::stats_pattern(&self.entity, &org),
            keys::detail_pattern(&self.entity),
        ]
    }

    /// Clear the tenant's list, dropdown and stats entries and every detail
    /// entry of this entity.
    ///
    /// All patterns are attempted; the first failure is returned afterwards.
    pub async fn invalidate(&self, org: &OrgId, mutation: Mutation) -> Result<InvalidationReport> {
        let mut report = InvalidationReport::default();
        let mut first_error: Option<Error> = None;

        for pattern in self.invalidation_patterns(org) {
            report.patterns.push(pattern.to_string());
            match self.cache.remove_matching(&pattern).await {
                Ok(removed) => report.keys_removed += removed,
                Err(e) => {
                    warn!(
                        entity = %self.entity,
                        mutation = mutation.as_str(),
                        pattern = %pattern,
                        error = %e,
                        "cache invalidation failed"
                    );
                    if let Error::PartialInvalidation { deleted, .. } = &e {
                        report.keys_removed += deleted;
                    }
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(
                    entity = %self.entity,
                    org = %org,
                    mutation = mutation.as_str(),
                    keys_removed = report.keys_removed,
                    "entity caches invalidated"
                );
                Ok(report)
            }
        }
    }

    /// Drop the exact detail entry of `id`, then clear the collections.
    pub fn invalidate_instance(
        &self,
        org: &OrgId,
        id: &dyn Display,
        mutation: Mutation,
    ) -> impl Future<Output = Result<InvalidationReport>> {
        let detail = self.detail_key(org, id);
        let org = org.clone();
        async move {
            let detail_result = self.cache.remove(&detail).await;
            let report = self.invalidate(&org, mutation).await;
            detail_result?;
            report
        }
    }
}
