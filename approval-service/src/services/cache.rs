//! Read-through configuration cache.
//!
//! Workflow definitions and role-group memberships are read on every
//! generation/scope computation but change rarely. The cache is an explicit
//! object injected into the service; entries expire after a TTL and are dropped
//! immediately by the invalidation hooks when a write goes through the service.

use async_trait::async_trait;
use dashmap::DashMap;
use service_core::error::AppError;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use super::metrics::record_cache_lookup;
use super::stores::{RoleGroupStore, WorkflowStore};
use crate::models::{RoleGroupMembership, WorkflowDefinition, WorkflowKey};

/// TTL map keyed by `K`.
///
/// Every invalidation bumps an epoch. A reader takes the epoch before going to
/// the backing store and hands it back to [`ConfigCache::insert_if_current`],
/// which drops the value if an invalidation happened in between.
pub struct ConfigCache<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: DashMap<K, (Instant, V)>,
    epoch: AtomicU64,
}

impl<K, V> ConfigCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: DashMap::new(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Fresh value for `key`, if any. Expired entries are evicted.
    pub fn get(&self, key: &K) -> Option<V> {
        let fresh = self.entries.get(key).and_then(|entry| {
            let (stored_at, value) = entry.value();
            (stored_at.elapsed() < self.ttl).then(|| value.clone())
        });
        if fresh.is_none() {
            self.entries
                .remove_if(key, |_, (stored_at, _)| stored_at.elapsed() >= self.ttl);
        }
        record_cache_lookup(self.name, fresh.is_some());
        fresh
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Store `value` unless the cache was invalidated since `epoch` was read.
    pub fn insert_if_current(&self, key: K, value: V, epoch: u64) -> bool {
        // The shard lock is held while checking, so an invalidation either bumps
        // the epoch first or removes the entry afterwards.
        let entry = self.entries.entry(key);
        if self.epoch() != epoch {
            debug!(cache = self.name, "Skipping stale cache fill");
            return false;
        }
        entry.insert((Instant::now(), value));
        true
    }

    pub fn invalidate(&self, key: &K) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(key);
    }

    pub fn invalidate_all(&self) {
        debug!(cache = self.name, "Invalidating cache");
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// [`WorkflowStore`] that caches lookups, including misses.
pub struct CachedWorkflowStore {
    inner: Arc<dyn WorkflowStore>,
    cache: ConfigCache<WorkflowKey, Option<WorkflowDefinition>>,
}

impl CachedWorkflowStore {
    pub fn new(inner: Arc<dyn WorkflowStore>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: ConfigCache::new("workflow_definitions", ttl),
        }
    }

    pub fn invalidate(&self, key: &WorkflowKey) {
        self.cache.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl WorkflowStore for CachedWorkflowStore {
    async fn workflow_definition(
        &self,
        key: &WorkflowKey,
    ) -> Result<Option<WorkflowDefinition>, AppError> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }
        let epoch = self.cache.epoch();
        let definition = self.inner.workflow_definition(key).await?;
        self.cache.insert_if_current(key.clone(), definition.clone(), epoch);
        Ok(definition)
    }

    async fn upsert_workflow_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<(), AppError> {
        let result = self.inner.upsert_workflow_definition(definition).await;
        self.cache.invalidate(&definition.key());
        result
    }
}

/// [`RoleGroupStore`] that caches memberships per person.
pub struct CachedRoleGroupStore {
    inner: Arc<dyn RoleGroupStore>,
    cache: ConfigCache<String, Vec<RoleGroupMembership>>,
}

impl CachedRoleGroupStore {
    pub fn new(inner: Arc<dyn RoleGroupStore>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: ConfigCache::new("role_group_memberships", ttl),
        }
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl RoleGroupStore for CachedRoleGroupStore {
    async fn active_memberships(
        &self,
        payroll_no: &str,
    ) -> Result<Vec<RoleGroupMembership>, AppError> {
        let key = payroll_no.to_string();
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let epoch = self.cache.epoch();
        let memberships = self.inner.active_memberships(payroll_no).await?;
        self.cache.insert_if_current(key, memberships.clone(), epoch);
        Ok(memberships)
    }

    async fn set_membership_active(
        &self,
        member_id: Uuid,
        active: bool,
    ) -> Result<bool, AppError> {
        let result = self.inner.set_membership_active(member_id, active).await;
        // The member's payroll number is not known here.
        self.cache.invalidate_all();
        result
    }
}
