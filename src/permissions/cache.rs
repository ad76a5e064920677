/*!
 * Permission Cache
 * Resolved permission sets keyed by (tenant, actor)
 */

use crate::core::limits::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::core::types::{ActorId, TenantId};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Cache key; always carries both the tenant and the actor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tenant_id: TenantId,
    actor_id: ActorId,
}

impl CacheKey {
    pub fn new(tenant_id: impl Into<TenantId>, actor_id: impl Into<ActorId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            actor_id: actor_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }
}

/// Cached permission set
struct CachedPermissions {
    permissions: Arc<BTreeSet<String>>,
    expires_at: SystemTime,
}

/// Permission cache with TTL expiry and a size bound
///
/// Entries are replaced whole, so a reader sees either the previous set or
/// the new one. Every invalidation bumps a generation counter; a set resolved
/// before an invalidation is never inserted after it (see `put_if_current`).
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of the hit/miss counters
#[repr(C, align(64))]
pub struct PermissionCache {
    cache: DashMap<CacheKey, CachedPermissions, RandomState>,
    max_size: usize,
    ttl: Duration,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PermissionCache {
    /// Create new cache
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            cache: DashMap::with_capacity_and_hasher(max_size.min(1024), RandomState::new()),
            max_size,
            ttl,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the cached set for a key if it has not expired
    pub fn get(&self, key: &CacheKey) -> Option<Arc<BTreeSet<String>>> {
        if let Some(entry) = self.cache.get(key) {
            if entry.expires_at > SystemTime::now() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.permissions));
            }
            // Expired, remove it
            drop(entry);
            self.cache.remove(key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Current invalidation generation; read it before resolving a set
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store a set resolved at `generation` unless an invalidation happened since
    ///
    /// `valid_until` caps the entry's lifetime below the TTL, e.g. at the end
    /// of an assignment window. Returns false when the set was discarded as
    /// possibly stale.
    pub fn put_if_current(
        &self,
        key: CacheKey,
        permissions: Arc<BTreeSet<String>>,
        generation: u64,
        valid_until: Option<SystemTime>,
    ) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.put_until(key.clone(), permissions, valid_until);
        // An invalidation may have landed between the check and the insert
        if self.generation() != generation {
            self.cache.remove(&key);
            return false;
        }
        true
    }

    /// Store a resolved set for the full TTL
    pub fn put(&self, key: CacheKey, permissions: Arc<BTreeSet<String>>) {
        self.put_until(key, permissions, None);
    }

    /// Store a resolved set that expires at the TTL or `valid_until`, whichever is first
    pub fn put_until(
        &self,
        key: CacheKey,
        permissions: Arc<BTreeSet<String>>,
        valid_until: Option<SystemTime>,
    ) {
        // Size limit - evict an arbitrary entry when full
        if self.cache.len() >= self.max_size && !self.cache.contains_key(&key) {
            if let Some(entry) = self.cache.iter().next() {
                let victim = entry.key().clone();
                drop(entry);
                self.cache.remove(&victim);
            }
        }

        let ttl_expiry = SystemTime::now() + self.ttl;
        let expires_at = valid_until.map_or(ttl_expiry, |until| until.min(ttl_expiry));
        self.cache.insert(
            key,
            CachedPermissions {
                permissions,
                expires_at,
            },
        );
    }

    /// Drop the entry for one actor in one tenant
    pub fn invalidate(&self, tenant_id: &str, actor_id: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.remove(&CacheKey::new(tenant_id, actor_id));
    }

    /// Drop every entry of a tenant
    pub fn invalidate_tenant(&self, tenant_id: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.retain(|key, _| key.tenant_id != tenant_id);
    }

    /// Clear entire cache
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            size: self.cache.len(),
            max_size: self.max_size,
            hits,
            misses,
            hit_rate,
        }
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage of lookups served from cache
    pub hit_rate: f64,
}
