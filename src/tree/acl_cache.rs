use std::collections::HashMap;
use std::sync::RwLock;

use crate::proto::ACL;

struct Entry {
    acl: Vec<ACL>,
    refcount: i64,
}

/// Interns ACL lists behind stable 64-bit handles with reference counting (§4.1).
///
/// Mirrors `ACLCacheEntry`/`ACLRef` from the snapshot format (`proto::persistence::snapshot`):
/// this is the live, mutable counterpart of what that module reads and writes.
pub struct ACLCache {
    inner: RwLock<Inner>,
}

struct Inner {
    by_handle: HashMap<i64, Entry>,
    next_handle: i64,
}

impl ACLCache {
    pub fn new() -> ACLCache {
        ACLCache {
            inner: RwLock::new(Inner {
                by_handle: HashMap::new(),
                next_handle: 1,
            }),
        }
    }

    /// Intern `acl`, or bump the refcount of an identical already-interned list.
    pub fn convert_acls(&self, acl: &[ACL]) -> i64 {
        let mut inner = self.inner.write().unwrap();
        if let Some((&handle, _)) = inner.by_handle.iter().find(|(_, e)| e.acl == acl) {
            inner.by_handle.get_mut(&handle).unwrap().refcount += 1;
            return handle;
        }

        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.by_handle.insert(
            handle,
            Entry {
                acl: acl.to_vec(),
                refcount: 1,
            },
        );
        handle
    }

    /// Fetch the interned list for `handle`. An unknown handle is a programming error.
    pub fn convert_long(&self, handle: i64) -> Vec<ACL> {
        let inner = self.inner.read().unwrap();
        inner
            .by_handle
            .get(&handle)
            .unwrap_or_else(|| panic!("unknown ACL handle {}", handle))
            .acl
            .clone()
    }

    pub fn remove_usage(&self, handle: i64) {
        let mut inner = self.inner.write().unwrap();
        if let Some(entry) = inner.by_handle.get_mut(&handle) {
            entry.refcount -= 1;
        }
    }

    /// Load a raw `(handle, acl)` pair from a snapshot's ACL table with refcount zero
    /// (§4.6): the table lists every interned list regardless of whether any node still
    /// references it, and `purgeUnused` is what decides which survive.
    pub fn load_entry(&self, handle: i64, acl: Vec<ACL>) {
        let mut inner = self.inner.write().unwrap();
        inner.by_handle.insert(handle, Entry { acl, refcount: 0 });
        inner.next_handle = inner.next_handle.max(handle + 1);
    }

    /// Bump the refcount of an already-loaded handle as a znode record referencing it
    /// is read back from a snapshot (§4.6). No-op if `handle` was never loaded.
    pub fn add_usage(&self, handle: i64) {
        let mut inner = self.inner.write().unwrap();
        if let Some(entry) = inner.by_handle.get_mut(&handle) {
            entry.refcount += 1;
        }
    }

    /// Whether `handle` is present in the cache, regardless of refcount. A snapshot
    /// node referencing a handle absent from the ACL table is a fatal restore error
    /// (§7).
    pub fn contains(&self, handle: i64) -> bool {
        self.inner.read().unwrap().by_handle.contains_key(&handle)
    }

    /// Drop every entry with a zero (or negative) refcount. Called once at the end of
    /// restore, never mid-replay.
    pub fn purge_unused(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.by_handle.retain(|_, e| e.refcount > 0);
    }

    pub fn refcount(&self, handle: i64) -> i64 {
        self.inner.read().unwrap().by_handle.get(&handle).map_or(0, |e| e.refcount)
    }

    /// All (handle, acl) pairs in handle order, for serialization (§4.1).
    pub fn entries(&self) -> Vec<(i64, Vec<ACL>)> {
        let inner = self.inner.read().unwrap();
        let mut entries: Vec<_> = inner.by_handle.iter().map(|(&h, e)| (h, e.acl.clone())).collect();
        entries.sort_by_key(|(h, _)| *h);
        entries
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.by_handle.clear();
        inner.next_handle = 1;
    }
}

impl Default for ACLCache {
    fn default() -> Self {
        ACLCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Id, Perms, PERM_ALL};

    fn acl(scheme: &str) -> Vec<ACL> {
        vec![ACL {
            perms: PERM_ALL,
            id: Id {
                scheme: scheme.to_owned(),
                id: "anyone".to_owned(),
            },
        }]
    }

    #[test]
    fn interns_identical_lists() {
        let cache = ACLCache::new();
        let h1 = cache.convert_acls(&acl("world"));
        let h2 = cache.convert_acls(&acl("world"));
        assert_eq!(h1, h2);
        assert_eq!(cache.refcount(h1), 2);
    }

    #[test]
    fn distinct_lists_get_distinct_handles() {
        let cache = ACLCache::new();
        let h1 = cache.convert_acls(&acl("world"));
        let h2 = cache.convert_acls(&acl("digest"));
        assert_ne!(h1, h2);
    }

    #[test]
    fn purge_drops_zero_refcount_entries_only_after_sweep() {
        let cache = ACLCache::new();
        let h = cache.convert_acls(&acl("world"));
        cache.remove_usage(h);
        assert_eq!(cache.refcount(h), 0);
        // Still resolvable until the sweep runs.
        assert_eq!(cache.convert_long(h), acl("world"));
        cache.purge_unused();
        assert_eq!(cache.refcount(h), 0);
        assert_eq!(cache.entries().iter().find(|(handle, _)| *handle == h), None);
    }

    #[test]
    fn load_entry_starts_at_zero_and_add_usage_bumps_it() {
        let cache = ACLCache::new();
        cache.load_entry(7, acl("world"));
        assert!(cache.contains(7));
        assert_eq!(cache.refcount(7), 0);

        cache.add_usage(7);
        cache.add_usage(7);
        assert_eq!(cache.refcount(7), 2);
        assert_eq!(cache.convert_long(7), acl("world"));
    }

    #[test]
    fn add_usage_on_unknown_handle_is_a_no_op() {
        let cache = ACLCache::new();
        cache.add_usage(42);
        assert!(!cache.contains(42));
    }
}
