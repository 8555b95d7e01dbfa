use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::TreeConfig;
use crate::proto::proto::WatcherEventType;
use crate::proto::{EphemeralType, SessionId, Stat, StatPersisted, Timestamp, Version, Zxid, ACL, PERM_ALL, PERM_READ};
use crate::proto::{Id, CONTAINER_EPHEMERAL_OWNER};

use super::acl_cache::ACLCache;
use super::error::{KeeperError, Result};
use super::node::NodeRecord;
use super::path_trie::PathTrie;
use super::watch::{WatchManager, Watcher};

/// Split `path` at its last `/` into `(parent, child name)`, the way §4.4.1 specifies.
///
/// For a top-level path like `/a` this yields `("", "a")`; `node_key` turns the empty
/// parent name back into `"/"`, which is how this crate realizes "root is aliased as
/// both `""` and `"/"`" (§3) without actually storing two map entries for it.
pub(crate) fn split_path(path: &str) -> (&str, &str) {
    let idx = path.rfind('/').unwrap_or(0);
    (&path[..idx], &path[idx + 1..])
}

pub(crate) fn node_key(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

fn zero_stat(ephemeral_owner: SessionId) -> StatPersisted {
    StatPersisted {
        czxid: Zxid(0),
        mzxid: Zxid(0),
        ctime: Timestamp(0),
        mtime: Timestamp(0),
        version: Version(0),
        cversion: Version(0),
        aversion: Version(0),
        ephemeral_owner,
        pzxid: Zxid(0),
    }
}

fn world_acl(perms: crate::proto::Perms) -> Vec<ACL> {
    vec![ACL {
        perms,
        id: Id {
            scheme: "world".to_owned(),
            id: "anyone".to_owned(),
        },
    }]
}

const QUOTA_ROOT: &str = "/zookeeper/quota";
pub(crate) const CONFIG_NODE_PATH: &str = "/zookeeper/config";
const LIMITS_NAME: &str = "zookeeper_limits";
const STATS_NAME: &str = "zookeeper_stats";

fn limits_path(quota_subject: &str) -> String {
    format!("{}{}/{}", QUOTA_ROOT, quota_subject, LIMITS_NAME)
}

fn stats_path(quota_subject: &str) -> String {
    format!("{}{}/{}", QUOTA_ROOT, quota_subject, STATS_NAME)
}

fn parse_quota_blob(data: &[u8]) -> (i64, i64) {
    let text = String::from_utf8_lossy(data);
    let mut count = 0i64;
    let mut bytes = 0i64;
    for field in text.split(',') {
        if let Some(v) = field.strip_prefix("count=") {
            count = v.trim().parse().unwrap_or(0);
        } else if let Some(v) = field.strip_prefix("bytes=") {
            bytes = v.trim().parse().unwrap_or(0);
        }
    }
    (count, bytes)
}

fn format_quota_blob(count: i64, bytes: i64) -> Vec<u8> {
    format!("count={},bytes={}", count, bytes).into_bytes()
}

/// The hierarchical store (§2, C5): the path → `NodeRecord` index, the ephemeral /
/// container / ttl side-indexes, the quota trie, and the two watch managers, plus the
/// ACL cache every node's `acl_handle` points into.
///
/// Collections are each guarded by their own lock rather than a lock per node (§5,
/// "Rust realization"): a single replay thread drives every mutation, so the only
/// concurrency that matters in practice is reader/writer, not writer/writer.
pub struct DataTree {
    pub(crate) acl_cache: ACLCache,
    pub(crate) nodes: RwLock<HashMap<String, NodeRecord>>,
    pub(crate) ephemerals: RwLock<HashMap<SessionId, HashSet<String>>>,
    pub(crate) containers: RwLock<HashSet<String>>,
    pub(crate) ttls: RwLock<HashSet<String>>,
    pub(crate) p_trie: PathTrie,
    data_watches: WatchManager,
    child_watches: WatchManager,
    last_processed_zxid: AtomicI64,
    config: TreeConfig,
}

impl DataTree {
    /// An empty tree with no nodes at all, not even root: used by the snapshot reader
    /// (§4.6), which populates `nodes` wholesale from the stream instead of bootstrapping
    /// the reserved paths itself.
    pub(crate) fn empty(config: TreeConfig) -> DataTree {
        DataTree {
            acl_cache: ACLCache::new(),
            nodes: RwLock::new(HashMap::new()),
            ephemerals: RwLock::new(HashMap::new()),
            containers: RwLock::new(HashSet::new()),
            ttls: RwLock::new(HashSet::new()),
            p_trie: PathTrie::new(),
            data_watches: WatchManager::new(),
            child_watches: WatchManager::new(),
            last_processed_zxid: AtomicI64::new(0),
            config,
        }
    }

    /// A fresh tree with root and the reserved `/zookeeper` subtree already in place
    /// (§3).
    pub fn new(config: TreeConfig) -> DataTree {
        let tree = Self::empty(config);

        let root_acl = tree.acl_cache.convert_acls(&world_acl(PERM_ALL));
        tree.nodes
            .write()
            .unwrap()
            .insert("/".to_owned(), NodeRecord::new(Vec::new(), root_acl, zero_stat(SessionId(0))));

        for (path, acl) in [
            ("/zookeeper", world_acl(PERM_ALL)),
            ("/zookeeper/quota", world_acl(PERM_ALL)),
            (CONFIG_NODE_PATH, world_acl(PERM_READ)),
        ] {
            tree.create_node(path, Vec::new(), &acl, SessionId(0), Version(-1), Zxid(0), Timestamp(0))
                .expect("bootstrapping a reserved path cannot fail");
        }

        tree
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    // ---- 4.4.1 createNode -------------------------------------------------------

    pub fn create_node(
        &self,
        path: &str,
        data: Vec<u8>,
        acl: &[ACL],
        ephemeral_owner: SessionId,
        parent_c_version: Version,
        zxid: Zxid,
        time: Timestamp,
    ) -> Result<Stat> {
        let (parent_name, child_name) = split_path(path);
        let parent_key = node_key(parent_name).to_owned();

        let (stat, data_len) = {
            let mut nodes = self.nodes.write().unwrap();

            if nodes.contains_key(path) {
                return Err(KeeperError::NodeExists);
            }

            let new_cversion = {
                let parent = nodes.get(&parent_key).ok_or(KeeperError::NoNode)?;
                if parent_c_version.0 == -1 {
                    Version(parent.stat.cversion.0 + 1)
                } else {
                    parent_c_version
                }
            };

            {
                let parent = nodes.get_mut(&parent_key).ok_or(KeeperError::NoNode)?;
                parent.stat.cversion = new_cversion;
                parent.stat.pzxid = zxid;
                parent.children.insert(child_name.to_owned());
            }

            let acl_handle = self.acl_cache.convert_acls(acl);
            let stat = StatPersisted {
                czxid: zxid,
                mzxid: zxid,
                ctime: time,
                mtime: time,
                version: Version(0),
                cversion: Version(0),
                aversion: Version(0),
                ephemeral_owner,
                pzxid: zxid,
            };

            let data_len = data.len();
            nodes.insert(path.to_owned(), NodeRecord::new(data, acl_handle, stat.clone()));
            (stat, data_len)
        };

        match EphemeralType::from_owner(ephemeral_owner) {
            EphemeralType::Container => {
                self.containers.write().unwrap().insert(path.to_owned());
            }
            EphemeralType::Ttl(_) => {
                self.ttls.write().unwrap().insert(path.to_owned());
            }
            EphemeralType::Normal(session) => {
                self.ephemerals.write().unwrap().entry(session).or_default().insert(path.to_owned());
            }
            EphemeralType::Void => {}
        }

        if parent_name.starts_with(QUOTA_ROOT) {
            let quota_subject = &parent_name[QUOTA_ROOT.len()..];
            if child_name == LIMITS_NAME {
                self.p_trie.add_path(quota_subject);
            } else if child_name == STATS_NAME {
                self.update_quota_for_path(quota_subject);
            }
        }

        let last_prefix = self.p_trie.find_max_prefix(path);
        if !last_prefix.is_empty() {
            self.update_count(&last_prefix, 1);
            self.update_bytes(&last_prefix, data_len as i64);
        }

        self.data_watches.trigger_watch(path, WatcherEventType::NodeCreated);
        let parent_watch_path = node_key(parent_name);
        self.child_watches.trigger_watch(parent_watch_path, WatcherEventType::NodeChildrenChanged);

        Ok(stat.to_stat(data_len as i32, 0))
    }

    // ---- 4.4.2 deleteNode --------------------------------------------------------

    pub fn delete_node(&self, path: &str, zxid: Zxid) -> Result<()> {
        let (parent_name, child_name) = split_path(path);
        let parent_key = node_key(parent_name).to_owned();

        let (acl_handle, ephemeral_owner, data_len) = {
            let mut nodes = self.nodes.write().unwrap();
            let node = nodes.remove(path).ok_or(KeeperError::NoNode)?;
            if let Some(parent) = nodes.get_mut(&parent_key) {
                parent.children.remove(child_name);
                // cversion is deliberately not bumped here (§4.4.2, §9 open question).
                parent.stat.pzxid = zxid;
            }
            (node.acl_handle, node.stat.ephemeral_owner, node.data.len())
        };

        self.acl_cache.remove_usage(acl_handle);

        match EphemeralType::from_owner(ephemeral_owner) {
            EphemeralType::Container => {
                self.containers.write().unwrap().remove(path);
            }
            EphemeralType::Ttl(_) => {
                self.ttls.write().unwrap().remove(path);
            }
            EphemeralType::Normal(session) => {
                if let Some(set) = self.ephemerals.write().unwrap().get_mut(&session) {
                    set.remove(path);
                }
            }
            EphemeralType::Void => {}
        }

        if child_name == LIMITS_NAME {
            // §9 open question: the corrected guard checks the full quota prefix, not
            // just "/zookeeper", so a stray `zookeeper_limits` elsewhere under
            // `/zookeeper` can't mistakenly prune the quota trie.
            debug_assert!(
                parent_name.starts_with(QUOTA_ROOT),
                "zookeeper_limits sibling found outside /zookeeper/quota: {}",
                path
            );
            if parent_name.starts_with(QUOTA_ROOT) {
                self.p_trie.delete_path(&parent_name[QUOTA_ROOT.len()..]);
            }
        }

        let last_prefix = self.p_trie.find_max_prefix(path);
        if !last_prefix.is_empty() {
            self.update_count(&last_prefix, -1);
            self.update_bytes(&last_prefix, -(data_len as i64));
        }

        let fired_from_data = self.data_watches.trigger_watch(path, WatcherEventType::NodeDeleted);
        self.child_watches
            .trigger_watch_suppressing(path, WatcherEventType::NodeDeleted, &fired_from_data);
        let parent_watch_path = node_key(parent_name);
        self.child_watches.trigger_watch(parent_watch_path, WatcherEventType::NodeChildrenChanged);

        Ok(())
    }

    // ---- 4.4.3 setData -------------------------------------------------------------

    pub fn set_data(&self, path: &str, data: Vec<u8>, version: Version, zxid: Zxid, time: Timestamp) -> Result<Stat> {
        let (last_len, new_len, stat, num_children) = {
            let mut nodes = self.nodes.write().unwrap();
            let node = nodes.get_mut(node_key(path)).ok_or(KeeperError::NoNode)?;
            let last_len = node.data.len();
            node.data = data;
            node.stat.mtime = time;
            node.stat.mzxid = zxid;
            node.stat.version = version;
            (last_len, node.data.len(), node.stat.clone(), node.children.len())
        };

        let last_prefix = self.p_trie.find_max_prefix(path);
        if !last_prefix.is_empty() {
            self.update_bytes(&last_prefix, new_len as i64 - last_len as i64);
        }

        self.data_watches.trigger_watch(path, WatcherEventType::NodeDataChanged);

        Ok(stat.to_stat(new_len as i32, num_children as i32))
    }

    // ---- 4.4.4 setACL ---------------------------------------------------------------

    pub fn set_acl(&self, path: &str, acl: &[ACL], version: Version) -> Result<Stat> {
        let (old_handle, stat, data_len, num_children) = {
            let mut nodes = self.nodes.write().unwrap();
            let node = nodes.get_mut(node_key(path)).ok_or(KeeperError::NoNode)?;
            let old_handle = node.acl_handle;
            node.acl_handle = self.acl_cache.convert_acls(acl);
            node.stat.aversion = version;
            (old_handle, node.stat.clone(), node.data.len(), node.children.len())
        };
        self.acl_cache.remove_usage(old_handle);
        // No watch fires here — deliberate asymmetry with setData (§4.4.4, §9).
        Ok(stat.to_stat(data_len as i32, num_children as i32))
    }

    // ---- 4.4.5 quota accounting -----------------------------------------------------

    fn update_count(&self, quota_subject: &str, diff: i64) {
        self.update_stat_field(quota_subject, diff, 0);
    }

    fn update_bytes(&self, quota_subject: &str, diff: i64) {
        self.update_stat_field(quota_subject, 0, diff);
    }

    fn update_stat_field(&self, quota_subject: &str, count_diff: i64, bytes_diff: i64) {
        let stats = stats_path(quota_subject);

        let updated = {
            let mut nodes = self.nodes.write().unwrap();
            match nodes.get_mut(&stats) {
                Some(node) => {
                    let (count, bytes) = parse_quota_blob(&node.data);
                    let new_count = count + count_diff;
                    let new_bytes = bytes + bytes_diff;
                    node.data = format_quota_blob(new_count, new_bytes);
                    Some((new_count, new_bytes))
                }
                None => {
                    log::warn!("no zookeeper_stats node for quota path {}", quota_subject);
                    None
                }
            }
        };

        let (new_count, new_bytes) = match updated {
            Some(v) => v,
            None => return,
        };

        let limits = limits_path(quota_subject);
        if let Some(limits_node) = self.nodes.read().unwrap().get(&limits) {
            let (max_count, max_bytes) = parse_quota_blob(&limits_node.data);
            if max_count > 0 && new_count > max_count {
                log::warn!("quota exceeded: {} count {} > limit {}", quota_subject, new_count, max_count);
            }
            if max_bytes > 0 && new_bytes > max_bytes {
                log::warn!("quota exceeded: {} bytes {} > limit {}", quota_subject, new_bytes, max_bytes);
            }
        }
    }

    /// Recompute the absolute `count`/`bytes` for `quota_subject` from the live subtree
    /// (§4.4.5); used only when a stats node is first created or on restore (§4.6).
    pub fn update_quota_for_path(&self, quota_subject: &str) {
        let (count, bytes) = {
            let nodes = self.nodes.read().unwrap();
            count_subtree(&nodes, quota_subject)
        };
        let stats = stats_path(quota_subject);
        if let Some(node) = self.nodes.write().unwrap().get_mut(&stats) {
            node.data = format_quota_blob(count, bytes);
        }
    }

    /// Traverse `/zookeeper/quota`, rebuild `p_trie` for every `zookeeper_limits` leaf,
    /// and recompute the matching stats node (§4.6, restore path).
    pub(crate) fn setup_quota(&self) {
        self.p_trie.clear();

        let limits_suffix = format!("/{}", LIMITS_NAME);
        let quota_subjects: Vec<String> = {
            let nodes = self.nodes.read().unwrap();
            nodes
                .keys()
                .filter(|k| k.starts_with(QUOTA_ROOT) && k.ends_with(&limits_suffix))
                .map(|k| k[QUOTA_ROOT.len()..k.len() - limits_suffix.len()].to_owned())
                .collect()
        };

        for subject in quota_subjects {
            self.p_trie.add_path(&subject);
            self.update_quota_for_path(&subject);
        }
    }

    // ---- 4.4.6 killSession ------------------------------------------------------------

    pub fn kill_session(&self, session: SessionId, zxid: Zxid) {
        let paths: Vec<String> = self
            .ephemerals
            .write()
            .unwrap()
            .remove(&session)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();

        for path in paths {
            match self.delete_node(&path, zxid) {
                Ok(()) | Err(KeeperError::NoNode) => {}
                Err(e) => log::warn!("unexpected error deleting ephemeral {} on session kill: {:?}", path, e),
            }
        }
    }

    // ---- 4.5 post-processing helper --------------------------------------------------

    /// Advance `parent.cversion`/`pzxid` if `new_cversion` is ahead of what's recorded
    /// (§4.5, restore-time `NODE_EXISTS` repair).
    pub fn set_cversion_pzxid(&self, path: &str, new_cversion: Version, zxid: Zxid) {
        let mut nodes = self.nodes.write().unwrap();
        if let Some(node) = nodes.get_mut(node_key(path)) {
            let resolved = if new_cversion.0 == -1 {
                Version(node.stat.cversion.0 + 1)
            } else {
                new_cversion
            };
            if resolved.0 > node.stat.cversion.0 {
                node.stat.cversion = resolved;
                node.stat.pzxid = zxid;
            }
        }
    }

    pub fn last_processed_zxid(&self) -> Zxid {
        Zxid(self.last_processed_zxid.load(Ordering::SeqCst))
    }

    /// Monotonic: only ever moves forward (§4.5, "lastProcessedZxid is updated only
    /// after a transaction's effect is fully applied").
    pub fn set_last_processed_zxid(&self, zxid: Zxid) {
        self.last_processed_zxid.fetch_max(zxid.0, Ordering::SeqCst);
    }

    // ---- 4.7 query primitives ----------------------------------------------------------

    pub fn get_data(&self, path: &str, watcher: Option<Arc<dyn Watcher>>) -> Result<(Vec<u8>, Stat)> {
        let nodes = self.nodes.read().unwrap();
        let node = nodes.get(node_key(path)).ok_or(KeeperError::NoNode)?;
        let stat = node.stat.to_stat(node.data.len() as i32, node.children.len() as i32);
        let data = node.data.clone();
        drop(nodes);

        if let Some(w) = watcher {
            self.data_watches.add_watch(path, w);
        }
        Ok((data, stat))
    }

    pub fn get_children(&self, path: &str, watcher: Option<Arc<dyn Watcher>>) -> Result<(Vec<String>, Stat)> {
        let nodes = self.nodes.read().unwrap();
        let node = nodes.get(node_key(path)).ok_or(KeeperError::NoNode)?;
        let stat = node.stat.to_stat(node.data.len() as i32, node.children.len() as i32);
        let children = node.children.iter().cloned().collect();
        drop(nodes);

        if let Some(w) = watcher {
            self.child_watches.add_watch(path, w);
        }
        Ok((children, stat))
    }

    /// Stats `path`; on `NO_NODE` still registers the data watch (if any), so it fires
    /// on a future `NodeCreated` (§4.7).
    pub fn stat_node(&self, path: &str, watcher: Option<Arc<dyn Watcher>>) -> Result<Stat> {
        let found = {
            let nodes = self.nodes.read().unwrap();
            nodes
                .get(node_key(path))
                .map(|node| node.stat.to_stat(node.data.len() as i32, node.children.len() as i32))
        };

        if let Some(w) = watcher {
            self.data_watches.add_watch(path, w);
        }

        found.ok_or(KeeperError::NoNode)
    }

    pub fn get_acl(&self, path: &str) -> Result<(Vec<ACL>, Stat)> {
        let nodes = self.nodes.read().unwrap();
        let node = nodes.get(node_key(path)).ok_or(KeeperError::NoNode)?;
        let stat = node.stat.to_stat(node.data.len() as i32, node.children.len() as i32);
        let handle = node.acl_handle;
        drop(nodes);
        Ok((self.acl_cache.convert_long(handle), stat))
    }

    pub fn get_ephemerals_for_session(&self, session: SessionId) -> Vec<String> {
        self.ephemerals
            .read()
            .unwrap()
            .get(&session)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_ephemerals(&self) -> HashMap<SessionId, Vec<String>> {
        self.ephemerals
            .read()
            .unwrap()
            .iter()
            .map(|(session, paths)| (*session, paths.iter().cloned().collect()))
            .collect()
    }

    /// Textual diagnostic dump (§6), grouped by owning session.
    pub fn dump_ephemerals(&self) -> String {
        let map = self.ephemerals.read().unwrap();
        let mut sessions: Vec<_> = map.keys().cloned().collect();
        sessions.sort_by_key(|s| s.0);

        let mut out = String::new();
        for session in sessions {
            out.push_str(&format!("Session 0x{:x}:\n", session.0));
            let mut paths: Vec<_> = map[&session].iter().cloned().collect();
            paths.sort();
            for path in paths {
                out.push_str(&format!("\t{}\n", path));
            }
        }
        out
    }

    pub fn data_watches(&self) -> &WatchManager {
        &self.data_watches
    }

    pub fn child_watches(&self) -> &WatchManager {
        &self.child_watches
    }

    pub fn node_exists(&self, path: &str) -> bool {
        self.nodes.read().unwrap().contains_key(node_key(path))
    }

    // ---- 4.6 snapshot codec --------------------------------------------------------

    pub fn serialize<W: std::io::Write>(&self, writer: W) -> std::result::Result<(), failure::Error> {
        super::snapshot::write(self, writer)
    }

    pub fn deserialize<R: std::io::Read>(reader: R, config: TreeConfig) -> std::result::Result<DataTree, failure::Error> {
        super::snapshot::read(reader, config)
    }
}

fn count_subtree(nodes: &HashMap<String, NodeRecord>, path: &str) -> (i64, i64) {
    let node = match nodes.get(node_key(path)) {
        Some(n) => n,
        None => return (0, 0),
    };

    let mut count = 1i64; // count the subject node itself
    let mut bytes = node.data.len() as i64;

    for child in &node.children {
        let child_path = format!("{}/{}", if path == "/" { "" } else { path }, child);
        let (c, b) = count_subtree(nodes, &child_path);
        count += c;
        bytes += b;
    }

    (count, bytes)
}

impl Default for DataTree {
    fn default() -> Self {
        DataTree::new(TreeConfig::default())
    }
}

#[allow(dead_code)]
const CONTAINER_MARKER: i64 = CONTAINER_EPHEMERAL_OWNER;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::PERM_ALL;
    use std::sync::Mutex;

    fn acl() -> Vec<ACL> {
        world_acl(PERM_ALL)
    }

    struct RecordingWatcher(Mutex<Vec<WatcherEventType>>);
    impl Watcher for RecordingWatcher {
        fn process(&self, event: &crate::proto::proto::WatcherEvent) {
            self.0.lock().unwrap().push(event.typ);
        }
    }

    // S1 — create/read/delete persistent.
    #[test]
    fn create_read_delete_persistent() {
        let _ = env_logger::try_init();
        let tree = DataTree::new(TreeConfig::default());

        let stat = tree
            .create_node("/a", b"x".to_vec(), &acl(), SessionId(0), Version(-1), Zxid(1), Timestamp(1))
            .unwrap();
        assert_eq!(stat.version, Version(0));

        let (data, _) = tree.get_data("/a", None).unwrap();
        assert_eq!(data, b"x");

        let (_, root_stat) = tree.get_data("/", None).unwrap();
        assert_eq!(root_stat.cversion, Version(1));
        assert_eq!(root_stat.pzxid, Zxid(1));

        tree.delete_node("/a", Zxid(2)).unwrap();
        assert!(matches!(tree.get_data("/a", None), Err(KeeperError::NoNode)));

        let (_, root_stat) = tree.get_data("/", None).unwrap();
        assert_eq!(root_stat.pzxid, Zxid(2));
        // delete does not bump cversion (§4.4.2, §9).
        assert_eq!(root_stat.cversion, Version(1));
    }

    // S2 — ephemeral lifecycle via session kill.
    #[test]
    fn ephemeral_lifecycle_via_session_kill() {
        let tree = DataTree::new(TreeConfig::default());
        let session = SessionId(0xA);

        tree.create_node("/e", Vec::new(), &acl(), session, Version(-1), Zxid(10), Timestamp(10))
            .unwrap();
        assert_eq!(tree.get_ephemerals_for_session(session), vec!["/e".to_owned()]);

        let watcher: Arc<RecordingWatcher> = Arc::new(RecordingWatcher(Mutex::new(Vec::new())));
        tree.get_data("/e", Some(watcher.clone())).unwrap();

        tree.kill_session(session, Zxid(11));

        assert!(tree.get_ephemerals_for_session(session).is_empty());
        assert!(matches!(tree.get_data("/e", None), Err(KeeperError::NoNode)));
        assert_eq!(watcher.0.lock().unwrap().as_slice(), &[WatcherEventType::NodeDeleted]);
    }

    // S5 — quota accounting.
    #[test]
    fn quota_accounting_warns_but_does_not_reject() {
        let tree = DataTree::new(TreeConfig::default());

        tree.create_node(
            "/zookeeper/quota/foo",
            Vec::new(),
            &acl(),
            SessionId(0),
            Version(-1),
            Zxid(1),
            Timestamp(1),
        )
        .unwrap();
        tree.create_node(
            "/zookeeper/quota/foo/zookeeper_limits",
            b"count=2,bytes=-1".to_vec(),
            &acl(),
            SessionId(0),
            Version(-1),
            Zxid(2),
            Timestamp(2),
        )
        .unwrap();
        tree.create_node(
            "/zookeeper/quota/foo/zookeeper_stats",
            b"count=0,bytes=0".to_vec(),
            &acl(),
            SessionId(0),
            Version(-1),
            Zxid(3),
            Timestamp(3),
        )
        .unwrap();

        tree.create_node("/foo", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(4), Timestamp(4))
            .unwrap();
        tree.create_node("/foo/a", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(5), Timestamp(5))
            .unwrap();

        let (stats, _) = tree.get_data("/zookeeper/quota/foo/zookeeper_stats", None).unwrap();
        assert_eq!(parse_quota_blob(&stats), (2, 0));

        // Exceeds the count=2 limit; the create still succeeds (no rejection, §4.4.5).
        tree.create_node("/foo/b", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(6), Timestamp(6))
            .unwrap();
        let (stats, _) = tree.get_data("/zookeeper/quota/foo/zookeeper_stats", None).unwrap();
        assert_eq!(parse_quota_blob(&stats), (3, 0));
    }

    // S6 — watch one-shot.
    #[test]
    fn set_data_fires_one_shot_data_watch() {
        let tree = DataTree::new(TreeConfig::default());
        tree.create_node("/a", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(1), Timestamp(1))
            .unwrap();

        let watcher: Arc<RecordingWatcher> = Arc::new(RecordingWatcher(Mutex::new(Vec::new())));
        tree.get_data("/a", Some(watcher.clone())).unwrap();

        tree.set_data("/a", b"y".to_vec(), Version(1), Zxid(2), Timestamp(2)).unwrap();
        assert_eq!(watcher.0.lock().unwrap().as_slice(), &[WatcherEventType::NodeDataChanged]);

        tree.set_data("/a", b"z".to_vec(), Version(2), Zxid(3), Timestamp(3)).unwrap();
        assert_eq!(watcher.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn set_acl_does_not_fire_a_watch() {
        let tree = DataTree::new(TreeConfig::default());
        tree.create_node("/a", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(1), Timestamp(1))
            .unwrap();

        let watcher: Arc<RecordingWatcher> = Arc::new(RecordingWatcher(Mutex::new(Vec::new())));
        tree.get_data("/a", Some(watcher.clone())).unwrap();

        tree.set_acl("/a", &world_acl(PERM_READ), Version(1)).unwrap();
        assert!(watcher.0.lock().unwrap().is_empty());
    }

    #[test]
    fn create_on_missing_parent_is_no_node() {
        let tree = DataTree::new(TreeConfig::default());
        let err = tree
            .create_node("/missing/child", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(1), Timestamp(1))
            .unwrap_err();
        assert_eq!(err, KeeperError::NoNode);
    }

    #[test]
    fn create_duplicate_is_node_exists() {
        let tree = DataTree::new(TreeConfig::default());
        tree.create_node("/a", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(1), Timestamp(1))
            .unwrap();
        let err = tree
            .create_node("/a", Vec::new(), &acl(), SessionId(0), Version(-1), Zxid(2), Timestamp(2))
            .unwrap_err();
        assert_eq!(err, KeeperError::NodeExists);
    }

    #[test]
    fn root_is_aliased_as_empty_string_and_slash() {
        let tree = DataTree::new(TreeConfig::default());
        let (_, via_slash) = tree.get_data("/", None).unwrap();
        let (_, via_empty) = tree.get_data("", None).unwrap();
        assert_eq!(via_slash, via_empty);
    }

    #[test]
    fn container_and_ttl_are_indexed_separately_from_ephemerals() {
        let tree = DataTree::new(TreeConfig::default());

        tree.create_node(
            "/c",
            Vec::new(),
            &acl(),
            SessionId(CONTAINER_EPHEMERAL_OWNER),
            Version(-1),
            Zxid(1),
            Timestamp(1),
        )
        .unwrap();
        assert!(tree.containers.read().unwrap().contains("/c"));
        assert!(tree.get_ephemerals().is_empty());

        let ttl_owner = EphemeralType::ttl_owner(30_000);
        tree.create_node("/t", Vec::new(), &acl(), ttl_owner, Version(-1), Zxid(2), Timestamp(2))
            .unwrap();
        assert!(tree.ttls.read().unwrap().contains("/t"));
        assert!(tree.get_ephemerals().is_empty());
    }
}
