use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::proto::proto::{KeeperState, WatcherEvent, WatcherEventType};

/// A one-shot observer registered on a path (§4.3).
///
/// Implementations should return promptly: `process` runs synchronously on the
/// thread driving the triggering mutation (§5, "no operation suspends or blocks").
pub trait Watcher: Send + Sync {
    fn process(&self, event: &WatcherEvent);
}

/// A set of watchers, deduplicated by `Arc` identity so that `(path, watcher)` stays
/// idempotent per §4.3 without requiring `Watcher` to implement `Eq`/`Hash`.
#[derive(Default)]
struct WatcherSet(Vec<Arc<dyn Watcher>>);

impl WatcherSet {
    fn insert(&mut self, watcher: Arc<dyn Watcher>) {
        if !self.0.iter().any(|w| Arc::ptr_eq(w, &watcher)) {
            self.0.push(watcher);
        }
    }

    fn remove(&mut self, watcher: &Arc<dyn Watcher>) -> bool {
        let before = self.0.len();
        self.0.retain(|w| !Arc::ptr_eq(w, watcher));
        self.0.len() != before
    }
}

/// Maps `path -> set<Watcher>`, firing one-shot events (§4.3). A `DataTree` holds two
/// independent instances: one for data watches, one for child watches.
pub struct WatchManager {
    by_path: RwLock<HashMap<String, WatcherSet>>,
}

impl WatchManager {
    pub fn new() -> WatchManager {
        WatchManager {
            by_path: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_watch(&self, path: &str, watcher: Arc<dyn Watcher>) {
        let mut map = self.by_path.write().unwrap();
        map.entry(path.to_owned()).or_default().insert(watcher);
    }

    /// Remove and notify every watcher on `path`, returning the watchers fired so a
    /// caller can pass them as suppression to a sibling manager's trigger on the same
    /// path (used so data- and child-watch sets don't double-fire on delete, §4.4.2).
    pub fn trigger_watch(&self, path: &str, event_type: WatcherEventType) -> Vec<Arc<dyn Watcher>> {
        self.trigger_watch_suppressing(path, event_type, &[])
    }

    pub fn trigger_watch_suppressing(
        &self,
        path: &str,
        event_type: WatcherEventType,
        suppress: &[Arc<dyn Watcher>],
    ) -> Vec<Arc<dyn Watcher>> {
        let fired = {
            let mut map = self.by_path.write().unwrap();
            match map.remove(path) {
                Some(set) => set.0,
                None => return Vec::new(),
            }
        };

        let event = WatcherEvent {
            typ: clone_event_type(&event_type),
            state: KeeperState::SyncConnected,
            path: path.to_owned(),
        };

        let mut actually_fired = Vec::with_capacity(fired.len());
        for watcher in fired {
            if suppress.iter().any(|w| Arc::ptr_eq(w, &watcher)) {
                continue;
            }
            // A panicking callback must not take down the writer thread or stop the
            // remaining watchers from being notified (§4.3).
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| watcher.process(&event)));
            if result.is_err() {
                log::error!("watcher callback panicked while processing {:?} on {}", event.typ, path);
            }
            actually_fired.push(watcher);
        }
        actually_fired
    }

    pub fn contains_watcher(&self, path: &str, watcher: &Arc<dyn Watcher>) -> bool {
        let map = self.by_path.read().unwrap();
        map.get(path).map_or(false, |set| set.0.iter().any(|w| Arc::ptr_eq(w, watcher)))
    }

    /// Remove `watcher` from every path it is registered on (`removeCnxn`, §9).
    pub fn remove_watcher(&self, watcher: &Arc<dyn Watcher>) {
        let mut map = self.by_path.write().unwrap();
        map.retain(|_, set| {
            set.remove(watcher);
            !set.0.is_empty()
        });
    }

    pub fn remove_watcher_from(&self, path: &str, watcher: &Arc<dyn Watcher>) {
        let mut map = self.by_path.write().unwrap();
        if let Some(set) = map.get_mut(path) {
            set.remove(watcher);
            if set.0.is_empty() {
                map.remove(path);
            }
        }
    }

    pub fn watch_count(&self) -> usize {
        self.by_path.read().unwrap().values().map(|s| s.0.len()).sum()
    }

    /// Textual per-path report (diagnostic dump, §6).
    pub fn dump_watches(&self) -> String {
        let map = self.by_path.read().unwrap();
        let mut paths: Vec<_> = map.keys().cloned().collect();
        paths.sort();
        let mut out = String::new();
        for path in paths {
            out.push_str(&format!("{}: {} watchers\n", path, map[&path].0.len()));
        }
        out
    }
}

impl Default for WatchManager {
    fn default() -> Self {
        WatchManager::new()
    }
}

fn clone_event_type(t: &WatcherEventType) -> WatcherEventType {
    match t {
        WatcherEventType::None => WatcherEventType::None,
        WatcherEventType::NodeCreated => WatcherEventType::NodeCreated,
        WatcherEventType::NodeDeleted => WatcherEventType::NodeDeleted,
        WatcherEventType::NodeDataChanged => WatcherEventType::NodeDataChanged,
        WatcherEventType::NodeChildrenChanged => WatcherEventType::NodeChildrenChanged,
        WatcherEventType::DataWatchRemoved => WatcherEventType::DataWatchRemoved,
        WatcherEventType::ChildWatchRemoved => WatcherEventType::ChildWatchRemoved,
    }
}
