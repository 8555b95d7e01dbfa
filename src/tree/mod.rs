//! C2–C7 (§2): the hierarchical store (`DataTree`) and its supporting caches and
//! indexes (ACL cache, path trie, watch manager), the transaction processor that
//! drives mutations from an ordered log, and the snapshot codec that freezes and
//! restores the whole thing.

mod acl_cache;
mod data_tree;
mod error;
mod node;
mod path_trie;
mod snapshot;
mod txn_processor;
mod watch;

pub use data_tree::DataTree;
pub use error::{KeeperError, Result};
pub use txn_processor::{ProcessTxnResult, SessionUpgradeHook, TransactionProcessor};
pub use watch::{WatchManager, Watcher};
