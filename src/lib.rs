#[macro_use]
extern crate strum_macros;

#[macro_use]
extern crate num_derive;

#[macro_use]
extern crate failure;

pub mod config;
pub mod proto;
pub mod serde;
pub mod tree;

pub use proto::{
    ACL, CreateMode, Duration, EphemeralType, Id, OptionalVersion, Perms, SessionId, Stat, StatPersisted, Timestamp,
    Version, Xid, Zxid, ANY_VERSION, PERM_ADMIN, PERM_ALL, PERM_CREATE, PERM_DELETE, PERM_READ, PERM_WRITE,
};

pub use tree::{DataTree, KeeperError, ProcessTxnResult, SessionUpgradeHook, TransactionProcessor, WatchManager, Watcher};
