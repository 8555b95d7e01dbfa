use std::collections::HashSet;

use crate::proto::StatPersisted;

/// A single znode: opaque data, an ACL handle, persistent metadata, and the names of
/// its direct children (not full paths — see §3).
///
/// `DataTree` is the sole owner of every `NodeRecord`; callers only ever see defensive
/// copies produced by the query primitives in §4.7.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub data: Vec<u8>,
    pub acl_handle: i64,
    pub stat: StatPersisted,
    pub children: HashSet<String>,
}

impl NodeRecord {
    pub fn new(data: Vec<u8>, acl_handle: i64, stat: StatPersisted) -> NodeRecord {
        NodeRecord {
            data,
            acl_handle,
            stat,
            children: HashSet::new(),
        }
    }
}
