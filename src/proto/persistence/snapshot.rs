use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::proto::Duration;
use crate::proto::SessionId;
use crate::proto::StatPersisted;
use crate::proto::ACL;

/// Handle into a tree's ACL cache, as persisted in a snapshot's ACL table (§4.6).
#[derive(Deserialize, Serialize)]
pub struct ACLRef(pub i64);

#[derive(Deserialize, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub timeout: Duration,
}

#[derive(Deserialize, Serialize)]
pub struct ACLCacheEntry {
    pub entry_id: ACLRef,
    pub acl: Vec<ACL>,
}

#[derive(Deserialize, Serialize)]
pub struct DataNode {
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    pub acl: ACLRef,
    pub stat: StatPersisted,
}
