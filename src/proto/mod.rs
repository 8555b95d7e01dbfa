
pub mod proto;
pub mod persistence;
pub mod txn;

use serde_derive::Deserialize;
use serde_derive::Serialize;

// See https://github.com/apache/zookeeper/blob/trunk/src/zookeeper.jute

/// ZooKeeper transaction id
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Zxid(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Timestamp(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Duration(pub i32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Version(pub i32);
pub const ANY_VERSION: Version = Version(-1);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct OptionalVersion(pub i32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct SessionId(pub i64);

/// Exchange id, a correlation id sent by a request and returned in its response.
/// It starts at 1, but can be negative for server-generated notifications (see
/// `FinalRequestProcessor` in ZK server)
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Xid(pub i32);

/// Permissions associated to an ACL
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct Perms(pub u32);

impl Perms {
    /// Checks that `self` grants all permissions granted by `perm`.
    pub fn has(&self, perm: Perms) -> bool {
        (self.0 & perm.0) ^ perm.0 == 0
    }
}

impl std::ops::BitOr for Perms {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Perms(self.0 | rhs.0)
    }
}

pub const PERM_READ: Perms = Perms(1 << 0);
pub const PERM_WRITE: Perms = Perms(1 << 1);
pub const PERM_CREATE: Perms = Perms(1 << 2);
pub const PERM_DELETE: Perms = Perms(1 << 3);
pub const PERM_ADMIN: Perms = Perms(1 << 4);
pub const PERM_ALL: Perms = Perms(PERM_READ.0 | PERM_WRITE.0 | PERM_CREATE.0 | PERM_DELETE.0 | PERM_ADMIN.0);

// See CreateMode.java
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub enum CreateMode {
    Persistent = 0,
    Ephemeral = 1,
    PersistentSequential = 2,
    EphemeralSequential = 3,
    Container = 4,
    PersistentWithTTL = 5,
    PersistentSequentialWithTTL = 6,
}

use CreateMode::*;
impl CreateMode {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Ephemeral | EphemeralSequential)
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, PersistentSequential | EphemeralSequential)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Container)
    }

    pub fn is_ttl(&self) -> bool {
        matches!(self, PersistentWithTTL | PersistentSequentialWithTTL)
    }
}

//----- Data

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Id {
    pub scheme: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ACL {
    pub perms: Perms,
    pub id: Id,
}

/// Information shared with the client
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Stat {
    /// Created zxid
    pub czxid: Zxid,
    /// Last modified zxid
    pub mzxid: Zxid,
    /// Created time
    pub ctime: Timestamp,
    /// Last modified time
    pub mtime: Timestamp,
    /// Version
    pub version: Version,
    /// Child version
    pub cversion: Version,
    /// ACL version
    pub aversion: Version,
    /// Owner id if ephemeral, 0 otherwise
    pub ephemeral_owner: SessionId,
    /// Length of the data in the node
    pub data_length: i32,
    /// Number of children of this node
    pub num_children: i32,
    /// Last modified children
    pub pzxid: Zxid,
}

/// Information explicitly stored by the server persistently.
///
/// Everything a client-facing `Stat` carries except `data_length` and `num_children`,
/// which are derived from the live node rather than stored.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct StatPersisted {
    /// created zxid
    pub czxid: Zxid,
    /// last modified zxid
    pub mzxid: Zxid,
    /// created
    pub ctime: Timestamp,
    /// last modified
    pub mtime: Timestamp,
    /// version
    pub version: Version,
    /// child version
    pub cversion: Version,
    /// acl version
    pub aversion: Version,
    /// owner id if ephemeral, 0 otw
    pub ephemeral_owner: SessionId,
    /// last modified children
    pub pzxid: Zxid,
}

impl StatPersisted {
    pub fn to_stat(&self, data_length: i32, num_children: i32) -> Stat {
        Stat {
            czxid: self.czxid,
            mzxid: self.mzxid,
            ctime: self.ctime,
            mtime: self.mtime,
            version: self.version,
            cversion: self.cversion,
            aversion: self.aversion,
            ephemeral_owner: self.ephemeral_owner,
            data_length,
            num_children,
            pzxid: self.pzxid,
        }
    }
}

/// The lifecycle class encoded in a znode's `ephemeral_owner` tag.
///
/// ZooKeeper packs this into a single 64-bit signed field: zero means a persistent
/// znode, a positive value is a session id (the znode is a plain ephemeral owned by
/// that session), and the high bits of a negative value discriminate containers from
/// TTL nodes (whose low bits then carry the TTL in milliseconds).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EphemeralType {
    Void,
    Normal(SessionId),
    Container,
    Ttl(i64),
}

/// Reserved `ephemeral_owner` value marking a container znode.
pub const CONTAINER_EPHEMERAL_OWNER: i64 = i64::MIN + 1;

/// High bit that, combined with a non-reserved negative value, marks a TTL znode. The
/// remaining 40 bits hold the millisecond TTL (see `EXTENDED_FEATURE_ADDRESS_OFFSET` in
/// the original `EphemeralType.java`).
const TTL_MASK: i64 = 0x8000_0000_0000_0000u64 as i64;
const MAX_TTL: i64 = (1i64 << 40) - 1;

impl EphemeralType {
    pub fn from_owner(owner: SessionId) -> EphemeralType {
        let value = owner.0;
        if value == 0 {
            EphemeralType::Void
        } else if value == CONTAINER_EPHEMERAL_OWNER {
            EphemeralType::Container
        } else if value < 0 && (value & TTL_MASK) != 0 && value != CONTAINER_EPHEMERAL_OWNER {
            EphemeralType::Ttl(value & MAX_TTL)
        } else if value > 0 {
            EphemeralType::Normal(owner)
        } else {
            EphemeralType::Void
        }
    }

    /// Encode a TTL duration (in milliseconds) into an `ephemeral_owner` tag.
    pub fn ttl_owner(ttl_millis: i64) -> SessionId {
        SessionId(TTL_MASK | (ttl_millis & MAX_TTL))
    }

    pub fn is_ephemeral(&self) -> bool {
        !matches!(self, EphemeralType::Void)
    }
}

#[cfg(test)]
pub mod test {

    use super::*;

    /// Test that the additional derives on enums behave as expected
    #[test]
    pub fn test_opcode_derives() {
        use super::proto::OpCode;
        use num_traits::cast::ToPrimitive;
        use strum::IntoEnumIterator;

        // Use CloseSession as its value is different from its position in the variants

        let x = OpCode::CloseSession;

        // ToPrimitive
        assert_eq!(x.to_i32(), Some(-11));

        // IntoStaticStr
        let x: &'static str = OpCode::Create.into();
        assert_eq!(x, "Create");

        // EnumIter
        let v = OpCode::iter().collect::<Vec<_>>();
        assert_eq!(&v[0..3], &[OpCode::Notification, OpCode::Create, OpCode::Delete]);

        let _v = OpCode::iter().map(|v| (v, 0)).collect::<Vec<_>>();
    }

    #[test]
    fn ephemeral_type_roundtrip() {
        assert_eq!(EphemeralType::from_owner(SessionId(0)), EphemeralType::Void);
        assert_eq!(
            EphemeralType::from_owner(SessionId(CONTAINER_EPHEMERAL_OWNER)),
            EphemeralType::Container
        );
        assert_eq!(EphemeralType::from_owner(SessionId(42)), EphemeralType::Normal(SessionId(42)));

        let owner = EphemeralType::ttl_owner(5000);
        assert_eq!(EphemeralType::from_owner(owner), EphemeralType::Ttl(5000));
    }
}
