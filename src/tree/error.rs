use crate::proto::proto::ErrorCode;

/// Errors raised by tree mutation primitives (§4.4).
///
/// This is distinct from `failure::Error`, which the snapshot and transaction-log
/// codecs use for decode failures: the tree trusts the *shape* of what it's given
/// (the request processor validates versions, permissions, etc. before a transaction
/// ever reaches `DataTree`) and only raises these application-level failures.
#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum KeeperError {
    #[fail(display = "no node")]
    NoNode,
    #[fail(display = "node already exists")]
    NodeExists,
    #[fail(display = "runtime inconsistency")]
    RuntimeInconsistency,
    #[fail(display = "ephemeral create attempted on a local session")]
    EphemeralOnLocalSession,
}

impl KeeperError {
    pub fn code(&self) -> ErrorCode {
        match self {
            KeeperError::NoNode => ErrorCode::NoNode,
            KeeperError::NodeExists => ErrorCode::NodeExists,
            KeeperError::RuntimeInconsistency => ErrorCode::RuntimeInconsistency,
            KeeperError::EphemeralOnLocalSession => ErrorCode::EphemeralOnLocalSession,
        }
    }
}

pub type Result<T> = std::result::Result<T, KeeperError>;
