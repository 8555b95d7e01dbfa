//! Knobs that an embedding server plumbs into the [`crate::tree::DataTree`] and
//! [`crate::tree::TransactionProcessor`], following this crate's existing preference
//! for small `serde`-derived structs over ad hoc constructor arguments.

use serde_derive::{Deserialize, Serialize};

/// Tree-level configuration.
///
/// `digest_enabled` is carried for parity with the server this crate's data model is
/// drawn from, but this crate does not compute or verify digests: the distilled
/// behavior it implements never calls for one, so the flag is inert here. An embedder
/// that needs digests should treat this as a contract for a future extension, not a
/// currently wired feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Whether an ephemeral create arriving from a local (non-replicated) session may
    /// be transparently upgraded to a global session instead of being rejected.
    pub local_session_upgrading_enabled: bool,

    /// Inert placeholder for the digest/checksum subsystem; see the struct doc.
    pub digest_enabled: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            local_session_upgrading_enabled: false,
            digest_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let cfg = TreeConfig::default();
        assert!(!cfg.local_session_upgrading_enabled);
        assert!(!cfg.digest_enabled);
    }
}
