use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::proto::Zxid;

pub mod snapshot;

#[derive(Deserialize, Serialize)]
pub struct FileHeader {
    pub magic: i32,   // Should be TXNLOG_MAGIC or SNAP_MAGIC
    pub version: i32, // Should be 2
    pub dbid: i64,
}

pub const TXNLOG_MAGIC: i32 = 0x5a4b4c47; // "ZKLG"
pub const SNAP_MAGIC: i32 = 0x5a4b534e; // ZKSN

pub const FILE_FORMAT_VERSION: i32 = 2;

/// Log and snapshot files are named `log.<hex zxid>` / `snapshot.<hex zxid>`, where the
/// zxid is the first (log) or last (snapshot) transaction the file covers.
pub fn zxid_from_path(path: impl AsRef<std::path::Path>) -> Option<Zxid> {
    let name = path.as_ref().file_name()?.to_str()?;
    let hex = name.rsplit('.').next()?;
    i64::from_str_radix(hex, 16).ok().map(Zxid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zxid_from_log_name() {
        assert_eq!(zxid_from_path("log.200000001"), Some(Zxid(0x200000001)));
        assert_eq!(zxid_from_path("/a/b/snapshot.1000005d0"), Some(Zxid(0x1000005d0)));
    }

    #[test]
    fn rejects_malformed_name() {
        assert_eq!(zxid_from_path("not-a-log-file"), None);
    }
}
