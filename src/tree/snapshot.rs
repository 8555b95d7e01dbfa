//! C7 (§4.6): streams a [`DataTree`] out to, and rebuilds one from, a generic byte
//! stream — the in-memory counterpart of the on-disk framing that
//! [`crate::proto::persistence::snapshot`] knows how to parse from a real snapshot
//! file.
//!
//! Session records are always written as an empty section and skipped-but-tolerated
//! on read: session tracking is a collaborator concern this crate doesn't model
//! (§1), not a format this crate's output ever needs to round-trip on its own.

use std::collections::HashMap;
use std::io::{Read, Write};

use failure::Error;
use serde::{Deserialize, Serialize};

use crate::config::TreeConfig;
use crate::proto::persistence::snapshot::{ACLCacheEntry, ACLRef, DataNode, Session};
use crate::proto::persistence::{FileHeader, FILE_FORMAT_VERSION, SNAP_MAGIC};
use crate::proto::{EphemeralType, Zxid};
use crate::serde::{de, ser};

use super::data_tree::{node_key, split_path};
use super::node::NodeRecord;
use super::DataTree;

pub fn write<W: Write>(tree: &DataTree, writer: W) -> Result<(), Error> {
    let mut ser = ser::to_writer(writer);

    FileHeader {
        magic: SNAP_MAGIC,
        version: FILE_FORMAT_VERSION,
        dbid: 0,
    }
    .serialize(&mut ser)?;

    // No sessions: out of scope for this crate's tree (§1).
    0i32.serialize(&mut ser)?;

    let entries = tree.acl_cache.entries();
    (entries.len() as i32).serialize(&mut ser)?;
    for (handle, acl) in entries {
        ACLCacheEntry {
            entry_id: ACLRef(handle),
            acl,
        }
        .serialize(&mut ser)?;
    }

    let nodes = tree.nodes.read().unwrap();
    write_subtree(&mut ser, &nodes, "")?;

    // End-of-stream marker (§4.6); root itself was just emitted under path "".
    "/".to_owned().serialize(&mut ser)?;

    Ok(())
}

fn write_subtree<W: Write>(
    ser: &mut crate::serde::ser::Serializer<W>,
    nodes: &HashMap<String, NodeRecord>,
    path: &str,
) -> Result<(), Error> {
    let node = nodes
        .get(node_key(path))
        .unwrap_or_else(|| panic!("tree-consistency invariant P1 violated at {:?}", path));

    path.to_owned().serialize(&mut *ser)?;
    DataNode {
        data: node.data.clone(),
        acl: ACLRef(node.acl_handle),
        stat: node.stat.clone(),
    }
    .serialize(&mut *ser)?;

    let mut children: Vec<&String> = node.children.iter().collect();
    children.sort();
    for child in children {
        let child_path = format!("{}/{}", path, child);
        write_subtree(ser, nodes, &child_path)?;
    }

    Ok(())
}

/// Rebuild a tree from `reader` (§4.6). A missing parent or an ACL handle absent
/// from the table is fatal and aborts the restore (§7).
pub fn read<R: Read>(reader: R, config: TreeConfig) -> Result<DataTree, Error> {
    let mut de = de::from_reader(reader);

    let header = FileHeader::deserialize(&mut de)?;
    if header.magic != SNAP_MAGIC {
        return Err(failure::err_msg("wrong snapshot magic number"));
    }
    if header.version != FILE_FORMAT_VERSION {
        return Err(failure::err_msg("wrong snapshot version"));
    }

    let session_count = i32::deserialize(&mut de)?;
    for _ in 0..session_count {
        Session::deserialize(&mut de)?;
    }

    let tree = DataTree::empty(config);

    let acl_count = i32::deserialize(&mut de)?;
    for _ in 0..acl_count {
        let entry = ACLCacheEntry::deserialize(&mut de)?;
        tree.acl_cache.load_entry(entry.entry_id.0, entry.acl);
    }

    loop {
        let path = String::deserialize(&mut de)?;
        if path == "/" {
            break;
        }

        let record = DataNode::deserialize(&mut de)?;
        let handle = record.acl.0;

        if !tree.acl_cache.contains(handle) {
            return Err(failure::format_err!(
                "snapshot node {:?} references unknown ACL handle {}",
                path,
                handle
            ));
        }
        tree.acl_cache.add_usage(handle);

        let key = node_key(&path).to_owned();
        let ephemeral_owner = record.stat.ephemeral_owner;

        {
            let mut nodes = tree.nodes.write().unwrap();
            nodes.insert(
                key.clone(),
                NodeRecord::new(record.data, handle, record.stat),
            );

            if key != "/" {
                let (parent_name, child_name) = split_path(&path);
                let parent_key = node_key(parent_name).to_owned();
                match nodes.get_mut(&parent_key) {
                    Some(parent) => {
                        parent.children.insert(child_name.to_owned());
                    }
                    None => {
                        return Err(failure::format_err!(
                            "snapshot node {:?} has no parent {:?} in the stream so far",
                            path,
                            parent_key
                        ));
                    }
                }
            }
        }

        match EphemeralType::from_owner(ephemeral_owner) {
            EphemeralType::Container => {
                tree.containers.write().unwrap().insert(key);
            }
            EphemeralType::Ttl(_) => {
                tree.ttls.write().unwrap().insert(key);
            }
            EphemeralType::Normal(session) => {
                tree.ephemerals.write().unwrap().entry(session).or_default().insert(key);
            }
            EphemeralType::Void => {}
        }
    }

    tree.setup_quota();
    tree.acl_cache.purge_unused();

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Id, SessionId, Timestamp, Version, ACL, PERM_ALL};

    fn acl() -> Vec<ACL> {
        vec![ACL {
            perms: PERM_ALL,
            id: Id {
                scheme: "world".to_owned(),
                id: "anyone".to_owned(),
            },
        }]
    }

    // P5 — round trip.
    #[test]
    fn round_trips_a_small_tree() {
        let tree = DataTree::new(TreeConfig::default());
        tree.create_node("/a", b"hello".to_vec(), &acl(), SessionId(0), Version(-1), Zxid(1), Timestamp(1))
            .unwrap();
        tree.create_node("/a/b", b"world".to_vec(), &acl(), SessionId(0), Version(-1), Zxid(2), Timestamp(2))
            .unwrap();
        tree.set_last_processed_zxid(Zxid(2));

        let mut buf = Vec::new();
        write(&tree, &mut buf).unwrap();

        let restored = read(&buf[..], TreeConfig::default()).unwrap();

        let (data, stat) = restored.get_data("/a", None).unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(stat.czxid, Zxid(1));

        let (data, _) = restored.get_data("/a/b", None).unwrap();
        assert_eq!(data, b"world");

        let (children, _) = restored.get_children("/a", None).unwrap();
        assert_eq!(children, vec!["b".to_owned()]);

        let (root_children, _) = restored.get_children("/", None).unwrap();
        assert!(root_children.contains(&"a".to_owned()));
        assert!(root_children.contains(&"zookeeper".to_owned()));
    }

    #[test]
    fn rejects_a_snapshot_with_an_unknown_acl_handle() {
        use crate::proto::StatPersisted;

        // Hand-build a stream whose ACL table is empty but whose single node
        // references a handle: the read path must reject it instead of silently
        // minting a fresh cache entry (§7).
        let mut buf = Vec::new();
        {
            let mut ser = crate::serde::ser::to_writer(&mut buf);
            FileHeader {
                magic: SNAP_MAGIC,
                version: FILE_FORMAT_VERSION,
                dbid: 0,
            }
            .serialize(&mut ser)
            .unwrap();
            0i32.serialize(&mut ser).unwrap(); // sessions
            0i32.serialize(&mut ser).unwrap(); // zero acl entries
            "".to_owned().serialize(&mut ser).unwrap();
            DataNode {
                data: Vec::new(),
                acl: ACLRef(999),
                stat: StatPersisted {
                    czxid: Zxid(0),
                    mzxid: Zxid(0),
                    ctime: Timestamp(0),
                    mtime: Timestamp(0),
                    version: Version(0),
                    cversion: Version(0),
                    aversion: Version(0),
                    ephemeral_owner: SessionId(0),
                    pzxid: Zxid(0),
                },
            }
            .serialize(&mut ser)
            .unwrap();
        }

        let err = read(&buf[..], TreeConfig::default()).unwrap_err();
        assert!(err.to_string().contains("unknown ACL handle"));
    }
}
