//! C6 (§4.5): interprets a `(TxnHeader, TxnBody)` pair, calling into [`DataTree`] for
//! each sub-operation, and reports a [`ProcessTxnResult`] per the wire shape described
//! in §6.

use std::sync::Arc;

use num_traits::cast::ToPrimitive;

use crate::proto::proto::{ErrorCode, OpCode};
use crate::proto::txn::{
    CheckVersionTxn, CreateContainerTxn, CreateTTLTxn, CreateTxn, DeleteTxn, MultiTxn, MultiTxnOperation, SetACLTxn,
    SetDataTxn, TxnHeader, TxnOperation,
};
use crate::proto::{EphemeralType, SessionId, Stat, Version, Xid, Zxid, CONTAINER_EPHEMERAL_OWNER};

use super::data_tree::{split_path, CONFIG_NODE_PATH};
use super::error::{KeeperError, Result};
use super::DataTree;

/// Per-transaction outcome (§6). `equals`/`hash` are defined solely on
/// `(client_id, cxid)`, matching the upstream contract that uses this as a
/// completion-tracking key regardless of what the transaction actually did.
#[derive(Debug, Clone)]
pub struct ProcessTxnResult {
    pub client_id: SessionId,
    pub cxid: Xid,
    pub zxid: Zxid,
    pub err: i32,
    pub op_code: OpCode,
    pub path: String,
    pub stat: Option<Stat>,
    pub multi_result: Option<Vec<ProcessTxnResult>>,
}

impl PartialEq for ProcessTxnResult {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id && self.cxid == other.cxid
    }
}
impl Eq for ProcessTxnResult {}

impl std::hash::Hash for ProcessTxnResult {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.client_id.hash(state);
        self.cxid.hash(state);
    }
}

impl ProcessTxnResult {
    pub fn is_ok(&self) -> bool {
        self.err == ok_code()
    }
}

/// External collaborator contract (§6): whether `client_id` names a session that is
/// only locally known to the server it's connected to, as opposed to one replicated
/// through the ensemble. The tree has no session concept of its own; an embedder
/// that tracks sessions plugs this in so that an ephemeral create arriving from an
/// unupgraded local session is rejected rather than silently accepted.
pub trait SessionUpgradeHook: Send + Sync {
    fn is_local_session(&self, client_id: SessionId) -> bool;
}

fn ok_code() -> i32 {
    ErrorCode::Ok.to_i32().unwrap()
}

fn code_of(err: KeeperError) -> i32 {
    err.code().to_i32().unwrap()
}

fn code_of_error_code(code: &ErrorCode) -> i32 {
    code.to_i32().unwrap()
}

/// C6 (§2): drives [`DataTree`] mutations from an ordered stream of transactions.
/// Callers are expected to invoke [`process_txn`](Self::process_txn) from a single
/// thread, in zxid order (§5) — this type does no scheduling of its own.
pub struct TransactionProcessor {
    tree: Arc<DataTree>,
    session_upgrade_hook: Option<Arc<dyn SessionUpgradeHook>>,
}

impl TransactionProcessor {
    pub fn new(tree: Arc<DataTree>) -> TransactionProcessor {
        TransactionProcessor {
            tree,
            session_upgrade_hook: None,
        }
    }

    pub fn with_session_upgrade_hook(tree: Arc<DataTree>, hook: Arc<dyn SessionUpgradeHook>) -> TransactionProcessor {
        TransactionProcessor {
            tree,
            session_upgrade_hook: Some(hook),
        }
    }

    pub fn tree(&self) -> &DataTree {
        &self.tree
    }

    /// §4.5: dispatch `op`, then publish `header.zxid` as `lastProcessedZxid` only
    /// after the tree mutation (if any) is fully visible.
    pub fn process_txn(&self, header: &TxnHeader, op: &TxnOperation) -> ProcessTxnResult {
        let result = self.dispatch_top(header, op);
        self.tree.set_last_processed_zxid(header.zxid);
        result
    }

    fn mk(
        &self,
        header: &TxnHeader,
        op_code: OpCode,
        err: i32,
        path: &str,
        stat: Option<Stat>,
        multi_result: Option<Vec<ProcessTxnResult>>,
    ) -> ProcessTxnResult {
        ProcessTxnResult {
            client_id: header.client_id,
            cxid: header.cxid,
            zxid: header.zxid,
            err,
            op_code,
            path: path.to_owned(),
            stat,
            multi_result,
        }
    }

    fn check_upgrade(&self, client_id: SessionId) -> Result<()> {
        if let Some(hook) = &self.session_upgrade_hook {
            if hook.is_local_session(client_id) && !self.tree.config().local_session_upgrading_enabled {
                return Err(KeeperError::EphemeralOnLocalSession);
            }
        }
        Ok(())
    }

    fn dispatch_top(&self, header: &TxnHeader, op: &TxnOperation) -> ProcessTxnResult {
        match op {
            TxnOperation::CreateSession(_) => self.mk(header, OpCode::CreateSession, ok_code(), "", None, None),
            TxnOperation::CloseSession => {
                self.tree.kill_session(header.client_id, header.zxid);
                self.mk(header, OpCode::CloseSession, ok_code(), "", None, None)
            }
            TxnOperation::Create(t) => self.dispatch_create(header, OpCode::Create, t),
            TxnOperation::Create2(t) => self.dispatch_create(header, OpCode::Create2, t),
            TxnOperation::CreateTTL(t) => self.dispatch_create_ttl(header, t),
            TxnOperation::CreateContainer(t) => self.dispatch_create_container(header, t),
            TxnOperation::Delete(t) => self.dispatch_delete(header, OpCode::Delete, t),
            TxnOperation::DeleteContainer(t) => self.dispatch_delete(header, OpCode::DeleteContainer, t),
            TxnOperation::Reconfig(t) => self.dispatch_set_data(header, OpCode::Reconfig, t, Some(CONFIG_NODE_PATH)),
            TxnOperation::SetData(t) => self.dispatch_set_data(header, OpCode::SetData, t, None),
            TxnOperation::SetACL(t) => self.dispatch_set_acl(header, t),
            TxnOperation::Error(t) => self.mk(header, OpCode::Error, code_of_error_code(&t.err), "", None, None),
            TxnOperation::Multi(t) => self.dispatch_multi(header, t),
        }
    }

    fn apply_create(
        &self,
        header: &TxnHeader,
        path: &str,
        data: Vec<u8>,
        acl: &[crate::proto::ACL],
        ephemeral_owner: SessionId,
        parent_c_version: Version,
    ) -> (i32, Option<Stat>) {
        match self.tree.create_node(path, data, acl, ephemeral_owner, parent_c_version, header.zxid, header.time) {
            Ok(stat) => (ok_code(), Some(stat)),
            Err(KeeperError::NodeExists) => {
                // §4.5 restore-time repair: a lazily-captured snapshot can already
                // contain this child, so the replayed create only needs to advance
                // the parent's bookkeeping, not insert anything.
                let (parent, _) = split_path(path);
                self.tree.set_cversion_pzxid(parent, parent_c_version, header.zxid);
                (code_of(KeeperError::NodeExists), None)
            }
            Err(e) => (code_of(e), None),
        }
    }

    fn dispatch_create(&self, header: &TxnHeader, op_code: OpCode, txn: &CreateTxn) -> ProcessTxnResult {
        let ephemeral_owner = if txn.ephemeral { header.client_id } else { SessionId(0) };

        if txn.ephemeral {
            if let Err(e) = self.check_upgrade(header.client_id) {
                return self.mk(header, op_code, code_of(e), &txn.path, None, None);
            }
        }

        let (err, stat) = self.apply_create(header, &txn.path, txn.data.clone(), &txn.acl, ephemeral_owner, txn.parent_c_version);
        self.mk(header, op_code, err, &txn.path, stat, None)
    }

    fn dispatch_create_container(&self, header: &TxnHeader, txn: &CreateContainerTxn) -> ProcessTxnResult {
        let (err, stat) = self.apply_create(
            header,
            &txn.path,
            txn.data.clone(),
            &txn.acl,
            SessionId(CONTAINER_EPHEMERAL_OWNER),
            txn.parent_c_version,
        );
        self.mk(header, OpCode::CreateContainer, err, &txn.path, stat, None)
    }

    fn dispatch_create_ttl(&self, header: &TxnHeader, txn: &CreateTTLTxn) -> ProcessTxnResult {
        let owner = EphemeralType::ttl_owner(txn.ttl);
        let (err, stat) = self.apply_create(header, &txn.path, txn.data.clone(), &txn.acl, owner, txn.parent_c_version);
        self.mk(header, OpCode::CreateTTL, err, &txn.path, stat, None)
    }

    fn dispatch_delete(&self, header: &TxnHeader, op_code: OpCode, txn: &DeleteTxn) -> ProcessTxnResult {
        let err = match self.tree.delete_node(&txn.path, header.zxid) {
            Ok(()) => ok_code(),
            Err(e) => code_of(e),
        };
        self.mk(header, op_code, err, &txn.path, None, None)
    }

    fn dispatch_set_data(
        &self,
        header: &TxnHeader,
        op_code: OpCode,
        txn: &SetDataTxn,
        path_override: Option<&str>,
    ) -> ProcessTxnResult {
        let path = path_override.unwrap_or(&txn.path);
        match self.tree.set_data(path, txn.data.clone(), txn.version, header.zxid, header.time) {
            Ok(stat) => self.mk(header, op_code, ok_code(), path, Some(stat), None),
            Err(e) => self.mk(header, op_code, code_of(e), path, None, None),
        }
    }

    fn dispatch_set_acl(&self, header: &TxnHeader, txn: &SetACLTxn) -> ProcessTxnResult {
        match self.tree.set_acl(&txn.path, &txn.acl, txn.version) {
            Ok(stat) => self.mk(header, OpCode::SetACL, ok_code(), &txn.path, Some(stat), None),
            Err(e) => self.mk(header, OpCode::SetACL, code_of(e), &txn.path, None, None),
        }
    }

    fn dispatch_check(&self, header: &TxnHeader, txn: &CheckVersionTxn) -> ProcessTxnResult {
        self.mk(header, OpCode::Check, ok_code(), &txn.path, None, None)
    }

    /// §4.5 multi semantics: a pre-scan decides whether any sub-record carries an
    /// `error` marker. If so the whole multi fails: every other sub-record is
    /// rewritten to an error result (`OK` before the marker, `RUNTIME_INCONSISTENCY`
    /// after) and none of them touch the tree. Otherwise every sub-record is applied
    /// for real and `rc.err` is the first non-OK sub-result.
    fn dispatch_multi(&self, header: &TxnHeader, multi: &MultiTxn) -> ProcessTxnResult {
        let has_error_marker = multi.txns.iter().any(|op| matches!(op, MultiTxnOperation::Error(_)));

        let results: Vec<ProcessTxnResult> = if has_error_marker {
            let mut seen_marker = false;
            multi
                .txns
                .iter()
                .map(|op| match op {
                    MultiTxnOperation::Error(e) => {
                        seen_marker = true;
                        self.mk(header, OpCode::Error, code_of_error_code(&e.err), "", None, None)
                    }
                    other => {
                        let path = multi_op_path(other);
                        let err = if seen_marker {
                            code_of(KeeperError::RuntimeInconsistency)
                        } else {
                            ok_code()
                        };
                        self.mk(header, OpCode::Error, err, path, None, None)
                    }
                })
                .collect()
        } else {
            multi.txns.iter().map(|op| self.apply_multi_op(header, op)).collect()
        };

        let top_err = results.iter().map(|r| r.err).find(|&e| e != ok_code()).unwrap_or_else(ok_code);

        self.mk(header, OpCode::Multi, top_err, "", None, Some(results))
    }

    fn apply_multi_op(&self, header: &TxnHeader, op: &MultiTxnOperation) -> ProcessTxnResult {
        match op {
            MultiTxnOperation::Create(t) => self.dispatch_create(header, OpCode::Create, t),
            MultiTxnOperation::Create2(t) => self.dispatch_create(header, OpCode::Create2, t),
            MultiTxnOperation::CreateTTL(t) => self.dispatch_create_ttl(header, t),
            MultiTxnOperation::CreateContainer(t) => self.dispatch_create_container(header, t),
            MultiTxnOperation::Delete(t) => self.dispatch_delete(header, OpCode::Delete, t),
            MultiTxnOperation::DeleteContainer(t) => self.dispatch_delete(header, OpCode::DeleteContainer, t),
            MultiTxnOperation::SetData(t) => self.dispatch_set_data(header, OpCode::SetData, t, None),
            MultiTxnOperation::Check(t) => self.dispatch_check(header, t),
            MultiTxnOperation::Error(e) => self.mk(header, OpCode::Error, code_of_error_code(&e.err), "", None, None),
        }
    }
}

fn multi_op_path(op: &MultiTxnOperation) -> &str {
    match op {
        MultiTxnOperation::Create(t) | MultiTxnOperation::Create2(t) => &t.path,
        MultiTxnOperation::CreateTTL(t) => &t.path,
        MultiTxnOperation::CreateContainer(t) => &t.path,
        MultiTxnOperation::Delete(t) | MultiTxnOperation::DeleteContainer(t) => &t.path,
        MultiTxnOperation::SetData(t) => &t.path,
        MultiTxnOperation::Check(t) => &t.path,
        MultiTxnOperation::Error(_) => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::proto::{Id, Timestamp, ACL, PERM_ALL};
    use super::super::node::NodeRecord;

    fn acl() -> Vec<ACL> {
        vec![ACL {
            perms: PERM_ALL,
            id: Id {
                scheme: "world".to_owned(),
                id: "anyone".to_owned(),
            },
        }]
    }

    fn header(client_id: i64, cxid: i32, zxid: i64, time: u64) -> TxnHeader {
        TxnHeader {
            client_id: SessionId(client_id),
            cxid: Xid(cxid),
            zxid: Zxid(zxid),
            time: Timestamp(time),
        }
    }

    fn create_txn(path: &str, ephemeral: bool) -> CreateTxn {
        CreateTxn {
            path: path.to_owned(),
            data: Vec::new(),
            acl: acl(),
            ephemeral,
            parent_c_version: Version(-1),
        }
    }

    // S1 — create/delete via the processor.
    #[test]
    fn creates_and_deletes_through_process_txn() {
        let tree = Arc::new(DataTree::new(TreeConfig::default()));
        let processor = TransactionProcessor::new(tree.clone());

        let r = processor.process_txn(&header(1, 1, 1, 1), &TxnOperation::Create(create_txn("/a", false)));
        assert!(r.is_ok());
        assert_eq!(tree.last_processed_zxid(), Zxid(1));

        let r = processor.process_txn(&header(1, 2, 2, 2), &TxnOperation::Delete(DeleteTxn { path: "/a".to_owned() }));
        assert!(r.is_ok());
        assert!(matches!(tree.get_data("/a", None), Err(KeeperError::NoNode)));
        assert_eq!(tree.last_processed_zxid(), Zxid(2));
    }

    // S2 — session kill via closeSession.
    #[test]
    fn close_session_kills_ephemerals() {
        let tree = Arc::new(DataTree::new(TreeConfig::default()));
        let processor = TransactionProcessor::new(tree.clone());

        processor.process_txn(&header(0xA, 1, 1, 1), &TxnOperation::Create(create_txn("/e", true)));
        assert_eq!(tree.get_ephemerals_for_session(SessionId(0xA)), vec!["/e".to_owned()]);

        processor.process_txn(&header(0xA, 2, 2, 2), &TxnOperation::CloseSession);
        assert!(tree.get_ephemerals_for_session(SessionId(0xA)).is_empty());
        assert!(matches!(tree.get_data("/e", None), Err(KeeperError::NoNode)));
    }

    // S3 — multi with a mid-stream error marker.
    #[test]
    fn multi_with_error_marker_rewrites_every_other_subresult() {
        let tree = Arc::new(DataTree::new(TreeConfig::default()));
        let processor = TransactionProcessor::new(tree.clone());

        let body = MultiTxn {
            txns: vec![
                MultiTxnOperation::Create(create_txn("/x", false)),
                MultiTxnOperation::Error(crate::proto::txn::ErrorTxn { err: ErrorCode::NoNode }),
                MultiTxnOperation::Create(create_txn("/y", false)),
            ],
        };

        let r = processor.process_txn(&header(1, 1, 1, 1), &TxnOperation::Multi(body));
        assert_eq!(r.err, code_of_error_code(&ErrorCode::NoNode));

        let results = r.multi_result.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].err, ok_code());
        assert_eq!(results[1].err, code_of_error_code(&ErrorCode::NoNode));
        assert_eq!(results[2].err, code_of(KeeperError::RuntimeInconsistency));

        // Tree unchanged: neither create actually ran.
        assert!(matches!(tree.get_data("/x", None), Err(KeeperError::NoNode)));
        assert!(matches!(tree.get_data("/y", None), Err(KeeperError::NoNode)));
    }

    #[test]
    fn multi_without_error_marker_applies_every_suboperation() {
        let tree = Arc::new(DataTree::new(TreeConfig::default()));
        let processor = TransactionProcessor::new(tree.clone());

        let body = MultiTxn {
            txns: vec![
                MultiTxnOperation::Create(create_txn("/x", false)),
                MultiTxnOperation::Create(create_txn("/y", false)),
            ],
        };

        let r = processor.process_txn(&header(1, 1, 1, 1), &TxnOperation::Multi(body));
        assert!(r.is_ok());
        assert!(tree.node_exists("/x"));
        assert!(tree.node_exists("/y"));
    }

    // S4 — restore-time NODE_EXISTS repair.
    #[test]
    fn restore_repair_advances_cversion_on_node_exists() {
        let tree = Arc::new(DataTree::new(TreeConfig::default()));
        let processor = TransactionProcessor::new(tree.clone());

        processor.process_txn(&header(1, 1, 1, 1), &TxnOperation::Create(create_txn("/p", false)));
        tree.set_cversion_pzxid("/p", Version(5), Zxid(50));

        // Simulate a lazily-captured snapshot that already contains /p/c as a child
        // of /p, without /p's own cversion/pzxid reflecting that yet.
        let acl_handle = tree.acl_cache.convert_acls(&acl());
        {
            let mut nodes = tree.nodes.write().unwrap();
            nodes.get_mut("/p").unwrap().children.insert("c".to_owned());
            nodes.insert(
                "/p/c".to_owned(),
                NodeRecord::new(
                    Vec::new(),
                    acl_handle,
                    crate::proto::StatPersisted {
                        czxid: Zxid(51),
                        mzxid: Zxid(51),
                        ctime: Timestamp(51),
                        mtime: Timestamp(51),
                        version: Version(0),
                        cversion: Version(0),
                        aversion: Version(0),
                        ephemeral_owner: SessionId(0),
                        pzxid: Zxid(51),
                    },
                ),
            );
        }

        let r = processor.process_txn(
            &header(1, 2, 51, 51),
            &TxnOperation::Create(CreateTxn {
                path: "/p/c".to_owned(),
                data: Vec::new(),
                acl: acl(),
                ephemeral: false,
                parent_c_version: Version(6),
            }),
        );

        assert_eq!(r.err, code_of(KeeperError::NodeExists));
        let (_, stat) = tree.get_data("/p", None).unwrap();
        assert_eq!(stat.cversion, Version(6));
        assert_eq!(stat.pzxid, Zxid(51));
    }

    struct AlwaysLocal;
    impl SessionUpgradeHook for AlwaysLocal {
        fn is_local_session(&self, _client_id: SessionId) -> bool {
            true
        }
    }

    #[test]
    fn ephemeral_create_from_local_session_is_rejected_when_upgrading_disabled() {
        let tree = Arc::new(DataTree::new(TreeConfig::default()));
        let processor = TransactionProcessor::with_session_upgrade_hook(tree.clone(), Arc::new(AlwaysLocal));

        let r = processor.process_txn(&header(1, 1, 1, 1), &TxnOperation::Create(create_txn("/e", true)));
        assert_eq!(r.err, code_of(KeeperError::EphemeralOnLocalSession));
        assert!(!tree.node_exists("/e"));
    }

    #[test]
    fn ephemeral_create_from_local_session_succeeds_when_upgrading_enabled() {
        let mut config = TreeConfig::default();
        config.local_session_upgrading_enabled = true;
        let tree = Arc::new(DataTree::new(config));
        let processor = TransactionProcessor::with_session_upgrade_hook(tree.clone(), Arc::new(AlwaysLocal));

        let r = processor.process_txn(&header(1, 1, 1, 1), &TxnOperation::Create(create_txn("/e", true)));
        assert!(r.is_ok());
        assert!(tree.node_exists("/e"));
    }

    #[test]
    fn process_txn_result_equality_ignores_everything_but_client_and_cxid() {
        let tree = Arc::new(DataTree::new(TreeConfig::default()));
        let processor = TransactionProcessor::new(tree);

        let a = processor.process_txn(&header(1, 1, 1, 1), &TxnOperation::Create(create_txn("/a", false)));
        let b = processor.process_txn(&header(1, 1, 99, 99), &TxnOperation::Create(create_txn("/zzz", false)));
        assert_eq!(a, b);
    }
}
