//! Algorithm registry and dispatch-key resolution.
//!
//! The registry maps a resolved string key to an algorithm object. Keys
//! concatenate the operation name, the keys of its required op arguments
//! (or a `_t<code>` element-type tag when there are none), a `_md`/`_mc`
//! mask suffix for mask-capable operations, and a device-class suffix.
//!
//! Resolution tries the accelerator key first (when a backend is active),
//! then the CPU key, then the per-type generic CPU key -- the last makes
//! user-defined ops dispatch without enumerated registration. A key
//! missing everywhere is `NotImplemented`.

use crate::expression::ExprNode;
use crate::library::Library;
use crate::status::Status;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Execution context of a single node dispatch.
pub struct DispatchContext<'a> {
    pub lib: &'a Library,
    pub node: &'a ExprNode,
    /// Index of the scheduler step the node runs in.
    pub step_id: usize,
    /// Node index inside the expression.
    pub task_id: usize,
    /// Device the node is pinned to (0 when unpinned).
    pub device_id: usize,
}

/// A registered per-operation algorithm.
pub trait Algo: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run the node; per-tile fan-out happens inside, on the library
    /// pool.
    fn execute(&self, ctx: &DispatchContext) -> Result<(), Status>;
}

/// Key → algorithm map behind a read-mostly lock.
#[derive(Default)]
pub struct AlgoRegistry {
    map: RwLock<HashMap<String, Arc<dyn Algo>>>,
}

impl AlgoRegistry {
    /// Register `algo` under `key`, replacing any previous entry.
    pub fn add(&self, key: &str, algo: Arc<dyn Algo>) {
        self.map.write().unwrap().insert(key.to_string(), algo);
    }

    /// True when `key` has a registration.
    pub fn has(&self, key: &str) -> bool {
        self.map.read().unwrap().contains_key(key)
    }

    /// Look up `key`.
    pub fn find(&self, key: &str) -> Option<Arc<dyn Algo>> {
        self.map.read().unwrap().get(key).cloned()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mask suffix of a node key.
fn mask_suffix(node: &ExprNode) -> &'static str {
    if !node.op.maskable() {
        return "";
    }
    if node.desc.is_set(crate::descriptor::Param::MaskComplement) {
        "_mc"
    } else {
        "_md"
    }
}

/// The node's dispatch key without a device suffix.
pub fn node_key(node: &ExprNode) -> String {
    let mut key = node.op.name().to_string();
    let op_keys = node.op.op_keys();
    if op_keys.is_empty() {
        key.push_str("_t");
        key.push(node.op.type_code());
    } else {
        for op_key in op_keys {
            key.push('_');
            key.push_str(op_key);
        }
    }
    key.push_str(mask_suffix(node));
    key
}

/// The per-type generic key (op keys replaced by the element-type tag).
pub fn generic_key(node: &ExprNode) -> String {
    let mut key = node.op.name().to_string();
    key.push_str("_t");
    key.push(node.op.type_code());
    key.push_str(mask_suffix(node));
    key
}

/// Resolve the algorithm for `node`, honouring the accelerator → CPU →
/// generic fallback order.
pub fn resolve(lib: &Library, node: &ExprNode) -> Result<Arc<dyn Algo>, Status> {
    let registry = lib.registry();
    let base = node_key(node);

    if let Some(acc) = lib.accelerator() {
        let key = format!("{base}{}", acc.suffix());
        if let Some(algo) = registry.find(&key) {
            return Ok(algo);
        }
    }

    let cpu = format!("{base}__cpu");
    if let Some(algo) = registry.find(&cpu) {
        return Ok(algo);
    }

    let generic = format!("{}__cpu", generic_key(node));
    if let Some(algo) = registry.find(&generic) {
        return Ok(algo);
    }

    crate::lib_log!(lib, Status::NotImplemented, "no algorithm for key {cpu}");
    Err(Status::NotImplemented)
}
