//! Cache keys for pure nodes.
//!
//! A key is the node's identity plus a digest of the bindings the node
//! reads. Bindings the node does not read never enter the digest, so an
//! unrelated assignment elsewhere in the scope chain keeps the entry valid.
//!
//! The key also carries the values it read. Equality compares them
//! exactly, so two binding states whose digests collide still produce
//! unequal keys and the cache reports the clash instead of a stale hit.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use strand_core::Value;
use strand_ir::{Node, NodeId, StableHasher};

use crate::context::EvalContext;
use crate::evaluator::Evaluator;

#[derive(Clone, Debug)]
pub struct Fingerprint {
    pub node: NodeId,
    pub bindings: u64,
    /// Value of each free variable in classification order; `None` if unbound.
    pub(crate) reads: Arc<[Option<Value>]>,
}

impl Fingerprint {
    /// 64-bit digest used as the cache slot key.
    pub fn digest(&self) -> u64 {
        let mut h = StableHasher::new();
        self.hash(&mut h);
        h.finish()
    }

    pub fn reads(&self) -> &[Option<Value>] {
        &self.reads
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
            && self.bindings == other.bindings
            && self.reads.len() == other.reads.len()
            && self.reads.iter().zip(other.reads.iter()).all(|pair| match pair {
                (Some(a), Some(b)) => a.is_identical(b),
                (None, None) => true,
                _ => false,
            })
    }
}

impl Eq for Fingerprint {}

impl Hash for Fingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
        self.bindings.hash(state);
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:016x}", self.node, self.bindings)
    }
}

/// Returns `None` unless the evaluator vouches for the node being pure and
/// names its free variables.
pub fn fingerprint<E: Evaluator + ?Sized>(
    evaluator: &E,
    node: &Node,
    ctx: &EvalContext,
) -> Option<Fingerprint> {
    let class = evaluator.classify(node);
    if !class.cacheable {
        return None;
    }
    let vars = class.free_variables?;
    let mut h = StableHasher::new();
    let mut reads = Vec::with_capacity(vars.len());
    for name in vars.iter() {
        name.hash(&mut h);
        let value = ctx.lookup(name);
        match &value {
            Some(v) => {
                1u8.hash(&mut h);
                v.hash(&mut h);
            }
            None => 0u8.hash(&mut h),
        }
        reads.push(value);
    }
    Some(Fingerprint {
        node: node.id,
        bindings: h.finish(),
        reads: reads.into(),
    })
}
