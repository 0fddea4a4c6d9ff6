use std::sync::{Mutex, MutexGuard, PoisonError};

use ahash::RandomState;
use hashbrown::HashSet;
use smallvec::SmallVec;
use strand_ir::NodeId;
use tracing::debug;

use crate::errors::EvalError;

/// One entry of the active evaluation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallFrame {
    pub node: NodeId,
    pub depth: usize,
}

#[derive(Debug, Default)]
struct ActivePath {
    frames: SmallVec<[CallFrame; 32]>,
    members: HashSet<NodeId, RandomState>,
}

/// Tracks which nodes are mid-evaluation on the current path and rejects
/// re-entry into any of them.
#[derive(Debug, Default)]
pub struct CycleDetector {
    active: Mutex<ActivePath>,
}

impl CycleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means a visit panicked; the guards it held have
    // already unwound out of the path.
    fn path(&self) -> MutexGuard<'_, ActivePath> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        self.path().members.contains(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.path().frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.path().frames.len()
    }

    /// Snapshot of the active path, outermost first.
    pub fn frames(&self) -> Vec<CallFrame> {
        self.path().frames.to_vec()
    }

    pub fn enter(&self, node: NodeId, depth: usize) -> Result<CycleGuard<'_>, EvalError> {
        let mut path = self.path();
        if !path.members.insert(node) {
            let start = path
                .frames
                .iter()
                .position(|f| f.node == node)
                .unwrap_or(0);
            let mut cycle: Vec<NodeId> = path.frames[start..].iter().map(|f| f.node).collect();
            cycle.push(node);
            debug!(%node, length = cycle.len() - 1, "circular reference detected");
            return Err(EvalError::CircularReferenceDetected { path: cycle });
        }
        path.frames.push(CallFrame { node, depth });
        Ok(CycleGuard {
            detector: self,
            node,
        })
    }

    fn leave(&self, node: NodeId) {
        let mut path = self.path();
        path.members.remove(&node);
        // Guards drop in reverse order, so `node` is normally on top.
        if let Some(pos) = path.frames.iter().rposition(|f| f.node == node) {
            path.frames.remove(pos);
        }
    }
}

/// Membership of one node in the active path; removed on drop.
#[must_use = "dropping the guard immediately leaves the active path"]
#[derive(Debug)]
pub struct CycleGuard<'a> {
    detector: &'a CycleDetector,
    node: NodeId,
}

impl CycleGuard<'_> {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.detector.leave(self.node);
    }
}
