use std::fmt;
use std::ops::Index;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use strand_syntax::Span;

use crate::{BinaryOp, NodeKind, UnaryOp};

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique identity of one parsed tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(pub u32);

impl TreeId {
    fn fresh() -> Self {
        TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable node identity: unique across every tree built in this process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub tree: TreeId,
    pub index: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.tree.0, self.index)
    }
}

/// Data the evaluator needs beyond kind and children.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Arc<str>),
    Name(Arc<str>),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub children: Box<[NodeId]>,
    pub span: Span,
    pub payload: Payload,
}

impl Node {
    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Name(n) => Some(n),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Tree {
    id: TreeId,
    nodes: Box<[Node]>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.tree != self.id {
            return None;
        }
        self.nodes.get(id.index as usize)
    }

    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().filter_map(move |c| self.get(*c))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(n) => n,
            None => panic!("node {id} does not belong to tree #{}", self.id.0),
        }
    }
}

/// Incremental tree construction.
///
/// `reserve` hands out an id before the node's children exist, so a node
/// can list one of its own ancestors as a child. The resulting graph is
/// not a tree any more; the runtime's cycle detector reports it.
pub struct TreeBuilder {
    id: TreeId,
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            id: TreeId::fresh(),
            nodes: Vec::new(),
        }
    }

    pub fn tree_id(&self) -> TreeId {
        self.id
    }

    pub fn add(
        &mut self,
        kind: NodeKind,
        payload: Payload,
        children: &[NodeId],
        span: Span,
    ) -> NodeId {
        let id = self.reserve(kind, span);
        self.finish(id, payload, children);
        id
    }

    pub fn leaf(&mut self, kind: NodeKind, payload: Payload) -> NodeId {
        let at = self.nodes.len() as u32;
        self.add(kind, payload, &[], Span::point(at))
    }

    pub fn reserve(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId {
            tree: self.id,
            index: self.nodes.len() as u32,
        };
        self.nodes.push(Node {
            id,
            kind,
            children: Box::new([]),
            span,
            payload: Payload::None,
        });
        id
    }

    pub fn finish(&mut self, id: NodeId, payload: Payload, children: &[NodeId]) {
        debug_assert!(children.iter().all(|c| c.tree == self.id));
        if let Some(node) = self.nodes.get_mut(id.index as usize) {
            node.payload = payload;
            node.children = children.into();
        }
    }

    pub fn build(self, root: Option<NodeId>) -> Tree {
        Tree {
            id: self.id,
            nodes: self.nodes.into_boxed_slice(),
            root,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
