//! Sampled call-tree nodes.
//!
//! A profile's nodes arrive as a flat list with parent references. They are
//! stored in an arena ([`ProfileNodes`]) and addressed by [`NodeId`]; parent
//! and child links are arena indices.

use crate::event::RawProfileNode;
use crate::{Result, TraceError};
use std::collections::HashMap;

/// Index of a node inside its [`ProfileNodes`] arena.
pub type NodeId = usize;

/// Classification of a node, resolved once when the tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A real function frame.
    Normal,
    /// The synthetic `(root)` node.
    Root,
    /// Top-level `(idle)` node.
    Idle,
    /// Top-level `(program)` node: profiler bookkeeping outside user code.
    Program,
    /// Top-level `(garbage collector)` node.
    GarbageCollector,
}

impl NodeKind {
    pub fn is_meta(self) -> bool {
        self != NodeKind::Normal
    }
}

/// One call site in the sampled call tree.
#[derive(Debug, Clone)]
pub struct ProfileNode {
    /// ID assigned by the profiler.
    pub raw_id: u64,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Distance from the tree root (root is 0).
    pub depth: usize,
    pub kind: NodeKind,
    pub function_name: String,
    pub url: String,
    pub script_id: String,
    /// 1-based line, 0 when unknown.
    pub line_number: i64,
    /// 1-based column, 0 when unknown.
    pub column_number: i64,
}

impl ProfileNode {
    fn from_raw(raw: &RawProfileNode) -> Self {
        let frame = &raw.call_frame;
        let function_name = if frame.function_name.is_empty() {
            "(anonymous)".to_string()
        } else {
            frame.function_name.clone()
        };

        ProfileNode {
            raw_id: raw.id,
            parent: None,
            children: Vec::new(),
            depth: 0,
            kind: NodeKind::Normal,
            function_name,
            url: frame.url.clone(),
            script_id: frame.script_id.clone(),
            // Convert 0-based to 1-based; unknown (-1) becomes 0
            line_number: frame.line_number + 1,
            column_number: frame.column_number + 1,
        }
    }

    /// Identity used for attribution: `name@url:line:column`.
    pub fn signature(&self) -> String {
        format!(
            "{}@{}:{}:{}",
            self.function_name, self.url, self.line_number, self.column_number
        )
    }

    /// Whether the node maps to a concrete source position.
    pub fn is_in_text(&self) -> bool {
        self.line_number > 0 && self.column_number > 0
    }

    pub fn is_meta(&self) -> bool {
        self.kind.is_meta()
    }

    /// Same function at the same source position, regardless of call path.
    pub fn is_same_function(&self, other: &ProfileNode) -> bool {
        self.function_name == other.function_name
            && self.url == other.url
            && self.script_id == other.script_id
            && self.line_number == other.line_number
            && self.column_number == other.column_number
    }
}

/// Arena of the nodes of one profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileNodes {
    nodes: Vec<ProfileNode>,
    by_raw_id: HashMap<u64, NodeId>,
    pub root: Option<NodeId>,
    pub idle: Option<NodeId>,
    pub program: Option<NodeId>,
    pub garbage_collector: Option<NodeId>,
}

impl ProfileNodes {
    /// Build the tree from the concatenated nodes of all chunks.
    pub fn build(raw_nodes: &[RawProfileNode]) -> Result<Self> {
        let mut arena = ProfileNodes::default();

        for raw in raw_nodes {
            if arena.by_raw_id.contains_key(&raw.id) {
                return Err(TraceError::DuplicateNodeId(raw.id));
            }
            arena.by_raw_id.insert(raw.id, arena.nodes.len());
            arena.nodes.push(ProfileNode::from_raw(raw));
        }

        // Link parents; nodes whose parent cannot be resolved become roots
        let mut unparented = Vec::new();
        for (id, raw) in raw_nodes.iter().enumerate() {
            match raw.parent.and_then(|p| arena.by_raw_id.get(&p).copied()) {
                Some(parent) => {
                    arena.nodes[id].parent = Some(parent);
                    arena.nodes[parent].children.push(id);
                }
                None => unparented.push(id),
            }
        }

        arena.assign_depths(unparented)?;
        arena.classify();

        Ok(arena)
    }

    fn assign_depths(&mut self, roots: Vec<NodeId>) -> Result<()> {
        let mut visited = vec![false; self.nodes.len()];
        let mut to_visit = roots;

        while let Some(id) = to_visit.pop() {
            visited[id] = true;
            self.nodes[id].depth = self.nodes[id]
                .parent
                .map_or(0, |parent| self.nodes[parent].depth + 1);
            to_visit.extend_from_slice(&self.nodes[id].children);
        }

        // Anything unreachable from a root hangs off a parent cycle
        match visited.iter().position(|&seen| !seen) {
            Some(id) => Err(TraceError::CyclicNodeTree(self.nodes[id].raw_id)),
            None => Ok(()),
        }
    }

    fn classify(&mut self) {
        for node in &mut self.nodes {
            if !node.is_in_text() && node.parent.is_none() && node.function_name == "(root)" {
                node.kind = NodeKind::Root;
            }
        }

        for id in 0..self.nodes.len() {
            let top_level = self.is_top_level(id);
            let node = &mut self.nodes[id];
            if node.kind == NodeKind::Root || !top_level || node.is_in_text() {
                continue;
            }
            node.kind = match node.function_name.as_str() {
                "(idle)" => NodeKind::Idle,
                "(program)" => NodeKind::Program,
                "(garbage collector)" => NodeKind::GarbageCollector,
                _ => NodeKind::Normal,
            };
        }

        // Later duplicates win
        for (id, node) in self.nodes.iter().enumerate() {
            match node.kind {
                NodeKind::Root => self.root = Some(id),
                NodeKind::Idle => self.idle = Some(id),
                NodeKind::Program => self.program = Some(id),
                NodeKind::GarbageCollector => self.garbage_collector = Some(id),
                NodeKind::Normal => {}
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &ProfileNode {
        &self.nodes[id]
    }

    /// Resolve a profiler-assigned ID to its arena index.
    pub fn lookup(&self, raw_id: u64) -> Option<NodeId> {
        self.by_raw_id.get(&raw_id).copied()
    }

    /// Whether the node's parent is the root node.
    pub fn is_top_level(&self, id: NodeId) -> bool {
        self.nodes[id]
            .parent
            .is_some_and(|parent| self.nodes[parent].kind == NodeKind::Root)
    }

    /// The outermost ancestor below the tree root.
    pub fn stack_bottom(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            if self.nodes[parent].parent.is_none() {
                break;
            }
            current = parent;
        }
        current
    }

    /// Ancestor chain from the tree root down to `id`, inclusive.
    pub fn stack(&self, id: NodeId) -> Vec<NodeId> {
        let mut stack = Vec::with_capacity(self.nodes[id].depth + 1);
        let mut current = Some(id);
        while let Some(node) = current {
            stack.push(node);
            current = self.nodes[node].parent;
        }
        stack.reverse();
        stack
    }
}
