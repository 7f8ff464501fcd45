//! Read-only tree capability consumed by the extractor, plus the owned arena
//! tree produced by parser backends.
//!
//! Ownership model:
//! - `Node` is the uniform view every consumer works against.
//! - `SyntaxTree` owns all node data in one arena (node `0` is the root) and
//!   shares the source text so original spans stay recoverable.
//! - `TreeNode` is a cheap copyable handle into a `SyntaxTree`.

use std::ops::Range;
use std::sync::Arc;

use crate::types::{NodeIndex, Token, TypeLabel};

/// Uniform read-only view of a parsed syntax node.
pub trait Node: Sized {
    /// Token text; empty for inner nodes.
    fn token(&self) -> &str;
    /// Node type label reported by the parser.
    fn type_label(&self) -> &str;
    /// Ordered children.
    fn children(&self) -> Vec<Self>;
    /// Enclosing node, if any.
    fn parent(&self) -> Option<Self>;

    /// A leaf has no children.
    fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Nodes of this subtree in pre-order (self first).
    fn pre_order(self) -> Vec<Self>
    where
        Self: Clone,
    {
        let mut ordered = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            let mut children = node.children();
            children.reverse();
            ordered.push(node);
            stack.extend(children);
        }
        ordered
    }
}

/// Arena storage for one node.
#[derive(Clone, Debug)]
struct NodeData {
    type_label: TypeLabel,
    token: Token,
    technical_token: Option<Token>,
    field_name: Option<&'static str>,
    span: Range<usize>,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
}

/// Owned syntax tree backed by a node arena.
#[derive(Clone, Debug)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    source: Arc<str>,
}

impl SyntaxTree {
    /// Handle to the root node.
    pub fn root(&self) -> TreeNode<'_> {
        TreeNode { tree: self, idx: 0 }
    }

    /// Handle to node `idx`.
    ///
    /// Panics when `idx` is out of range; indices come from this tree's own handles.
    pub fn node(&self, idx: NodeIndex) -> TreeNode<'_> {
        assert!(idx < self.nodes.len(), "node index {idx} out of range");
        TreeNode { tree: self, idx }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Trees always hold at least a root; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Original source text covered by node `idx`.
    pub fn text_of(&self, idx: NodeIndex) -> &str {
        self.source
            .get(self.nodes[idx].span.clone())
            .unwrap_or_default()
    }

    /// Replace the token reported for node `idx` (e.g. `METHOD_NAME`).
    pub fn set_technical_token(&mut self, idx: NodeIndex, token: impl Into<Token>) {
        self.nodes[idx].technical_token = Some(token.into());
    }

    /// Copy the subtree rooted at `idx` into a standalone tree.
    ///
    /// The copy's root has no parent; the source text is shared.
    pub fn subtree(&self, idx: NodeIndex) -> SyntaxTree {
        let mut nodes: Vec<NodeData> = Vec::new();
        let mut stack: Vec<(NodeIndex, Option<NodeIndex>)> = vec![(idx, None)];
        while let Some((old_idx, new_parent)) = stack.pop() {
            let new_idx = nodes.len();
            let mut data = self.nodes[old_idx].clone();
            data.parent = new_parent;
            data.children = Vec::with_capacity(data.children.len());
            nodes.push(data);
            if let Some(parent) = new_parent {
                nodes[parent].children.push(new_idx);
            }
            for child in self.nodes[old_idx].children.iter().rev() {
                stack.push((*child, Some(new_idx)));
            }
        }
        SyntaxTree {
            nodes,
            source: Arc::clone(&self.source),
        }
    }
}

/// Copyable handle to one node of a `SyntaxTree`.
#[derive(Clone, Copy, Debug)]
pub struct TreeNode<'a> {
    tree: &'a SyntaxTree,
    idx: NodeIndex,
}

impl<'a> TreeNode<'a> {
    /// Arena index of this node.
    pub fn index(&self) -> NodeIndex {
        self.idx
    }

    /// Owning tree.
    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    /// Field name this node occupies in its parent, when the grammar names one.
    pub fn field_name(&self) -> Option<&'static str> {
        self.data().field_name
    }

    /// First child stored under `field`.
    pub fn child_by_field(&self, field: &str) -> Option<TreeNode<'a>> {
        self.data()
            .children
            .iter()
            .map(|idx| self.tree.node(*idx))
            .find(|child| child.field_name() == Some(field))
    }

    /// Children whose type label is `kind`.
    pub fn children_of_kind(&self, kind: &str) -> Vec<TreeNode<'a>> {
        self.children()
            .into_iter()
            .filter(|child| child.type_label() == kind)
            .collect()
    }

    /// Normalized token ignoring any technical replacement.
    pub fn normalized_token(&self) -> &'a str {
        &self.tree.nodes[self.idx].token
    }

    /// Original source text of this node.
    pub fn text(&self) -> &'a str {
        self.tree.text_of(self.idx)
    }

    /// Ancestors from parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = TreeNode<'a>> + use<'a> {
        let tree = self.tree;
        std::iter::successors(self.data().parent, move |idx| tree.nodes[*idx].parent)
            .map(move |idx| tree.node(idx))
    }

    /// Number of nodes in the subtree rooted here.
    pub fn subtree_size(&self) -> usize {
        self.pre_order().len()
    }

    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.idx]
    }
}

impl Node for TreeNode<'_> {
    fn token(&self) -> &str {
        let data = self.data();
        data.technical_token.as_deref().unwrap_or(&data.token)
    }

    fn type_label(&self) -> &str {
        &self.data().type_label
    }

    fn children(&self) -> Vec<Self> {
        self.data()
            .children
            .iter()
            .map(|idx| TreeNode {
                tree: self.tree,
                idx: *idx,
            })
            .collect()
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|idx| TreeNode {
            tree: self.tree,
            idx,
        })
    }
}

/// Incremental builder used by parser backends and tests.
///
/// Nodes are opened and closed in document order; the first opened node is the root.
#[derive(Debug)]
pub struct SyntaxTreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<NodeIndex>,
    source: Arc<str>,
}

impl SyntaxTreeBuilder {
    /// Start a tree over `source`.
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            nodes: Vec::new(),
            open: Vec::new(),
            source: source.into(),
        }
    }

    /// Open a node as a child of the innermost open node.
    pub fn open(
        &mut self,
        type_label: impl Into<TypeLabel>,
        token: impl Into<Token>,
        field_name: Option<&'static str>,
        span: Range<usize>,
    ) -> NodeIndex {
        let idx = self.nodes.len();
        let parent = self.open.last().copied();
        self.nodes.push(NodeData {
            type_label: type_label.into(),
            token: token.into(),
            technical_token: None,
            field_name,
            span,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(idx);
        }
        self.open.push(idx);
        idx
    }

    /// Close the innermost open node.
    pub fn close(&mut self) {
        self.open.pop();
    }

    /// Open and immediately close a leaf.
    pub fn leaf(
        &mut self,
        type_label: impl Into<TypeLabel>,
        token: impl Into<Token>,
        field_name: Option<&'static str>,
        span: Range<usize>,
    ) -> NodeIndex {
        let idx = self.open(type_label, token, field_name, span);
        self.close();
        idx
    }

    /// Finish the tree; `None` when no node was added.
    pub fn finish(self) -> Option<SyntaxTree> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(SyntaxTree {
            nodes: self.nodes,
            source: self.source,
        })
    }
}
