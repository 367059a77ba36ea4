//! Nested-set coordinate maintenance.
//!
//! A [`Forest`] holds every row of one or more trees, ordered by `(root, lft)`.
//! All mutations rewrite `lft`/`rgt`/`depth`/`root` in place; callers apply them
//! to a snapshot and commit the whole forest once [`Forest::validate`] passes,
//! which makes each operation all-or-nothing against the backing store.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Node, NodeDraft, NodeKey};

/// Where a moved subtree lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Immediately before the given sibling
    Before(NodeKey),
    /// Immediately after the given sibling
    After(NodeKey),
    /// As the last child of the given node
    LastChildOf(NodeKey),
    /// As the root of a new tree keyed by the moved node
    NewRoot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    nodes: Vec<Node>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(mut nodes: Vec<Node>) -> Self {
        nodes.sort_by_key(|n| (n.root, n.lft));
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn require(&self, key: NodeKey) -> DomainResult<&Node> {
        self.get(key).ok_or(DomainError::NodeNotFound(key))
    }

    fn get_mut(&mut self, key: NodeKey) -> DomainResult<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.key == key)
            .ok_or(DomainError::NodeNotFound(key))
    }

    pub fn next_key(&self) -> NodeKey {
        self.nodes.iter().map(|n| n.key).max().unwrap_or(0) + 1
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_root())
    }

    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        if node.is_root() {
            return None;
        }
        self.nodes
            .iter()
            .find(|p| p.depth + 1 == node.depth && p.contains(node))
    }

    /// Previous sibling by `lft`; for roots, the root with the next-lower key.
    pub fn previous_sibling(&self, node: &Node) -> Option<&Node> {
        if node.is_root() {
            return self
                .roots()
                .filter(|r| r.root < node.root)
                .max_by_key(|r| r.root);
        }
        self.nodes
            .iter()
            .find(|s| s.root == node.root && s.rgt + 1 == node.lft)
    }

    /// Next sibling by `lft`; for roots, the root with the next-higher key.
    pub fn next_sibling(&self, node: &Node) -> Option<&Node> {
        if node.is_root() {
            return self
                .roots()
                .filter(|r| r.root > node.root)
                .min_by_key(|r| r.root);
        }
        self.nodes
            .iter()
            .find(|s| s.root == node.root && s.lft == node.rgt + 1)
    }

    pub fn children_of(&self, node: &Node) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|c| c.depth == node.depth + 1 && node.contains(c))
            .collect()
    }

    /// The node and its siblings in order: children of the parent, or all roots.
    pub fn siblings_of(&self, node: &Node) -> Vec<&Node> {
        match self.parent_of(node) {
            Some(parent) => self.children_of(parent),
            None if node.is_root() => self.roots().collect(),
            None => Vec::new(),
        }
    }

    /// Nearest earlier sibling for which `keep` holds.
    pub fn previous_sibling_where<F>(&self, node: &Node, keep: F) -> Option<&Node>
    where
        F: Fn(&Node) -> bool,
    {
        let siblings = self.siblings_of(node);
        let at = siblings.iter().position(|s| s.key == node.key)?;
        siblings[..at].iter().rev().copied().find(|s| keep(*s))
    }

    /// Nearest later sibling for which `keep` holds.
    pub fn next_sibling_where<F>(&self, node: &Node, keep: F) -> Option<&Node>
    where
        F: Fn(&Node) -> bool,
    {
        let siblings = self.siblings_of(node);
        let at = siblings.iter().position(|s| s.key == node.key)?;
        siblings[at + 1..].iter().copied().find(|s| keep(*s))
    }

    /// The node and all of its descendants, in preorder.
    pub fn subtree(&self, node: &Node) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.key == node.key || node.contains(n))
            .collect()
    }

    /// Levels below `node` in its deepest branch, 0 for a leaf.
    pub fn subtree_height(&self, node: &Node) -> u32 {
        self.subtree(node)
            .iter()
            .map(|n| n.depth - node.depth)
            .max()
            .unwrap_or(0)
    }

    /// Shift every coordinate `>= from` in tree `root` by `delta`.
    fn shift(&mut self, root: NodeKey, from: i64, delta: i64) {
        for n in self.nodes.iter_mut().filter(|n| n.root == root) {
            if n.lft >= from {
                n.lft += delta;
            }
            if n.rgt >= from {
                n.rgt += delta;
            }
        }
    }

    fn resort(&mut self) {
        self.nodes.sort_by_key(|n| (n.root, n.lft));
    }

    #[instrument(level = "debug", skip(self, draft))]
    pub fn insert_root(&mut self, draft: NodeDraft) -> Node {
        let key = self.next_key();
        let node = Node::from_draft(key, key, 1, 2, 0, draft);
        self.nodes.push(node.clone());
        self.resort();
        node
    }

    /// Append a new node as the last child of `parent_key`.
    #[instrument(level = "debug", skip(self, draft))]
    pub fn insert_child(&mut self, parent_key: NodeKey, draft: NodeDraft) -> DomainResult<Node> {
        let parent = self.require(parent_key)?.clone();
        let key = self.next_key();

        self.shift(parent.root, parent.rgt, 2);
        let node = Node::from_draft(
            key,
            parent.root,
            parent.rgt,
            parent.rgt + 1,
            parent.depth + 1,
            draft,
        );
        self.nodes.push(node.clone());
        self.resort();
        debug!("inserted {} under {}", node.key, parent.key);
        Ok(node)
    }

    /// Relocate a node with all of its descendants.
    ///
    /// Returns the moved rows with their new coordinates.
    #[instrument(level = "debug", skip(self))]
    pub fn move_subtree(&mut self, key: NodeKey, placement: Placement) -> DomainResult<Vec<Node>> {
        let node = self.require(key)?.clone();

        let target_key = match placement {
            Placement::Before(t) | Placement::After(t) | Placement::LastChildOf(t) => Some(t),
            Placement::NewRoot => None,
        };
        if let Some(t) = target_key {
            let target = self.require(t)?;
            if target.key == node.key || node.contains(target) {
                return Err(DomainError::invalid(format!(
                    "cannot move node {} into its own subtree",
                    node.key
                )));
            }
            if target.is_root() && !matches!(placement, Placement::LastChildOf(_)) {
                return Err(DomainError::invalid(format!(
                    "cannot place node {} beside root {}",
                    node.key, target.key
                )));
            }
        } else if node.is_root() {
            return Err(DomainError::invalid(format!(
                "node {} is already a root",
                node.key
            )));
        }

        let width = node.width();
        let (mut moving, rest): (Vec<Node>, Vec<Node>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| n.key == node.key || node.contains(n));
        self.nodes = rest;
        self.shift(node.root, node.rgt + 1, -width);

        let (new_root, position, new_depth) = match placement {
            Placement::NewRoot => (node.key, 1, 0),
            Placement::Before(t) => {
                let t = self.require(t)?;
                (t.root, t.lft, t.depth)
            }
            Placement::After(t) => {
                let t = self.require(t)?;
                (t.root, t.rgt + 1, t.depth)
            }
            Placement::LastChildOf(t) => {
                let t = self.require(t)?;
                (t.root, t.rgt, t.depth + 1)
            }
        };
        if placement != Placement::NewRoot {
            self.shift(new_root, position, width);
        }

        let offset = position - node.lft;
        let depth_delta = i64::from(new_depth) - i64::from(node.depth);
        for n in moving.iter_mut() {
            n.lft += offset;
            n.rgt += offset;
            n.depth = u32::try_from(i64::from(n.depth) + depth_delta)
                .map_err(|_| DomainError::corrupt(format!("negative depth for node {}", n.key)))?;
            n.root = new_root;
        }

        debug!(
            "moved {} rows of subtree {} to root {} at {}",
            moving.len(),
            node.key,
            new_root,
            position
        );
        self.nodes.extend(moving.iter().cloned());
        self.resort();
        Ok(moving)
    }

    /// Remove a node and its descendants and close the gap.
    ///
    /// Returns the removed rows.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_subtree(&mut self, key: NodeKey) -> DomainResult<Vec<Node>> {
        let node = self.require(key)?.clone();
        let (removed, rest): (Vec<Node>, Vec<Node>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| n.key == node.key || node.contains(n));
        self.nodes = rest;
        self.shift(node.root, node.rgt + 1, -node.width());
        debug!("deleted {} rows of subtree {}", removed.len(), node.key);
        Ok(removed)
    }

    /// Set `active` on a node and all of its descendants. Coordinates are untouched.
    #[instrument(level = "debug", skip(self))]
    pub fn set_active_subtree(&mut self, key: NodeKey, active: bool) -> DomainResult<Vec<Node>> {
        let node = self.require(key)?.clone();
        let mut changed = Vec::new();
        for n in self
            .nodes
            .iter_mut()
            .filter(|n| n.key == node.key || node.contains(n))
        {
            n.active = active;
            changed.push(n.clone());
        }
        Ok(changed)
    }

    /// Apply a coordinate-free edit to one node.
    pub fn update<F>(&mut self, key: NodeKey, edit: F) -> DomainResult<Node>
    where
        F: FnOnce(&mut Node),
    {
        let node = self.get_mut(key)?;
        let (root, lft, rgt, depth) = (node.root, node.lft, node.rgt, node.depth);
        edit(node);
        node.key = key;
        node.root = root;
        node.lft = lft;
        node.rgt = rgt;
        node.depth = depth;
        Ok(node.clone())
    }

    /// Check every nested-set invariant across all trees.
    pub fn validate(&self) -> DomainResult<()> {
        let mut keys = HashSet::new();
        for n in &self.nodes {
            if !keys.insert(n.key) {
                return Err(DomainError::corrupt(format!("duplicate key {}", n.key)));
            }
        }

        let mut start = 0;
        while start < self.nodes.len() {
            let root = self.nodes[start].root;
            let end = self.nodes[start..]
                .iter()
                .position(|n| n.root != root)
                .map_or(self.nodes.len(), |p| start + p);
            validate_tree(&self.nodes[start..end])?;
            start = end;
        }
        Ok(())
    }
}

/// Validate one tree whose rows are sorted by `lft`.
fn validate_tree(rows: &[Node]) -> DomainResult<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    if first.key != first.root || first.lft != 1 || first.depth != 0 {
        return Err(DomainError::corrupt(format!(
            "tree {} does not start with its root at lft 1",
            first.root
        )));
    }

    let mut coords = Vec::with_capacity(rows.len() * 2);
    let mut open: Vec<&Node> = Vec::new();
    for (i, n) in rows.iter().enumerate() {
        if n.lft >= n.rgt || (n.rgt - n.lft) % 2 == 0 {
            return Err(DomainError::corrupt(format!(
                "node {} has invalid interval [{}, {}]",
                n.key, n.lft, n.rgt
            )));
        }
        while open.last().is_some_and(|p| p.rgt < n.lft) {
            open.pop();
        }
        match open.last() {
            None if i > 0 => {
                return Err(DomainError::corrupt(format!(
                    "tree {} has more than one top-level node",
                    n.root
                )))
            }
            Some(p) if n.rgt >= p.rgt => {
                return Err(DomainError::corrupt(format!(
                    "node {} overlaps node {}",
                    n.key, p.key
                )))
            }
            Some(p) if n.depth != p.depth + 1 => {
                return Err(DomainError::corrupt(format!(
                    "node {} has depth {} under parent depth {}",
                    n.key, n.depth, p.depth
                )))
            }
            _ => {}
        }
        open.push(n);
        coords.push(n.lft);
        coords.push(n.rgt);
    }

    coords.sort_unstable();
    let contiguous = coords
        .iter()
        .zip(1_i64..)
        .all(|(c, expected)| *c == expected);
    if !contiguous {
        return Err(DomainError::corrupt(format!(
            "tree {} coordinates are not contiguous",
            first.root
        )));
    }
    Ok(())
}
