//! Tree renderer: ordered nodes to nested markup in one forward pass.
//!
//! Rows sorted by `(root, lft)` are already a depth-first preorder walk, so the
//! renderer never builds a tree in memory. Nesting is decided from `depth`
//! alone: a deeper node opens one list level per unit of depth, a shallower
//! node closes one level per unit. A stack of open intervals, popped as soon as
//! an interval ends, supplies the positional facts (first/last sibling,
//! previous sibling) needed for the per-node move flags. Those facts count
//! only siblings that are rendered themselves.

use std::fmt::Write as _;

use serde::Serialize;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::validator::accepts_children;
use crate::config::{IconSettings, Settings, TreeOptions};
use crate::domain::{Direction, IconType, Node, NodeKey};

/// Request-scoped render state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderContext {
    /// Node the current user last selected; falls back to a node flagged `selected`
    pub selected: Option<NodeKey>,
    /// Admins also see invisible nodes
    pub admin: bool,
}

impl RenderContext {
    pub fn admin() -> Self {
        Self {
            selected: None,
            admin: true,
        }
    }

    pub fn with_selected(mut self, key: NodeKey) -> Self {
        self.selected = Some(key);
        self
    }
}

/// Derived UI metadata for one rendered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub key: NodeKey,
    pub lft: i64,
    pub rgt: i64,
    pub depth: u32,
    pub is_leaf: bool,
    pub movable_u: bool,
    pub movable_d: bool,
    pub movable_l: bool,
    pub movable_r: bool,
    pub removable: bool,
    pub removable_all: bool,
    pub child_allowed: bool,
    pub disabled: bool,
    pub readonly: bool,
    pub collapsed: bool,
    pub active: bool,
}

impl NodeView {
    pub fn is_movable(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.movable_u,
            Direction::Down => self.movable_d,
            Direction::Left => self.movable_l,
            Direction::Right => self.movable_r,
        }
    }
}

/// Bracket counters over every `<ul>` and `<li>` written, the outer list
/// included; opened and closed always match after a render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub levels_opened: usize,
    pub levels_closed: usize,
    pub items_opened: usize,
    pub items_closed: usize,
    pub rendered: usize,
    pub skipped: usize,
}

impl RenderStats {
    pub fn is_balanced(&self) -> bool {
        self.levels_opened == self.levels_closed && self.items_opened == self.items_closed
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderedTree {
    pub html: String,
    pub nodes: Vec<NodeView>,
    pub stats: RenderStats,
}

impl RenderedTree {
    pub fn view(&self, key: NodeKey) -> Option<&NodeView> {
        self.nodes.iter().find(|v| v.key == key)
    }
}

/// Per-item hook used by widgets that embed the tree (e.g. the picker input).
pub trait ItemDecorator {
    /// Markup inserted before the node icon.
    fn prefix(&self, _node: &Node, _view: &NodeView) -> Option<String> {
        None
    }

    /// Whether the item carries the selected class.
    fn is_selected(&self, _node: &Node) -> bool {
        false
    }
}

/// No per-item decoration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl ItemDecorator for Plain {}

/// One open interval on the ancestor stack.
#[derive(Debug, Clone, Copy)]
struct Frame {
    root: NodeKey,
    rgt: i64,
    depth: u32,
    accepts_children: bool,
    has_shown_child: bool,
}

#[derive(Debug, Clone)]
pub struct TreeRenderer {
    options: TreeOptions,
    icons: IconSettings,
}

impl TreeRenderer {
    pub fn new(options: TreeOptions, icons: IconSettings) -> Self {
        Self { options, icons }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.tree.clone(), settings.icons.clone())
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Visibility policy: skipped nodes hide their whole subtree.
    pub fn is_hidden(&self, node: &Node, ctx: &RenderContext) -> bool {
        (!ctx.admin && !node.visible) || (!self.options.show_inactive && !node.active)
    }

    pub fn accepts_children(&self, node: &Node) -> bool {
        accepts_children(node, self.options.max_depth)
    }

    /// Per node, whether it is rendered: hidden nodes take their subtree along.
    fn shown_mask(&self, nodes: &[Node], ctx: &RenderContext) -> Vec<bool> {
        let mut shown = vec![false; nodes.len()];
        let mut hidden_until: Option<(NodeKey, i64)> = None;
        for (i, node) in nodes.iter().enumerate() {
            if let Some((root, rgt)) = hidden_until {
                if node.root == root && node.rgt < rgt {
                    continue;
                }
                hidden_until = None;
            }
            if self.is_hidden(node, ctx) {
                hidden_until = Some((node.root, node.rgt));
                continue;
            }
            shown[i] = true;
        }
        shown
    }

    pub fn render(&self, nodes: &[Node], ctx: &RenderContext) -> RenderedTree {
        self.render_with(nodes, ctx, &Plain)
    }

    #[instrument(level = "debug", skip(self, nodes, decorator), fields(nodes = nodes.len()))]
    pub fn render_with(
        &self,
        nodes: &[Node],
        ctx: &RenderContext,
        decorator: &dyn ItemDecorator,
    ) -> RenderedTree {
        let mut out = RenderedTree::default();
        let heights = self
            .options
            .max_depth
            .map(|_| subtree_heights(nodes))
            .unwrap_or_default();
        let selected = ctx
            .selected
            .and_then(|k| nodes.iter().find(|n| n.key == k))
            .or_else(|| nodes.iter().find(|n| n.selected));
        let shown = self.shown_mask(nodes, ctx);
        let has_next = next_shown_sibling(nodes, &shown);

        let html = &mut out.html;
        let stats = &mut out.stats;
        html.push_str("<div class=\"nt-tree\">\n");
        let _ = writeln!(
            html,
            "<div class=\"nt-tree-heading\">{}</div>",
            escape_html(&self.options.root_label)
        );

        let mut ancestors: Vec<Frame> = Vec::new();
        let mut base_depth: Option<u32> = None;
        let mut current_depth = 0u32;
        let mut counter = 0usize;
        let mut roots_seen = 0usize;

        for (index, node) in nodes.iter().enumerate() {
            if !shown[index] {
                stats.skipped += 1;
                continue;
            }

            let mut previous: Option<Frame> = None;
            while let Some(top) = ancestors.last() {
                if top.root != node.root || top.rgt < node.lft {
                    previous = ancestors.pop();
                } else {
                    break;
                }
            }
            let parent = ancestors.last().copied();
            let previous_sibling = previous.filter(|p| match parent {
                Some(parent) => p.root == parent.root && p.depth == node.depth,
                None => p.depth == node.depth,
            });
            let is_first_root = node.is_root() && roots_seen == 0;
            if node.is_root() {
                roots_seen += 1;
            }
            let is_first_sibling = match ancestors.last_mut() {
                Some(p) => !std::mem::replace(&mut p.has_shown_child, true),
                // the top of a scoped subtree: its siblings are not loaded
                None => is_first_root || !node.is_root(),
            };
            let is_last_sibling = parent.is_none() || !has_next[index];
            ancestors.push(Frame {
                root: node.root,
                rgt: node.rgt,
                depth: node.depth,
                accepts_children: self.accepts_children(node),
                has_shown_child: false,
            });

            let base = *base_depth.get_or_insert(node.depth);
            let depth = node.depth.saturating_sub(base);

            if counter > 0 {
                if depth > current_depth {
                    for step in current_depth..depth {
                        if step > current_depth {
                            html.push_str("<li class=\"nt-gap\">");
                            stats.items_opened += 1;
                        }
                        html.push_str("<ul class=\"nt-tree-children\">\n");
                        stats.levels_opened += 1;
                    }
                } else {
                    html.push_str("</li>\n");
                    stats.items_closed += 1;
                    for _ in depth..current_depth {
                        html.push_str("</ul></li>\n");
                        stats.levels_closed += 1;
                        stats.items_closed += 1;
                    }
                }
            } else {
                html.push_str("<ul class=\"nt-tree-list\">\n");
                stats.levels_opened += 1;
            }
            current_depth = depth;

            let height = heights.get(index).copied().unwrap_or(0);
            let view = self.view(
                node,
                is_first_sibling,
                is_last_sibling,
                previous_sibling,
                height,
                selected,
            );
            self.write_item(html, node, &view, decorator);
            stats.items_opened += 1;
            stats.rendered += 1;
            counter += 1;
            out.nodes.push(view);
        }

        if counter > 0 {
            html.push_str("</li>\n");
            stats.items_closed += 1;
            for _ in 0..current_depth {
                html.push_str("</ul></li>\n");
                stats.levels_closed += 1;
                stats.items_closed += 1;
            }
            html.push_str("</ul>\n");
            stats.levels_closed += 1;
        } else {
            let _ = writeln!(
                html,
                "<div class=\"nt-tree-empty\">{}</div>",
                escape_html(&self.options.empty_message)
            );
        }
        html.push_str("</div>\n");

        debug!(
            "rendered {} nodes, skipped {}",
            out.stats.rendered, out.stats.skipped
        );
        out
    }

    fn view(
        &self,
        node: &Node,
        is_first_sibling: bool,
        is_last_sibling: bool,
        previous_sibling: Option<Frame>,
        height: u32,
        selected: Option<&Node>,
    ) -> NodeView {
        let fits_one_deeper = self
            .options
            .max_depth
            .map_or(true, |max| node.depth + 1 + height <= max);
        let movable_u = !node.is_root() && !is_first_sibling;
        let movable_d = !node.is_root() && !is_last_sibling;
        let movable_l = !node.is_root() && (node.depth > 1 || self.options.allow_new_roots);
        let movable_r = previous_sibling.is_some_and(|p| p.accepts_children) && fits_one_deeper;
        let on_selected_path = selected.is_some_and(|s| node.contains(s));

        NodeView {
            key: node.key,
            lft: node.lft,
            rgt: node.rgt,
            depth: node.depth,
            is_leaf: node.is_leaf(),
            movable_u: movable_u && node.movable_flag(Direction::Up),
            movable_d: movable_d && node.movable_flag(Direction::Down),
            movable_l: movable_l && node.movable_flag(Direction::Left),
            movable_r: movable_r && node.movable_flag(Direction::Right),
            removable: node.removable && !node.readonly && (node.is_leaf() || node.removable_all),
            removable_all: node.removable_all && !node.readonly,
            child_allowed: self.accepts_children(node),
            disabled: node.disabled,
            readonly: node.readonly,
            collapsed: node.collapsed && !node.is_leaf() && !on_selected_path,
            active: selected.is_some_and(|s| s.key == node.key),
        }
    }

    fn write_item(
        &self,
        html: &mut String,
        node: &Node,
        view: &NodeView,
        decorator: &dyn ItemDecorator,
    ) {
        let mut classes = vec![if view.is_leaf { "nt-child" } else { "nt-parent" }];
        if view.collapsed {
            classes.push("nt-collapsed");
        }
        if view.disabled {
            classes.push("nt-disabled");
        }
        if !node.active {
            classes.push("nt-inactive");
        }
        if !node.visible {
            classes.push("nt-invisible");
        }
        if view.active {
            classes.push("nt-active");
        }
        if decorator.is_selected(node) {
            classes.push("nt-selected");
        }

        let flag = |b: bool| if b { 1 } else { 0 };
        let _ = write!(
            html,
            "<li class=\"{}\" data-key=\"{}\" data-lft=\"{}\" data-rgt=\"{}\" data-lvl=\"{}\" \
             data-disabled=\"{}\" data-readonly=\"{}\" data-movable-u=\"{}\" data-movable-d=\"{}\" \
             data-movable-l=\"{}\" data-movable-r=\"{}\" data-removable=\"{}\" \
             data-removable-all=\"{}\" data-child-allowed=\"{}\">",
            classes.join(" "),
            view.key,
            view.lft,
            view.rgt,
            view.depth,
            flag(view.disabled),
            flag(view.readonly),
            flag(view.movable_u),
            flag(view.movable_d),
            flag(view.movable_l),
            flag(view.movable_r),
            flag(view.removable),
            flag(view.removable_all),
            flag(view.child_allowed),
        );

        html.push_str("<div class=\"nt-tree-item\" tabindex=\"-1\">");
        if !view.is_leaf {
            html.push_str("<span class=\"nt-node-toggle\"></span>");
        }
        if let Some(prefix) = decorator.prefix(node, view) {
            html.push_str(&prefix);
        }
        let _ = write!(
            html,
            "<span class=\"nt-node-icon\">{}</span><span class=\"nt-node-label\">{}",
            self.icon_markup(node, view),
            escape_html(&node.name)
        );
        if self.options.show_keys {
            let _ = write!(html, " <small class=\"nt-node-key\">#{}</small>", node.key);
        }
        html.push_str("</span></div>\n");
    }

    fn icon_markup(&self, node: &Node, view: &NodeView) -> String {
        match (&node.icon, node.icon_type) {
            (Some(icon), IconType::Raw) => icon.clone(),
            (Some(icon), IconType::Css) => format!("<i class=\"{}\"></i>", escape_html(icon)),
            (None, _) => {
                let class = if view.is_leaf {
                    &self.icons.child
                } else if view.collapsed {
                    &self.icons.parent
                } else {
                    &self.icons.parent_open
                };
                format!("<i class=\"{}\"></i>", escape_html(class))
            }
        }
    }

    /// Plain-text rendering of the same filtered sequence, for terminals.
    pub fn render_text(&self, nodes: &[Node], ctx: &RenderContext) -> Tree<String> {
        let mut stack: Vec<(i64, Tree<String>)> =
            vec![(-1, Tree::new(self.options.root_label.clone()))];
        let shown = self.shown_mask(nodes, ctx);

        for (node, _) in nodes.iter().zip(&shown).filter(|(_, s)| **s) {

            let depth = i64::from(node.depth);
            while stack.len() > 1 && stack.last().is_some_and(|(d, _)| *d >= depth) {
                fold_top(&mut stack);
            }
            let mut label = format!("{} [{}]", node.name, node.key);
            if !node.active {
                label.push_str(" (inactive)");
            }
            stack.push((depth, Tree::new(label)));
        }
        while stack.len() > 1 {
            fold_top(&mut stack);
        }
        stack
            .pop()
            .map(|(_, tree)| tree)
            .unwrap_or_else(|| Tree::new(self.options.root_label.clone()))
    }
}

fn fold_top(stack: &mut Vec<(i64, Tree<String>)>) {
    if let Some((_, child)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.push(child);
        }
    }
}

/// For each shown node, whether a later shown node shares its nearest shown
/// ancestor. Top-level nodes are left `false`.
fn next_shown_sibling(nodes: &[Node], shown: &[bool]) -> Vec<bool> {
    let mut has_next = vec![false; nodes.len()];
    // (index, last shown child so far)
    let mut open: Vec<(usize, Option<usize>)> = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        if !shown[i] {
            continue;
        }
        while let Some(&(top, _)) = open.last() {
            let t = &nodes[top];
            if t.root != node.root || t.rgt < node.lft {
                open.pop();
            } else {
                break;
            }
        }
        if let Some((_, last)) = open.last_mut() {
            if let Some(prev) = last.replace(i) {
                has_next[prev] = true;
            }
        }
        open.push((i, None));
    }
    has_next
}

/// For each node, levels between it and its deepest descendant.
fn subtree_heights(nodes: &[Node]) -> Vec<u32> {
    let mut heights = vec![0u32; nodes.len()];
    let mut open: Vec<usize> = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        while let Some(&top) = open.last() {
            let t = &nodes[top];
            if t.root != node.root || t.rgt < node.lft {
                open.pop();
            } else {
                break;
            }
        }
        for &a in &open {
            let h = node.depth.saturating_sub(nodes[a].depth);
            if h > heights[a] {
                heights[a] = h;
            }
        }
        open.push(i);
    }
    heights
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
