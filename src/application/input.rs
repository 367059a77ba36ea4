//! Tree picker input: a form field backed by a tree of checkable nodes.
//!
//! The form value is a single hidden input holding a comma-separated list of
//! selected node keys. The tree below it is the regular renderer output with a
//! checkbox (or radio button in single mode) in front of every node.

use std::fmt;

use itertools::Itertools;
use tracing::instrument;

use crate::application::renderer::{
    escape_html, ItemDecorator, NodeView, RenderContext, RenderedTree, TreeRenderer,
};
use crate::config::{InputOptions, Settings};
use crate::domain::{DomainError, DomainResult, Node, NodeKey};

/// Ordered, duplicate-free set of selected keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: Vec<NodeKey>,
    multiple: bool,
}

impl Selection {
    pub fn new(multiple: bool) -> Self {
        Self {
            keys: Vec::new(),
            multiple,
        }
    }

    /// Parse the hidden-input value. In single mode only the last key is kept.
    pub fn parse(csv: &str, multiple: bool) -> DomainResult<Self> {
        let mut selection = Self::new(multiple);
        for part in csv.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let key = part.parse::<NodeKey>().map_err(|_| {
                DomainError::invalid(format!("invalid node key in selection: '{part}'"))
            })?;
            selection.insert(key);
        }
        Ok(selection)
    }

    pub fn insert(&mut self, key: NodeKey) {
        if !self.multiple {
            self.keys.clear();
        }
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    /// Flip one key, the way a click on a node's checkbox does.
    pub fn toggle(&mut self, key: NodeKey) {
        if let Some(pos) = self.keys.iter().position(|k| *k == key) {
            self.keys.remove(pos);
        } else {
            self.insert(key);
        }
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn keys(&self) -> &[NodeKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Drop keys that are unknown or not selectable.
    pub fn retain_selectable(&mut self, nodes: &[Node]) {
        self.keys
            .retain(|k| nodes.iter().any(|n| n.key == *k && !n.disabled));
    }

    pub fn to_csv(&self) -> String {
        self.keys.iter().join(",")
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv())
    }
}

/// Output of [`TreeInput::render`].
#[derive(Debug, Clone)]
pub struct RenderedInput {
    pub html: String,
    /// The selection after unknown and disabled keys were dropped
    pub selection: Selection,
    pub tree: RenderedTree,
}

struct CheckDecorator<'a> {
    selection: &'a Selection,
    field: &'a str,
}

impl ItemDecorator for CheckDecorator<'_> {
    fn prefix(&self, node: &Node, view: &NodeView) -> Option<String> {
        let kind = if self.selection.is_multiple() {
            "checkbox"
        } else {
            "radio"
        };
        let mut markup = format!(
            "<input type=\"{kind}\" class=\"nt-node-check\" name=\"{}-check\" value=\"{}\"",
            escape_html(self.field),
            node.key
        );
        if self.selection.contains(node.key) {
            markup.push_str(" checked");
        }
        if view.disabled {
            markup.push_str(" disabled");
        }
        markup.push('>');
        Some(markup)
    }

    fn is_selected(&self, node: &Node) -> bool {
        self.selection.contains(node.key)
    }
}

#[derive(Debug, Clone)]
pub struct TreeInput {
    renderer: TreeRenderer,
    options: InputOptions,
}

impl TreeInput {
    pub fn new(renderer: TreeRenderer, options: InputOptions) -> Self {
        Self { renderer, options }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(TreeRenderer::from_settings(settings), settings.input.clone())
    }

    pub fn options(&self) -> &InputOptions {
        &self.options
    }

    /// Parse a submitted value with this input's selection mode.
    pub fn parse_value(&self, csv: &str) -> DomainResult<Selection> {
        Selection::parse(csv, self.options.multiple)
    }

    #[instrument(level = "debug", skip(self, nodes, selection))]
    pub fn render(
        &self,
        nodes: &[Node],
        selection: &Selection,
        ctx: &RenderContext,
    ) -> RenderedInput {
        let mut selection = selection.clone();
        selection.retain_selectable(nodes);

        let decorator = CheckDecorator {
            selection: &selection,
            field: &self.options.field_name,
        };
        let tree = self.renderer.render_with(nodes, ctx, &decorator);

        let caption = if selection.is_empty() {
            format!(
                "<span class=\"nt-placeholder\">{}</span>",
                escape_html(&self.options.placeholder)
            )
        } else {
            nodes
                .iter()
                .filter(|n| selection.contains(n.key))
                .map(|n| escape_html(&n.name))
                .join(", ")
        };

        let html = format!(
            "<div class=\"nt-tree-input\" data-multiple=\"{}\">\n\
             <input type=\"hidden\" name=\"{}\" value=\"{}\">\n\
             <div class=\"nt-tree-input-caption\">{}</div>\n\
             <div class=\"nt-tree-input-dropdown\">\n{}</div>\n\
             </div>\n",
            u8::from(selection.is_multiple()),
            escape_html(&self.options.field_name),
            escape_html(&selection.to_csv()),
            caption,
            tree.html,
        );
        RenderedInput {
            html,
            selection,
            tree,
        }
    }
}
