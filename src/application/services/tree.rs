//! Tree service: reads and all-or-nothing mutations over a node store
//!
//! Every mutation is one transaction:
//!
//! ```text
//! fetch rows -> decode -> Forest -> validate request -> mutate
//!            -> Forest::validate -> encode -> replace_all
//! ```
//!
//! Nothing reaches the store unless every step succeeds. Columns the loader
//! does not know about are carried over from the fetched rows unchanged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use termtree::Tree;
use tracing::{debug, info, instrument};

use crate::application::input::{RenderedInput, TreeInput};
use crate::application::loader::{TreeLoader, TreeScope};
use crate::application::renderer::{RenderContext, RenderedTree, TreeRenderer};
use crate::application::validator::{MutationValidator, RemoveMode};
use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    Direction, DomainError, Forest, Node, NodeAttributes, NodeDraft, NodeKey,
};
use crate::infrastructure::traits::{NodeStore, Row};

/// Result of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// The node the request was about, as committed (or as removed)
    pub node: Node,
    /// Every committed row that is new or whose state changed
    pub affected: Vec<Node>,
    /// Keys deleted by a hard delete
    pub removed: Vec<NodeKey>,
    pub message: String,
}

/// What a transaction body hands back: the subject node and a message.
type Change = (Node, String);

pub struct TreeService {
    store: Arc<dyn NodeStore>,
    settings: Arc<Settings>,
    loader: TreeLoader,
    validator: MutationValidator,
    renderer: TreeRenderer,
    input: TreeInput,
    lock: Mutex<()>,
}

impl TreeService {
    pub fn new(store: Arc<dyn NodeStore>, settings: Arc<Settings>) -> Self {
        Self {
            loader: TreeLoader::new(settings.columns.clone()),
            validator: MutationValidator::new(settings.tree.clone()),
            renderer: TreeRenderer::from_settings(&settings),
            input: TreeInput::from_settings(&settings),
            store,
            settings,
            lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ============================================================
    // Reads
    // ============================================================

    /// Ordered node sequence for `scope`.
    pub fn nodes(&self, scope: &TreeScope) -> ApplicationResult<Vec<Node>> {
        let rows = self.store.fetch().with_store_context("fetch rows")?;
        self.loader.load(&rows, scope)
    }

    pub fn find(&self, key: NodeKey) -> ApplicationResult<Node> {
        self.nodes(&TreeScope::All)?
            .into_iter()
            .find(|n| n.key == key)
            .ok_or_else(|| DomainError::NodeNotFound(key).into())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn render(&self, scope: &TreeScope, ctx: &RenderContext) -> ApplicationResult<RenderedTree> {
        let nodes = self.nodes(scope)?;
        Ok(self.renderer.render(&nodes, ctx))
    }

    pub fn render_text(&self, scope: &TreeScope, ctx: &RenderContext) -> ApplicationResult<Tree<String>> {
        let nodes = self.nodes(scope)?;
        Ok(self.renderer.render_text(&nodes, ctx))
    }

    /// Render the tree picker with `value` as the submitted hidden-input value.
    pub fn render_input(
        &self,
        scope: &TreeScope,
        value: &str,
        ctx: &RenderContext,
    ) -> ApplicationResult<RenderedInput> {
        let selection = self.input.parse_value(value)?;
        let nodes = self.nodes(scope)?;
        Ok(self.input.render(&nodes, &selection, ctx))
    }

    // ============================================================
    // Mutations
    // ============================================================

    #[instrument(level = "debug", skip(self, draft), fields(name = %draft.name))]
    pub fn create(&self, parent: NodeKey, draft: NodeDraft) -> ApplicationResult<MutationOutcome> {
        self.transaction("create", |forest| {
            self.validator.create(forest, parent)?;
            let node = forest.insert_child(parent, draft)?;
            let message = format!("created node {} under {}", node.key, parent);
            Ok((node, message))
        })
    }

    #[instrument(level = "debug", skip(self, draft), fields(name = %draft.name))]
    pub fn create_root(&self, draft: NodeDraft) -> ApplicationResult<MutationOutcome> {
        self.transaction("create root", |forest| {
            self.validator.create_root()?;
            let node = forest.insert_root(draft);
            let message = format!("created root {}", node.key);
            Ok((node, message))
        })
    }

    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&self, key: NodeKey, direction: Direction) -> ApplicationResult<MutationOutcome> {
        self.transaction("move", |forest| {
            let placement = self.validator.move_node(forest, key, direction)?;
            forest.move_subtree(key, placement)?;
            let node = forest.require(key)?.clone();
            let message = format!("moved node {key} {direction}");
            Ok((node, message))
        })
    }

    /// Soft or hard delete, depending on `tree.soft_delete`.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&self, key: NodeKey) -> ApplicationResult<MutationOutcome> {
        self.transaction("remove", |forest| {
            match self.validator.remove(forest, key)? {
                RemoveMode::Soft => {
                    let changed = forest.set_active_subtree(key, false)?;
                    let node = forest.require(key)?.clone();
                    Ok((node, format!("deactivated {} nodes", changed.len())))
                }
                RemoveMode::Hard => {
                    let removed = forest.delete_subtree(key)?;
                    let node = removed
                        .iter()
                        .find(|n| n.key == key)
                        .cloned()
                        .ok_or(DomainError::NodeNotFound(key))?;
                    Ok((node, format!("removed {} nodes", removed.len())))
                }
            }
        })
    }

    /// Reactivate a soft-deleted node and its descendants.
    #[instrument(level = "debug", skip(self))]
    pub fn restore(&self, key: NodeKey) -> ApplicationResult<MutationOutcome> {
        self.transaction("restore", |forest| {
            self.validator.restore(forest, key)?;
            let changed = forest.set_active_subtree(key, true)?;
            let node = forest.require(key)?.clone();
            Ok((node, format!("restored {} nodes", changed.len())))
        })
    }

    #[instrument(level = "debug", skip(self, attributes))]
    pub fn save(&self, key: NodeKey, attributes: NodeAttributes) -> ApplicationResult<MutationOutcome> {
        self.transaction("save", |forest| {
            self.validator.save(forest.require(key)?, &attributes)?;
            let node = forest.update(key, |n| attributes.apply_to(n))?;
            Ok((node, format!("saved node {key}")))
        })
    }

    // ============================================================
    // Transaction
    // ============================================================

    fn transaction<F>(&self, action: &str, body: F) -> ApplicationResult<MutationOutcome>
    where
        F: FnOnce(&mut Forest) -> ApplicationResult<Change>,
    {
        // a panicking transaction never committed, so the guarded state is still consistent
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let rows = self.store.fetch().with_store_context("fetch rows")?;
        let nodes = self.loader.decode_all(&rows)?;
        let mut originals: HashMap<NodeKey, Row> = nodes
            .iter()
            .map(|n| n.key)
            .zip(rows)
            .collect();

        let mut forest = Forest::from_nodes(nodes);
        forest.validate()?;
        let before: HashMap<NodeKey, Node> = forest
            .nodes()
            .iter()
            .map(|n| (n.key, n.clone()))
            .collect();

        let (node, message) = body(&mut forest)?;
        forest.validate()?;

        let affected: Vec<Node> = forest
            .nodes()
            .iter()
            .filter(|n| before.get(&n.key) != Some(*n))
            .cloned()
            .collect();
        let mut removed: Vec<NodeKey> = before
            .keys()
            .copied()
            .filter(|k| forest.get(*k).is_none())
            .collect();
        removed.sort_unstable();

        let rows: Vec<Row> = forest
            .nodes()
            .iter()
            .map(|n| {
                let mut row = originals.remove(&n.key).unwrap_or_default();
                row.extend(self.loader.encode(n));
                row
            })
            .collect();
        debug!("{}: writing {} rows", action, rows.len());
        self.store
            .replace_all(rows)
            .with_store_context("replace rows")?;

        info!("{}: {}", action, message);
        Ok(MutationOutcome {
            node,
            affected,
            removed,
            message,
        })
    }
}
