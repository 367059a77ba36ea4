//! Tree loader: raw rows to an ordered node sequence
//!
//! Rows come from a [`NodeStore`](crate::infrastructure::NodeStore) and are
//! decoded through the configured [`ColumnNames`]. The coordinate and name
//! columns are required; icon and flag columns fall back to node defaults.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::ColumnNames;
use crate::domain::{DomainError, IconType, Node, NodeDraft, NodeKey};
use crate::infrastructure::Row;

/// Which part of the forest to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TreeScope {
    #[default]
    All,
    /// Only the trees rooted at these keys
    Roots(Vec<NodeKey>),
    /// One node and its descendants
    Subtree(NodeKey),
}

#[derive(Debug, Clone)]
pub struct TreeLoader {
    columns: ColumnNames,
}

impl TreeLoader {
    pub fn new(columns: ColumnNames) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnNames {
        &self.columns
    }

    /// Decode every row and return the nodes selected by `scope`, sorted by `(root, lft)`.
    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    pub fn load(&self, rows: &[Row], scope: &TreeScope) -> ApplicationResult<Vec<Node>> {
        let mut nodes = self.decode_all(rows)?;
        nodes.sort_by_key(|n| (n.root, n.lft));

        let nodes = match scope {
            TreeScope::All => nodes,
            TreeScope::Roots(keys) => nodes
                .into_iter()
                .filter(|n| keys.contains(&n.root))
                .collect(),
            TreeScope::Subtree(key) => {
                let top = nodes
                    .iter()
                    .find(|n| n.key == *key)
                    .cloned()
                    .ok_or(DomainError::NodeNotFound(*key))?;
                nodes
                    .into_iter()
                    .filter(|n| n.key == top.key || top.contains(n))
                    .collect()
            }
        };
        debug!("loaded {} nodes for {:?}", nodes.len(), scope);
        Ok(nodes)
    }

    pub fn decode_all(&self, rows: &[Row]) -> ApplicationResult<Vec<Node>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.decode(i, row))
            .collect()
    }

    /// Decode one row; `index` is only used in error messages.
    pub fn decode(&self, index: usize, row: &Row) -> ApplicationResult<Node> {
        let c = &self.columns;
        let key = required_int(row, index, &c.key)?;
        let root = required_int(row, index, &c.root)?;
        let lft = required_int(row, index, &c.left)?;
        let rgt = required_int(row, index, &c.right)?;
        let depth = u32::try_from(required_int(row, index, &c.depth)?).map_err(|_| {
            ApplicationError::configuration(format!(
                "row {index}: column '{}' must be a non-negative depth",
                c.depth
            ))
        })?;
        let name = match row.get(&c.name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(ApplicationError::configuration(format!(
                    "row {index}: column '{}' must be text, got {other}",
                    c.name
                )))
            }
            None => return Err(missing(index, &c.name)),
        };

        let icon = match row.get(&c.icon) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        let icon_type = match row.get(&c.icon_type) {
            Some(Value::Number(n)) => n.as_i64().and_then(IconType::from_code),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "css" => Some(IconType::Css),
                "raw" => Some(IconType::Raw),
                _ => None,
            },
            _ => None,
        }
        .unwrap_or_default();

        let mut draft = NodeDraft::new(name);
        draft.icon = icon;
        draft.icon_type = icon_type;
        let mut node = Node::from_draft(key, root, lft, rgt, depth, draft);

        let flags: [(&str, &mut bool); 13] = [
            (c.active.as_str(), &mut node.active),
            (c.visible.as_str(), &mut node.visible),
            (c.disabled.as_str(), &mut node.disabled),
            (c.readonly.as_str(), &mut node.readonly),
            (c.collapsed.as_str(), &mut node.collapsed),
            (c.selected.as_str(), &mut node.selected),
            (c.movable_u.as_str(), &mut node.movable_u),
            (c.movable_d.as_str(), &mut node.movable_d),
            (c.movable_l.as_str(), &mut node.movable_l),
            (c.movable_r.as_str(), &mut node.movable_r),
            (c.removable.as_str(), &mut node.removable),
            (c.removable_all.as_str(), &mut node.removable_all),
            (c.child_allowed.as_str(), &mut node.child_allowed),
        ];
        for (column, slot) in flags {
            if let Some(value) = row.get(column).and_then(as_flag) {
                *slot = value;
            }
        }
        Ok(node)
    }

    /// Encode a node into a row with every configured column.
    pub fn encode(&self, node: &Node) -> Row {
        let c = &self.columns;
        let mut row = Row::new();
        row.insert(c.key.clone(), node.key.into());
        row.insert(c.root.clone(), node.root.into());
        row.insert(c.left.clone(), node.lft.into());
        row.insert(c.right.clone(), node.rgt.into());
        row.insert(c.depth.clone(), node.depth.into());
        row.insert(c.name.clone(), node.name.clone().into());
        row.insert(
            c.icon.clone(),
            node.icon.clone().map_or(Value::Null, Value::String),
        );
        row.insert(c.icon_type.clone(), node.icon_type.code().into());
        for (column, value) in [
            (&c.active, node.active),
            (&c.visible, node.visible),
            (&c.disabled, node.disabled),
            (&c.readonly, node.readonly),
            (&c.collapsed, node.collapsed),
            (&c.selected, node.selected),
            (&c.movable_u, node.movable_u),
            (&c.movable_d, node.movable_d),
            (&c.movable_l, node.movable_l),
            (&c.movable_r, node.movable_r),
            (&c.removable, node.removable),
            (&c.removable_all, node.removable_all),
            (&c.child_allowed, node.child_allowed),
        ] {
            row.insert(column.clone(), value.into());
        }
        row
    }
}

fn missing(index: usize, column: &str) -> ApplicationError {
    ApplicationError::configuration(format!(
        "row {index}: required column '{column}' is missing"
    ))
}

fn required_int(row: &Row, index: usize, column: &str) -> ApplicationResult<i64> {
    match row.get(column) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
            ApplicationError::configuration(format!(
                "row {index}: column '{column}' must be an integer, got {n}"
            ))
        }),
        Some(other) => Err(ApplicationError::configuration(format!(
            "row {index}: column '{column}' must be an integer, got {other}"
        ))),
        None => Err(missing(index, column)),
    }
}

/// Booleans are accepted as JSON bools or 0/1 integers.
fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}
