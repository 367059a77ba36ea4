//! Node records: one row of a nested-set tree

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Unique node identifier.
pub type NodeKey = i64;

/// How a node's `icon` value is interpreted when rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    /// `icon` is a CSS class list rendered as `<i class="...">`
    #[default]
    Css,
    /// `icon` is trusted markup emitted verbatim
    Raw,
}

impl IconType {
    /// Numeric code used by row stores (1 = css, 2 = raw).
    pub fn code(self) -> i64 {
        match self {
            IconType::Css => 1,
            IconType::Raw => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(IconType::Css),
            2 => Some(IconType::Raw),
            _ => None,
        }
    }
}

/// Direction of a single-step move, as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Swap with the previous sibling
    Up,
    /// Swap with the next sibling
    Down,
    /// Become the next sibling of the parent
    Left,
    /// Become the last child of the previous sibling
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Single-letter code used in markup attributes (`u`, `d`, `l`, `r`).
    pub fn code(self) -> char {
        match self {
            Direction::Up => 'u',
            Direction::Down => 'd',
            Direction::Left => 'l',
            Direction::Right => 'r',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

impl FromStr for Direction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u" | "up" => Ok(Direction::Up),
            "d" | "down" => Ok(Direction::Down),
            "l" | "left" => Ok(Direction::Left),
            "r" | "right" => Ok(Direction::Right),
            other => Err(DomainError::invalid(format!("unknown move direction: {other}"))),
        }
    }
}

/// One tree entry with its nested-set coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    /// Key of the root node of the tree this node belongs to
    pub root: NodeKey,
    pub lft: i64,
    pub rgt: i64,
    /// Distance from the tree's root, 0 for roots
    pub depth: u32,
    pub name: String,
    pub icon: Option<String>,
    pub icon_type: IconType,

    pub active: bool,
    pub visible: bool,
    pub disabled: bool,
    pub readonly: bool,
    pub collapsed: bool,
    pub selected: bool,

    pub movable_u: bool,
    pub movable_d: bool,
    pub movable_l: bool,
    pub movable_r: bool,
    pub removable: bool,
    pub removable_all: bool,
    pub child_allowed: bool,
}

impl Node {
    /// Build a saved node from a draft and its coordinates.
    pub fn from_draft(
        key: NodeKey,
        root: NodeKey,
        lft: i64,
        rgt: i64,
        depth: u32,
        draft: NodeDraft,
    ) -> Self {
        let NodeDraft {
            name,
            icon,
            icon_type,
            flags,
        } = draft;
        let mut node = Self {
            key,
            root,
            lft,
            rgt,
            depth,
            name,
            icon,
            icon_type,
            active: true,
            visible: true,
            disabled: false,
            readonly: false,
            collapsed: false,
            selected: false,
            movable_u: true,
            movable_d: true,
            movable_l: true,
            movable_r: true,
            removable: true,
            removable_all: false,
            child_allowed: true,
        };
        flags.apply_to(&mut node);
        node
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Number of descendants, derived from the interval width.
    pub fn descendant_count(&self) -> usize {
        usize::try_from((self.rgt - self.lft - 1) / 2).unwrap_or(0)
    }

    /// Width of the interval, i.e. `2 * subtree size`.
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// True when `other` is a strict descendant of this node.
    pub fn contains(&self, other: &Node) -> bool {
        self.root == other.root && self.lft < other.lft && other.rgt < self.rgt
    }

    /// The node's own permission flag for a direction, ignoring position.
    pub fn movable_flag(&self, direction: Direction) -> bool {
        !self.readonly
            && match direction {
                Direction::Up => self.movable_u,
                Direction::Down => self.movable_d,
                Direction::Left => self.movable_l,
                Direction::Right => self.movable_r,
            }
    }

    pub fn attributes(&self) -> NodeAttributes {
        NodeAttributes {
            name: Some(self.name.clone()),
            icon: Some(self.icon.clone()),
            icon_type: Some(self.icon_type),
            flags: NodeFlags::from_node(self),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.key)
    }
}

/// Optional flag overrides; `None` keeps the current or default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFlags {
    pub active: Option<bool>,
    pub visible: Option<bool>,
    pub disabled: Option<bool>,
    pub readonly: Option<bool>,
    pub collapsed: Option<bool>,
    pub selected: Option<bool>,
    pub movable_u: Option<bool>,
    pub movable_d: Option<bool>,
    pub movable_l: Option<bool>,
    pub movable_r: Option<bool>,
    pub removable: Option<bool>,
    pub removable_all: Option<bool>,
    pub child_allowed: Option<bool>,
}

impl NodeFlags {
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(v) = self.active {
            node.active = v;
        }
        if let Some(v) = self.visible {
            node.visible = v;
        }
        if let Some(v) = self.disabled {
            node.disabled = v;
        }
        if let Some(v) = self.readonly {
            node.readonly = v;
        }
        if let Some(v) = self.collapsed {
            node.collapsed = v;
        }
        if let Some(v) = self.selected {
            node.selected = v;
        }
        if let Some(v) = self.movable_u {
            node.movable_u = v;
        }
        if let Some(v) = self.movable_d {
            node.movable_d = v;
        }
        if let Some(v) = self.movable_l {
            node.movable_l = v;
        }
        if let Some(v) = self.movable_r {
            node.movable_r = v;
        }
        if let Some(v) = self.removable {
            node.removable = v;
        }
        if let Some(v) = self.removable_all {
            node.removable_all = v;
        }
        if let Some(v) = self.child_allowed {
            node.child_allowed = v;
        }
    }

    pub fn from_node(node: &Node) -> Self {
        Self {
            active: Some(node.active),
            visible: Some(node.visible),
            disabled: Some(node.disabled),
            readonly: Some(node.readonly),
            collapsed: Some(node.collapsed),
            selected: Some(node.selected),
            movable_u: Some(node.movable_u),
            movable_d: Some(node.movable_d),
            movable_l: Some(node.movable_l),
            movable_r: Some(node.movable_r),
            removable: Some(node.removable),
            removable_all: Some(node.removable_all),
            child_allowed: Some(node.child_allowed),
        }
    }

    /// Set one flag by its field name, as given on a command line.
    pub fn set(&mut self, name: &str, value: bool) -> Result<(), DomainError> {
        let slot = match name {
            "active" => &mut self.active,
            "visible" => &mut self.visible,
            "disabled" => &mut self.disabled,
            "readonly" => &mut self.readonly,
            "collapsed" => &mut self.collapsed,
            "selected" => &mut self.selected,
            "movable_u" => &mut self.movable_u,
            "movable_d" => &mut self.movable_d,
            "movable_l" => &mut self.movable_l,
            "movable_r" => &mut self.movable_r,
            "removable" => &mut self.removable,
            "removable_all" => &mut self.removable_all,
            "child_allowed" => &mut self.child_allowed,
            other => return Err(DomainError::invalid(format!("unknown node flag: {other}"))),
        };
        *slot = Some(value);
        Ok(())
    }
}

/// Editable, coordinate-free attributes of a saved node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeAttributes {
    pub name: Option<String>,
    /// `Some(None)` clears the icon
    pub icon: Option<Option<String>>,
    pub icon_type: Option<IconType>,
    pub flags: NodeFlags,
}

impl NodeAttributes {
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(name) = &self.name {
            node.name = name.trim().to_string();
        }
        if let Some(icon) = &self.icon {
            node.icon = icon.clone();
        }
        if let Some(icon_type) = self.icon_type {
            node.icon_type = icon_type;
        }
        self.flags.apply_to(node);
    }
}

/// An unsaved node: display attributes without coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDraft {
    pub name: String,
    pub icon: Option<String>,
    pub icon_type: IconType,
    pub flags: NodeFlags,
}

impl NodeDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>, icon_type: IconType) -> Self {
        self.icon = Some(icon.into());
        self.icon_type = icon_type;
        self
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }
}
