//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nestview/nestview.toml`
//! 3. Local config: `<dir>/.nestview.toml`
//! 4. Environment variables: `NESTVIEW_*` prefix, `__` between sections
//!
//! The resulting [`Settings`] is validated once and then shared read-only.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Column names of the row store. Every node attribute maps to one column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnNames {
    pub key: String,
    pub root: String,
    pub left: String,
    pub right: String,
    pub depth: String,
    pub name: String,
    pub icon: String,
    pub icon_type: String,
    pub active: String,
    pub visible: String,
    pub disabled: String,
    pub readonly: String,
    pub collapsed: String,
    pub selected: String,
    pub movable_u: String,
    pub movable_d: String,
    pub movable_l: String,
    pub movable_r: String,
    pub removable: String,
    pub removable_all: String,
    pub child_allowed: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            key: "id".into(),
            root: "root".into(),
            left: "lft".into(),
            right: "rgt".into(),
            depth: "lvl".into(),
            name: "name".into(),
            icon: "icon".into(),
            icon_type: "icon_type".into(),
            active: "active".into(),
            visible: "visible".into(),
            disabled: "disabled".into(),
            readonly: "readonly".into(),
            collapsed: "collapsed".into(),
            selected: "selected".into(),
            movable_u: "movable_u".into(),
            movable_d: "movable_d".into(),
            movable_l: "movable_l".into(),
            movable_r: "movable_r".into(),
            removable: "removable".into(),
            removable_all: "removable_all".into(),
            child_allowed: "child_allowed".into(),
        }
    }
}

impl ColumnNames {
    /// All `(attribute, column)` pairs, required ones first.
    pub fn all(&self) -> [(&'static str, &str); 21] {
        [
            ("key", self.key.as_str()),
            ("root", self.root.as_str()),
            ("left", self.left.as_str()),
            ("right", self.right.as_str()),
            ("depth", self.depth.as_str()),
            ("name", self.name.as_str()),
            ("icon", self.icon.as_str()),
            ("icon_type", self.icon_type.as_str()),
            ("active", self.active.as_str()),
            ("visible", self.visible.as_str()),
            ("disabled", self.disabled.as_str()),
            ("readonly", self.readonly.as_str()),
            ("collapsed", self.collapsed.as_str()),
            ("selected", self.selected.as_str()),
            ("movable_u", self.movable_u.as_str()),
            ("movable_d", self.movable_d.as_str()),
            ("movable_l", self.movable_l.as_str()),
            ("movable_r", self.movable_r.as_str()),
            ("removable", self.removable.as_str()),
            ("removable_all", self.removable_all.as_str()),
            ("child_allowed", self.child_allowed.as_str()),
        ]
    }
}

/// Tree behaviour and display policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeOptions {
    /// Removal deactivates nodes instead of deleting rows
    pub soft_delete: bool,
    /// Whether new root trees may be created (directly or by moving left)
    pub allow_new_roots: bool,
    /// Render inactive (soft-deleted) nodes
    pub show_inactive: bool,
    /// Deepest allowed depth; `None` is unbounded, `Some(0)` is roots only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    /// Heading rendered above the tree
    pub root_label: String,
    /// Placeholder rendered for an empty tree
    pub empty_message: String,
    /// Append the node key to each label
    pub show_keys: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            soft_delete: true,
            allow_new_roots: true,
            show_inactive: false,
            max_depth: None,
            root_label: "Root".into(),
            empty_message: "No valid tree nodes are available for display.".into(),
            show_keys: false,
        }
    }
}

/// Default icons (CSS classes) for nodes without their own icon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IconSettings {
    pub parent: String,
    pub parent_open: String,
    pub child: String,
}

impl Default for IconSettings {
    fn default() -> Self {
        Self {
            parent: "fas fa-folder".into(),
            parent_open: "fas fa-folder-open".into(),
            child: "fas fa-file".into(),
        }
    }
}

/// Tree picker input settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputOptions {
    /// Form field name of the hidden input
    pub field_name: String,
    /// Allow selecting more than one node
    pub multiple: bool,
    /// Caption shown when nothing is selected
    pub placeholder: String,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            field_name: "selection".into(),
            multiple: true,
            placeholder: "Select...".into(),
        }
    }
}

/// Unified configuration for nestview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// JSON row store (default: nestview.json in the data dir)
    pub store: PathBuf,
    pub columns: ColumnNames,
    pub tree: TreeOptions,
    pub icons: IconSettings,
    pub input: InputOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: default_store_path(),
            columns: ColumnNames::default(),
            tree: TreeOptions::default(),
            icons: IconSettings::default(),
            input: InputOptions::default(),
        }
    }
}

fn default_store_path() -> PathBuf {
    ProjectDirs::from("", "", "nestview")
        .map(|dirs| dirs.data_dir().join("nestview.json"))
        .unwrap_or_else(|| PathBuf::from("nestview.json"))
}

/// Get the XDG config directory for nestview.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nestview").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nestview.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".nestview.toml")
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.nestview.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = Config::try_from(&Settings::default()).map_err(config_err)?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                builder = builder.add_source(File::from(global_path).required(true));
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("local config: {}", local_path.display());
                builder = builder.add_source(File::from(local_path).required(true));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("NESTVIEW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a settings document directly (defaults fill missing keys).
    pub fn from_toml(content: &str) -> Result<Self, ApplicationError> {
        let mut settings: Self = toml::from_str(content).map_err(|e| {
            ApplicationError::configuration(format!("parse settings: {e}"))
        })?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the store path.
    fn expand_paths(&mut self) {
        let raw = self.store.to_string_lossy().to_string();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.store = PathBuf::from(expanded.into_owned());
        }
    }

    /// Reject column mappings the loader cannot work with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| ApplicationError::configuration(e.to_string()))?;
        let mut seen = HashSet::new();
        for (attribute, column) in self.columns.all() {
            if !ident.is_match(column) {
                return Err(ApplicationError::configuration(format!(
                    "column for '{attribute}' is not a valid identifier: '{column}'"
                )));
            }
            if !seen.insert(column) {
                return Err(ApplicationError::configuration(format!(
                    "column '{column}' is mapped more than once"
                )));
            }
        }
        if self.input.field_name.trim().is_empty() {
            return Err(ApplicationError::configuration(
                "input field name must not be empty",
            ));
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self)
            .map_err(|e| ApplicationError::configuration(format!("serialize config: {e}")))
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# nestview configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/nestview/nestview.toml
#   Local:  ./.nestview.toml
#   Env:    NESTVIEW_* environment variables, e.g. NESTVIEW_TREE__SOFT_DELETE=false

# JSON row store
# store = "~/.local/share/nestview/nestview.json"

[columns]
# Map node attributes to store columns
# key = "id"
# root = "root"
# left = "lft"
# right = "rgt"
# depth = "lvl"
# name = "name"

[tree]
# Removal only deactivates nodes
# soft_delete = true
# Allow creating new root trees
# allow_new_roots = true
# Render soft-deleted nodes
# show_inactive = false
# Limit nesting (0 = roots only)
# max_depth = 5

[icons]
# parent = "fas fa-folder"
# parent_open = "fas fa-folder-open"
# child = "fas fa-file"

[input]
# field_name = "selection"
# multiple = true
# placeholder = "Select..."
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::configuration(e.to_string())
}
