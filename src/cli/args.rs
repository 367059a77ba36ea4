//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::domain::{Direction, IconType, NodeKey};

/// Nested-set tree view: render, edit and pick nodes of a tree store
#[derive(Parser, Debug)]
#[command(name = "nestview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Row store file (overrides the `store` setting)
    #[arg(short, long, global = true, env = "NESTVIEW_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,

    /// Print mutation results as JSON response payloads
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory holding `.nestview.toml` (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which part of the forest a read command works on.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Only these trees (root keys)
    #[arg(long = "root", value_delimiter = ',', conflicts_with = "subtree")]
    pub roots: Vec<NodeKey>,

    /// Only this node and its descendants
    #[arg(long)]
    pub subtree: Option<NodeKey>,

    /// Render as admin: invisible nodes are shown
    #[arg(long)]
    pub admin: bool,

    /// Selected node; its ancestors are expanded
    #[arg(long)]
    pub selected: Option<NodeKey>,
}

/// Display attributes for a new node.
#[derive(Args, Debug, Clone)]
pub struct DraftArgs {
    /// Node label
    pub name: String,

    /// Icon: CSS class, or markup with `--raw-icon`
    #[arg(long)]
    pub icon: Option<String>,

    /// Treat the icon as raw markup
    #[arg(long)]
    pub raw_icon: bool,

    /// Leaf-only node: refuses children
    #[arg(long)]
    pub no_children: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the tree as HTML
    Render {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Show the tree in the terminal
    Show {
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Create a node as the last child of PARENT
    Create {
        /// Parent node key
        parent: NodeKey,
        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Create a new tree
    CreateRoot {
        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Move a node one step: up, down, left or right
    Move {
        key: NodeKey,
        /// u|up, d|down, l|left, r|right
        direction: Direction,
    },

    /// Remove a node (soft delete unless disabled in settings)
    Remove { key: NodeKey },

    /// Reactivate a soft-deleted node and its descendants
    Restore { key: NodeKey },

    /// Edit a node's attributes
    Save {
        key: NodeKey,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_icon")]
        icon: Option<String>,
        #[arg(long)]
        clear_icon: bool,
        #[arg(long, value_parser = parse_icon_type)]
        icon_type: Option<IconType>,
        /// Set flags, e.g. `--set readonly=true --set collapsed=false`
        #[arg(long = "set", value_name = "FLAG=BOOL")]
        flags: Vec<String>,
    },

    /// Render the tree picker input
    Input {
        /// Submitted hidden-input value (comma-separated keys)
        #[arg(default_value = "")]
        value: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Show config paths
    Path,
}

fn parse_icon_type(s: &str) -> Result<IconType, String> {
    match s.to_ascii_lowercase().as_str() {
        "css" => Ok(IconType::Css),
        "raw" => Ok(IconType::Raw),
        other => Err(format!("unknown icon type '{other}', expected css or raw")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    // https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_move_args_when_parsing_then_direction_decoded() {
        let cli = Cli::try_parse_from(["nestview", "-dd", "move", "7", "l"]).unwrap();
        assert_eq!(cli.debug, 2);
        match cli.command {
            Some(Commands::Move { key, direction }) => {
                assert_eq!(key, 7);
                assert_eq!(direction, Direction::Left);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
