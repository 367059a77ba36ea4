//! Command dispatch: one handler per subcommand

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::application::{
    ApplicationResult, NodeResponse, RenderContext, TreeScope,
};
use crate::application::services::MutationOutcome;
use crate::cli::args::{Cli, Commands, ConfigCommands, DraftArgs, ScopeArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{IconType, NodeAttributes, NodeDraft, NodeFlags, NodeKey};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `nestview --help`".into(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(cli, command),
        _ => {
            let container = ServiceContainer::new(load_settings(cli)?);
            dispatch(cli, command, &container)
        }
    }
}

fn dispatch(cli: &Cli, command: &Commands, container: &ServiceContainer) -> CliResult<()> {
    let tree = &container.tree;
    match command {
        Commands::Render { scope } => cmd_render(cli, container, scope),
        Commands::Show { scope } => {
            let text = tree.render_text(&to_scope(scope), &to_context(scope))?;
            output::info(&text);
            Ok(())
        }
        Commands::Input { value, scope } => {
            let rendered = tree.render_input(&to_scope(scope), value, &to_context(scope))?;
            if cli.json {
                print_json(&json!({
                    "value": rendered.selection.to_csv(),
                    "html": rendered.html,
                }))
            } else {
                output::info(&rendered.html);
                Ok(())
            }
        }
        Commands::Create { parent, draft } => report(cli, tree.create(*parent, to_draft(draft))),
        Commands::CreateRoot { draft } => report(cli, tree.create_root(to_draft(draft))),
        Commands::Move { key, direction } => report(cli, tree.move_node(*key, *direction)),
        Commands::Remove { key } => report(cli, tree.remove(*key)),
        Commands::Restore { key } => report(cli, tree.restore(*key)),
        Commands::Save {
            key,
            name,
            icon,
            clear_icon,
            icon_type,
            flags,
        } => {
            let attributes = to_attributes(name, icon, *clear_icon, *icon_type, flags)?;
            report(cli, tree.save(*key, attributes))
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = project_dir(cli)?;
    let mut settings = Settings::load(Some(&dir))?;
    if let Some(store) = &cli.store {
        settings.store = store.clone();
    }
    debug!("store: {}", settings.store.display());
    Ok(settings)
}

fn project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e).into()),
    }
}

#[instrument(level = "debug", skip(cli, container))]
fn cmd_render(cli: &Cli, container: &ServiceContainer, scope: &ScopeArgs) -> CliResult<()> {
    let rendered = container
        .tree
        .render(&to_scope(scope), &to_context(scope))?;
    if cli.json {
        print_json(&json!({
            "html": rendered.html,
            "nodes": rendered.nodes,
            "stats": rendered.stats,
        }))
    } else {
        output::info(&rendered.html);
        Ok(())
    }
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let dir = project_dir(cli)?;
            output::header("Config paths");
            match global_config_path() {
                Some(path) => output::field("global", &describe(path)),
                None => output::field("global", "(no home directory)"),
            }
            output::field("local", &describe(local_config_path(&dir)));
        }
    }
    Ok(())
}

fn describe(path: PathBuf) -> String {
    let state = if path.exists() { "" } else { " (not found)" };
    format!("{}{}", path.display(), state)
}

/// Print a mutation result. In JSON mode the error payload is printed too,
/// and the error is still returned so the exit code reflects it.
fn report(cli: &Cli, result: ApplicationResult<MutationOutcome>) -> CliResult<()> {
    if cli.json {
        print_json(&NodeResponse::from_result(&result))?;
        result?;
        return Ok(());
    }
    let outcome = result?;
    output::success(&outcome.message);
    for n in &outcome.affected {
        output::node_line(n.key, &n.name, n.lft, n.rgt, n.depth, n.active);
    }
    if !outcome.removed.is_empty() {
        let keys: Vec<String> = outcome.removed.iter().map(NodeKey::to_string).collect();
        output::field("removed", &keys.join(", "));
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| InfraError::Serialization {
        context: "render response".into(),
        source: e,
    })?;
    output::info(&text);
    Ok(())
}

fn to_scope(args: &ScopeArgs) -> TreeScope {
    match (args.subtree, args.roots.is_empty()) {
        (Some(key), _) => TreeScope::Subtree(key),
        (None, false) => TreeScope::Roots(args.roots.clone()),
        (None, true) => TreeScope::All,
    }
}

fn to_context(args: &ScopeArgs) -> RenderContext {
    RenderContext {
        selected: args.selected,
        admin: args.admin,
    }
}

fn to_draft(args: &DraftArgs) -> NodeDraft {
    let mut draft = NodeDraft::new(args.name.clone());
    if let Some(icon) = &args.icon {
        let icon_type = if args.raw_icon {
            IconType::Raw
        } else {
            IconType::Css
        };
        draft = draft.with_icon(icon.clone(), icon_type);
    }
    if args.no_children {
        draft = draft.with_flags(NodeFlags {
            child_allowed: Some(false),
            ..NodeFlags::default()
        });
    }
    draft
}

fn to_attributes(
    name: &Option<String>,
    icon: &Option<String>,
    clear_icon: bool,
    icon_type: Option<IconType>,
    flags: &[String],
) -> CliResult<NodeAttributes> {
    let mut attributes = NodeAttributes {
        name: name.clone(),
        icon: if clear_icon {
            Some(None)
        } else {
            icon.clone().map(Some)
        },
        icon_type,
        flags: NodeFlags::default(),
    };
    for assignment in flags {
        let (flag, value) = assignment
            .split_once('=')
            .ok_or_else(|| CliError::InvalidArgs(format!("expected FLAG=BOOL, got '{assignment}'")))?;
        let value: bool = value.trim().parse().map_err(|_| {
            CliError::InvalidArgs(format!("'{value}' is not a boolean for flag '{flag}'"))
        })?;
        attributes
            .flags
            .set(flag.trim(), value)
            .map_err(|e| CliError::InvalidArgs(e.to_string()))?;
    }
    Ok(attributes)
}
