//! Command dispatch: maps subcommands onto the tree service.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::services::CancelFlag;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{ResolveArgs, ScalarValue, TreeDisplay, PATH_SEPARATOR};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `cfgtree --help`".into(),
        ));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let local_dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().map_err(|e| InfraError::io("resolve current directory", e))?,
    };
    let settings = Settings::load(Some(local_dir.as_path()))?;
    debug!("settings: {:?}", settings);

    if let Commands::Config { command } = command {
        return cmd_config(command, &settings, &local_dir);
    }

    let container = ServiceContainer::new(settings);
    match command {
        Commands::Add {
            label,
            parent,
            value,
        } => cmd_add(&container, label, parent.as_deref(), value.as_deref()),
        Commands::Set { path, value, json } => cmd_set(&container, path, value, *json),
        Commands::Get { path } => cmd_get(&container, path),
        Commands::Rm { path } => cmd_rm(&container, path),
        Commands::Rename { path, label } => cmd_rename(&container, path, label),
        Commands::Clear => cmd_clear(&container),
        Commands::Tree => cmd_tree(&container),
        Commands::Commands => cmd_commands(&container),
        Commands::Export { file } => cmd_export(&container, file.as_deref()),
        Commands::Import { file } => cmd_import(&container, file.as_deref()),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

/// Interpret a command-line value, optionally as JSON.
fn parse_value(raw: &str, json: bool) -> CliResult<ScalarValue> {
    if !json {
        return Ok(ScalarValue::from(raw));
    }
    let parsed: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CliError::InvalidArgs(format!("--json value is not JSON: {e}")))?;
    Ok(ScalarValue::try_from(parsed).map_err(ApplicationError::from)?)
}

fn join_path(parent: Option<&str>, label: &str) -> String {
    match parent {
        Some(p) => format!("{p}{PATH_SEPARATOR}{label}"),
        None => label.to_string(),
    }
}

#[instrument(skip(container))]
fn cmd_add(
    container: &ServiceContainer,
    label: &str,
    parent: Option<&str>,
    value: Option<&str>,
) -> CliResult<()> {
    let tree = &container.tree;
    let value = value.map(ScalarValue::from);
    match parent {
        Some(path) => {
            let parent_id = tree.locate(path)?;
            tree.add_child_to_item(parent_id, label, value)?;
        }
        None => {
            let id = tree.add_root_item(label)?;
            if let Some(value) = value {
                tree.set_item_value(id, value)?;
            }
        }
    }
    output::success(&format!("added {}", join_path(parent, label)));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_set(container: &ServiceContainer, path: &str, value: &str, json: bool) -> CliResult<()> {
    let value = parse_value(value, json)?;
    let id = container.tree.locate(path)?;
    container.tree.set_item_value(id, value)?;
    output::success(&format!("set {path}"));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_get(container: &ServiceContainer, path: &str) -> CliResult<()> {
    let value = container.tree.resolve(&ResolveArgs {
        path: path.to_string(),
    })?;
    output::info(&value);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_rm(container: &ServiceContainer, path: &str) -> CliResult<()> {
    let id = container.tree.locate(path)?;
    if container.tree.remove_item(id)? {
        output::success(&format!("removed {path}"));
    } else {
        output::warning(&format!("{path} was already gone"));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_rename(container: &ServiceContainer, path: &str, label: &str) -> CliResult<()> {
    let id = container.tree.locate(path)?;
    container.tree.rename_item(id, label)?;
    output::success(&format!("renamed {path} to {label}"));
    Ok(())
}

fn cmd_clear(container: &ServiceContainer) -> CliResult<()> {
    container.tree.clear()?;
    output::success("cleared all items");
    Ok(())
}

fn cmd_tree(container: &ServiceContainer) -> CliResult<()> {
    let trees = container.tree.read(|store| store.to_display_trees());
    if trees.is_empty() {
        output::detail("(empty)");
    }
    for tree in trees {
        output::info(&tree);
    }
    Ok(())
}

fn cmd_commands(container: &ServiceContainer) -> CliResult<()> {
    let descriptors = container.tree.generate_commands();
    let json = serde_json::to_string_pretty(&descriptors).map_err(|e| {
        ApplicationError::OperationFailed {
            context: "serialize command descriptors".into(),
            source: Box::new(e),
        }
    })?;
    output::info(&json);
    Ok(())
}

fn target_file(container: &ServiceContainer, file: Option<&Path>) -> PathBuf {
    file.map(Path::to_path_buf)
        .unwrap_or_else(|| container.settings.export_file.clone())
}

#[instrument(skip(container))]
fn cmd_export(container: &ServiceContainer, file: Option<&Path>) -> CliResult<()> {
    let path = target_file(container, file);
    container.tree.export_to_file(&path, &CancelFlag::new())?;
    output::action("Exported", &path.display());
    Ok(())
}

#[instrument(skip(container))]
fn cmd_import(container: &ServiceContainer, file: Option<&Path>) -> CliResult<()> {
    let path = target_file(container, file);
    let count = container.tree.import_from_file(&path, &CancelFlag::new())?;
    output::action("Imported", &format!("{count} items from {}", path.display()));
    Ok(())
}

fn cmd_config(command: &ConfigCommands, settings: &Settings, local_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            output::header("Config files");
            match global_config_path() {
                Some(p) => output::detail(&format!("global: {}", p.display())),
                None => output::detail("global: (no config directory)"),
            }
            output::detail(&format!("local:  {}", local_config_path(local_dir).display()));
            output::header("State");
            output::detail(&format!("state file: {}", settings.state_file.display()));
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path()
                    .ok_or_else(|| CliError::Usage("cannot determine global config directory".into()))?
            } else {
                local_config_path(local_dir)
            };
            let fs = RealFileSystem;
            if fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            fs.ensure_parent(&path)
                .and_then(|_| fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn given_plain_value_when_parsing_then_kept_verbatim() {
        assert_eq!(parse_value("[1]", false).unwrap().as_str(), "[1]");
    }

    #[test]
    fn given_json_number_when_parsing_then_stringified() {
        assert_eq!(parse_value("8080", true).unwrap().as_str(), "8080");
    }

    #[test]
    fn given_json_array_when_parsing_then_invalid_value_type() {
        let err = parse_value("[1, 2]", true).unwrap_err();
        assert!(matches!(
            err,
            CliError::Infra(InfraError::Application(ApplicationError::Domain(
                DomainError::InvalidValueType(_)
            )))
        ));
    }

    #[test]
    fn given_broken_json_when_parsing_then_invalid_args() {
        assert!(matches!(
            parse_value("{", true).unwrap_err(),
            CliError::InvalidArgs(_)
        ));
    }

    #[test]
    fn given_parent_when_joining_then_dotted() {
        assert_eq!(join_path(Some("a.b"), "c"), "a.b.c");
        assert_eq!(join_path(None, "c"), "c");
    }
}
