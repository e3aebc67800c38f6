//! Implementation of the `gitbridge config` commands.
//!
//! Values are printed to stdout. A setting that is not set (and has no
//! `--default`) is a user error, so scripts can tell it apart from an empty
//! value.

use super::Session;
use crate::cli::{ConfigAction, ConfigCommand, ConfigGetArgs, ConfigGetIntArgs};
use gitbridge::config::ConfigScope;
use gitbridge::error::{GitBridgeError, Result};
use gitbridge::git::{ConfigResult, ConfigSettings, GitProcess};
use gitbridge::platform::PhysicalFileSystem;

/// Dispatch config subcommands.
pub fn dispatch_config(session: &Session, config_cmd: ConfigCommand) -> Result<()> {
    match config_cmd.action {
        ConfigAction::Get(args) => cmd_config_get(session, args),
        ConfigAction::GetInt(args) => cmd_config_get_int(session, args),
        ConfigAction::List(args) => {
            let settings = session.process.try_get_all_config(args.local)?;
            print_lines(format_settings(&settings, '='));
            Ok(())
        }
        ConfigAction::GetAll(args) => {
            let multi = session.process.get_multi_config(&args.name);
            let checked = ConfigResult::new(multi.result.clone(), &args.name);
            checked.try_parse_as_string(None)?;
            print_lines(multi.values);
            Ok(())
        }
        ConfigAction::UrlMatch(args) => {
            let settings = session
                .process
                .try_get_config_url_match(&args.section, &args.url)?;
            print_lines(format_settings(&settings, ' '));
            Ok(())
        }
    }
}

fn cmd_config_get(session: &Session, args: ConfigGetArgs) -> Result<()> {
    let result = read_setting(session, &args.name, &args.scope)?;
    match result.try_parse_as_string(args.default.as_deref())? {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => Err(not_set(&args.name)),
    }
}

fn cmd_config_get_int(session: &Session, args: ConfigGetIntArgs) -> Result<()> {
    let result = read_setting(session, &args.name, "any")?;
    let value = result.try_parse_as_int(args.default, args.min)?;
    println!("{}", value);
    Ok(())
}

fn read_setting(session: &Session, name: &str, scope: &str) -> Result<ConfigResult> {
    let scope = ConfigScope::from_str(scope).ok_or_else(|| {
        GitBridgeError::UserError(format!(
            "invalid config scope '{}' (expected any, local, global, or system)",
            scope
        ))
    })?;

    match scope {
        ConfigScope::Any => Ok(session
            .process
            .get_from_config(name, false, &PhysicalFileSystem)),
        ConfigScope::Local => {
            if session.enlistment.is_none() {
                return Err(GitBridgeError::UserError(
                    "--scope local needs a repository (use --repo)".to_string(),
                ));
            }
            Ok(session.process.get_from_local_config(name))
        }
        ConfigScope::Global => GitProcess::get_from_global_config(&session.config, name),
        ConfigScope::System => GitProcess::get_from_system_config(&session.config, name),
    }
}

fn not_set(name: &str) -> GitBridgeError {
    GitBridgeError::UserError(format!("config setting '{}' is not set", name))
}

/// One `key<sep>value` line per value, in key order.
pub fn format_settings(settings: &ConfigSettings, separator: char) -> Vec<String> {
    settings
        .values()
        .flat_map(|setting| {
            setting
                .values
                .iter()
                .map(move |value| format!("{}{}{}", setting.name, separator, value))
        })
        .collect()
}

fn print_lines(lines: impl IntoIterator<Item = String>) {
    for line in lines {
        println!("{}", line);
    }
}
