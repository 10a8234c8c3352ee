//! Waypoint CLI - a local-first learning progress tracker.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use waypoint::cli::{
    BadgeCommands, Cli, Commands, ConfigCommands, NoteCommands, SyncCommands, TokenCommands,
    XpCommands,
};
use waypoint::commands::{self, Output};
use waypoint::config::{ConfigOverrides, OutputFormat, resolve_config};
use waypoint::store::{Store, data_root};
use waypoint::{Error, action_log};

fn main() {
    let cli = Cli::parse();
    let profile = cli.profile.clone();

    // Resolve the profile's data directory
    let root = match data_root(&profile) {
        Ok(root) => root,
        Err(e) => {
            eprintln!(r#"{{"error": "{}"}}"#, e);
            process::exit(1);
        }
    };

    // -H wins; otherwise the resolved output-format preference decides
    let human = cli.human_readable || prefers_human(&root);

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    // Start timing
    let start = Instant::now();

    // Execute command
    let result = run_command(cli.command, &root, human);

    // Calculate duration
    let duration = start.elapsed().as_millis() as u64;

    // Determine success/error
    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Log the action (never fails a command)
    action_log::log_action(&profile, &cmd_name, args_json, success, error, duration);

    // Handle result
    if let Err(e) = result {
        if let Error::NotInitialized = e {
            if human {
                eprintln!("Error: no waypoint data found for this profile.\n");
                eprintln!("To initialize it:");
                eprintln!("    wp init\n");
                eprintln!("Data location: {}", root.display());
            } else {
                let err = serde_json::json!({
                    "error": "No waypoint data found for this profile",
                    "hint": "run 'wp init' first",
                    "path": root,
                });
                eprintln!("{}", err);
            }
        } else if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        }
        process::exit(1);
    }
}

/// Check the resolved output-format preference for an initialized profile.
///
/// Before `wp init` there is nothing to read; JSON stays the default.
fn prefers_human(root: &Path) -> bool {
    let Ok(store) = Store::open(root) else {
        return false;
    };
    match resolve_config(&store, &ConfigOverrides::default()) {
        Ok(config) => *config.output_format() == OutputFormat::Human,
        Err(_) => false,
    }
}

fn run_command(command: Commands, root: &PathBuf, human: bool) -> Result<(), Error> {
    match command {
        Commands::Init => {
            let result = commands::init(root)?;
            output(&result, human);
        }

        Commands::Toggle { module, state } => {
            let result = commands::toggle(root, module, state)?;
            output(&result, human);
        }

        Commands::Subtask { module, task } => {
            let result = commands::subtask(root, module, task)?;
            output(&result, human);
        }

        Commands::Note { command } => match command {
            NoteCommands::Set { module, text } => {
                let result = commands::note_set(root, module, &text.join(" "))?;
                output(&result, human);
            }
            NoteCommands::Show { module } => {
                let result = commands::note_show(root, module)?;
                output(&result, human);
            }
        },

        Commands::Badge { command } => match command {
            BadgeCommands::Add { name } => {
                let result = commands::badge_add(root, &name)?;
                output(&result, human);
            }
            BadgeCommands::List => {
                let result = commands::badge_list(root)?;
                output(&result, human);
            }
        },

        Commands::Xp { command } => match command {
            XpCommands::Add { amount } => {
                let result = commands::xp_add(root, amount)?;
                output(&result, human);
            }
            XpCommands::Show => {
                let result = commands::xp_show(root)?;
                output(&result, human);
            }
        },

        Commands::Status => {
            let result = commands::status(root)?;
            output(&result, human);
        }

        Commands::Sync { command } => match command {
            SyncCommands::Push => {
                let result = commands::sync_push(root)?;
                output(&result, human);
            }
            SyncCommands::Pull => {
                let result = commands::sync_pull(root)?;
                output(&result, human);
            }
        },

        Commands::Export { output: out_file } => {
            let result = commands::export(root, out_file.as_deref())?;
            output(&result, human);
        }

        Commands::Import { file } => {
            let result = commands::import(root, &file)?;
            output(&result, human);
        }

        Commands::Reset { force } => {
            let result = commands::reset(root, force)?;
            output(&result, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(root, &key)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(root, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::Show => {
                let result = commands::config_show(root)?;
                output(&result, human);
            }
        },

        Commands::Token { command } => match command {
            TokenCommands::Set { token } => {
                let result = commands::token_set(root, &token)?;
                output(&result, human);
            }
            TokenCommands::Show => {
                let result = commands::token_show(root)?;
                output(&result, human);
            }
            TokenCommands::Clear => {
                let result = commands::token_clear(root)?;
                output(&result, human);
            }
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Serialize the parsed command into a name and argument JSON for the
/// action log. Sensitive values are redacted by the log's sanitizer via
/// their key names.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    use serde_json::json;

    match command {
        Commands::Init => ("init".to_string(), json!({})),
        Commands::Toggle { module, state } => (
            "toggle".to_string(),
            json!({"module": module, "state": state}),
        ),
        Commands::Subtask { module, task } => (
            "subtask".to_string(),
            json!({"module": module, "task": task}),
        ),
        Commands::Note { command } => match command {
            NoteCommands::Set { module, text } => (
                "note set".to_string(),
                json!({"module": module, "chars": text.join(" ").len()}),
            ),
            NoteCommands::Show { module } => ("note show".to_string(), json!({"module": module})),
        },
        Commands::Badge { command } => match command {
            BadgeCommands::Add { name } => ("badge add".to_string(), json!({"name": name})),
            BadgeCommands::List => ("badge list".to_string(), json!({})),
        },
        Commands::Xp { command } => match command {
            XpCommands::Add { amount } => ("xp add".to_string(), json!({"amount": amount})),
            XpCommands::Show => ("xp show".to_string(), json!({})),
        },
        Commands::Status => ("status".to_string(), json!({})),
        Commands::Sync { command } => match command {
            SyncCommands::Push => ("sync push".to_string(), json!({})),
            SyncCommands::Pull => ("sync pull".to_string(), json!({})),
        },
        Commands::Export { output } => (
            "export".to_string(),
            json!({"output": output.as_ref().map(|p| p.display().to_string())}),
        ),
        Commands::Import { file } => (
            "import".to_string(),
            json!({"file": file.display().to_string()}),
        ),
        Commands::Reset { force } => ("reset".to_string(), json!({"force": force})),
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => ("config get".to_string(), json!({"key": key})),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                json!({"key": key, "value": value}),
            ),
            ConfigCommands::Show => ("config show".to_string(), json!({})),
        },
        Commands::Token { command } => match command {
            TokenCommands::Set { token } => {
                ("token set".to_string(), json!({"token": token}))
            }
            TokenCommands::Show => ("token show".to_string(), json!({})),
            TokenCommands::Clear => ("token clear".to_string(), json!({})),
        },
    }
}
