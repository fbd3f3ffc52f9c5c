//! Configuration view and validation commands — `specflow config`.

use anyhow::{Context, Result};
use std::path::Path;

use super::super::{Cli, ConfigCommands};
use super::load_config;

pub fn cmd_config(cli: &Cli, project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    use specflow::config::{CONFIG_FILE, SpecflowToml, user_config_path};
    use specflow::init::get_specflow_dir;

    let specflow_dir = get_specflow_dir(project_dir);
    let config_path = specflow_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Specflow Configuration");
            println!("======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config.toml found at {}", config_path.display());
                println!("Run 'specflow config init' to create one.");
            }
            if let Some(user) = user_config_path().filter(|p| p.exists()) {
                println!("User config: {}", user.display());
            }
            println!();

            let config = load_config(cli, project_dir.to_path_buf())?;
            println!("[agent]");
            println!("  command = \"{}\"", config.toml.agent.command);
            println!("  args = {:?}", config.toml.agent.args);
            println!("  timeout_secs = {}", config.toml.agent.timeout_secs);
            println!();
            println!("[workflow]");
            println!("  max_retries = {}", config.toml.workflow.max_retries);
            println!("  specs_dir = \"{}\"", config.toml.workflow.specs_dir);
            println!("  state_dir = \"{}\"", config.toml.workflow.state_dir);
            println!();

            println!("Effective values (with env/CLI overrides):");
            println!("  agent_command = \"{}\"", config.agent_command());
            println!("  max_retries = {}", config.max_retries());
            println!("  timeout_secs = {}", config.timeout_secs());
            println!("  specs_dir = {}", config.specs_dir().display());
            println!("  state_dir = {}", config.state_dir().display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = load_config(cli, project_dir.to_path_buf())?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("config.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&specflow_dir).with_context(|| {
                format!("Failed to create directory: {}", specflow_dir.display())
            })?;
            SpecflowToml::default().save(&config_path)?;

            println!("Created config.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [agent] command, args, timeout_secs");
            println!("  - [workflow] max_retries, specs_dir, state_dir");
            println!();
        }
    }

    Ok(())
}
