//! Configuration view and validation commands: `scrumboard config`.

use anyhow::Result;

use scrumboard::config::{CONFIG_FILE, Config, ScrumboardToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_path();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Scrumboard Configuration");
            println!("========================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found at {}", CONFIG_FILE, config_path.display());
                println!("Using defaults. Run 'scrumboard config init' to create one.");
            }
            println!();

            // Effective values, after env and CLI overrides
            let server = config.server_config();
            println!("[client]");
            println!("  api_url = \"{}\"", config.api_url());
            println!("  timeout_secs = {}", config.toml.client.timeout_secs);
            println!();
            println!("[server]");
            println!("  port = {}", server.port);
            println!("  db_path = \"{}\"", server.db_path.display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

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
                println!("{} already exists at {}", CONFIG_FILE, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config.config_dir.exists() {
                std::fs::create_dir_all(&config.config_dir)?;
            }

            ScrumboardToml::default().save(&config_path)?;

            println!("Created {} at {}", CONFIG_FILE, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [client] api_url, timeout_secs");
            println!("  - [server] port, db_path");
            println!();
        }
    }

    Ok(())
}
