use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use scrumboard::board::ColumnId;
use scrumboard::config::Config;

mod cmd;

#[derive(Parser)]
#[command(name = "scrumboard")]
#[command(version, about = "Kanban board with optimistic sync to a task store")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Base URL of the task server. Overrides scrumboard.toml and SCRUMBOARD_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the task server
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Initialize database only (don't start server)
        #[arg(long)]
        init: bool,
    },
    /// Show the board
    Board,
    /// Add a card to the end of a column
    Add {
        /// Column: backlog, todo, inprogress, done
        column: ColumnId,
        /// Card title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Change a card's title and/or description
    Edit {
        /// Card id or unique id prefix
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Move a card to a column, optionally at a position (default: end)
    Move {
        /// Card id or unique id prefix
        id: String,
        /// Destination column
        to: ColumnId,
        /// Zero-based position in the destination column
        #[arg(short, long)]
        position: Option<usize>,
    },
    /// Delete a card
    Rm {
        /// Card id or unique id prefix
        id: String,
    },
    /// Move a column to another display position
    MoveColumn {
        column: ColumnId,
        /// Zero-based target position
        position: usize,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default scrumboard.toml file
    Init,
}

fn default_log_level(cli: &Cli) -> &'static str {
    if cli.verbose {
        "debug"
    } else if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // A missing .env is normal.
    let _ = dotenvy::from_path(project_dir.join(".env"));
    scrumboard::logging::init(default_log_level(&cli));

    let mut config = Config::load(&project_dir)?;
    if let Some(url) = &cli.api_url {
        config.toml.client.api_url = url.clone();
    }

    match &cli.command {
        Commands::Serve {
            port,
            db_path,
            init,
        } => {
            if let Some(port) = port {
                config.toml.server.port = *port;
            }
            if let Some(db_path) = db_path {
                config.toml.server.db_path = db_path.clone();
            }
            cmd::cmd_serve(config.server_config(), *init).await?;
        }
        Commands::Board => cmd::cmd_board(&config).await?,
        Commands::Add {
            column,
            title,
            description,
        } => {
            cmd::cmd_add(&config, *column, &title.join(" "), description.as_deref()).await?;
        }
        Commands::Edit {
            id,
            title,
            description,
        } => {
            cmd::cmd_edit(&config, id, title.as_deref(), description.as_deref()).await?;
        }
        Commands::Move { id, to, position } => {
            cmd::cmd_move(&config, id, *to, *position).await?;
        }
        Commands::Rm { id } => cmd::cmd_rm(&config, id).await?,
        Commands::MoveColumn { column, position } => {
            cmd::cmd_move_column(&config, *column, *position).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
