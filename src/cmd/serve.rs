//! Task server command: `scrumboard serve`.

use anyhow::Result;

use scrumboard::backend::server::{self, ServerConfig};

pub async fn cmd_serve(server_config: ServerConfig, init: bool) -> Result<()> {
    if init {
        server::open_database(&server_config)?;
        println!(
            "Task database initialized at {}",
            server_config.db_path.display()
        );
        return Ok(());
    }

    tracing::info!(
        port = server_config.port,
        db_path = %server_config.db_path.display(),
        "starting task server"
    );
    server::start_server(server_config).await
}
