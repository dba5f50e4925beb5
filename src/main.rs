//! echo-log-server: an HTTP echo server with an append-only journal
//!
//! Every POST body is:
//! - Printed to stdout
//! - Wrapped in a JSON record with timestamp, client IP and server endpoint
//! - Appended to `echo_server.log`
//! - Returned to the client as the response body
//!
//! The server binds an ephemeral port by default and announces it on
//! stdout. Configuration via CLI arguments or TOML file.

mod config;
mod error;
mod handler;
mod journal;
mod record;
mod server;

use config::Config;
use handler::{print_line, EchoOutput};
use journal::Journal;
use server::Server;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging; stdout carries the port announcement and messages
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        listen = %config.listen,
        mode = ?config.mode,
        log_file = %config.log_file.display(),
        "Starting echo-log-server"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::new(&config.log_file));
    let output: EchoOutput = Arc::new(Mutex::new(io::stdout()));
    let server = Server::bind(&config, journal, Arc::clone(&output)).await?;

    let port = server.local_addr()?.port();
    print_line(&output, &format!("Server running on port {port}"));

    server.run().await?;
    Ok(())
}
