//! Lattice console binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lattice_console::cli::Cli;
use lattice_console::dispatch::Shell;
use lattice_console::error::ConsoleError;
use lattice_console::output::OutputFormat;
use lattice_console::repl;
use lattice_mesh::{DiscoveryConfig, MeshNode};

fn main() -> ExitCode {
    // Tracing goes to stderr; stdout belongs to the shell.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ConsoleError> {
    let discovery = DiscoveryConfig {
        port: cli.discovery_port,
        announce_interval: chrono::Duration::seconds(cli.announce_interval_secs as i64),
        peer_timeout: chrono::Duration::seconds(cli.peer_timeout_secs as i64),
    };

    let node = MeshNode::builder(cli.name.as_str())
        .port(cli.port)
        .discovery(discovery)
        .start()
        .await
        .map_err(|e| ConsoleError::Startup(e.to_string()))?;

    let mut shell = Shell::new(&node, OutputFormat::new(cli.format));
    let result = repl::run(&mut shell).await;

    drop(shell);
    node.dispose();
    result
}
