//! Command-line argument parsing with clap.

use clap::{Parser, ValueEnum};

/// Lattice console - interactive operator shell for a lattice mesh.
#[derive(Parser, Debug, Clone)]
#[command(name = "lattice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Service name announced to the mesh.
    #[arg(short, long, env = "LATTICE_NAME", default_value = "console")]
    pub name: String,

    /// Invoke transport port (0 picks an ephemeral port).
    #[arg(short, long, env = "LATTICE_PORT", default_value_t = 0)]
    pub port: u16,

    /// Output format for `services` and `info`.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// UDP port shared by mesh discovery.
    #[arg(long, default_value_t = 47700)]
    pub discovery_port: u16,

    /// Seconds between presence announcements.
    #[arg(long, default_value_t = 5)]
    pub announce_interval_secs: u64,

    /// Seconds after which a silent peer is dropped.
    #[arg(long, default_value_t = 30)]
    pub peer_timeout_secs: u64,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}
