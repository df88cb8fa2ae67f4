//! # lattice-console
//!
//! Interactive operator shell for a lattice mesh.
//!
//! The console joins the mesh as a node of its own, then reads commands from
//! stdin until told to stop:
//!
//! - `services` — list the peers currently visible in the mesh
//! - `info <id-or-name>` — show one peer's record
//! - `request <id-or-name> <endpoint> <json>` — invoke an endpoint; the
//!   response prints asynchronously when it arrives
//! - `stop` — shut the console down
//!
//! # Architecture
//!
//! One line of input flows through [`tokenize::tokenize`] into
//! [`dispatch::Shell::handle_line`]. The tokenizer tracks nesting depth over
//! brackets and quotes so a raw JSON object survives as a single argument.
//! The dispatcher talks to the mesh only through the [`lattice_mesh::Mesh`]
//! trait.
//!
//! ```text
//! ┌─────────────┐  tokenize → dispatch  ┌──────────────┐
//! │   stdin     │──────────────────────►│  lattice-mesh │
//! └─────────────┘                       └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod repl;
pub mod tokenize;

pub use cli::{Cli, Format};
pub use dispatch::Shell;
pub use error::ConsoleError;
pub use output::OutputFormat;
