//! The interactive read loop.
//!
//! Reads one line at a time from stdin and feeds it through the shell until
//! `stop` is issued or stdin reaches end of input. Reading is async so
//! response printers and discovery keep making progress while the loop
//! waits for the operator.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use lattice_mesh::Mesh;

use crate::dispatch::Shell;
use crate::error::ConsoleError;

/// Delay between starting the mesh node and reading the first command,
/// giving discovery a moment to populate the peer table.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Runs the shell against stdin/stdout until it stops.
///
/// End of input is treated like `stop`: a shell whose input is gone cannot
/// receive further commands.
///
/// # Errors
///
/// Returns an error if reading stdin or writing stdout fails.
pub async fn run<M: Mesh>(shell: &mut Shell<M>) -> Result<(), ConsoleError> {
    tokio::time::sleep(SETTLE_DELAY).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    while shell.is_running() {
        match lines.next_line().await? {
            Some(line) => shell.handle_line(&line, &mut stdout)?,
            None => {
                debug!("End of input; stopping");
                break;
            }
        }
    }

    Ok(())
}
