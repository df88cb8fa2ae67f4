//! Command dispatch for the interactive shell.
//!
//! One tokenized line is matched against the closed set of verbs, validated
//! (arity, then target resolution, then endpoint, then payload — in that
//! order), and executed. Every failure path writes a message and ends the
//! command; nothing is retried and no partial request is ever sent.

use std::io::Write;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use lattice_mesh::Mesh;
use lattice_proto::{Peer, PeerId};

use crate::error::ConsoleError;
use crate::output::{OutputFormat, PeerDetails, PeerList};
use crate::tokenize::tokenize;

/// The closed set of shell verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Request,
    Info,
    Services,
    Stop,
}

impl Verb {
    /// Case-sensitive exact match on the first token.
    fn parse(token: &str) -> Option<Self> {
        match token {
            "request" => Some(Self::Request),
            "info" => Some(Self::Info),
            "services" => Some(Self::Services),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// The interactive shell: a running flag, an output format, and a handle to
/// the mesh.
///
/// Generic over [`Mesh`] so the dispatch logic is testable without sockets.
#[derive(Debug)]
pub struct Shell<M> {
    mesh: M,
    format: OutputFormat,
    running: bool,
}

impl<M: Mesh> Shell<M> {
    /// Creates a shell in the running state.
    #[must_use]
    pub fn new(mesh: M, format: OutputFormat) -> Self {
        Self {
            mesh,
            format,
            running: true,
        }
    }

    /// Whether the read loop should continue.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Tokenizes one input line and dispatches it.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing to `out` fails; command-level
    /// failures are messages, not errors.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<(), ConsoleError> {
        let tokens = tokenize(line);
        self.dispatch(line, &tokens, out)
    }

    /// Dispatches an already-tokenized line.
    ///
    /// An empty token sequence is the tokenizer's unparseable sentinel; a
    /// single empty token is a blank line and a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing to `out` fails.
    pub fn dispatch<W: Write>(
        &mut self,
        line: &str,
        tokens: &[String],
        out: &mut W,
    ) -> Result<(), ConsoleError> {
        if tokens.is_empty() {
            writeln!(out, "Could not tokenize command \"{line}\"")?;
            return Ok(());
        }
        if tokens.len() == 1 && tokens[0].is_empty() {
            return Ok(());
        }

        let Some(verb) = Verb::parse(&tokens[0]) else {
            writeln!(out, "Invalid/unknown command \"{line}\"")?;
            return Ok(());
        };

        match verb {
            Verb::Stop => {
                debug!("Stop requested");
                self.running = false;
                Ok(())
            }
            Verb::Services => {
                let list = PeerList {
                    peers: self.mesh.peers(),
                };
                self.format.write(out, &list)
            }
            Verb::Info => self.info(tokens, out),
            Verb::Request => self.request(tokens, out),
        }
    }

    fn info<W: Write>(&mut self, tokens: &[String], out: &mut W) -> Result<(), ConsoleError> {
        if tokens.len() < 2 {
            writeln!(out, "Format: info <target uuid or name>")?;
            return Ok(());
        }

        let peers = self.mesh.peers();
        let Some(peer) = resolve_peer(&peers, &tokens[1]) else {
            writeln!(out, "No service could be identified with {}", tokens[1])?;
            return Ok(());
        };

        self.format.write(out, &PeerDetails { peer: peer.clone() })
    }

    fn request<W: Write>(&mut self, tokens: &[String], out: &mut W) -> Result<(), ConsoleError> {
        if tokens.len() < 4 {
            writeln!(out, "Format: request <target uuid or name> <endpoint> <json>")?;
            return Ok(());
        }

        let peers = self.mesh.peers();
        let Some(peer) = resolve_peer(&peers, &tokens[1]) else {
            writeln!(out, "No service could be identified with {}", tokens[1])?;
            return Ok(());
        };

        let endpoint = tokens[2].as_str();
        if !peer.has_endpoint(endpoint) {
            let options = peer
                .endpoints
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "No endpoint named {endpoint}, options are [{options}]")?;
            return Ok(());
        }

        let payload = match serde_json::from_str::<Value>(&tokens[3]) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                writeln!(out, "Json is not valid: payload must be an object")?;
                return Ok(());
            }
            Err(e) => {
                writeln!(out, "Json is not valid: {e}")?;
                return Ok(());
            }
        };

        let pending = self.mesh.request(peer.id, endpoint, payload);
        debug!(peer = %peer.name, endpoint = %endpoint, "Request dispatched");

        // The response arrives whenever the peer answers, concurrently with
        // further reads, so it prints from its own task.
        tokio::spawn(async move {
            match pending.await {
                Some(payload) => match serde_json::to_string_pretty(&payload) {
                    Ok(pretty) => println!("Response: {pretty}"),
                    Err(e) => debug!(error = %e, "Response not printable"),
                },
                None => println!("Response: null"),
            }
        });

        Ok(())
    }
}

/// Resolves a target written as either a peer ID or a name.
///
/// A token that parses as a UUID is matched by identifier, and an ID that
/// matches nothing does not fall back to names — IDs are authoritative.
/// Anything that does not parse as a UUID is matched case-insensitively by
/// name.
fn resolve_peer<'a>(peers: &'a [Peer], target: &str) -> Option<&'a Peer> {
    if let Ok(uuid) = Uuid::parse_str(target) {
        let id = PeerId::from_uuid(uuid);
        return peers.iter().find(|p| p.id == id);
    }
    peers
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(target))
}
