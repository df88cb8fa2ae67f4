//! Output formatting for shell commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;

use lattice_proto::Peer;

use crate::cli::Format;
use crate::error::ConsoleError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), ConsoleError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| ConsoleError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), ConsoleError>;
}

/// Peer listing for the `services` command.
#[derive(Debug, Clone, Serialize)]
pub struct PeerList {
    /// Peers currently visible in the mesh.
    pub peers: Vec<Peer>,
}

impl TableDisplay for PeerList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), ConsoleError> {
        if self.peers.is_empty() {
            writeln!(writer, "No services discovered")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<16} {:<36} {:>5}  ENDPOINTS",
            "NAME", "ID", "PORT"
        )?;
        for peer in &self.peers {
            let endpoints = peer
                .endpoints
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                writer,
                "{:<16} {:<36} {:>5}  {}",
                peer.name, peer.id, peer.port, endpoints
            )?;
        }
        Ok(())
    }
}

/// Single-peer details for the `info` command.
#[derive(Debug, Clone, Serialize)]
pub struct PeerDetails {
    /// The resolved peer.
    #[serde(flatten)]
    pub peer: Peer,
}

impl TableDisplay for PeerDetails {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), ConsoleError> {
        let endpoints = self
            .peer
            .endpoints
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(writer, "Name:      {}", self.peer.name)?;
        writeln!(writer, "Id:        {}", self.peer.id)?;
        writeln!(writer, "Port:      {}", self.peer.port)?;
        writeln!(writer, "Endpoints: [{endpoints}]")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<T: Serialize + TableDisplay>(format: Format, value: &T) -> String {
        let mut buf = Vec::new();
        OutputFormat::new(format).write(&mut buf, value).ok();
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn empty_peer_list_prints_placeholder() {
        let out = render(Format::Table, &PeerList { peers: vec![] });
        assert!(out.contains("No services discovered"));
    }

    #[test]
    fn peer_list_table_contains_all_columns() {
        let peer = Peer::new("inventory", 9040)
            .with_endpoint("list")
            .with_endpoint("reserve");
        let id = peer.id.to_string();
        let out = render(Format::Table, &PeerList { peers: vec![peer] });

        assert!(out.contains("inventory"));
        assert!(out.contains(&id));
        assert!(out.contains("9040"));
        assert!(out.contains("list, reserve"));
    }

    #[test]
    fn peer_list_json_is_parseable() {
        let peer = Peer::new("inventory", 9040).with_endpoint("list");
        let out = render(Format::Json, &PeerList { peers: vec![peer] });

        let value: Option<serde_json::Value> = serde_json::from_str(&out).ok();
        let peers = value
            .as_ref()
            .and_then(|v| v.get("peers"))
            .and_then(|v| v.as_array())
            .map_or(0, Vec::len);
        assert_eq!(peers, 1);
    }

    #[test]
    fn peer_details_table_lists_every_field() {
        let peer = Peer::new("billing", 9100).with_endpoint("charge");
        let id = peer.id.to_string();
        let out = render(Format::Table, &PeerDetails { peer });

        assert!(out.contains("Name:      billing"));
        assert!(out.contains(&id));
        assert!(out.contains("Port:      9100"));
        assert!(out.contains("Endpoints: [charge]"));
    }

    #[test]
    fn peer_details_json_flattens_record() {
        let peer = Peer::new("billing", 9100);
        let out = render(Format::Json, &PeerDetails { peer });

        let value: Option<serde_json::Value> = serde_json::from_str(&out).ok();
        assert_eq!(
            value.as_ref().and_then(|v| v.get("name")).and_then(|v| v.as_str()),
            Some("billing")
        );
    }
}
