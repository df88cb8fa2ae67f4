//! # lattice-proto
//!
//! Protocol definitions for communication between lattice mesh nodes.
//!
//! Two channels share these types:
//! - the UDP discovery channel, carrying [`MeshMessage::Announce`] datagrams;
//! - the WebSocket invoke channel, carrying [`MeshMessage::Invoke`] requests
//!   answered by a [`MeshResponse`].
//!
//! Both channels speak JSON text frames produced and consumed through the
//! `to_json`/`from_json` helpers on each envelope type.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;
pub mod wire;

pub use error::ProtoError;
pub use types::{Peer, PeerId};
pub use wire::{MESH_PROTOCOL_VERSION, MeshMessage, MeshResponse, error_codes};
