//! # lattice-mesh
//!
//! The networking and registry layer of a lattice node.
//!
//! A [`MeshNode`] announces itself over UDP, keeps a live table of peers it
//! has heard from, serves invoke requests on a WebSocket listener, and sends
//! fire-and-forget requests to other peers. Consumers that only need the
//! live-peer and request surface depend on the [`Mesh`] trait, which keeps
//! them testable with a fake.
//!
//! ```text
//! ┌──────────────┐   announce (UDP)   ┌──────────────┐
//! │  MeshNode A  │◄──────────────────►│  MeshNode B  │
//! │              │   invoke (WS)      │              │
//! └──────────────┘───────────────────►└──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod discovery;
pub mod node;
pub mod registry;

pub use discovery::DiscoveryConfig;
pub use node::{Mesh, MeshNode, MeshNodeBuilder, NodeError, Pending};
pub use registry::{PeerInfo, PeerRegistry};
