//! Peer-to-peer networking
//!
//! The peer registry, the longest-valid-chain resolver and the TCP protocol
//! nodes use to answer chain queries and client requests.

pub mod consensus;
pub mod node;
pub mod server;

pub use consensus::{ChainResponse, ChainSource, ConsensusResolver};
pub use node::{Node, Nodes};
pub use server::{send_request, Package, Server, TcpChainSource, DEFAULT_NODE};
