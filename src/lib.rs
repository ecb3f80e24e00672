//! # Architect Ledger
//!
//! A proof-of-work ledger node. Transactions are grouped into hash-linked
//! blocks, each block is gated by a small proof-of-work puzzle, and nodes
//! converge by adopting the longest valid chain any peer holds.
//!
//! ## How the code is organized
//! - `core/`: blocks and their canonical hash, proof-of-work, the ledger,
//!   chain validation and the `Blockchain` node service
//! - `network/`: peer registry, consensus resolver, TCP node protocol
//! - `storage/`: optional Sled snapshot of the chain
//! - `config/`: settings from the environment
//! - `utils/`: digest and clock helpers
//! - `cli/`: command-line interface
//!
//! ## Invariants worth remembering
//! - The chain is never empty and only changes by append or whole replacement.
//! - Block hashes are SHA-256 over key-sorted JSON, so every node agrees.
//! - A peer chain wins only if it is strictly longer AND fully valid,
//!   including every proof.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    Block, Blockchain, CancelToken, ChainValidator, Ledger, NodeOptions, ProofOfWork, Transaction,
};
pub use error::{BlockchainError, Result};
pub use network::{
    send_request, ChainResponse, ChainSource, ConsensusResolver, Node, Nodes, Package, Server,
    TcpChainSource,
};
pub use storage::ChainStore;
pub use utils::{current_timestamp, sha256_digest, sha256_hex};
