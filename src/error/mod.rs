//! Error handling for the ledger node
//!
//! Every failure in this crate is recoverable: the worst outcome of any single
//! error is "no state change".

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for ledger, consensus and node operations
#[derive(Debug, Clone, PartialEq)]
pub enum BlockchainError {
    /// Malformed caller input (missing fields, bad peer address)
    Validation(String),
    /// A peer could not be reached within its timeout
    PeerUnreachable { peer: String, reason: String },
    /// A peer answered with something that is not a chain
    PeerProtocol { peer: String, reason: String },
    /// A chain failed structural validation
    IntegrityViolation(String),
    /// Proof-of-work search failures
    Mining(String),
    /// Mining was abandoned because the chain tip moved
    MiningCancelled,
    /// Network communication errors
    Network(String),
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
    /// A shared lock was poisoned by a panicking thread
    Lock(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Validation(msg) => write!(f, "Validation error: {msg}"),
            BlockchainError::PeerUnreachable { peer, reason } => {
                write!(f, "Peer {peer} unreachable: {reason}")
            }
            BlockchainError::PeerProtocol { peer, reason } => {
                write!(f, "Protocol error from peer {peer}: {reason}")
            }
            BlockchainError::IntegrityViolation(msg) => write!(f, "Integrity violation: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::MiningCancelled => write!(f, "Mining cancelled: chain tip changed"),
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}
