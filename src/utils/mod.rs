//! Utility functions and helpers
//!
//! Digest and clock helpers shared by the ledger and the proof-of-work search.

pub mod crypto;

pub use crypto::{current_timestamp, sha256_digest, sha256_hex};
