//! Data storage and persistence
//!
//! The ledger lives in memory; this module keeps a durable copy of the chain
//! so a restarted node comes back with the blocks it had.

pub mod chain_store;

pub use chain_store::ChainStore;
