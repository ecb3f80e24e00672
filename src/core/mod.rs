//! Core ledger functionality
//!
//! Blocks and their canonical hash, the proof-of-work puzzle, the in-memory
//! ledger, chain validation and the node service that ties them together.

pub mod block;
pub mod blockchain;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;
pub mod validator;

pub use block::{Block, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
pub use blockchain::{Blockchain, NodeOptions};
pub use ledger::Ledger;
pub use proof_of_work::{CancelToken, ProofOfWork, DIFFICULTY_PREFIX};
pub use transaction::{Transaction, MINING_REWARD, REWARD_SENDER};
pub use validator::ChainValidator;
