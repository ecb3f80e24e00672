use crate::core::{Block, ProofOfWork};
use crate::error::{BlockchainError, Result};

/// Structural checks for any chain, local or received from a peer.
pub struct ChainValidator;

impl ChainValidator {
    /// True when `chain` passes every check in `validate`. The first block must
    /// carry the genesis sentinels even when it is the only block, so a lone
    /// mined block cut from some other chain is rejected.
    pub fn is_valid(chain: &[Block]) -> bool {
        Self::validate(chain).is_ok()
    }

    /// Walks the chain and reports the first broken invariant:
    /// - the chain is non-empty and starts with a genesis block
    /// - indexes increase by one and timestamps never go backwards
    /// - `previous_hash` equals the hash of the block before it
    /// - each `(previous proof, proof)` pair passes proof-of-work
    pub fn validate(chain: &[Block]) -> Result<()> {
        let genesis = chain.first().ok_or_else(|| {
            BlockchainError::IntegrityViolation("Chain has no genesis block".to_string())
        })?;
        if !genesis.is_genesis() {
            return Err(BlockchainError::IntegrityViolation(format!(
                "First block (index {}) does not carry the genesis sentinels",
                genesis.get_index()
            )));
        }

        for pair in chain.windows(2) {
            let (previous, block) = (&pair[0], &pair[1]);
            let index = block.get_index();

            if index != previous.get_index() + 1 {
                return Err(BlockchainError::IntegrityViolation(format!(
                    "Block {index} follows block {}",
                    previous.get_index()
                )));
            }
            if block.get_timestamp() < previous.get_timestamp() {
                return Err(BlockchainError::IntegrityViolation(format!(
                    "Block {index} is timestamped before its predecessor"
                )));
            }
            if block.get_previous_hash() != previous.hash() {
                return Err(BlockchainError::IntegrityViolation(format!(
                    "Block {index} does not reference the hash of block {}",
                    previous.get_index()
                )));
            }
            if !ProofOfWork::validate(previous.get_proof(), block.get_proof()) {
                return Err(BlockchainError::IntegrityViolation(format!(
                    "Block {index} carries an invalid proof {}",
                    block.get_proof()
                )));
            }
        }
        Ok(())
    }
}
