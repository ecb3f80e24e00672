// Durable snapshot of the chain in a Sled tree. Blocks are keyed by their
// big-endian index so iteration order is chain order.

use crate::core::Block;
use crate::error::{BlockchainError, Result};
use sled::{Db, Tree};
use std::path::Path;

const BLOCKS_TREE: &str = "blocks";
const CHAIN_LENGTH_KEY: &str = "chain_length";

#[derive(Clone)]
pub struct ChainStore {
    db: Db,
    blocks: Tree,
}

impl ChainStore {
    pub fn open(path: impl AsRef<Path>) -> Result<ChainStore> {
        let db = sled::open(path.as_ref())
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok(ChainStore { db, blocks })
    }

    fn encode(block: &Block) -> Result<Vec<u8>> {
        bincode::encode_to_vec(block, bincode::config::standard())
            .map_err(|e| BlockchainError::Serialization(format!("Failed to encode block: {e}")))
    }

    fn decode(bytes: &[u8]) -> Result<Block> {
        let (block, _) = bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| BlockchainError::Serialization(format!("Failed to decode block: {e}")))?;
        Ok(block)
    }

    /// Persist one appended block and the new length together.
    pub fn append_block(&self, block: &Block) -> Result<()> {
        self.write_blocks(std::slice::from_ref(block), block.get_index())
    }

    /// Persist a whole replacement chain.
    pub fn save_chain(&self, chain: &[Block]) -> Result<()> {
        self.write_blocks(chain, chain.len() as u64)
    }

    fn write_blocks(&self, blocks: &[Block], length: u64) -> Result<()> {
        let entries = blocks
            .iter()
            .map(|block| Ok((block.get_index().to_be_bytes(), Self::encode(block)?)))
            .collect::<Result<Vec<_>>>()?;
        let length_bytes = length.to_be_bytes();

        self.blocks
            .transaction(|tx_db| {
                for (key, value) in &entries {
                    tx_db.insert(&key[..], value.as_slice())?;
                }
                tx_db.insert(CHAIN_LENGTH_KEY, &length_bytes[..])?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                BlockchainError::Database(format!("Failed to update blocks tree: {e}"))
            })?;

        self.db.flush()?;
        Ok(())
    }

    /// The stored chain, or `None` if nothing was ever saved.
    pub fn load_chain(&self) -> Result<Option<Vec<Block>>> {
        let length = match self.blocks.get(CHAIN_LENGTH_KEY)? {
            Some(bytes) => {
                let bytes = <[u8; 8]>::try_from(&bytes[..]).map_err(|_| {
                    BlockchainError::Database("Invalid chain length record".to_string())
                })?;
                u64::from_be_bytes(bytes)
            }
            None => return Ok(None),
        };

        let mut chain = Vec::with_capacity(length as usize);
        for index in 1..=length {
            let bytes = self.blocks.get(index.to_be_bytes())?.ok_or_else(|| {
                BlockchainError::Database(format!("Block {index} missing from store"))
            })?;
            chain.push(Self::decode(&bytes)?);
        }
        Ok(Some(chain))
    }
}
