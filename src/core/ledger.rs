use crate::core::{Block, ChainValidator, Transaction};
use crate::error::Result;
use crate::utils::current_timestamp;

/// The append-only chain plus the buffer of transactions waiting for a block.
///
/// The chain is never empty: construction synthesizes the genesis block and
/// the only mutations are `new_block` and whole-chain replacement.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending_transactions: Vec<Transaction>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger {
            chain: vec![Block::generate_genesis_block(current_timestamp())],
            pending_transactions: vec![],
        }
    }

    /// Restore a ledger from a previously accepted chain.
    pub fn from_chain(chain: Vec<Block>) -> Result<Ledger> {
        ChainValidator::validate(&chain)?;
        Ok(Ledger {
            chain,
            pending_transactions: vec![],
        })
    }

    /// Seal the pending transactions into a new block and append it.
    ///
    /// `previous_hash` defaults to the hash of the current last block. The
    /// buffer moved into the block is the buffer left empty afterwards.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let last_block = self.last_block();
        let previous_hash = previous_hash.unwrap_or_else(|| last_block.hash());
        let timestamp = current_timestamp().max(last_block.get_timestamp());
        let index = last_block.get_index() + 1;

        let transactions = std::mem::take(&mut self.pending_transactions);
        let block = Block::new(index, timestamp, transactions, proof, previous_hash);
        self.chain.push(block.clone());
        block
    }

    /// Queue a transaction; returns the index of the block that will hold it.
    pub fn new_transaction(&mut self, sender: &str, recipient: &str, amount: u64) -> u64 {
        self.pending_transactions
            .push(Transaction::new(sender, recipient, amount));
        self.last_block().get_index() + 1
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Ledger always holds the genesis block")
    }

    pub fn get_chain(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn get_pending_transactions(&self) -> &[Transaction] {
        self.pending_transactions.as_slice()
    }

    /// Swap the whole chain for `chain` if it validates. Pending
    /// transactions are kept.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<()> {
        ChainValidator::validate(&chain)?;
        self.chain = chain;
        Ok(())
    }
}
