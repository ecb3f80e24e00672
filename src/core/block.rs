use crate::core::Transaction;
use crate::utils::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `previous_hash` carried by every genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// `proof` carried by every genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// A block as stored in the chain and sent to peers.
///
/// Fields are declared in lexicographic order, so the serde wire form lists
/// them in the same order as the canonical hashing form.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    index: u64,
    previous_hash: String,
    proof: u64,
    timestamp: i64,
    transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
    ) -> Block {
        Block {
            index,
            previous_hash,
            proof,
            timestamp,
            transactions,
        }
    }

    pub fn generate_genesis_block(timestamp: i64) -> Block {
        Block::new(
            1,
            timestamp,
            vec![],
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_proof(&self) -> u64 {
        self.proof
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    /// True when the block carries the genesis index and sentinels.
    pub fn is_genesis(&self) -> bool {
        self.index == 1
            && self.proof == GENESIS_PROOF
            && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Canonical JSON: every object's keys sorted, no insignificant whitespace.
    pub fn canonical_json(&self) -> String {
        let transactions = self
            .transactions
            .iter()
            .map(Transaction::canonical_value)
            .collect::<Vec<Value>>();

        // serde_json::Map is ordered by key, so insertion order is irrelevant
        let mut map = Map::new();
        map.insert("index".to_string(), Value::from(self.index));
        map.insert(
            "previous_hash".to_string(),
            Value::from(self.previous_hash.clone()),
        );
        map.insert("proof".to_string(), Value::from(self.proof));
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        map.insert("transactions".to_string(), Value::Array(transactions));
        Value::Object(map).to_string()
    }

    /// SHA-256 of the canonical JSON, as 64 lowercase hex characters.
    pub fn hash(&self) -> String {
        sha256_hex(self.canonical_json().as_bytes())
    }
}
