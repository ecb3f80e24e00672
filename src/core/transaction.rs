use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sender recorded on the reward a node pays itself for mining a block.
pub const REWARD_SENDER: &str = "0";

/// Amount credited by each mining reward.
pub const MINING_REWARD: u64 = 1;

// Fields are declared in lexicographic order so the wire form matches the
// canonical form used for hashing.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    amount: u64,
    recipient: String,
    sender: String,
}

impl Transaction {
    pub fn new(sender: &str, recipient: &str, amount: u64) -> Transaction {
        Transaction {
            amount,
            recipient: recipient.to_string(),
            sender: sender.to_string(),
        }
    }

    /// Checked constructor for caller-supplied transfers: sender and
    /// recipient must be present. Amount sign and sender existence are not
    /// checked here.
    pub fn new_transfer(sender: &str, recipient: &str, amount: u64) -> Result<Transaction> {
        if sender.trim().is_empty() {
            return Err(BlockchainError::Validation(
                "Missing value: sender".to_string(),
            ));
        }
        if recipient.trim().is_empty() {
            return Err(BlockchainError::Validation(
                "Missing value: recipient".to_string(),
            ));
        }
        Ok(Transaction::new(sender, recipient, amount))
    }

    /// The reward a miner credits to itself.
    pub fn new_reward(recipient: &str) -> Transaction {
        Transaction::new(REWARD_SENDER, recipient, MINING_REWARD)
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Key-sorted JSON object used by block hashing.
    pub fn canonical_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("amount".to_string(), Value::from(self.amount));
        map.insert("recipient".to_string(), Value::from(self.recipient.clone()));
        map.insert("sender".to_string(), Value::from(self.sender.clone()));
        Value::Object(map)
    }
}
