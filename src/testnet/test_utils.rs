//! Test utilities for ledger and consensus testing

use crate::core::{Block, CancelToken, Ledger, ProofOfWork};
use crate::error::{BlockchainError, Result};
use crate::network::{ChainResponse, ChainSource};
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

// Proofs only depend on the previous proof, so every chain mined from a
// genesis block walks the same sequence.
static PROOFS: Mutex<Vec<u64>> = Mutex::new(Vec::new());

fn next_proof(height: usize, last_proof: u64) -> u64 {
    let mut proofs = PROOFS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(proof) = proofs.get(height) {
        return *proof;
    }
    let proof = ProofOfWork::solve(last_proof, &CancelToken::new()).unwrap();
    if proofs.len() == height {
        proofs.push(proof);
    }
    proof
}

/// A valid chain of `length` blocks (genesis included), each mined block
/// carrying one transfer and one reward.
pub fn mine_chain(length: usize) -> Vec<Block> {
    let mut ledger = Ledger::new();
    for height in 0..length.saturating_sub(1) {
        let proof = next_proof(height, ledger.last_block().get_proof());
        ledger.new_transaction("alice", "bob", height as u64 + 1);
        ledger.new_transaction("0", "test-node", 1);
        ledger.new_block(proof, None);
    }
    ledger.get_chain().to_vec()
}

enum Reply {
    Response(ChainResponse),
    Delayed(ChainResponse, Duration),
    Unreachable,
}

/// `ChainSource` answering from a fixed table of peers.
#[derive(Default)]
pub struct MemoryChainSource {
    replies: HashMap<String, Reply>,
}

impl MemoryChainSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(self, peer: &str, chain: Vec<Block>) -> Self {
        self.with_response(peer, ChainResponse::new(chain))
    }

    pub fn with_response(mut self, peer: &str, response: ChainResponse) -> Self {
        self.replies
            .insert(peer.to_string(), Reply::Response(response));
        self
    }

    pub fn with_delay(mut self, peer: &str, chain: Vec<Block>, delay: Duration) -> Self {
        self.replies.insert(
            peer.to_string(),
            Reply::Delayed(ChainResponse::new(chain), delay),
        );
        self
    }

    pub fn with_unreachable(mut self, peer: &str) -> Self {
        self.replies.insert(peer.to_string(), Reply::Unreachable);
        self
    }
}

impl ChainSource for MemoryChainSource {
    fn fetch_chain(&self, peer: &str, _timeout: Duration) -> Result<ChainResponse> {
        match self.replies.get(peer) {
            Some(Reply::Response(response)) => Ok(response.clone()),
            Some(Reply::Delayed(response, delay)) => {
                thread::sleep(*delay);
                Ok(response.clone())
            }
            Some(Reply::Unreachable) | None => Err(BlockchainError::PeerUnreachable {
                peer: peer.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}
