//! Longest-valid-chain consensus
//!
//! Every node applies the same rule: a peer's chain replaces the local one only
//! when it is strictly longer than the best seen so far AND passes
//! `ChainValidator`. Peer failures are logged and skipped.

use crate::core::{Block, ChainValidator};
use crate::error::{BlockchainError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A peer's answer to a chain query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> ChainResponse {
        ChainResponse {
            length: chain.len(),
            chain,
        }
    }
}

/// Where candidate chains come from.
pub trait ChainSource: Send + Sync {
    /// Fetch the full chain held by `peer`, giving up after `timeout`.
    fn fetch_chain(&self, peer: &str, timeout: Duration) -> Result<ChainResponse>;
}

#[derive(Clone)]
pub struct ConsensusResolver {
    source: Arc<dyn ChainSource>,
    peer_timeout: Duration,
    deadline: Duration,
}

impl ConsensusResolver {
    pub fn new(source: Arc<dyn ChainSource>, peer_timeout: Duration, deadline: Duration) -> Self {
        Self {
            source,
            peer_timeout,
            deadline,
        }
    }

    /// Returns `(true, winner)` when some peer holds a strictly longer valid
    /// chain, otherwise `(false, local_chain)`.
    pub fn resolve(&self, local_chain: &[Block], peers: &[String]) -> (bool, Vec<Block>) {
        let responses = self.fetch_all(peers);

        let mut max_length = local_chain.len();
        let mut new_chain: Option<Vec<Block>> = None;

        for (peer, response) in peers.iter().zip(responses) {
            let response = match response {
                Some(Ok(response)) => response,
                Some(Err(e)) => {
                    warn!("Skipping peer {peer}: {e}");
                    continue;
                }
                None => {
                    warn!("Skipping peer {peer}: no answer before the resolve deadline");
                    continue;
                }
            };

            let length = response.chain.len();
            if response.length != length {
                let err = BlockchainError::PeerProtocol {
                    peer: peer.clone(),
                    reason: format!(
                        "reported length {} but sent {length} blocks",
                        response.length
                    ),
                };
                warn!("Skipping peer {peer}: {err}");
                continue;
            }

            if length <= max_length {
                continue;
            }
            match ChainValidator::validate(&response.chain) {
                Ok(()) => {
                    info!("Peer {peer} holds a longer valid chain ({length} blocks)");
                    max_length = length;
                    new_chain = Some(response.chain);
                }
                Err(e) => warn!("Discarding chain from peer {peer}: {e}"),
            }
        }

        match new_chain {
            Some(chain) => (true, chain),
            None => (false, local_chain.to_vec()),
        }
    }

    /// Query every peer concurrently. Slot `i` holds the outcome for
    /// `peers[i]`, or `None` if it did not answer before the deadline.
    fn fetch_all(&self, peers: &[String]) -> Vec<Option<Result<ChainResponse>>> {
        let mut responses: Vec<Option<Result<ChainResponse>>> = peers.iter().map(|_| None).collect();
        if peers.is_empty() {
            return responses;
        }

        let (sender, receiver) = mpsc::channel();
        for (slot, peer) in peers.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let sender = sender.clone();
            let peer = peer.clone();
            let timeout = self.peer_timeout;
            thread::spawn(move || {
                let response = source.fetch_chain(&peer, timeout);
                // the receiver is gone once the deadline has passed
                let _ = sender.send((slot, response));
            });
        }
        drop(sender);

        let deadline = Instant::now() + self.deadline;
        let mut outstanding = peers.len();
        while outstanding > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok((slot, response)) => {
                    responses[slot] = Some(response);
                    outstanding -= 1;
                }
                Err(_) => break,
            }
        }
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Ledger;
    use crate::testnet::{mine_chain, MemoryChainSource};

    fn resolver(source: MemoryChainSource) -> ConsensusResolver {
        ConsensusResolver::new(
            Arc::new(source),
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn broken(mut chain: Vec<Block>) -> Vec<Block> {
        let last = chain.pop().unwrap();
        chain.push(Block::new(
            last.get_index(),
            last.get_timestamp(),
            last.get_transactions().to_vec(),
            last.get_proof(),
            "forged".to_string(),
        ));
        chain
    }

    #[test]
    fn test_adopts_only_the_longer_valid_chain() {
        let local = mine_chain(4);
        let five = mine_chain(5);
        let source = MemoryChainSource::new()
            .with_chain("10.0.0.1:5000", broken(mine_chain(3)))
            .with_chain("10.0.0.2:5000", five.clone());

        let (replaced, chain) =
            resolver(source).resolve(&local, &peers(&["10.0.0.1:5000", "10.0.0.2:5000"]));
        assert!(replaced);
        assert_eq!(chain, five);
    }

    #[test]
    fn test_longer_invalid_chain_is_discarded() {
        let local = mine_chain(2);
        let source = MemoryChainSource::new().with_chain("10.0.0.1:5000", broken(mine_chain(4)));

        let (replaced, chain) = resolver(source).resolve(&local, &peers(&["10.0.0.1:5000"]));
        assert!(!replaced);
        assert_eq!(chain, local);
    }

    #[test]
    fn test_equal_length_chain_is_not_adopted() {
        let local = mine_chain(3);
        let source = MemoryChainSource::new().with_chain("10.0.0.1:5000", mine_chain(3));

        let (replaced, chain) = resolver(source).resolve(&local, &peers(&["10.0.0.1:5000"]));
        assert!(!replaced);
        assert_eq!(chain, local);
    }

    #[test]
    fn test_unreachable_and_slow_peers_are_skipped() {
        let local = Ledger::new().get_chain().to_vec();
        let longer = mine_chain(2);
        let source = MemoryChainSource::new()
            .with_unreachable("10.0.0.1:5000")
            .with_delay("10.0.0.2:5000", mine_chain(3), Duration::from_secs(5))
            .with_chain("10.0.0.3:5000", longer.clone());

        let started = Instant::now();
        let (replaced, chain) = resolver(source).resolve(
            &local,
            &peers(&["10.0.0.1:5000", "10.0.0.2:5000", "10.0.0.3:5000"]),
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(replaced);
        assert_eq!(chain, longer);
    }

    #[test]
    fn test_length_mismatch_is_a_protocol_error() {
        let local = Ledger::new().get_chain().to_vec();
        let mut response = ChainResponse::new(mine_chain(2));
        response.length = 7;
        let source = MemoryChainSource::new().with_response("10.0.0.1:5000", response);

        let (replaced, _) = resolver(source).resolve(&local, &peers(&["10.0.0.1:5000"]));
        assert!(!replaced);
    }

    #[test]
    fn test_no_peers_keeps_local_chain() {
        let local = mine_chain(2);
        let (replaced, chain) = resolver(MemoryChainSource::new()).resolve(&local, &[]);
        assert!(!replaced);
        assert_eq!(chain, local);
    }
}
