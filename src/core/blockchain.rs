// This is the node's ledger service - the one place the chain is mutated.
// The ledger and its pending buffer sit behind a single mutex so an append and
// a consensus replacement can never interleave.

use crate::core::{Block, CancelToken, ChainValidator, Ledger, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{ChainSource, ConsensusResolver, Nodes};
use crate::storage::ChainStore;
use log::{error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Settings a node is constructed with.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Identity credited with mining rewards
    pub node_id: String,
    /// Budget for a single peer's chain query
    pub peer_timeout: Duration,
    /// Budget for a whole resolve round
    pub resolve_deadline: Duration,
}

impl NodeOptions {
    pub fn new(node_id: &str) -> NodeOptions {
        NodeOptions {
            node_id: node_id.to_string(),
            peer_timeout: Duration::from_secs(5),
            resolve_deadline: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct Blockchain {
    ledger: Arc<Mutex<Ledger>>,
    nodes: Arc<Nodes>,
    resolver: ConsensusResolver,
    node_id: String,
    // The token handed to in-flight proof searches; swapped for a fresh one
    // whenever consensus replaces the chain.
    mining: Arc<Mutex<CancelToken>>,
    store: Option<ChainStore>,
}

impl Blockchain {
    // When I want a purely in-memory node
    pub fn new(options: NodeOptions, source: Arc<dyn ChainSource>) -> Blockchain {
        Self::with_ledger(options, source, Ledger::new(), None)
    }

    // When I want the node to come back with its chain after a restart
    pub fn open(
        options: NodeOptions,
        source: Arc<dyn ChainSource>,
        store: ChainStore,
    ) -> Result<Blockchain> {
        let ledger = match store.load_chain() {
            Ok(Some(chain)) => match Ledger::from_chain(chain) {
                Ok(ledger) => {
                    info!("Loaded stored chain with {} blocks", ledger.len());
                    ledger
                }
                Err(e) => {
                    warn!("Stored chain rejected, starting from genesis: {e}");
                    Self::fresh_ledger(&store)?
                }
            },
            Ok(None) => {
                info!("No stored chain found, creating genesis block");
                Self::fresh_ledger(&store)?
            }
            Err(e) => {
                warn!("Stored chain unreadable, starting from genesis: {e}");
                Self::fresh_ledger(&store)?
            }
        };
        Ok(Self::with_ledger(options, source, ledger, Some(store)))
    }

    fn fresh_ledger(store: &ChainStore) -> Result<Ledger> {
        let ledger = Ledger::new();
        store.save_chain(ledger.get_chain())?;
        Ok(ledger)
    }

    fn with_ledger(
        options: NodeOptions,
        source: Arc<dyn ChainSource>,
        ledger: Ledger,
        store: Option<ChainStore>,
    ) -> Blockchain {
        Blockchain {
            ledger: Arc::new(Mutex::new(ledger)),
            nodes: Arc::new(Nodes::new()),
            resolver: ConsensusResolver::new(
                source,
                options.peer_timeout,
                options.resolve_deadline,
            ),
            node_id: options.node_id,
            mining: Arc::new(Mutex::new(CancelToken::new())),
            store,
        }
    }

    fn lock_ledger(&self) -> Result<MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire ledger lock: {e}")))
    }

    fn mining_token(&self) -> Result<CancelToken> {
        self.mining
            .lock()
            .map(|token| token.clone())
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire mining lock: {e}")))
    }

    // Stop every proof search started against the chain that was just replaced
    fn cancel_mining(&self) -> Result<()> {
        let mut token = self
            .mining
            .lock()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire mining lock: {e}")))?;
        token.cancel();
        *token = CancelToken::new();
        Ok(())
    }

    // Persistence failures are logged; the in-memory chain stays authoritative
    fn persist(&self, write: impl FnOnce(&ChainStore) -> Result<()>) {
        if let Some(store) = &self.store {
            if let Err(e) = write(store) {
                error!("Failed to persist chain: {e}");
            }
        }
    }

    pub fn get_node_id(&self) -> &str {
        self.node_id.as_str()
    }

    /// Solve the puzzle for the current tip, credit the reward and append.
    ///
    /// The search runs without holding the ledger lock. If the tip moved in
    /// the meantime the attempt fails with `MiningCancelled` and nothing
    /// changes.
    pub fn mine(&self) -> Result<Block> {
        self.mine_with(ProofOfWork::solve)
    }

    fn mine_with(&self, solve: impl FnOnce(u64, &CancelToken) -> Option<u64>) -> Result<Block> {
        // Tip and token are read under the ledger lock, which a chain swap
        // also holds while it cancels, so they always belong together.
        let (tip, token) = {
            let ledger = self.lock_ledger()?;
            (ledger.last_block().clone(), self.mining_token()?)
        };

        info!("Mining on top of block {}", tip.get_index());
        let proof = solve(tip.get_proof(), &token).ok_or(BlockchainError::MiningCancelled)?;

        let mut ledger = self.lock_ledger()?;
        if ledger.last_block() != &tip {
            warn!("Chain tip moved while mining block {}", tip.get_index() + 1);
            return Err(BlockchainError::MiningCancelled);
        }

        let reward = Transaction::new_reward(&self.node_id);
        ledger.new_transaction(
            reward.get_sender(),
            reward.get_recipient(),
            reward.get_amount(),
        );
        let previous_hash = tip.hash();
        let block = ledger.new_block(proof, Some(previous_hash));
        self.persist(|store| store.append_block(&block));

        info!(
            "New block {} forged with {} transactions",
            block.get_index(),
            block.get_transactions().len()
        );
        Ok(block)
    }

    /// Queue a transfer; returns the index of the block that will hold it.
    pub fn submit_transaction(&self, sender: &str, recipient: &str, amount: u64) -> Result<u64> {
        let tx = Transaction::new_transfer(sender, recipient, amount)?;
        let index = self.lock_ledger()?.new_transaction(
            tx.get_sender(),
            tx.get_recipient(),
            tx.get_amount(),
        );
        info!("Transaction will be added to block {index}");
        Ok(index)
    }

    /// The chain and its length.
    pub fn get_chain(&self) -> Result<(Vec<Block>, usize)> {
        let ledger = self.lock_ledger()?;
        Ok((ledger.get_chain().to_vec(), ledger.len()))
    }

    pub fn get_pending_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock_ledger()?.get_pending_transactions().to_vec())
    }

    /// Register a peer; returns its normalized `host:port`.
    pub fn register_peer(&self, address: &str) -> Result<String> {
        let addr = self.nodes.add_node(address)?;
        info!("Registered peer {addr}");
        Ok(addr)
    }

    pub fn get_peers(&self) -> Vec<String> {
        self.nodes.get_nodes()
    }

    /// Run one consensus round against every known peer.
    ///
    /// Peers are queried without holding the ledger lock; the winner is
    /// adopted only if it is still longer than the local chain at swap time.
    pub fn resolve(&self) -> Result<(bool, Vec<Block>)> {
        let local_chain = self.lock_ledger()?.get_chain().to_vec();
        let peers = self.nodes.get_nodes();

        let (replaced, candidate) = self.resolver.resolve(&local_chain, &peers);
        if !replaced {
            info!("Our chain is authoritative ({} blocks)", local_chain.len());
            return Ok((false, local_chain));
        }

        let mut ledger = self.lock_ledger()?;
        if candidate.len() <= ledger.len() {
            info!("Local chain grew during resolve, keeping it");
            return Ok((false, ledger.get_chain().to_vec()));
        }
        ledger.replace_chain(candidate)?;
        self.cancel_mining()?;
        self.persist(|store| store.save_chain(ledger.get_chain()));

        info!("Our chain was replaced ({} blocks)", ledger.len());
        Ok((true, ledger.get_chain().to_vec()))
    }

    /// Defensive self-check of the local chain.
    pub fn verify(&self) -> Result<()> {
        ChainValidator::validate(self.lock_ledger()?.get_chain())
    }
}
