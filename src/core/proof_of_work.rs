use crate::utils::sha256_hex;
use log::{debug, info};
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A proof is accepted when the hex digest of `"{last_proof}{proof}"` starts
/// with this prefix.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Thread-safe flag used to abandon a proof search.
///
/// Clones share the flag; once triggered it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct ProofOfWork;

impl ProofOfWork {
    /// Does `hash("{last_proof}{proof}")` start with four zeroes?
    pub fn validate(last_proof: u64, proof: u64) -> bool {
        let guess = format!("{last_proof}{proof}");
        Self::meets_difficulty(&guess)
    }

    fn meets_difficulty(guess: &str) -> bool {
        sha256_hex(guess.as_bytes()).starts_with(DIFFICULTY_PREFIX)
    }

    /// Linear search from 0 for the smallest proof that validates against
    /// `last_proof`. Returns `None` once `cancel` is triggered or the proof
    /// space is exhausted.
    pub fn solve(last_proof: u64, cancel: &CancelToken) -> Option<u64> {
        info!("Searching for a proof after {last_proof}");
        let prefix = last_proof.to_string();
        let mut guess = String::with_capacity(prefix.len() + 20);

        for proof in 0..=u64::MAX {
            if cancel.is_cancelled() {
                info!("Proof search after {last_proof} cancelled at candidate {proof}");
                return None;
            }

            guess.clear();
            guess.push_str(&prefix);
            // writing into a String cannot fail
            let _ = write!(guess, "{proof}");

            if Self::meets_difficulty(&guess) {
                debug!("Proof {proof} found after {last_proof}");
                return Some(proof);
            }
        }
        None
    }
}
