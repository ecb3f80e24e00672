use crate::error::{BlockchainError, Result};
use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

/// A peer address reduced to `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node {
    addr: String,
}

impl Node {
    /// Accepts `host:port` or a URL such as `http://host:port/path`; the
    /// scheme and path are dropped.
    pub fn parse(address: &str) -> Result<Node> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(BlockchainError::Validation(
                "Missing value: node address".to_string(),
            ));
        }

        let without_scheme = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed,
        };
        let authority = without_scheme
            .split(|c: char| c == '/' || c == '?' || c == '#')
            .next()
            .unwrap_or_default();

        let (host, port) = authority.rsplit_once(':').ok_or_else(|| {
            BlockchainError::Validation(format!("Node address {address} has no port"))
        })?;
        if host.is_empty() {
            return Err(BlockchainError::Validation(format!(
                "Node address {address} has no host"
            )));
        }
        let bracketed = host.starts_with('[') && host.ends_with(']');
        if host.chars().any(char::is_whitespace) || (host.contains(':') && !bracketed) {
            return Err(BlockchainError::Validation(format!(
                "Node address {address} has an invalid host"
            )));
        }
        let port = port
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                BlockchainError::Validation(format!("Node address {address} has an invalid port"))
            })?;

        Ok(Node {
            addr: format!("{host}:{port}"),
        })
    }

    pub fn get_addr(&self) -> String {
        self.addr.clone()
    }
}

/// The set of known peers. Registration is idempotent and nothing is ever
/// removed.
#[derive(Default)]
pub struct Nodes {
    inner: RwLock<BTreeSet<Node>>,
}

impl Nodes {
    pub fn new() -> Nodes {
        Nodes {
            inner: RwLock::new(BTreeSet::new()),
        }
    }

    /// Normalize and insert; returns the normalized address.
    pub fn add_node(&self, address: &str) -> Result<String> {
        let node = Node::parse(address)?;
        let addr = node.get_addr();
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node);
        Ok(addr)
    }

    /// Known peers in address order.
    pub fn get_nodes(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Node::get_addr)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node_is_known(&self, address: &str) -> bool {
        match Node::parse(address) {
            Ok(node) => self
                .inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&node),
            Err(_) => false,
        }
    }
}
