use crate::core::NodeOptions;
use crate::network::DEFAULT_NODE;
use log::warn;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const NODE_ID_KEY: &str = "NODE_ID";
const PEER_TIMEOUT_KEY: &str = "PEER_TIMEOUT_MS";
const RESOLVE_DEADLINE_KEY: &str = "RESOLVE_DEADLINE_MS";
const DATA_DIR_KEY: &str = "DATA_DIR";

const DEFAULT_PEER_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RESOLVE_DEADLINE_MS: u64 = 10_000;

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults only: local address and a fresh random node identity.
    pub fn new() -> Config {
        let mut map = HashMap::new();
        map.insert(String::from(NODE_ADDRESS_KEY), String::from(DEFAULT_NODE));
        map.insert(
            String::from(NODE_ID_KEY),
            Uuid::new_v4().simple().to_string(),
        );
        Config {
            inner: RwLock::new(map),
        }
    }

    /// Defaults overridden by any of the known environment variables.
    pub fn from_env() -> Config {
        let config = Config::new();
        for key in [
            NODE_ADDRESS_KEY,
            NODE_ID_KEY,
            PEER_TIMEOUT_KEY,
            RESOLVE_DEADLINE_KEY,
            DATA_DIR_KEY,
        ] {
            if let Ok(value) = env::var(key) {
                config.set(key, value);
            }
        }
        config
    }

    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(String::from(key), value);
    }

    fn get_millis(&self, key: &str, default: u64) -> Duration {
        let millis = match self.get(key) {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!("Ignoring {key}={raw}: not a number of milliseconds");
                default
            }),
            None => default,
        };
        Duration::from_millis(millis)
    }

    pub fn get_node_addr(&self) -> String {
        self.get(NODE_ADDRESS_KEY)
            .unwrap_or_else(|| String::from(DEFAULT_NODE))
    }

    pub fn set_node_addr(&self, addr: String) {
        self.set(NODE_ADDRESS_KEY, addr);
    }

    pub fn get_node_id(&self) -> String {
        match self.get(NODE_ID_KEY) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().simple().to_string();
                self.set(NODE_ID_KEY, id.clone());
                id
            }
        }
    }

    pub fn set_node_id(&self, node_id: String) {
        self.set(NODE_ID_KEY, node_id);
    }

    pub fn get_peer_timeout(&self) -> Duration {
        self.get_millis(PEER_TIMEOUT_KEY, DEFAULT_PEER_TIMEOUT_MS)
    }

    pub fn get_resolve_deadline(&self) -> Duration {
        self.get_millis(RESOLVE_DEADLINE_KEY, DEFAULT_RESOLVE_DEADLINE_MS)
    }

    pub fn get_data_dir(&self) -> Option<PathBuf> {
        self.get(DATA_DIR_KEY)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn set_data_dir(&self, dir: String) {
        self.set(DATA_DIR_KEY, dir);
    }

    /// The settings a `Blockchain` is built with.
    pub fn node_options(&self) -> NodeOptions {
        NodeOptions {
            node_id: self.get_node_id(),
            peer_timeout: self.get_peer_timeout(),
            resolve_deadline: self.get_resolve_deadline(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.get_node_addr(), "127.0.0.1:2001");
        assert_eq!(config.get_node_id().len(), 32);
        assert!(!config.get_node_id().contains('-'));
        assert_eq!(config.get_peer_timeout(), Duration::from_secs(5));
        assert_eq!(config.get_resolve_deadline(), Duration::from_secs(10));
        assert_eq!(config.get_data_dir(), None);
    }

    #[test]
    fn test_node_identity_is_stable() {
        let config = Config::new();
        assert_eq!(config.get_node_id(), config.get_node_id());
        assert_ne!(config.get_node_id(), Config::new().get_node_id());
    }

    #[test]
    fn test_invalid_timeout_falls_back_to_default() {
        let config = Config::new();
        config.set(PEER_TIMEOUT_KEY, "soon".to_string());
        assert_eq!(config.get_peer_timeout(), Duration::from_secs(5));

        config.set(PEER_TIMEOUT_KEY, "250".to_string());
        assert_eq!(config.node_options().peer_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_overrides() {
        let config = Config::new();
        config.set_node_addr("0.0.0.0:5000".to_string());
        config.set_node_id("miner-1".to_string());
        config.set_data_dir("/tmp/ledger".to_string());

        let options = config.node_options();
        assert_eq!(config.get_node_addr(), "0.0.0.0:5000");
        assert_eq!(options.node_id, "miner-1");
        assert_eq!(config.get_data_dir(), Some(PathBuf::from("/tmp/ledger")));
    }
}
