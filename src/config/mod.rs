//! Configuration management
//!
//! Node settings read from the environment: listen address, node identity,
//! peer timeouts and the optional data directory.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
