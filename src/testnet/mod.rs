//! Test fixtures shared by the unit tests
//!
//! Mined chains and an in-memory `ChainSource` so consensus can be exercised
//! without sockets.

pub mod test_utils;

pub use test_utils::*;
