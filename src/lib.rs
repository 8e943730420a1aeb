//! Opyn RFQ: EIP-712 order signing and settlement tooling
//!
//! This is the root crate that provides benchmark and integration test access
//! to the workspace. For actual functionality, use the individual crates:
//!
//! - `rfq-core`: typed data hashing, wallets, order signing, token/settlement/relayer clients
//! - `rfq-cli`: the `opyn-rfq` command-line bidder

// Re-export for benchmarks and integration tests
pub use rfq_core as core;
