//! Opyn RFQ Core Library
//!
//! EIP-712 order hashing and signing, plus the token, settlement and relayer
//! collaborators an RFQ bidder talks to.

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod signing;

pub use error::{Error, Result};
