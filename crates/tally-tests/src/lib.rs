//! Integration test suite for Tally.
//!
//! Drives the controller, wallets and transaction builder together against
//! scripted daemons from `tally_rpc::testing`.

pub mod helpers;
