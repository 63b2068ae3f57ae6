//! HTTP adapters for the ledger API and the chain's JSON-RPC endpoint.

mod common;
pub mod ledger;
pub mod token;
