//! Core library for the peg-monitor project.
//!
//! Samples Chainlink USD feeds for stablecoins, stores the readings in a
//! SQLite warehouse, derives peg-deviation statistics and serves them over
//! HTTP. The binary (`main.rs`) wires these modules together.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod scheduler;
pub mod stats;
pub mod utils;
pub mod warehouse;
