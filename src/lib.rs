//! Scripts for deploying, upgrading, and interacting with the HashGameStore
//! smart contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod cli;
mod commands;
pub mod constants;
pub mod deploy;
pub mod errors;
pub mod registry;
mod solidity;
pub mod utils;
