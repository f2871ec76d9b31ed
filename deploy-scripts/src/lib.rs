//! Scripts for deploying, verifying, initializing and upgrading the marketplace contracts.

pub mod artifacts;
pub mod chain;
pub mod cli;
mod commands;
pub mod config;
pub mod constants;
pub mod errors;
pub mod runners;
mod solidity;
pub mod types;
pub mod utils;
pub mod verify;
