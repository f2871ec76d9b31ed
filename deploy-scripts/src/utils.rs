//! Utilities for the deploy scripts

use std::str::FromStr;

use alloy::{
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes};
use itertools::Itertools;
use tracing::info;

use crate::{
    chain::{ChainClient, RpcChainClient},
    errors::ScriptError,
    types::{DeploymentResult, InitializationResult},
};

/// Sets up the client through which every transaction of the run is signed
/// and submitted, logging the network and signer
pub async fn setup_client(priv_key: &str, rpc_url: &str) -> Result<RpcChainClient, ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let sender = signer.address();

    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let provider = ProviderBuilder::new().wallet(signer).connect_http(url);
    let client = RpcChainClient::new(DynProvider::new(provider), sender);

    let chain_id = client.chain_id().await?;
    info!(chain_id, "network: {rpc_url}");
    info!("signer: {sender:#x}");

    Ok(client)
}

/// Parse an address, ignoring checksum casing
pub fn parse_address(address: &str) -> Result<Address, ScriptError> {
    Address::from_str(address.trim())
        .map_err(|e| ScriptError::Config(format!("invalid address `{address}`: {e}")))
}

/// Parse a comma-separated list of addresses
pub fn parse_address_list(addresses: &str) -> Result<Vec<Address>, ScriptError> {
    addresses
        .split(',')
        .filter(|a| !a.trim().is_empty())
        .map(parse_address)
        .collect()
}

/// Parse optional hex calldata, with or without a `0x` prefix
pub fn parse_calldata(calldata: Option<&str>) -> Result<Bytes, ScriptError> {
    match calldata {
        Some(hex_str) => hex::decode(hex_str.trim_start_matches("0x"))
            .map(Bytes::from)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string())),
        None => Ok(Bytes::new()),
    }
}

/// Print the outcome of every processed deployment
pub fn print_deployments(results: &[DeploymentResult]) {
    if results.is_empty() {
        return;
    }

    println!("Deployed contracts:");
    println!("{}", results.iter().map(|r| format!("\t{r}")).join("\n"));
}

/// Print the outcome of every initialized contract
pub fn print_initializations(results: &[InitializationResult]) {
    for result in results {
        match &result.outcome {
            Ok(tx_hashes) => println!(
                "{:#x} initialized with {} transactions",
                result.target,
                tx_hashes.len()
            ),
            Err(e) => println!("{:#x} initialization failed: {}", result.target, e),
        }
    }
}
