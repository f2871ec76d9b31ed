//! The chain client used by the runners to submit and confirm transactions

use alloy::{
    network::{Ethereum, TransactionBuilder},
    providers::{DynProvider, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use tracing::debug;

use crate::errors::ScriptError;

/// A contract created by a confirmed deployment transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// The address of the new contract
    pub address: Address,
    /// The hash of the creation transaction
    pub tx_hash: TxHash,
}

/// The operations the runners perform against the chain.
///
/// Every transaction method blocks until the transaction is confirmed and
/// fails if it reverted.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The address transactions are signed by
    fn sender(&self) -> Address;

    /// The chain ID of the connected network
    async fn chain_id(&self) -> Result<u64, ScriptError>;

    /// Submit a contract-creation transaction with the given init code
    async fn deploy(&self, init_code: Bytes) -> Result<DeployedContract, ScriptError>;

    /// Submit a call to the given contract
    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, ScriptError>;

    /// Execute a read-only call against the given contract
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError>;

    /// Read a storage slot of the given contract
    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, ScriptError>;
}

/// A [`ChainClient`] backed by a JSON-RPC node and a local signing key
pub struct RpcChainClient {
    /// The provider, with the deployer's wallet attached
    provider: DynProvider<Ethereum>,
    /// The deployer's address
    sender: Address,
}

impl RpcChainClient {
    /// Wrap a provider whose wallet signs for `sender`
    pub fn new(provider: DynProvider<Ethereum>, sender: Address) -> Self {
        Self { provider, sender }
    }

    /// Send a transaction and wait for it to be included successfully
    async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt, ScriptError> {
        let pending = self
            .provider
            .send_transaction(tx.with_from(self.sender))
            .await
            .map_err(|e| ScriptError::TransactionSubmission(e.to_string()))?;
        debug!(tx_hash = %pending.tx_hash(), "transaction submitted");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ScriptError::TransactionConfirmation(e.to_string()))?;

        if !receipt.status() {
            return Err(ScriptError::TransactionReverted(format!(
                "{:#x}",
                receipt.transaction_hash
            )));
        }

        Ok(receipt)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
    }

    async fn deploy(&self, init_code: Bytes) -> Result<DeployedContract, ScriptError> {
        let tx = TransactionRequest::default().with_deploy_code(init_code);
        let receipt = self.submit(tx).await?;

        let address = receipt.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "receipt for {:#x} has no contract address",
                receipt.transaction_hash
            ))
        })?;

        Ok(DeployedContract {
            address,
            tx_hash: receipt.transaction_hash,
        })
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, ScriptError> {
        let tx = TransactionRequest::default().with_to(to).with_input(calldata);
        let receipt = self.submit(tx).await?;
        Ok(receipt.transaction_hash)
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(to)
            .with_input(calldata);
        self.provider
            .call(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, ScriptError> {
        self.provider
            .get_storage_at(address, slot)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }
}
