//! In-memory chain client and verifier used by the runner tests

use std::sync::Mutex;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use crate::{
    chain::{ChainClient, DeployedContract},
    constants::UPGRADE_AND_CALL_ONLY_VERSION,
    errors::ScriptError,
    solidity::UPGRADE_INTERFACE_VERSIONCall,
    verify::{VerificationRequest, Verifier},
};

/// A transaction submitted to the mock chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecordedTx {
    /// A contract creation with the given init code
    Deploy(Bytes),
    /// A call to a contract
    Call { to: Address, calldata: Bytes },
}

/// A chain that confirms every transaction except the one at `fail_at`
pub(crate) struct MockChainClient {
    /// Every submitted transaction, in order, including the failing one
    pub txs: Mutex<Vec<RecordedTx>>,
    /// The index of the transaction that reverts
    fail_at: Option<usize>,
    /// The address stored in every contract's EIP-1967 admin slot
    admin: Address,
    /// The admin's `UPGRADE_INTERFACE_VERSION`, `None` for a 4.x admin
    admin_version: Option<String>,
}

impl MockChainClient {
    pub(crate) fn new() -> Self {
        Self {
            txs: Mutex::new(Vec::new()),
            fail_at: None,
            admin: Self::admin(),
            admin_version: Some(UPGRADE_AND_CALL_ONLY_VERSION.to_string()),
        }
    }

    /// A chain on which the `index`th transaction reverts
    pub(crate) fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::new()
        }
    }

    /// A chain whose contracts have no proxy admin
    pub(crate) fn without_admin() -> Self {
        Self {
            admin: Address::ZERO,
            ..Self::new()
        }
    }

    /// A chain whose proxies are managed by a 4.x `ProxyAdmin`
    pub(crate) fn with_legacy_admin() -> Self {
        Self {
            admin_version: None,
            ..Self::new()
        }
    }

    /// The proxy admin reported by default
    pub(crate) fn admin() -> Address {
        Address::repeat_byte(0xad)
    }

    /// The address the `index`th transaction deploys to
    pub(crate) fn deployed_address(index: usize) -> Address {
        Address::left_padding_from(&[0xc0, index as u8])
    }

    /// The hash of the `index`th transaction
    pub(crate) fn tx_hash(index: usize) -> TxHash {
        TxHash::left_padding_from(&[0x70, index as u8])
    }

    pub(crate) fn recorded(&self) -> Vec<RecordedTx> {
        self.txs.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<(Address, Bytes)> {
        self.recorded()
            .into_iter()
            .filter_map(|tx| match tx {
                RecordedTx::Call { to, calldata } => Some((to, calldata)),
                RecordedTx::Deploy(_) => None,
            })
            .collect()
    }

    pub(crate) fn deploys(&self) -> Vec<Bytes> {
        self.recorded()
            .into_iter()
            .filter_map(|tx| match tx {
                RecordedTx::Deploy(code) => Some(code),
                RecordedTx::Call { .. } => None,
            })
            .collect()
    }

    /// Record a transaction, returning its index or the revert
    fn record(&self, tx: RecordedTx) -> Result<usize, ScriptError> {
        let mut txs = self.txs.lock().unwrap();
        let index = txs.len();
        txs.push(tx);

        if self.fail_at == Some(index) {
            return Err(ScriptError::TransactionReverted(format!(
                "{:#x}",
                Self::tx_hash(index)
            )));
        }
        Ok(index)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn sender(&self) -> Address {
        Address::repeat_byte(0xde)
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        Ok(31337)
    }

    async fn deploy(&self, init_code: Bytes) -> Result<DeployedContract, ScriptError> {
        let index = self.record(RecordedTx::Deploy(init_code))?;
        Ok(DeployedContract {
            address: Self::deployed_address(index),
            tx_hash: Self::tx_hash(index),
        })
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, ScriptError> {
        let index = self.record(RecordedTx::Call { to, calldata })?;
        Ok(Self::tx_hash(index))
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        let is_version_query = calldata.starts_with(&UPGRADE_INTERFACE_VERSIONCall::SELECTOR);
        match &self.admin_version {
            Some(version) if to == self.admin && is_version_query => {
                Ok((version.clone(),).abi_encode_params().into())
            }
            _ => Err(ScriptError::ContractInteraction("execution reverted".to_string())),
        }
    }

    async fn storage_at(&self, _address: Address, _slot: U256) -> Result<U256, ScriptError> {
        Ok(U256::from_be_slice(self.admin.as_slice()))
    }
}

/// A verifier that rejects the contracts named in `failing`
#[derive(Default)]
pub(crate) struct MockVerifier {
    /// Every verification request, in order
    pub requests: Mutex<Vec<VerificationRequest>>,
    /// Every `(proxy, implementation)` link request, in order
    pub links: Mutex<Vec<(Address, Address)>>,
    /// The contracts whose verification fails
    failing: Vec<String>,
}

impl MockVerifier {
    pub(crate) fn failing_for(contracts: &[&str]) -> Self {
        Self {
            failing: contracts.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn requested(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn linked(&self) -> Vec<(Address, Address)> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.contract_name) {
            return Err(ScriptError::Verification("Fail - Unable to verify".to_string()));
        }
        Ok(())
    }

    async fn link_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), ScriptError> {
        self.links.lock().unwrap().push((proxy, implementation));
        Ok(())
    }
}
