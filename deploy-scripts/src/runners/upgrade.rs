//! The upgrade runner: repoints a transparent proxy at a new implementation

use std::str::FromStr;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use tracing::{debug, info};

use crate::{
    artifacts::ArtifactStore,
    chain::ChainClient,
    constants::{
        NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT,
        UPGRADE_AND_CALL_ONLY_VERSION,
    },
    errors::ScriptError,
    solidity::{upgradeAndCallCall, upgradeCall, UPGRADE_INTERFACE_VERSIONCall},
    types::{Stage, UpgradeResult, UpgradeSpec},
    utils::parse_address,
};

/// Upgrades proxies through their `ProxyAdmin`
pub struct UpgradeRunner<'a, C: ChainClient> {
    /// The client transactions are submitted through
    client: &'a C,
    /// The compiled implementation contracts
    artifacts: &'a ArtifactStore,
}

impl<'a, C: ChainClient> UpgradeRunner<'a, C> {
    /// Create a runner deploying implementations from `artifacts`
    pub fn new(client: &'a C, artifacts: &'a ArtifactStore) -> Self {
        Self { client, artifacts }
    }

    /// Upgrade the proxy, deploying the new implementation unless one is given
    pub async fn upgrade(&self, spec: &UpgradeSpec) -> Result<UpgradeResult, ScriptError> {
        let proxy = parse_address(&spec.proxy_address)?;
        let admin = self.proxy_admin(proxy).await?;
        info!(
            proxy = %proxy,
            admin = %admin,
            "upgrading proxy to {}",
            spec.new_contract_name
        );

        let implementation = match &spec.implementation_address {
            Some(address) => parse_address(address)?,
            None => {
                let artifact = self.artifacts.load(&spec.new_contract_name)?;
                let deployed = self.client.deploy(artifact.deploy_code(&[])?).await?;
                info!(
                    contract = %spec.new_contract_name,
                    "implementation deployed at {:#x}",
                    deployed.address
                );
                deployed.address
            }
        };

        let calldata = self
            .upgrade_calldata(admin, proxy, implementation, &spec.calldata)
            .await;

        info!(proxy = %proxy, stage = %Stage::Submitted);
        let tx_hash = self.client.send(admin, calldata).await?;
        info!(proxy = %proxy, stage = %Stage::Confirmed, tx_hash = %tx_hash);

        Ok(UpgradeResult {
            proxy_address: proxy,
            implementation_address: implementation,
            tx_hash,
        })
    }

    /// Encode the admin call repointing the proxy.
    ///
    /// A 4.x admin's `upgradeAndCall` always calls the implementation, which
    /// reverts for empty data, so without data those admins get `upgrade`.
    /// 5.x admins only have `upgradeAndCall`.
    async fn upgrade_calldata(
        &self,
        admin: Address,
        proxy: Address,
        implementation: Address,
        data: &Bytes,
    ) -> Bytes {
        if data.is_empty() && !self.is_upgrade_and_call_only(admin).await {
            debug!(admin = %admin, "admin predates 5.0, using `upgrade`");
            return upgradeCall {
                proxy,
                implementation,
            }
            .abi_encode()
            .into();
        }

        upgradeAndCallCall {
            proxy,
            implementation,
            data: data.clone(),
        }
        .abi_encode()
        .into()
    }

    /// Whether the admin reports the 5.0 upgrade interface. Admins without
    /// `UPGRADE_INTERFACE_VERSION` revert the query.
    async fn is_upgrade_and_call_only(&self, admin: Address) -> bool {
        let query = UPGRADE_INTERFACE_VERSIONCall {}.abi_encode();
        match self.client.call(admin, query.into()).await {
            Ok(output) => <(String,)>::abi_decode_params(&output)
                .is_ok_and(|(version,)| version == UPGRADE_AND_CALL_ONLY_VERSION),
            Err(_) => false,
        }
    }

    /// Read the proxy admin address from the proxy's EIP-1967 admin slot.
    ///
    /// This is the recommended way to get the proxy admin address:
    /// https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
    async fn proxy_admin(&self, proxy: Address) -> Result<Address, ScriptError> {
        let slot = U256::from_str(PROXY_ADMIN_STORAGE_SLOT)
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        let word = self
            .client
            .storage_at(proxy, slot)
            .await?
            .to_be_bytes::<NUM_BYTES_STORAGE_SLOT>();

        let admin = Address::from_slice(&word[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..]);
        if admin.is_zero() {
            return Err(ScriptError::ContractInteraction(format!(
                "{proxy:#x} has no proxy admin, is it a transparent proxy?"
            )));
        }

        Ok(admin)
    }
}
