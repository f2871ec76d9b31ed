//! The initializer runner: seeds subscription tiers and APR brackets into
//! deployed staking factories

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use tracing::{error, info};

use crate::{
    chain::ChainClient,
    errors::ScriptError,
    solidity::{addAprCall, addSubscriptionCall},
    types::{InitSchedule, InitializationResult, Stage},
};

/// Replays an [`InitSchedule`] against staking factories.
///
/// The factories index tiers and brackets by insertion order, so the
/// schedule is applied strictly in order, one confirmed transaction at a time.
pub struct InitializerRunner<'a, C: ChainClient> {
    /// The client transactions are submitted through
    client: &'a C,
    /// The tiers and brackets to add
    schedule: &'a InitSchedule,
}

impl<'a, C: ChainClient> InitializerRunner<'a, C> {
    /// Create a runner applying `schedule`
    pub fn new(client: &'a C, schedule: &'a InitSchedule) -> Self {
        Self { client, schedule }
    }

    /// Initialize each target independently, in order
    pub async fn initialize_all(&self, targets: &[Address]) -> Vec<InitializationResult> {
        let mut results = Vec::with_capacity(targets.len());
        for &target in targets {
            let outcome = self.initialize(target).await;
            if let Err(e) = &outcome {
                error!(target = %target, stage = %Stage::Failed, "initialization aborted: {e}");
            }
            results.push(InitializationResult { target, outcome });
        }

        results
    }

    /// Apply the schedule to a single contract, stopping at the first failure
    pub async fn initialize(&self, target: Address) -> Result<Vec<TxHash>, ScriptError> {
        info!(target = %target, "initializing {target:#x}");
        let calls = self.calls()?;

        let mut tx_hashes = Vec::with_capacity(calls.len());
        for (description, calldata) in calls {
            let tx_hash = self.client.send(target, calldata).await?;
            info!(target = %target, tx_hash = %tx_hash, "{description}");
            tx_hashes.push(tx_hash);
        }

        Ok(tx_hashes)
    }

    /// The calls making up the schedule, subscriptions first, each with a
    /// description for the log.
    ///
    /// The whole schedule is validated here, so a bad entry fails the
    /// contract before any transaction is sent.
    fn calls(&self) -> Result<Vec<(String, Bytes)>, ScriptError> {
        let mut calls = Vec::with_capacity(self.schedule.num_transactions());

        for tier in &self.schedule.subscriptions {
            tier.validate()?;
            let call = addSubscriptionCall {
                name: tier.name.clone(),
                period: U256::from(tier.period),
                price: tier.price_wei()?,
            };
            calls.push((
                format!("added subscription {} ({}s, {})", tier.name, tier.period, tier.price),
                call.abi_encode().into(),
            ));
        }

        for &apr in &self.schedule.aprs {
            let call = addAprCall { apr: apr.into() };
            calls.push((format!("added apr {}", apr.0), call.abi_encode().into()));
        }

        Ok(calls)
    }
}
