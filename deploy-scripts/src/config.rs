//! Run configuration passed explicitly to each runner

use std::{path::PathBuf, time::Duration};

use crate::{
    constants::{
        COLLECTION_ADDRESS_KEY, CONFIG_REF_PREFIX, DEFAULT_PROXY_ARTIFACT, FEE_ADDRESS_KEY,
        SIGNER_ADDRESS_KEY, VERIFICATION_COOLDOWN,
    },
    errors::ScriptError,
};

/// Values referenced by deployment plans, and the runner policy knobs
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// The fee recipient address, referenced as `$FEE_ADDRESS`
    pub fee_address: Option<String>,
    /// The authorization signer address, referenced as `$SIGNER_ADDRESS`
    pub signer_address: Option<String>,
    /// The NFT collection address, referenced as `$COLLECTION_ADDRESS`
    pub collection_address: Option<String>,
    /// The pause between a confirmed deployment and its verification request
    pub verification_cooldown: Duration,
    /// The artifact of the transparent proxy deployed for upgradeable contracts
    pub proxy_artifact: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fee_address: None,
            signer_address: None,
            collection_address: None,
            verification_cooldown: VERIFICATION_COOLDOWN,
            proxy_artifact: PathBuf::from(DEFAULT_PROXY_ARTIFACT),
        }
    }
}

impl RunnerConfig {
    /// Resolve a plan argument, substituting configuration references
    pub fn resolve_arg(&self, arg: &str) -> Result<String, ScriptError> {
        let Some(key) = arg.strip_prefix(CONFIG_REF_PREFIX) else {
            return Ok(arg.to_string());
        };

        let value = match key {
            FEE_ADDRESS_KEY => &self.fee_address,
            SIGNER_ADDRESS_KEY => &self.signer_address,
            COLLECTION_ADDRESS_KEY => &self.collection_address,
            _ => {
                return Err(ScriptError::Config(format!(
                    "unknown configuration key `{key}`"
                )))
            }
        };

        value
            .clone()
            .ok_or_else(|| ScriptError::Config(format!("`{key}` is not set")))
    }

    /// Resolve every argument of a plan entry, in order
    pub fn resolve_args(&self, args: &[String]) -> Result<Vec<String>, ScriptError> {
        args.iter().map(|arg| self.resolve_arg(arg)).collect()
    }
}
