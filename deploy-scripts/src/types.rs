//! Type definitions used throughout the scripts

use std::{
    fmt::{self, Display},
    fs,
    path::Path,
};

use alloy_primitives::{utils::parse_ether, Address, Bytes, TxHash, U256};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        COLLECTION_ADDRESS_KEY, CONFIG_REF_PREFIX, DEFAULT_INITIALIZER, FEE_ADDRESS_KEY,
        HEXTOYS_NFT_OWNER, SECONDS_PER_MONTH, SIGNER_ADDRESS_KEY,
    },
    errors::ScriptError,
};

// --------------
// | Deployment |
// --------------

/// A single contract deployment, as described in a deployment plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// The name of the contract artifact to deploy
    pub contract_name: String,
    /// The constructor arguments, or the initializer arguments for an
    /// upgradeable contract.
    ///
    /// Arguments of the form `$KEY` are resolved from the run configuration.
    #[serde(default)]
    pub constructor_args: Vec<String>,
    /// Whether the contract is deployed behind an upgradeable proxy
    #[serde(default)]
    pub is_upgradeable: bool,
    /// The initializer invoked through the proxy at deployment time
    #[serde(default)]
    pub initializer_name: Option<String>,
    /// Whether to verify the contract with the block explorer after deployment
    #[serde(default = "default_verify")]
    pub verify: bool,
}

/// Contracts are verified unless a plan opts out
fn default_verify() -> bool {
    true
}

impl DeploymentSpec {
    /// A contract deployed directly with the given constructor arguments
    pub fn direct(contract_name: &str, constructor_args: &[&str]) -> Self {
        Self {
            contract_name: contract_name.to_string(),
            constructor_args: constructor_args.iter().map(|a| a.to_string()).collect(),
            is_upgradeable: false,
            initializer_name: None,
            verify: true,
        }
    }

    /// A contract deployed behind a proxy, initialized with `initialize(args)`
    pub fn upgradeable(contract_name: &str, initializer_args: &[&str]) -> Self {
        Self {
            is_upgradeable: true,
            initializer_name: Some(DEFAULT_INITIALIZER.to_string()),
            ..Self::direct(contract_name, initializer_args)
        }
    }

    /// Skip block explorer verification for this contract
    pub fn without_verification(mut self) -> Self {
        self.verify = false;
        self
    }
}

/// The outcome of a single deployment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentResult {
    /// The name of the deployed contract
    pub contract_name: String,
    /// The address of the contract, or of its proxy if upgradeable
    pub address: Address,
    /// The implementation behind the proxy, if upgradeable
    pub implementation: Option<Address>,
    /// The hash of the (proxy) deployment transaction
    pub tx_hash: TxHash,
    /// Whether the block explorer accepted the contract's source, and linked
    /// the proxy to it if upgradeable
    pub verified: bool,
    /// The verification error, if verification was attempted and failed
    pub error: Option<String>,
}

impl Display for DeploymentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match (&self.error, self.verified) {
            (_, true) => "verified".to_string(),
            (Some(e), false) => format!("unverified ({e})"),
            (None, false) => "unverified".to_string(),
        };
        write!(f, "{}: {:#x}", self.contract_name, self.address)?;
        if let Some(implementation) = self.implementation {
            write!(f, " (implementation {implementation:#x})")?;
        }
        write!(f, " (tx {:#x}) {}", self.tx_hash, status)
    }
}

/// The results of a deployment run, together with the fatal error that cut
/// it short, if any
#[derive(Debug, Default)]
pub struct DeploymentReport {
    /// The results of the specs processed before the run ended, in order
    pub results: Vec<DeploymentResult>,
    /// The error that aborted the run
    pub error: Option<ScriptError>,
}

impl DeploymentReport {
    /// Convert the report into the results of a complete run, or the fatal error
    pub fn into_result(self) -> Result<Vec<DeploymentResult>, ScriptError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.results),
        }
    }
}

/// The lifecycle of a single item processed by a runner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Not yet submitted
    Pending,
    /// The transaction was sent to the node
    Submitted,
    /// The transaction was included and succeeded
    Confirmed,
    /// A verification request was made, successful or not
    VerificationAttempted,
    /// Verification was disabled for the item
    VerificationSkipped,
    /// The item is complete
    Done,
    /// The item failed; the batch is aborted
    Failed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pending => write!(f, "pending"),
            Stage::Submitted => write!(f, "submitted"),
            Stage::Confirmed => write!(f, "confirmed"),
            Stage::VerificationAttempted => write!(f, "verification-attempted"),
            Stage::VerificationSkipped => write!(f, "verification-skipped"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// The built-in deployment plans
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeploymentPlan {
    /// The auction and fixed-price marketplace contracts
    Marketplace,
    /// The single and multi NFT staking factories
    Staking,
    /// The mystery box factory
    MysteryBox,
    /// The subscription contract
    Subscription,
    /// The loot box factory
    LootBox,
    /// The HexToys NFT collection
    Nft,
    /// The NFT collection factory
    NftFactory,
    /// The claim contract
    Claim,
    /// The NFT collection registry
    AddNft,
}

impl DeploymentPlan {
    /// The deployments making up the plan, in order
    pub fn specs(self) -> Vec<DeploymentSpec> {
        let fee = format!("{CONFIG_REF_PREFIX}{FEE_ADDRESS_KEY}");
        let signer = format!("{CONFIG_REF_PREFIX}{SIGNER_ADDRESS_KEY}");
        let collection = format!("{CONFIG_REF_PREFIX}{COLLECTION_ADDRESS_KEY}");

        match self {
            DeploymentPlan::Marketplace => ["SingleAuction", "SingleFixed", "MultipleFixed"]
                .into_iter()
                .map(|name| DeploymentSpec::direct(name, &[fee.as_str()]).without_verification())
                .collect(),
            DeploymentPlan::Staking => ["SingleNFTStakingFactory", "MultiNFTStakingFactory"]
                .into_iter()
                .map(|name| DeploymentSpec::direct(name, &[fee.as_str()]).without_verification())
                .collect(),
            DeploymentPlan::MysteryBox => {
                vec![DeploymentSpec::direct("MysteryBoxFactory", &[]).without_verification()]
            }
            DeploymentPlan::Subscription => {
                vec![DeploymentSpec::direct("HexToysSubscription", &[])]
            }
            DeploymentPlan::LootBox => {
                vec![DeploymentSpec::upgradeable("HexToysLootBoxFactory", &[])]
            }
            DeploymentPlan::Nft => {
                vec![DeploymentSpec::upgradeable("HexToysNFT", &[HEXTOYS_NFT_OWNER])]
            }
            DeploymentPlan::NftFactory => {
                vec![DeploymentSpec::upgradeable("HexToysNFTFactory", &[])]
            }
            DeploymentPlan::Claim => vec![DeploymentSpec::upgradeable(
                "HexToysClaim",
                &[collection.as_str(), signer.as_str()],
            )],
            DeploymentPlan::AddNft => {
                vec![DeploymentSpec::upgradeable("HexToysAddNFTCollection", &[])]
            }
        }
    }
}

/// Read a deployment plan from a JSON file containing an array of specs
pub fn read_plan_file(path: &Path) -> Result<Vec<DeploymentSpec>, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))
}

// ------------------
// | Initialization |
// ------------------

/// A subscription tier offered by a staking factory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    /// The display name of the tier
    pub name: String,
    /// The subscription period in seconds
    #[serde(alias = "periodSeconds")]
    pub period: u64,
    /// The price of the tier in whole tokens, as a decimal string
    pub price: String,
}

impl SubscriptionTier {
    /// Create a new tier
    pub fn new(name: &str, period: u64, price: &str) -> Self {
        Self {
            name: name.to_string(),
            period,
            price: price.to_string(),
        }
    }

    /// The price in 18-decimal base units
    pub fn price_wei(&self) -> Result<U256, ScriptError> {
        parse_ether(&self.price).map_err(|e| {
            ScriptError::CalldataConstruction(format!(
                "invalid price `{}` for subscription `{}`: {}",
                self.price, self.name, e
            ))
        })
    }

    /// Check the tier can be submitted
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.period == 0 {
            return Err(ScriptError::Config(format!(
                "subscription `{}` has a zero period",
                self.name
            )));
        }
        self.price_wei().map(|_| ())
    }
}

/// An APR bracket offered by a staking factory, in tenths of a percent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AprBracket(pub u64);

impl From<AprBracket> for U256 {
    fn from(apr: AprBracket) -> Self {
        U256::from(apr.0)
    }
}

/// The subscription tiers and APR brackets seeded into a staking factory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitSchedule {
    /// The subscription tiers, in the order they are added
    pub subscriptions: Vec<SubscriptionTier>,
    /// The APR brackets, in the order they are added
    pub aprs: Vec<AprBracket>,
}

impl Default for InitSchedule {
    fn default() -> Self {
        Self {
            subscriptions: vec![
                SubscriptionTier::new("Basic", SECONDS_PER_MONTH, "2000000"),
                SubscriptionTier::new("Standard", 3 * SECONDS_PER_MONTH, "5000000"),
                SubscriptionTier::new("Premium", 6 * SECONDS_PER_MONTH, "10000000"),
            ],
            aprs: [50, 100, 150, 200, 250, 300].into_iter().map(AprBracket).collect(),
        }
    }
}

impl InitSchedule {
    /// Read a schedule from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))
    }

    /// The number of transactions needed to apply the schedule to one contract
    pub fn num_transactions(&self) -> usize {
        self.subscriptions.len() + self.aprs.len()
    }
}

/// The outcome of initializing a single staking factory
#[derive(Debug)]
pub struct InitializationResult {
    /// The initialized contract
    pub target: Address,
    /// The confirmed transaction hashes, in submission order, or the error
    /// that aborted the contract's initialization
    pub outcome: Result<Vec<TxHash>, ScriptError>,
}

// -----------
// | Upgrade |
// -----------

/// A proxy upgrade
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeSpec {
    /// The address of the proxy to repoint
    pub proxy_address: String,
    /// The name of the new implementation contract
    pub new_contract_name: String,
    /// An already-deployed implementation to use instead of deploying
    /// `new_contract_name`
    pub implementation_address: Option<String>,
    /// Calldata with which the proxy calls the new implementation during the
    /// upgrade, empty for none
    pub calldata: Bytes,
}

/// The outcome of a proxy upgrade
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeResult {
    /// The proxy address, unchanged by the upgrade
    pub proxy_address: Address,
    /// The implementation the proxy now points to
    pub implementation_address: Address,
    /// The hash of the upgrade transaction
    pub tx_hash: TxHash,
}
