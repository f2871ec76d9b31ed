//! Definitions of CLI arguments and commands for deploy scripts

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    artifacts::ArtifactStore,
    chain::RpcChainClient,
    commands::{deploy, initialize, upgrade, verify},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_PROXY_ADDRESS, DEFAULT_PROXY_ARTIFACT,
        DEFAULT_STAKING_FACTORY_ADDRESSES, DEFAULT_UPGRADE_CONTRACT, DEFAULT_VERIFIER_URL,
        VERIFICATION_COOLDOWN,
    },
    errors::ScriptError,
    types::DeploymentPlan,
    utils::setup_client,
};

/// Deploy, verify, initialize and upgrade the marketplace contracts.
///
/// Every option can be set from the environment (or a `.env` file), so a
/// configured run needs nothing but the command.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub rpc: RpcArgs,

    /// Directory containing the Hardhat compilation artifacts
    #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    Deploy(DeployArgs),
    Initialize(InitializeArgs),
    Upgrade(UpgradeArgs),
    Verify(VerifyArgs),
}

impl Command {
    /// Run the command, connecting to the node only if it sends transactions
    pub async fn run(self, rpc: &RpcArgs, artifacts: &ArtifactStore) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, &rpc.client().await?, artifacts).await,
            Command::Initialize(args) => initialize(args, &rpc.client().await?).await,
            Command::Upgrade(args) => upgrade(args, &rpc.client().await?, artifacts).await,
            Command::Verify(args) => verify(args, artifacts).await,
        }
    }
}

/// Node connection settings, required by every command that sends transactions
#[derive(Args, Default)]
pub struct RpcArgs {
    /// Private key of the deployer
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub priv_key: Option<String>,

    /// Network RPC URL
    #[arg(long, env = "NODE_URL")]
    pub rpc_url: Option<String>,
}

impl RpcArgs {
    /// Connect to the node with the deployer's key
    pub async fn client(&self) -> Result<RpcChainClient, ScriptError> {
        let priv_key = self
            .priv_key
            .as_deref()
            .ok_or_else(|| ScriptError::Config("PRIVATE_KEY is not set".to_string()))?;
        let rpc_url = self
            .rpc_url
            .as_deref()
            .ok_or_else(|| ScriptError::Config("NODE_URL is not set".to_string()))?;

        setup_client(priv_key, rpc_url).await
    }
}

/// Block explorer settings
#[derive(Args)]
pub struct VerifierArgs {
    /// Block explorer API key, verification is skipped without one
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Etherscan-compatible verification API endpoint
    #[arg(long, env = "VERIFIER_URL", default_value = DEFAULT_VERIFIER_URL)]
    pub verifier_url: String,
}

/// Deploy the contracts of a plan, verifying each after a cool-down
#[derive(Args)]
pub struct DeployArgs {
    /// The built-in plan to deploy
    #[arg(required_unless_present = "plan_file", conflicts_with = "plan_file")]
    pub plan: Option<DeploymentPlan>,

    /// A JSON file containing the deployment specs to run
    #[arg(long)]
    pub plan_file: Option<PathBuf>,

    /// Fee recipient, referenced in plans as `$FEE_ADDRESS`
    #[arg(long, env = "FEE_ADDRESS")]
    pub fee_address: Option<String>,

    /// Off-chain authorization signer, referenced in plans as `$SIGNER_ADDRESS`
    #[arg(long, env = "SIGNER_ADDRESS")]
    pub signer_address: Option<String>,

    /// NFT collection, referenced in plans as `$COLLECTION_ADDRESS`
    #[arg(long, env = "COLLECTION_ADDRESS")]
    pub collection_address: Option<String>,

    /// Seconds to wait after a deployment is confirmed before verifying it
    #[arg(long, default_value_t = VERIFICATION_COOLDOWN.as_secs())]
    pub verification_cooldown: u64,

    /// The `TransparentUpgradeableProxy` artifact deployed for upgradeable contracts
    #[arg(long, env = "PROXY_ARTIFACT", default_value = DEFAULT_PROXY_ARTIFACT)]
    pub proxy_artifact: PathBuf,

    #[command(flatten)]
    pub verifier: VerifierArgs,
}

/// Seed subscription tiers and APR brackets into the staking factories
#[derive(Args)]
pub struct InitializeArgs {
    /// Comma-separated addresses of the factories to initialize
    #[arg(
        long,
        env = "STAKING_FACTORY_ADDRESSES",
        default_value = DEFAULT_STAKING_FACTORY_ADDRESSES
    )]
    pub targets: String,

    /// A JSON file with the subscriptions and APRs to add instead of the defaults
    #[arg(long)]
    pub schedule: Option<PathBuf>,
}

/// Upgrade a transparent proxy to a new implementation
#[derive(Args)]
pub struct UpgradeArgs {
    /// Address of the proxy contract
    #[arg(long, env = "PROXY_ADDRESS", default_value = DEFAULT_PROXY_ADDRESS)]
    pub proxy: String,

    /// Name of the new implementation contract
    #[arg(short, long, default_value = DEFAULT_UPGRADE_CONTRACT)]
    pub contract: String,

    /// Address of an already-deployed implementation to use instead
    #[arg(short, long)]
    pub implementation: Option<String>,

    /// Optional calldata, in hex form, with which to
    /// call the implementation contract when upgrading
    #[arg(long)]
    pub calldata: Option<String>,
}

/// Verify an already-deployed contract
#[derive(Args)]
pub struct VerifyArgs {
    /// Address of the deployed contract
    #[arg(short, long)]
    pub address: String,

    /// Name of the contract artifact
    #[arg(short, long)]
    pub contract: String,

    #[command(flatten)]
    pub verifier: VerifierArgs,
}
