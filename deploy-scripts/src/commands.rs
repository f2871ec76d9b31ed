//! Implementations of the various deploy scripts

use std::time::Duration;

use alloy_primitives::Bytes;
use tracing::{info, warn};

use crate::{
    artifacts::ArtifactStore,
    chain::ChainClient,
    cli::{DeployArgs, InitializeArgs, UpgradeArgs, VerifierArgs, VerifyArgs},
    config::RunnerConfig,
    errors::ScriptError,
    runners::{DeploymentRunner, InitializerRunner, UpgradeRunner},
    types::{read_plan_file, InitSchedule, UpgradeSpec},
    utils::{
        parse_address, parse_address_list, parse_calldata, print_deployments,
        print_initializations,
    },
    verify::{EtherscanVerifier, VerificationRequest, Verifier},
};

pub async fn deploy(
    args: DeployArgs,
    client: &impl ChainClient,
    artifacts: &ArtifactStore,
) -> Result<(), ScriptError> {
    let specs = match (&args.plan_file, args.plan) {
        (Some(path), _) => read_plan_file(path)?,
        (None, Some(plan)) => plan.specs(),
        (None, None) => {
            return Err(ScriptError::Config("no deployment plan given".to_string()))
        }
    };

    let config = RunnerConfig {
        fee_address: args.fee_address,
        signer_address: args.signer_address,
        collection_address: args.collection_address,
        verification_cooldown: Duration::from_secs(args.verification_cooldown),
        proxy_artifact: args.proxy_artifact,
    };

    let verifier = setup_verifier(&args.verifier, artifacts)?;
    if verifier.is_none() {
        warn!("API_KEY not set, contracts will not be verified");
    }

    let runner = DeploymentRunner::new(
        client,
        verifier.as_ref().map(|v| v as &dyn Verifier),
        artifacts,
        &config,
    );
    let report = runner.run(&specs).await;
    print_deployments(&report.results);

    report.into_result().map(|_| ())
}

/// Initialize every target, failing if any of them failed
pub async fn initialize(
    args: InitializeArgs,
    client: &impl ChainClient,
) -> Result<(), ScriptError> {
    let targets = parse_address_list(&args.targets)?;
    let schedule = match &args.schedule {
        Some(path) => InitSchedule::from_file(path)?,
        None => InitSchedule::default(),
    };

    let results = InitializerRunner::new(client, &schedule)
        .initialize_all(&targets)
        .await;
    print_initializations(&results);

    match results.into_iter().find_map(|r| r.outcome.err()) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub async fn upgrade(
    args: UpgradeArgs,
    client: &impl ChainClient,
    artifacts: &ArtifactStore,
) -> Result<(), ScriptError> {
    let spec = UpgradeSpec {
        proxy_address: args.proxy,
        new_contract_name: args.contract,
        implementation_address: args.implementation,
        calldata: parse_calldata(args.calldata.as_deref())?,
    };

    let result = UpgradeRunner::new(client, artifacts).upgrade(&spec).await?;
    println!("{} upgraded: {:#x}", spec.new_contract_name, result.proxy_address);
    println!("\timplementation: {:#x}", result.implementation_address);

    Ok(())
}

/// Verify a single contract. A rejected verification is logged, not returned.
pub async fn verify(args: VerifyArgs, artifacts: &ArtifactStore) -> Result<(), ScriptError> {
    let verifier = setup_verifier(&args.verifier, artifacts)?
        .ok_or_else(|| ScriptError::Config("API_KEY is required to verify".to_string()))?;

    let request = VerificationRequest {
        address: parse_address(&args.address)?,
        contract_name: args.contract,
        constructor_args: Bytes::new(),
    };
    verify_contract(&verifier, &request).await;

    Ok(())
}

/// Request verification, logging the outcome
async fn verify_contract(verifier: &dyn Verifier, request: &VerificationRequest) {
    match verifier.verify(request).await {
        Ok(()) => info!("{} verified", request.contract_name),
        Err(e) => warn!("{} verification failed: {e}", request.contract_name),
    }
}

/// Build the block explorer client, if an API key is configured
fn setup_verifier(
    args: &VerifierArgs,
    artifacts: &ArtifactStore,
) -> Result<Option<EtherscanVerifier>, ScriptError> {
    args.api_key
        .as_deref()
        .map(|key| EtherscanVerifier::new(&args.verifier_url, key, artifacts.clone()))
        .transpose()
}
