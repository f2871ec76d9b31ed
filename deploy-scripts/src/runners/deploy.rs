//! The deployment runner: deploy, cool down, verify, for each spec in a plan

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use tracing::{error, info, warn};

use crate::{
    artifacts::{ArtifactStore, ContractArtifact},
    chain::{ChainClient, DeployedContract},
    config::RunnerConfig,
    errors::ScriptError,
    types::{DeploymentReport, DeploymentResult, DeploymentSpec, Stage},
    verify::{VerificationRequest, Verifier},
};

/// A proxy deployed in front of a freshly deployed implementation
struct DeployedProxy {
    /// The proxy, the address users interact with
    proxy: DeployedContract,
    /// The implementation the proxy delegates to
    implementation: Address,
}

/// Deploys the contracts of a plan in order.
///
/// A deployment failure aborts the run; a verification failure is logged and
/// recorded on the spec's result.
pub struct DeploymentRunner<'a, C: ChainClient> {
    /// The client deployments are submitted through
    client: &'a C,
    /// The block explorer, if verification is enabled
    verifier: Option<&'a dyn Verifier>,
    /// The compiled contracts
    artifacts: &'a ArtifactStore,
    /// Argument values, the proxy artifact and the cool-down policy
    config: &'a RunnerConfig,
}

impl<'a, C: ChainClient> DeploymentRunner<'a, C> {
    /// Create a runner; without a verifier every spec skips verification
    pub fn new(
        client: &'a C,
        verifier: Option<&'a dyn Verifier>,
        artifacts: &'a ArtifactStore,
        config: &'a RunnerConfig,
    ) -> Self {
        Self {
            client,
            verifier,
            artifacts,
            config,
        }
    }

    /// Process every spec in order, stopping at the first deployment failure
    pub async fn run(&self, specs: &[DeploymentSpec]) -> DeploymentReport {
        let mut report = DeploymentReport::default();

        for spec in specs {
            match self.process(spec).await {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    error!(contract = %spec.contract_name, stage = %Stage::Failed, "{e}");
                    report.error = Some(e);
                    break;
                }
            }
        }

        report
    }

    /// Deploy and verify a single spec
    async fn process(&self, spec: &DeploymentSpec) -> Result<DeploymentResult, ScriptError> {
        let name = &spec.contract_name;
        info!(contract = %name, stage = %Stage::Pending, "deploying {name}");

        let args = self.config.resolve_args(&spec.constructor_args)?;
        let artifact = self.artifacts.load(name)?;

        let (deployed, implementation) = if spec.is_upgradeable {
            let deployed = self.deploy_proxy(&artifact, spec, &args).await?;
            (deployed.proxy, Some(deployed.implementation))
        } else {
            (self.deploy_direct(&artifact, &args).await?, None)
        };
        info!(
            contract = %name,
            stage = %Stage::Confirmed,
            tx_hash = %deployed.tx_hash,
            "{name} deployed at {:#x}",
            deployed.address
        );

        let (verified, error) = self.verify(spec, deployed.address, implementation).await;
        info!(contract = %name, stage = %Stage::Done, verified);

        Ok(DeploymentResult {
            contract_name: name.clone(),
            address: deployed.address,
            implementation,
            tx_hash: deployed.tx_hash,
            verified,
            error,
        })
    }

    /// Deploy the contract itself with the given constructor arguments
    async fn deploy_direct(
        &self,
        artifact: &ContractArtifact,
        args: &[String],
    ) -> Result<DeployedContract, ScriptError> {
        let init_code = artifact.deploy_code(args)?;

        info!(contract = %artifact.contract_name, stage = %Stage::Submitted);
        self.client.deploy(init_code).await
    }

    /// Deploy the implementation, then a transparent proxy in front of it
    /// which calls the initializer with the given arguments
    async fn deploy_proxy(
        &self,
        artifact: &ContractArtifact,
        spec: &DeploymentSpec,
        args: &[String],
    ) -> Result<DeployedProxy, ScriptError> {
        // Encode everything before the first transaction is sent
        let init_data = match &spec.initializer_name {
            Some(initializer) => artifact.encode_call(initializer, args)?,
            None if args.is_empty() => Vec::new(),
            None => {
                return Err(ScriptError::CalldataConstruction(format!(
                    "`{}` has arguments but no initializer",
                    spec.contract_name
                )))
            }
        };
        let implementation_code = artifact.deploy_code(&[])?;
        let proxy = ContractArtifact::from_file(&self.config.proxy_artifact)?;

        info!(
            contract = %artifact.contract_name,
            stage = %Stage::Submitted,
            "deploying implementation"
        );
        let implementation = self.client.deploy(implementation_code).await?;
        info!(
            contract = %artifact.contract_name,
            "implementation deployed at {:#x}",
            implementation.address
        );

        let proxy_args = (
            implementation.address,
            self.client.sender(),
            Bytes::from(init_data),
        )
            .abi_encode_params();
        let proxy_code = [proxy.bytecode.as_ref(), &proxy_args].concat();

        info!(
            contract = %artifact.contract_name,
            stage = %Stage::Submitted,
            "deploying {}",
            proxy.contract_name
        );
        let proxy = self.client.deploy(proxy_code.into()).await?;

        Ok(DeployedProxy {
            proxy,
            implementation: implementation.address,
        })
    }

    /// Wait out the cool-down and request verification, returning whether it
    /// succeeded and the error if it did not.
    ///
    /// Behind a proxy the implementation is verified at its own address, then
    /// the proxy is linked to it.
    async fn verify(
        &self,
        spec: &DeploymentSpec,
        address: Address,
        implementation: Option<Address>,
    ) -> (bool, Option<String>) {
        let Some(verifier) = self.verifier.filter(|_| spec.verify) else {
            info!(contract = %spec.contract_name, stage = %Stage::VerificationSkipped);
            return (false, None);
        };

        info!(
            contract = %spec.contract_name,
            "waiting {:?} before verification",
            self.config.verification_cooldown
        );
        tokio::time::sleep(self.config.verification_cooldown).await;

        let request = VerificationRequest {
            address: implementation.unwrap_or(address),
            contract_name: spec.contract_name.clone(),
            constructor_args: Bytes::new(),
        };
        let mut outcome = verifier.verify(&request).await;
        if let (true, Some(implementation)) = (outcome.is_ok(), implementation) {
            outcome = verifier.link_proxy(address, implementation).await;
        }
        info!(contract = %spec.contract_name, stage = %Stage::VerificationAttempted);

        match outcome {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(contract = %spec.contract_name, "verification failed: {e}");
                (false, Some(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use alloy_primitives::keccak256;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        artifacts::tests::{sample_abi, write_artifact},
        constants::PROXY_CONTRACT_NAME,
        runners::mocks::{MockChainClient, MockVerifier},
    };

    const FEE_ADDRESS: &str = "0x00000000000000000000000000000000000000fe";

    /// An artifacts directory and a matching run configuration
    struct Fixture {
        /// Holds the artifacts and the proxy package
        _dir: TempDir,
        store: ArtifactStore,
        config: RunnerConfig,
    }

    /// Write the OpenZeppelin proxy artifact outside the artifacts
    /// directory, the way the `@openzeppelin/contracts` package ships it
    fn write_proxy_package(root: &Path) -> std::path::PathBuf {
        write_artifact(
            root,
            PROXY_CONTRACT_NAME,
            json!([{
                "type": "constructor",
                "stateMutability": "payable",
                "inputs": [
                    { "name": "_logic", "type": "address", "internalType": "address" },
                    { "name": "initialOwner", "type": "address", "internalType": "address" },
                    { "name": "_data", "type": "bytes", "internalType": "bytes" }
                ]
            }]),
        );
        root.join(format!(
            "contracts/{PROXY_CONTRACT_NAME}.sol/{PROXY_CONTRACT_NAME}.json"
        ))
    }

    /// The given constructor-less contracts, the `Market` contract taking a
    /// fee address and the upgradeable `Vault`
    fn fixture(names: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let artifacts_dir = dir.path().join("artifacts");
        for name in names {
            write_artifact(&artifacts_dir, name, json!([]));
        }
        write_artifact(&artifacts_dir, "Market", sample_abi());
        // Upgradeable, so only the initializer
        write_artifact(&artifacts_dir, "Vault", json!([sample_abi()[1].clone()]));

        let proxy_artifact = write_proxy_package(&dir.path().join("node_modules"));
        let config = RunnerConfig {
            fee_address: Some(FEE_ADDRESS.to_string()),
            verification_cooldown: Duration::ZERO,
            proxy_artifact,
            ..Default::default()
        };

        Fixture {
            _dir: dir,
            store: ArtifactStore::new(artifacts_dir),
            config,
        }
    }

    fn direct(names: &[&str]) -> Vec<DeploymentSpec> {
        names.iter().map(|n| DeploymentSpec::direct(n, &[])).collect()
    }

    #[tokio::test]
    async fn test_specs_deployed_in_order() {
        let f = fixture(&["A", "B", "C"]);
        let client = MockChainClient::new();
        let verifier = MockVerifier::default();
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &f.config);

        let results = runner
            .run(&direct(&["A", "B", "C"]))
            .await
            .into_result()
            .unwrap();

        let names: Vec<_> = results.iter().map(|r| r.contract_name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.address, MockChainClient::deployed_address(i));
            assert_eq!(result.tx_hash, MockChainClient::tx_hash(i));
            assert_eq!(result.implementation, None);
            assert!(result.verified);
            assert_eq!(result.error, None);
        }

        let verified: Vec<_> = verifier
            .requested()
            .into_iter()
            .map(|r| r.address)
            .collect();
        let deployed: Vec<_> = (0..3).map(MockChainClient::deployed_address).collect();
        assert_eq!(verified, deployed);
        assert!(verifier.requested().iter().all(|r| r.constructor_args.is_empty()));
        assert!(verifier.linked().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_failure_aborts_remaining_specs() {
        let f = fixture(&["A", "B", "C"]);
        let client = MockChainClient::failing_at(1);
        let verifier = MockVerifier::default();
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &f.config);

        let report = runner.run(&direct(&["A", "B", "C"])).await;

        // `C` is never submitted, `A` keeps its result
        assert_eq!(client.deploys().len(), 2);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].contract_name, "A");
        assert!(matches!(report.error, Some(ScriptError::TransactionReverted(_))));
        assert_eq!(verifier.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_verification_failure_does_not_stop_the_run() {
        let f = fixture(&["A", "B"]);
        let client = MockChainClient::new();
        let verifier = MockVerifier::failing_for(&["A"]);
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &f.config);

        let results = runner
            .run(&direct(&["A", "B"]))
            .await
            .into_result()
            .unwrap();

        assert_eq!(client.deploys().len(), 2);
        assert!(!results[0].verified);
        assert!(results[0].error.as_deref().unwrap().contains("Unable to verify"));
        assert!(results[1].verified);
    }

    #[tokio::test]
    async fn test_deploy_and_verify_then_deploy_and_fail_verify() {
        let f = fixture(&["First", "Second"]);
        let client = MockChainClient::new();
        let verifier = MockVerifier::failing_for(&["Second"]);
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &f.config);

        let report = runner.run(&direct(&["First", "Second"])).await;

        assert!(report.error.is_none());
        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.address != Address::ZERO));
        assert!(report.results[0].verified);
        assert!(!report.results[1].verified);
    }

    #[tokio::test]
    async fn test_constructor_args_resolved_from_config() {
        let f = fixture(&[]);
        let client = MockChainClient::new();
        let runner = DeploymentRunner::new(&client, None, &f.store, &f.config);

        let specs = [DeploymentSpec::direct("Market", &["$FEE_ADDRESS"])];
        runner.run(&specs).await.into_result().unwrap();

        let code = &client.deploys()[0];
        assert_eq!(
            Address::from_slice(&code[code.len() - 20..]),
            Address::with_last_byte(0xfe)
        );
    }

    #[tokio::test]
    async fn test_unresolved_args_abort_before_submission() {
        let f = fixture(&[]);
        let client = MockChainClient::new();
        let config = RunnerConfig {
            fee_address: None,
            ..f.config.clone()
        };
        let runner = DeploymentRunner::new(&client, None, &f.store, &config);

        let specs = [DeploymentSpec::direct("Market", &["$FEE_ADDRESS"])];
        let report = runner.run(&specs).await;

        assert!(matches!(report.error, Some(ScriptError::Config(_))));
        assert!(client.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_upgradeable_deploys_implementation_then_proxy() {
        let f = fixture(&[]);
        let client = MockChainClient::new();
        let runner = DeploymentRunner::new(&client, None, &f.store, &f.config);

        let owner = "0x0000000000000000000000000000000000000001";
        let specs = [DeploymentSpec::upgradeable("Vault", &[owner, "7"])];
        let results = runner.run(&specs).await.into_result().unwrap();

        let deploys = client.deploys();
        assert_eq!(deploys.len(), 2);

        // The proxy is constructed with the implementation, the deployer and
        // the initializer call
        let proxy_args = &deploys[1][5..];
        let (logic, owner_arg, data) =
            <(Address, Address, Bytes)>::abi_decode_params(proxy_args).unwrap();
        assert_eq!(logic, MockChainClient::deployed_address(0));
        assert_eq!(owner_arg, client.sender());
        assert_eq!(&data[..4], &keccak256("initialize(address,uint256)")[..4]);

        assert_eq!(results[0].address, MockChainClient::deployed_address(1));
        assert_eq!(
            results[0].implementation,
            Some(MockChainClient::deployed_address(0))
        );
    }

    #[tokio::test]
    async fn test_upgradeable_verifies_implementation_and_links_proxy() {
        let f = fixture(&[]);
        let client = MockChainClient::new();
        let verifier = MockVerifier::default();
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &f.config);

        let specs = [DeploymentSpec::upgradeable("Vault", &[FEE_ADDRESS, "1"])];
        let results = runner.run(&specs).await.into_result().unwrap();

        let implementation = MockChainClient::deployed_address(0);
        let proxy = MockChainClient::deployed_address(1);

        // The source is checked against the implementation's own bytecode
        let requests = verifier.requested();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].address, implementation);
        assert_eq!(requests[0].contract_name, "Vault");

        assert_eq!(verifier.linked(), [(proxy, implementation)]);
        assert_eq!(results[0].address, proxy);
        assert!(results[0].verified);
    }

    #[tokio::test]
    async fn test_rejected_implementation_is_not_linked() {
        let f = fixture(&[]);
        let client = MockChainClient::new();
        let verifier = MockVerifier::failing_for(&["Vault"]);
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &f.config);

        let specs = [DeploymentSpec::upgradeable("Vault", &[FEE_ADDRESS, "1"])];
        let results = runner.run(&specs).await.into_result().unwrap();

        assert!(verifier.linked().is_empty());
        assert!(!results[0].verified);
        assert!(results[0].error.is_some());
    }

    #[tokio::test]
    async fn test_proxy_comes_from_the_package_artifact() {
        let f = fixture(&[]);
        let client = MockChainClient::new();

        // No proxy in the project's own artifacts directory is needed...
        let runner = DeploymentRunner::new(&client, None, &f.store, &f.config);
        let specs = [DeploymentSpec::upgradeable("Vault", &[FEE_ADDRESS, "1"])];
        runner.run(&specs).await.into_result().unwrap();
        assert_eq!(client.deploys().len(), 2);

        // ...but a missing package artifact aborts before any transaction
        let client = MockChainClient::new();
        let config = RunnerConfig {
            proxy_artifact: f.config.proxy_artifact.with_file_name("Missing.json"),
            ..f.config.clone()
        };
        let runner = DeploymentRunner::new(&client, None, &f.store, &config);
        let report = runner.run(&specs).await;

        assert!(matches!(report.error, Some(ScriptError::ArtifactParsing(_))));
        assert!(client.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_verification_skipped() {
        let f = fixture(&["A", "B"]);
        let client = MockChainClient::new();
        let verifier = MockVerifier::default();

        let specs = [DeploymentSpec::direct("A", &[]).without_verification()];
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &f.config);
        let results = runner.run(&specs).await.into_result().unwrap();
        assert!(!results[0].verified);
        assert_eq!(results[0].error, None);
        assert!(verifier.requested().is_empty());

        let runner = DeploymentRunner::new(&client, None, &f.store, &f.config);
        let results = runner
            .run(&direct(&["B"]))
            .await
            .into_result()
            .unwrap();
        assert!(!results[0].verified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_before_verification() {
        let f = fixture(&["A"]);
        let client = MockChainClient::new();
        let verifier = MockVerifier::default();
        let config = RunnerConfig {
            verification_cooldown: Duration::from_secs(60),
            ..f.config.clone()
        };
        let runner = DeploymentRunner::new(&client, Some(&verifier), &f.store, &config);

        let start = tokio::time::Instant::now();
        runner.run(&direct(&["A"])).await.into_result().unwrap();

        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(verifier.requested().len(), 1);
    }
}
