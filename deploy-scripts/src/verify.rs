//! Source verification against an Etherscan-compatible block explorer

use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    artifacts::ArtifactStore,
    constants::{MAX_VERIFICATION_POLLS, VERIFICATION_POLL_INTERVAL, VERIFIER_REQUEST_TIMEOUT},
    errors::ScriptError,
};

/// The status reported by the explorer while a verification is queued
const PENDING_RESULT: &str = "Pending in queue";

/// A request to verify a deployed contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The address of the deployed contract
    pub address: Address,
    /// The name of the contract artifact
    pub contract_name: String,
    /// The ABI-encoded constructor arguments, empty by convention
    pub constructor_args: Bytes,
}

/// A block explorer that can verify contract sources
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verify the contract, returning once the explorer has accepted or
    /// rejected its source
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError>;

    /// Mark `proxy` as a proxy of the verified `implementation`, so the
    /// explorer shows the implementation's ABI at the proxy address
    async fn link_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), ScriptError>;
}

/// The envelope of every Etherscan API response
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    /// "1" on success, "0" on failure
    status: String,
    /// A short description of the status
    message: String,
    /// The payload, or the error detail
    result: String,
}

/// The state of a submitted verification
#[derive(Debug, PartialEq, Eq)]
enum VerificationStatus {
    Pending,
    Verified,
    Rejected(String),
}

impl From<EtherscanResponse> for VerificationStatus {
    fn from(response: EtherscanResponse) -> Self {
        if response.result == PENDING_RESULT {
            VerificationStatus::Pending
        } else if response.status == "1" {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Rejected(format!("{}: {}", response.message, response.result))
        }
    }
}

/// A [`Verifier`] using the Etherscan `verifysourcecode` API with solc
/// standard JSON input read from the Hardhat build info
pub struct EtherscanVerifier {
    /// The HTTP client
    client: Client,
    /// The API endpoint
    url: String,
    /// The API key
    api_key: String,
    /// The artifacts the verified contracts were compiled to
    artifacts: ArtifactStore,
    /// The interval between status polls
    poll_interval: Duration,
}

impl EtherscanVerifier {
    /// Create a verifier for the explorer API at `url`
    pub fn new(url: &str, api_key: &str, artifacts: ArtifactStore) -> Result<Self, ScriptError> {
        let client = Client::builder()
            .timeout(VERIFIER_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
            artifacts,
            poll_interval: VERIFICATION_POLL_INTERVAL,
        })
    }

    /// Submit the source, returning the explorer's verification GUID
    async fn submit(&self, request: &VerificationRequest) -> Result<String, ScriptError> {
        let artifact = self.artifacts.load(&request.contract_name)?;
        let bundle = self.artifacts.source_bundle(&artifact)?;
        let address = format!("{:#x}", request.address);
        let constructor_args = hex::encode(&request.constructor_args);

        self.post(&[
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", bundle.standard_json_input.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", bundle.fully_qualified_name.as_str()),
            ("compilerversion", bundle.compiler_version.as_str()),
            // Sic, the Etherscan API misspells this parameter
            ("constructorArguements", constructor_args.as_str()),
        ])
        .await
    }

    /// Post a form to the API, returning the result of an accepted request
    async fn post(&self, form: &[(&str, &str)]) -> Result<String, ScriptError> {
        let response: EtherscanResponse = self
            .client
            .post(&self.url)
            .query(&[("apikey", self.api_key.as_str())])
            .form(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .json()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        if response.status != "1" {
            return Err(ScriptError::Verification(format!(
                "{}: {}",
                response.message, response.result
            )));
        }

        Ok(response.result)
    }

    /// Fetch the status of a submitted request with the given status action
    async fn check_status(
        &self,
        action: &str,
        guid: &str,
    ) -> Result<VerificationStatus, ScriptError> {
        let query = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", action),
            ("guid", guid),
        ];

        let response: EtherscanResponse = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .json()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        Ok(response.into())
    }

    /// Poll a submitted request until the explorer accepts or rejects it
    async fn await_status(&self, action: &str, guid: &str) -> Result<(), ScriptError> {
        for _ in 0..MAX_VERIFICATION_POLLS {
            tokio::time::sleep(self.poll_interval).await;
            match self.check_status(action, guid).await? {
                VerificationStatus::Pending => continue,
                VerificationStatus::Verified => return Ok(()),
                VerificationStatus::Rejected(reason) => {
                    return Err(ScriptError::Verification(reason))
                }
            }
        }

        Err(ScriptError::Verification(format!(
            "request {guid} still pending after {MAX_VERIFICATION_POLLS} polls"
        )))
    }
}

#[async_trait]
impl Verifier for EtherscanVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        let guid = self.submit(request).await.map_err(|e| match e {
            ScriptError::Verification(_) => e,
            other => ScriptError::Verification(other.to_string()),
        })?;
        debug!(%guid, "verification submitted");

        self.await_status("checkverifystatus", &guid).await?;
        info!(address = %request.address, "{} verified", request.contract_name);
        Ok(())
    }

    async fn link_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), ScriptError> {
        let proxy_str = format!("{proxy:#x}");
        let implementation_str = format!("{implementation:#x}");

        let guid = self
            .post(&[
                ("module", "contract"),
                ("action", "verifyproxycontract"),
                ("address", proxy_str.as_str()),
                ("expectedimplementation", implementation_str.as_str()),
            ])
            .await?;
        debug!(%guid, "proxy link submitted");

        self.await_status("checkproxyverification", &guid).await?;
        info!(proxy = %proxy, implementation = %implementation, "proxy linked");
        Ok(())
    }
}
