//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
///
/// Every variant except [`ScriptError::Verification`] is fatal to the run in
/// which it occurs. Verification errors are logged by the runners and never
/// propagated past the spec that produced them.
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading configuration or a required configuration value is missing
    Config(String),
    /// Error reading a plan or schedule file
    ReadFile(String),
    /// Error locating or parsing a contract artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error constructing calldata for a contract method or constructor
    CalldataConstruction(String),
    /// Error submitting a transaction
    TransactionSubmission(String),
    /// Error waiting for a transaction to be confirmed
    TransactionConfirmation(String),
    /// A confirmed transaction reverted
    TransactionReverted(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error reading contract state
    ContractInteraction(String),
    /// Error verifying a contract's source with the block explorer
    Verification(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Config(s) => write!(f, "configuration error: {}", s),
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::TransactionSubmission(s) => {
                write!(f, "error submitting transaction: {}", s)
            }
            ScriptError::TransactionConfirmation(s) => {
                write!(f, "error confirming transaction: {}", s)
            }
            ScriptError::TransactionReverted(s) => write!(f, "transaction reverted: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::Verification(s) => write!(f, "error verifying contract: {}", s),
        }
    }
}

impl Error for ScriptError {}
