//! The deployment, initialization and upgrade runners
//!
//! Each runner processes its items strictly in sequence, waiting for every
//! transaction to be confirmed before submitting the next.

mod deploy;
mod initialize;
mod upgrade;

#[cfg(test)]
pub(crate) mod mocks;

pub use deploy::DeploymentRunner;
pub use initialize::InitializerRunner;
pub use upgrade::UpgradeRunner;
