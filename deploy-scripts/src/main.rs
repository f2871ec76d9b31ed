use clap::Parser;
use deploy_scripts::{artifacts::ArtifactStore, cli::Cli, errors::ScriptError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    // A missing `.env` file is fine, the environment may already be set
    dotenvy::dotenv().ok();

    let Cli {
        rpc,
        artifacts_dir,
        command,
    } = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .init();

    let artifacts = ArtifactStore::new(artifacts_dir);
    command.run(&rpc, &artifacts).await
}
