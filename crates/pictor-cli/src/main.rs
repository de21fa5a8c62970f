use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use aws_config::BehaviorVersion;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use pictor_core::event::LifecycleEvent;
use pictor_gateway::{Gateway, GatewayConfig, S3ArtifactStore, SageMakerInference};
use pictor_lifecycle::{
    JumpStartResolver, LifecycleConfig, LifecycleManager, LifecycleRuntime, SageMakerHost,
};

#[derive(Parser)]
#[command(name = "pictor", about = "PICTOR — hosted text-to-image endpoint lifecycle and gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dispatch a provisioning lifecycle event (Create/Update/Delete).
    Lifecycle {
        /// Event JSON file; reads stdin when omitted.
        #[arg(long)]
        event_file: Option<PathBuf>,
    },
    /// Run one inference request against the configured endpoint.
    Generate {
        /// Text prompt for the image.
        #[arg(long)]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logs on stderr; stdout carries the command's JSON result.
    fmt()
        .with_env_filter(EnvFilter::from_env("PICTOR_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Lifecycle { event_file } => run_lifecycle(event_file).await,
        Command::Generate { prompt } => run_generate(prompt).await,
    }
}

async fn run_lifecycle(event_file: Option<PathBuf>) -> Result<()> {
    let raw = match event_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let event: LifecycleEvent = serde_json::from_str(&raw)?;

    // Initialization failures must fail the command itself, not crash the
    // dispatch: the runtime carries them and rejects every event.
    let runtime = match build_lifecycle_runtime().await {
        Ok(runtime) => runtime,
        Err(e) => LifecycleRuntime::init_failed(e),
    };

    tracing::info!(command = %event.command, "Dispatching lifecycle event");
    let outcome = runtime.dispatch(&event).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn build_lifecycle_runtime()
-> Result<LifecycleRuntime, pictor_lifecycle::LifecycleError> {
    let config = LifecycleConfig::from_env()?;

    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let region = aws
        .region()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "us-east-1".to_string());

    let resolver = Arc::new(JumpStartResolver::new(region)?);
    let host = Arc::new(SageMakerHost::new(aws_sdk_sagemaker::Client::new(&aws)));

    Ok(LifecycleRuntime::ready(LifecycleManager::new(
        config, resolver, host,
    )))
}

async fn run_generate(prompt: String) -> Result<()> {
    let config = GatewayConfig::from_env()?;
    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;

    let inference = Arc::new(SageMakerInference::new(
        aws_sdk_sagemakerruntime::Client::new(&aws),
        config.endpoint_name.clone(),
    ));
    let store = Arc::new(S3ArtifactStore::new(
        aws_sdk_s3::Client::new(&aws),
        config.output_bucket.clone(),
    ));
    let gateway = Gateway::new(inference, store);

    let event = serde_json::json!({ "prompt": prompt });
    let response = gateway.handle(&event).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        anyhow::bail!("request failed with status {}", response.status_code);
    }
    Ok(())
}
