use log::{error, info};
use recipe_ingest::{IngestConfig, IngestPipeline, Submission};
use std::env;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

const USAGE: &str = "Usage: recipe-ingest <url> [user_id] [session_id]";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Get the URL and optional ids from command-line arguments
    let args: Vec<String> = env::args().collect();
    let url = args.get(1).ok_or(USAGE)?;
    let user_id = args.get(2).cloned().unwrap_or_else(|| "cli".to_string());
    let session_id = match args.get(3) {
        Some(id) => id.clone(),
        None => format!("cli-{}", SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs()),
    };

    let submission = Submission::new(user_id, session_id, url)?;
    let config = IngestConfig::load()?;
    info!(
        "Using provider {} with {:?} store",
        config.default_provider, config.store.backend
    );
    let pipeline = IngestPipeline::from_config(config)?;

    let record = pipeline.run(&submission).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
