use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rag_inference::config::InferencerConfig;
use rag_inference::{create_inferencer, Inferencer, RagError, SearchRecord};

/// Run one retrieval-augmented query against the configured inference service.
///
/// The service is selected from the environment (`GATEWAY_ENABLED`,
/// `INFERENCE_SERVICE`, `MODEL_ID`, ...).
#[derive(Parser, Debug)]
#[command(name = "infer", version)]
struct Args {
    /// The user query
    query: String,
    /// JSON file holding an array of `{"text": ...}` passages
    context: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("inference failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_context(path: &Path) -> Result<Vec<SearchRecord>, RagError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn run(args: Args) -> Result<(), RagError> {
    let context = match &args.context {
        Some(path) => load_context(path)?,
        None => Vec::new(),
    };

    let cfg = InferencerConfig::from_env()?;
    let inferencer = create_inferencer(&cfg)?;
    info!(
        "running query against {} with {} context passages",
        inferencer.model_id(),
        context.len()
    );

    let result = inferencer.generate_text(&args.query, &context).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
