//! Runs the artifact workflow over one image and prints the result as JSON.

use anyhow::Context;
use clap::Parser;
use restoreflow::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Photograph of the artifact
    image: PathBuf,

    /// Restoration level: light, medium or heavy
    #[arg(long, default_value = "medium")]
    level: RestorationLevel,

    /// Years to project degradation over
    #[arg(long, default_value_t = 10)]
    years: u32,

    /// Material to use for the degradation model instead of the identified one
    #[arg(long)]
    material: Option<String>,

    /// Write the restored image here
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = ProviderConfig::from_env().context("loading provider configuration")?;
    let orchestrator = Orchestrator::from_config(&config)
        .context("building provider adapters")?
        .with_event_sink(Arc::new(LoggingEventSink::new(tracing::Level::INFO)));

    let mut request = WorkflowRequest::new(&args.image)
        .with_restoration_level(args.level)
        .with_time_span(args.years);
    if let Some(material) = args.material {
        request = request.with_material(material);
    }

    let result = orchestrator
        .process(&request)
        .await
        .with_context(|| format!("processing {}", args.image.display()))?;

    if let Some(path) = &args.output {
        match result
            .stage(StageId::Restoration)
            .and_then(StageResult::as_restoration)
        {
            Some(restoration) => {
                tokio::fs::write(path, &restoration.image)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), method = %restoration.method, "Restored image written");
            }
            None => tracing::warn!("No restored image to write"),
        }
    }

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_completed() {
        std::process::exit(1);
    }
    Ok(())
}
