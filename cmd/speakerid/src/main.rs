//! speakerid - Identify the speaker of an audio clip.

mod config;
mod server;
mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speakerid_audio::MfccConfig;
use speakerid_predict::{LabelEncoder, OnnxClassifier, OnnxClassifierConfig, Predictor};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use server::AppState;
use upload::UploadStore;

/// Identify the speaker of an audio clip with a pre-trained classifier.
///
/// Configuration is read from --config, or ~/.speakerid/config.yaml when
/// present. Flags override the config file.
#[derive(Parser)]
#[command(name = "speakerid")]
#[command(about = "Speaker identification from audio clips")]
#[command(version)]
struct Cli {
    /// Config file (default is ~/.speakerid/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ONNX classifier model
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// JSON label mapping
    #[arg(long, global = true)]
    labels: Option<PathBuf>,

    /// Upload directory
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the upload page
    Serve {
        /// Listen address (e.g. :5000, 127.0.0.1:8080)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Predict the speaker of a local audio file
    Predict {
        /// Audio file (wav, flac, mp3, ogg, ...)
        file: PathBuf,
    },
    /// List the known speaker labels
    Labels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let cfg = resolve_config(&cli)?;

    match &cli.command {
        Commands::Serve { addr } => {
            let addr = config::parse_addr(addr.as_deref().unwrap_or(&cfg.addr))?;
            let predictor = Arc::new(load_predictor(&cfg)?);
            let uploads = UploadStore::open(&cfg.upload_dir).with_context(|| {
                format!("create upload dir {}", cfg.upload_dir.display())
            })?;
            info!("storing uploads in {}", uploads.dir().display());

            let state = Arc::new(AppState::new(predictor, uploads, cfg.keep_uploads)?);
            server::serve(addr, server::router(state, cfg.max_upload_bytes)).await
        }
        Commands::Predict { file } => {
            let predictor = load_predictor(&cfg)?;
            let file = file.clone();
            let prediction =
                tokio::task::spawn_blocking(move || predictor.predict_file(&file)).await??;
            println!("{}", prediction.message());
            Ok(())
        }
        Commands::Labels => {
            let labels = load_labels(&cfg)?;
            for (i, label) in labels.classes().iter().enumerate() {
                println!("{i}\t{label}");
            }
            Ok(())
        }
    }
}

/// Merges config file, flags and environment.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        cfg.model_path = model.clone();
    }
    if let Some(labels) = &cli.labels {
        cfg.labels_path = labels.clone();
    }
    if let Some(dir) = &cli.upload_dir {
        cfg.upload_dir = dir.clone();
    }
    cfg.apply_env();
    Ok(cfg)
}

fn load_labels(cfg: &Config) -> Result<LabelEncoder> {
    LabelEncoder::from_json_file(&cfg.labels_path)
        .with_context(|| format!("load labels {}", cfg.labels_path.display()))
}

/// Loads the classifier and label mapping once, for the process lifetime.
fn load_predictor(cfg: &Config) -> Result<Predictor> {
    let labels = load_labels(cfg)?;
    info!("loaded {} speaker labels", labels.len());

    let classifier = OnnxClassifier::load(
        &cfg.model_path,
        OnnxClassifierConfig {
            input_name: cfg.input_name.clone(),
            output_name: cfg.output_name.clone(),
            graph_optimization: cfg.graph_optimization,
            intra_threads: cfg.intra_threads,
            ..Default::default()
        },
    )
    .with_context(|| format!("load model {}", cfg.model_path.display()))?;

    Ok(Predictor::new(
        Arc::new(classifier),
        labels,
        MfccConfig::default(),
    )?)
}
