//! CLI argument parsing for phantom-jam

use crate::config::ServiceConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "phantom-jam")]
#[command(version)]
#[command(about = "DBSCAN phantom traffic jam detector and segment query service", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train and evaluate the detector, then save the model
    Train(TrainArgs),
    /// Serve segment lookups over HTTP
    Serve(ServeArgs),
    /// Classify a dataset with a saved model
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Labeled traffic CSV
    #[arg(long, value_name = "FILE", default_value = "dataset.csv")]
    pub dataset: PathBuf,

    /// Where to write the fitted model
    #[arg(long = "model-out", value_name = "FILE", default_value = "dbscan_jam_model.apr")]
    pub model_out: PathBuf,

    /// Detector configuration (TOML); defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the split seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Save the model without zstd compression
    #[arg(long = "no-compress")]
    pub no_compress: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// CSV loaded at startup [env: DATASET_PATH]
    #[arg(long, value_name = "FILE")]
    pub dataset: Option<PathBuf>,

    /// Bind address [env: HOST]
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port [env: PORT]
    #[arg(long)]
    pub port: Option<u16>,

    /// Allowed CORS origin, repeatable [env: CORS_ORIGINS]
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    pub cors_origins: Vec<String>,
}

impl ServeArgs {
    /// Layer command-line values over an env/default configuration
    pub fn apply(self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(dataset) = self.dataset {
            config.dataset_path = dataset;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if !self.cors_origins.is_empty() {
            config.cors_origins = self.cors_origins;
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Saved model
    #[arg(long, value_name = "FILE", default_value = "dbscan_jam_model.apr")]
    pub model: PathBuf,

    /// Traffic CSV to classify
    #[arg(long, value_name = "FILE")]
    pub dataset: PathBuf,

    /// Write predictions here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
