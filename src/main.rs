use anyhow::{Context, Result};
use clap::Parser;
use phantom_jam::{
    cli::{Cli, Command, ScoreArgs, ServeArgs, TrainArgs},
    config::{DetectorConfig, ServiceConfig},
    dataset,
    detector::{self, ConfusionMatrix},
    model_persistence::{self, DetectorArtifact, ModelMetadata, PersistenceOptions},
    segment,
};
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises everything to TRACE
fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("phantom_jam=info,tower_http=info"));
    let filter = if debug {
        filter.add_directive(tracing::Level::TRACE.into())
    } else {
        filter
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DetectorConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.no_compress {
        config.compress = false;
    }
    config.validate()?;
    tracing::debug!(?config, "Detector configuration");

    let samples = dataset::load_traffic_samples(&args.dataset)
        .with_context(|| format!("Failed to load dataset {}", args.dataset.display()))?;
    let outcome = detector::train(&samples, &config)?;

    print!("{}", outcome.report.format());

    let fingerprint = dataset::dataset_fingerprint(&args.dataset)?;
    let metadata = ModelMetadata::new(outcome.report.partitions.train_rows)
        .with_hyperparameter("eps", config.eps)
        .with_hyperparameter("min_samples", config.min_samples)
        .with_hyperparameter("test_fraction", config.test_fraction)
        .with_hyperparameter("seed", config.seed)
        .with_hyperparameter("threshold_policy", outcome.report.threshold.policy.describe())
        .with_dataset_sha256(fingerprint)
        .with_description("DBSCAN core-point distance detector for phantom jams");
    let artifact = DetectorArtifact {
        detector: outcome.detector,
        metadata,
    };

    let options = PersistenceOptions::new()
        .with_compression(config.compress)
        .with_name("phantom-jam-dbscan");
    model_persistence::save_detector(&artifact, &args.model_out, options)
        .with_context(|| format!("Failed to save model {}", args.model_out.display()))?;

    println!("\nModel saved as: {}", args.model_out.display());
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    dotenvy::dotenv().ok();
    let config = args.apply(ServiceConfig::from_env());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(segment::serve(config))
}

fn run_score(args: ScoreArgs) -> Result<()> {
    let artifact = model_persistence::load_detector(&args.model)
        .with_context(|| format!("Failed to load model {}", args.model.display()))?;
    tracing::info!("{}", model_persistence::model_status_line(&artifact.metadata));

    let samples = dataset::load_traffic_samples(&args.dataset)
        .with_context(|| format!("Failed to load dataset {}", args.dataset.display()))?;
    let features: Vec<_> = samples.iter().map(|s| s.features()).collect();
    let predictions = artifact.detector.predict_batch(&features);

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(["row", "anomaly_score", "predicted_jam", "actual_jam"])?;
    for (i, (sample, prediction)) in samples.iter().zip(&predictions).enumerate() {
        writer.write_record([
            i.to_string(),
            prediction.anomaly_score.to_string(),
            u8::from(prediction.is_jam).to_string(),
            u8::from(sample.is_jam()).to_string(),
        ])?;
    }
    writer.flush()?;

    let actual: Vec<bool> = samples.iter().map(|s| s.is_jam()).collect();
    let predicted: Vec<bool> = predictions.iter().map(|p| p.is_jam).collect();
    let cm = ConfusionMatrix::from_predictions(&actual, &predicted);
    tracing::info!(
        rows = cm.total(),
        accuracy = cm.accuracy(),
        f1 = cm.f1(),
        true_positive = cm.true_positive,
        false_positive = cm.false_positive,
        "Scored dataset"
    );

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Train(args) => run_train(args),
        Command::Serve(args) => run_serve(args),
        Command::Score(args) => run_score(args),
    }
}
