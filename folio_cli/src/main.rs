use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_engine::core_modules::predictor::{PredictorService, UniformModule};
use folio_engine::core_modules::sentiment::{
    HttpSentimentScorer, SentimentAdapter, SentimentPanel, SubmissionOutcome,
};
use folio_engine::core_modules::utils::image_helper::image_helper;
use folio_engine::stroke_file::StrokeFile;
use folio_engine::{DigitPipeline, InferenceOutcome, PipelineConfig, SentimentConfig};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Run the digit and sentiment demos from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a stroke file through the digit pipeline and print the predictions
    Draw {
        /// JSON file of the form {"strokes": [[[x, y], ...], ...]}
        strokes: PathBuf,

        /// Model file handed to the predictor's one-time load
        #[arg(short, long, default_value = "flatmodel_large.bin")]
        model: String,

        /// TOML file overriding the surface and input geometry
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the full-resolution surface here
        #[arg(long)]
        png: Option<PathBuf>,

        /// Write the downsampled model input here
        #[arg(long)]
        input_png: Option<PathBuf>,
    },
    /// Score text with the remote sentiment model
    Sentiment {
        /// Successive edits of the text box, submitted concurrently
        texts: Vec<String>,

        /// Read edits from stdin, one per line
        #[arg(short, long)]
        interactive: bool,

        #[arg(long)]
        endpoint: Option<String>,

        /// Per-request timeout; unset waits indefinitely
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Serve the site
    #[cfg(feature = "web")]
    Serve,
}

fn load_pipeline_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading pipeline config {}", path.display()))?;
    let config: PipelineConfig =
        toml::from_str(&source).with_context(|| format!("parsing pipeline config {}", path.display()))?;
    Ok(config)
}

fn run_draw(
    strokes: &Path,
    model: &str,
    config: Option<&Path>,
    png: Option<&Path>,
    input_png: Option<&Path>,
) -> anyhow::Result<String> {
    let config = load_pipeline_config(config)?;
    let file = StrokeFile::load(strokes)?;

    let service = Arc::new(PredictorService::new(
        Box::new(UniformModule::new(config.classes)),
        &config,
    ));
    service
        .load_model_blocking(model)
        .with_context(|| format!("loading model {model}"))?;

    let mut pipeline = DigitPipeline::new(config, service)?;
    let summary = file.replay(&mut pipeline);
    info!(
        "replayed {} strokes ({} pointer events) from {}",
        summary.strokes,
        summary.events,
        strokes.display()
    );
    if let Some(InferenceOutcome::Failed(e)) = &summary.last_outcome {
        warn!("last inference failed: {e}");
    }

    if let (Some(path), Some(surface)) = (png, pipeline.surface()) {
        image_helper::save_surface(path, surface)?;
        info!("surface written to {}", path.display());
    }
    if let (Some(path), Some(input)) = (input_png, pipeline.input_vector()) {
        image_helper::save_input(path, &input)?;
        info!("model input written to {}", path.display());
    }

    let mut report = pipeline.display().render_text();
    if let Some((digit, p)) = pipeline.display().current().and_then(|v| v.best()) {
        report.push_str(&format!("\nbest guess: {digit} ({:.1}%)", p * 100.0));
    }
    Ok(report)
}

fn describe_panel(panel: &SentimentPanel) -> String {
    match panel {
        SentimentPanel::NoResult => "no result".to_string(),
        SentimentPanel::Analysing => "analysing...".to_string(),
        SentimentPanel::Scored(result) => {
            format!("{} {} ({})", result.label, result.percent_label(), result.colour)
        }
    }
}

fn describe_outcome(outcome: &SubmissionOutcome) -> String {
    match outcome {
        SubmissionOutcome::Neutral => "empty text, neutral".to_string(),
        SubmissionOutcome::Applied(result) => format!("{} {}", result.label, result.percent_label()),
        SubmissionOutcome::Failed(e) => format!("failed: {e}"),
        SubmissionOutcome::Superseded => "superseded by a newer edit".to_string(),
        SubmissionOutcome::Closed => "dropped after close".to_string(),
    }
}

fn spawn_edit(
    adapter: &Arc<SentimentAdapter<HttpSentimentScorer>>,
    index: usize,
    text: String,
) -> tokio::task::JoinHandle<()> {
    // Sequenced here, in typing order, before the task is scheduled.
    let submission = adapter.submit(text.clone());
    tokio::spawn(async move {
        let outcome = submission.await;
        println!("[{index}] {text:?}: {}", describe_outcome(&outcome));
    })
}

async fn run_sentiment(
    texts: Vec<String>,
    interactive: bool,
    endpoint: Option<String>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = SentimentConfig::default();
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    config.timeout = timeout_ms.map(Duration::from_millis);
    config.validate()?;

    let scorer = Arc::new(HttpSentimentScorer::new(&config)?);
    let adapter = Arc::new(SentimentAdapter::new(scorer));
    let mut tasks: Vec<_> = texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| spawn_edit(&adapter, index, text))
        .collect();

    if interactive {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let index = tasks.len();
            tasks.push(spawn_edit(&adapter, index, line));
        }
    }

    for task in tasks {
        task.await?;
    }
    println!("result: {}", describe_panel(&adapter.panel()));
    adapter.close();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    match Cli::parse().command {
        Command::Draw {
            strokes,
            model,
            config,
            png,
            input_png,
        } => {
            let report = run_draw(
                &strokes,
                &model,
                config.as_deref(),
                png.as_deref(),
                input_png.as_deref(),
            )?;
            println!("{report}");
        }
        Command::Sentiment {
            texts,
            interactive,
            endpoint,
            timeout_ms,
        } => run_sentiment(texts, interactive, endpoint, timeout_ms).await?,
        #[cfg(feature = "web")]
        Command::Serve => {
            let config = folio_site::SiteConfig::from_env()?;
            let handle = folio_site::start_server(config).await?;
            handle.await?;
        }
    }
    Ok(())
}
