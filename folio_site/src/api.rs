//! Request handling behind the JSON endpoints, kept free of any HTTP types so it
//! can be exercised without a server.

use folio_engine::core_modules::predictor::PredictorService;
use folio_engine::core_modules::readiness::ModelState;
use folio_engine::core_modules::sentiment::{
    SentimentError, SentimentResult, SentimentScorer, analyse_once,
};
use folio_engine::stroke_file::StrokeFile;
use folio_engine::{ConfigError, DigitPipeline, PLACEHOLDER, PipelineConfig, PredictionRow};
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on points accepted in one predict request.
pub const MAX_POINTS: usize = 20_000;

/// Upper bound on text accepted in one sentiment request, in bytes.
pub const MAX_TEXT_BYTES: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("model is not ready ({0})")]
    NotReady(ModelState),
    #[error("{points} points exceeds the limit of {max}")]
    TooManyPoints { points: usize, max: usize },
    #[error("text of {bytes} bytes exceeds the limit of {max}")]
    TextTooLong { bytes: usize, max: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sentiment model unavailable: {0}")]
    Sentiment(#[from] SentimentError),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::NotReady(ModelState::Failed(_)) => 500,
            ApiError::NotReady(_) => 503,
            ApiError::TooManyPoints { .. } | ApiError::TextTooLong { .. } => 413,
            ApiError::Config(_) => 500,
            ApiError::Sentiment(_) => 502,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "web", derive(serde::Serialize))]
pub struct RowReply {
    pub digit: usize,
    pub probability: f32,
    pub bar_percent: f32,
    pub label: String,
}

impl From<PredictionRow> for RowReply {
    fn from(row: PredictionRow) -> Self {
        Self {
            digit: row.digit,
            probability: row.probability,
            bar_percent: row.bar_percent,
            label: row.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "web", derive(serde::Serialize))]
pub struct DigitReply {
    /// Empty when nothing has been predicted yet.
    pub rows: Vec<RowReply>,
    pub best: Option<usize>,
    pub placeholder: Option<String>,
}

/// Replays `strokes` on a fresh surface and returns what the prediction panel shows.
///
/// Blocks on the predictor; call it from a blocking-capable thread.
pub fn predict_strokes(
    service: Arc<PredictorService>,
    config: &PipelineConfig,
    strokes: &StrokeFile,
) -> Result<DigitReply, ApiError> {
    let points = strokes.point_count();
    if points > MAX_POINTS {
        return Err(ApiError::TooManyPoints {
            points,
            max: MAX_POINTS,
        });
    }
    if !service.ready() {
        return Err(ApiError::NotReady(service.readiness().state()));
    }

    let mut pipeline = DigitPipeline::new(config.clone(), service)?;
    strokes.replay(&mut pipeline);

    let display = pipeline.display();
    let rows: Vec<RowReply> = display.rows().into_iter().map(RowReply::from).collect();
    Ok(DigitReply {
        best: display.current().and_then(|v| v.best()).map(|(digit, _)| digit),
        placeholder: rows.is_empty().then(|| PLACEHOLDER.to_string()),
        rows,
    })
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "web", derive(serde::Serialize))]
pub struct SentimentReply {
    pub score: f64,
    pub label: String,
    /// CSS colour, e.g. "rgb(204, 117, 4)".
    pub colour: String,
    pub percent: String,
}

impl From<SentimentResult> for SentimentReply {
    fn from(result: SentimentResult) -> Self {
        Self {
            score: result.score,
            label: result.label.to_string(),
            colour: result.colour.to_string(),
            percent: result.percent_label(),
        }
    }
}

pub async fn score_text<S: SentimentScorer + ?Sized>(
    scorer: &S,
    text: &str,
) -> Result<SentimentReply, ApiError> {
    if text.len() > MAX_TEXT_BYTES {
        return Err(ApiError::TextTooLong {
            bytes: text.len(),
            max: MAX_TEXT_BYTES,
        });
    }
    Ok(analyse_once(scorer, text).await?.into())
}
