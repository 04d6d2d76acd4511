// THEORY:
// The sentiment demo scores free text on every keystroke. The model runs on a
// remote endpoint, so every edit becomes an HTTP request, and rapid typing puts
// several requests in flight at once. Responses can come back in any order. If the
// last one to *arrive* won, a slow early request could overwrite the score for the
// text that is actually in the box.
//
// Key architectural principles:
// 1.  **Sequenced Submissions**: Every edit takes the next number from a monotonic
//     counter at the moment it happens, before any future is polled. A response
//     (or an "analysing" marker) is applied to the panel only if its number is
//     still the newest one issued. Older responses are dropped on arrival;
//     nothing needs to be cancelled.
// 2.  **Local Neutral Case**: Empty or whitespace-only text never touches the
//     network. It resolves immediately to the neutral score of 0.5, and because it
//     also takes a sequence number, it supersedes anything still in flight.
// 3.  **Failure Clears**: A transport or decoding failure for the newest request
//     leaves the panel with no result rather than a stale score.
// 4.  **Close on Unmount**: `close()` retires the adapter so a response arriving
//     after the page is gone is discarded instead of written to a dead view.
// 5.  **Pure Presentation Helpers**: Label thresholds and the amber/red/green
//     colour ramp are free functions so the CLI, the site and the tests share them.

use crate::config::SentimentConfig;
use futures::future::BoxFuture;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const NEUTRAL_SCORE: f64 = 0.5;

const AMBER: Rgb = Rgb(204, 117, 4);
const RED: Rgb = Rgb(207, 2, 12);
const GREEN: Rgb = Rgb(34, 197, 94);

/// Canned inputs offered next to the text box, with the label each should get.
pub const EXAMPLE_TEXTS: [(&str, SentimentLabel); 5] = [
    (
        "I absolutely love this product! It's the best thing I've ever bought.",
        SentimentLabel::VeryPositive,
    ),
    (
        "The service was okay, nothing special but not bad either.",
        SentimentLabel::Neutral,
    ),
    (
        "Terrible experience. Would not recommend to anyone.",
        SentimentLabel::VeryNegative,
    ),
    (
        "Great weather today, feeling happy and energetic!",
        SentimentLabel::Positive,
    ),
    (
        "This is disappointing, expected much better quality.",
        SentimentLabel::Negative,
    ),
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SentimentError {
    #[error("sentiment request failed: {0}")]
    Transport(String),
    #[error("sentiment endpoint answered {0}")]
    Status(u16),
    #[error("could not decode sentiment response: {0}")]
    Decode(String),
    #[error("sentiment score {0} is not a number")]
    InvalidScore(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::VeryNegative => "Very Negative",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Positive => "Positive",
            SentimentLabel::VeryPositive => "Very Positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

pub fn interpret(score: f64) -> SentimentLabel {
    if score >= 0.75 {
        SentimentLabel::VeryPositive
    } else if score >= 0.6 {
        SentimentLabel::Positive
    } else if score >= 0.4 {
        SentimentLabel::Neutral
    } else if score >= 0.25 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::VeryNegative
    }
}

fn interpolate(from: Rgb, to: Rgb, factor: f64) -> Rgb {
    let mix = |a: u8, b: u8| (a as f64 + factor * (b as f64 - a as f64)).round().clamp(0.0, 255.0) as u8;
    Rgb(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Amber at 0.5, shading to red at 0.0 and to green at 1.0.
pub fn colour(score: f64) -> Rgb {
    if score < 0.5 {
        interpolate(AMBER, RED, 1.0 - score * 2.0)
    } else {
        interpolate(AMBER, GREEN, (score - 0.5) * 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub score: f64,
    pub label: SentimentLabel,
    pub colour: Rgb,
}

impl SentimentResult {
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            label: interpret(score),
            colour: colour(score),
        }
    }

    pub fn neutral() -> Self {
        Self::from_score(NEUTRAL_SCORE)
    }

    /// e.g. "73%"
    pub fn percent_label(&self) -> String {
        format!("{:.0}%", self.score * 100.0)
    }
}

/// Something that turns text into a score in [0, 1].
pub trait SentimentScorer: Send + Sync {
    fn score<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<f64, SentimentError>>;
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ScoreResponse {
    score: f64,
}

/// Scores text with a `POST {"text": ...}` to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpSentimentScorer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSentimentScorer {
    pub fn new(config: &SentimentConfig) -> Result<Self, SentimentError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SentimentError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, config.endpoint.clone()))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, text: &str) -> Result<f64, SentimentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ScoreRequest { text })
            .send()
            .await
            .map_err(|e| SentimentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SentimentError::Status(status.as_u16()));
        }

        let body: ScoreResponse = response
            .json()
            .await
            .map_err(|e| SentimentError::Decode(e.to_string()))?;
        validate_score(body.score)
    }
}

impl SentimentScorer for HttpSentimentScorer {
    fn score<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<f64, SentimentError>> {
        Box::pin(self.request(text))
    }
}

/// Rejects NaN/infinite scores and pins the rest into [0, 1].
pub fn validate_score(score: f64) -> Result<f64, SentimentError> {
    if score.is_finite() {
        Ok(score.clamp(0.0, 1.0))
    } else {
        Err(SentimentError::InvalidScore(score))
    }
}

/// Scores a single text without any sequencing; empty text is neutral.
pub async fn analyse_once<S: SentimentScorer + ?Sized>(
    scorer: &S,
    text: &str,
) -> Result<SentimentResult, SentimentError> {
    if text.trim().is_empty() {
        return Ok(SentimentResult::neutral());
    }
    let score = validate_score(scorer.score(text).await?)?;
    Ok(SentimentResult::from_score(score))
}

/// What the result panel is currently showing.
#[derive(Debug, Clone, PartialEq)]
pub enum SentimentPanel {
    NoResult,
    Analysing,
    Scored(SentimentResult),
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Empty text, resolved locally.
    Neutral,
    Applied(SentimentResult),
    Failed(SentimentError),
    /// A newer submission was issued while this one was in flight.
    Superseded,
    /// The adapter was closed while this one was in flight.
    Closed,
}

pub struct SentimentAdapter<S: SentimentScorer + ?Sized> {
    scorer: Arc<S>,
    issued: AtomicU64,
    closed: AtomicBool,
    panel: Mutex<SentimentPanel>,
}

impl<S: SentimentScorer + ?Sized> SentimentAdapter<S> {
    pub fn new(scorer: Arc<S>) -> Self {
        Self {
            scorer,
            issued: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            panel: Mutex::new(SentimentPanel::NoResult),
        }
    }

    pub fn panel(&self) -> SentimentPanel {
        match self.panel.lock() {
            Ok(panel) => panel.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The sequence number of the newest submission.
    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Writes `next` only if `seq` is still the newest submission and we are open.
    fn apply_if_current(&self, seq: u64, next: SentimentPanel) -> bool {
        let mut panel = match self.panel.lock() {
            Ok(panel) => panel,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.closed.load(Ordering::SeqCst) || self.latest() != seq {
            return false;
        }
        *panel = next;
        true
    }

    // The synchronous half of an edit: takes the sequence number and shows the
    // neutral or analysing state. `Err` carries an outcome that needs no request.
    fn open(&self, text: &str) -> Result<u64, SubmissionOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SubmissionOutcome::Closed);
        }
        let seq = self.issue();
        if text.trim().is_empty() {
            self.apply_if_current(seq, SentimentPanel::Scored(SentimentResult::neutral()));
            return Err(SubmissionOutcome::Neutral);
        }
        self.apply_if_current(seq, SentimentPanel::Analysing);
        Ok(seq)
    }

    async fn finish(&self, seq: u64, text: &str) -> SubmissionOutcome {
        let scored = match self.scorer.score(text).await {
            Ok(score) => validate_score(score),
            Err(e) => Err(e),
        };

        if self.closed.load(Ordering::SeqCst) {
            debug!("sentiment response #{seq} arrived after close, dropped");
            return SubmissionOutcome::Closed;
        }

        match scored {
            Ok(score) => {
                let result = SentimentResult::from_score(score);
                if self.apply_if_current(seq, SentimentPanel::Scored(result.clone())) {
                    SubmissionOutcome::Applied(result)
                } else {
                    debug!("sentiment response #{seq} superseded by #{}", self.latest());
                    SubmissionOutcome::Superseded
                }
            }
            Err(e) => {
                warn!("sentiment analysis failed: {e}");
                if self.apply_if_current(seq, SentimentPanel::NoResult) {
                    SubmissionOutcome::Failed(e)
                } else {
                    SubmissionOutcome::Superseded
                }
            }
        }
    }

    /// Handles one edit of the text box.
    ///
    /// The sequence number is taken when this is called, not when the returned
    /// future is first polled, so edits are ordered by call order.
    pub fn text_changed<'a>(&'a self, text: &'a str) -> impl Future<Output = SubmissionOutcome> + 'a {
        let opened = self.open(text);
        async move {
            match opened {
                Ok(seq) => self.finish(seq, text).await,
                Err(outcome) => outcome,
            }
        }
    }

    /// The "Clear Text" button: neutral result, and nothing in flight may override it.
    pub fn clear(&self) {
        let seq = self.issue();
        self.apply_if_current(seq, SentimentPanel::Scored(SentimentResult::neutral()));
    }

    /// Detaches from the view. Every later response is dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.issue();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<S: SentimentScorer + ?Sized + 'static> SentimentAdapter<S> {
    /// Like `text_changed`, but the future owns its text and can be spawned.
    pub fn submit(
        self: &Arc<Self>,
        text: String,
    ) -> impl Future<Output = SubmissionOutcome> + Send + 'static {
        let adapter = Arc::clone(self);
        let opened = adapter.open(&text);
        async move {
            match opened {
                Ok(seq) => adapter.finish(seq, &text).await,
                Err(outcome) => outcome,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Answers each text after a fixed delay; unknown texts fail.
    struct ScriptedScorer {
        answers: HashMap<&'static str, (u64, Result<f64, SentimentError>)>,
        calls: AtomicUsize,
    }

    impl ScriptedScorer {
        fn new(answers: Vec<(&'static str, u64, Result<f64, SentimentError>)>) -> Arc<Self> {
            Arc::new(Self {
                answers: answers.into_iter().map(|(t, d, r)| (t, (d, r))).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl SentimentScorer for ScriptedScorer {
        fn score<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<f64, SentimentError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                let (delay, answer) = self
                    .answers
                    .get(text)
                    .cloned()
                    .unwrap_or((0, Err(SentimentError::Transport("unscripted".into()))));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                answer
            })
        }
    }

    #[test]
    fn labels_follow_the_thresholds() {
        assert_eq!(interpret(0.0), SentimentLabel::VeryNegative);
        assert_eq!(interpret(0.25), SentimentLabel::Negative);
        assert_eq!(interpret(0.39), SentimentLabel::Negative);
        assert_eq!(interpret(0.4), SentimentLabel::Neutral);
        assert_eq!(interpret(0.5), SentimentLabel::Neutral);
        assert_eq!(interpret(0.6), SentimentLabel::Positive);
        assert_eq!(interpret(0.75), SentimentLabel::VeryPositive);
        assert_eq!(interpret(1.0), SentimentLabel::VeryPositive);
    }

    #[test]
    fn colour_ramp_ends() {
        assert_eq!(colour(0.0), RED);
        assert_eq!(colour(0.5), AMBER);
        assert_eq!(colour(1.0), GREEN);
        assert_eq!(colour(0.0).to_string(), "rgb(207, 2, 12)");
        assert_eq!(SentimentResult::from_score(1.0).label.to_string(), "Very Positive");
        assert_eq!(SentimentResult::from_score(0.0).label.to_string(), "Very Negative");
    }

    #[test]
    fn colour_midpoints_are_rounded() {
        // Halfway from amber to green: (119, 157, 49)
        assert_eq!(colour(0.75), Rgb(119, 157, 49));
    }

    #[test]
    fn scores_are_validated() {
        assert_eq!(validate_score(1.7), Ok(1.0));
        assert_eq!(validate_score(-0.2), Ok(0.0));
        assert!(validate_score(f64::NAN).is_err());
    }

    #[test]
    fn examples_carry_distinct_labels() {
        let mut labels: Vec<_> = EXAMPLE_TEXTS.iter().map(|(_, l)| l.as_str()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 5);
    }

    #[tokio::test]
    async fn empty_text_is_neutral_without_a_request() {
        let scorer = ScriptedScorer::new(Vec::new());
        let adapter = SentimentAdapter::new(scorer.clone());
        assert_eq!(adapter.text_changed("   \n").await, SubmissionOutcome::Neutral);
        assert_eq!(adapter.panel(), SentimentPanel::Scored(SentimentResult::neutral()));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn a_slow_older_response_cannot_overwrite_a_newer_one() {
        let scorer = ScriptedScorer::new(vec![("I hate", 80, Ok(0.1)), ("I hate nothing", 5, Ok(0.9))]);
        let adapter = SentimentAdapter::new(scorer);

        let (old, new) = tokio::join!(adapter.text_changed("I hate"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            adapter.text_changed("I hate nothing").await
        });

        assert_eq!(old, SubmissionOutcome::Superseded);
        assert_eq!(new, SubmissionOutcome::Applied(SentimentResult::from_score(0.9)));
        assert_eq!(adapter.panel(), SentimentPanel::Scored(SentimentResult::from_score(0.9)));
    }

    #[tokio::test]
    async fn clearing_to_empty_beats_an_in_flight_request() {
        let scorer = ScriptedScorer::new(vec![("hello", 50, Ok(0.95))]);
        let adapter = SentimentAdapter::new(scorer);

        let (first, second) = tokio::join!(adapter.text_changed("hello"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            adapter.text_changed("").await
        });
        assert_eq!(first, SubmissionOutcome::Superseded);
        assert_eq!(second, SubmissionOutcome::Neutral);
        assert_eq!(adapter.panel(), SentimentPanel::Scored(SentimentResult::neutral()));
    }

    #[tokio::test]
    async fn panel_shows_analysing_while_waiting() {
        let scorer = ScriptedScorer::new(vec![("wait", 50, Ok(0.7))]);
        let adapter = SentimentAdapter::new(scorer);
        let (_, seen) = tokio::join!(adapter.text_changed("wait"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            adapter.panel()
        });
        assert_eq!(seen, SentimentPanel::Analysing);
        assert_eq!(adapter.panel(), SentimentPanel::Scored(SentimentResult::from_score(0.7)));
    }

    #[test_log::test(tokio::test)]
    async fn failure_leaves_no_result() {
        let scorer = ScriptedScorer::new(vec![("good", 0, Ok(0.8))]);
        let adapter = SentimentAdapter::new(scorer);
        adapter.text_changed("good").await;
        let outcome = adapter.text_changed("unknown words").await;
        assert!(matches!(outcome, SubmissionOutcome::Failed(SentimentError::Transport(_))));
        assert_eq!(adapter.panel(), SentimentPanel::NoResult);
    }

    #[tokio::test]
    async fn close_discards_late_responses() {
        let scorer = ScriptedScorer::new(vec![("bye", 30, Ok(0.2))]);
        let adapter = SentimentAdapter::new(scorer);
        let (outcome, _) = tokio::join!(adapter.text_changed("bye"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            adapter.close();
        });
        assert_eq!(outcome, SubmissionOutcome::Closed);
        assert_eq!(adapter.panel(), SentimentPanel::Analysing);
        assert_eq!(adapter.text_changed("bye").await, SubmissionOutcome::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn spawned_edits_resolve_to_the_last_one_typed() {
        // The newest edit answers last, the oldest in between.
        let scorer = ScriptedScorer::new(vec![
            ("g", 20, Ok(0.2)),
            ("go", 0, Ok(0.4)),
            ("goo", 10, Ok(0.6)),
            ("good", 40, Ok(0.9)),
        ]);
        let adapter = Arc::new(SentimentAdapter::new(scorer));

        let tasks: Vec<_> = ["g", "go", "goo", "good"]
            .into_iter()
            .map(|text| tokio::spawn(adapter.submit(text.to_string())))
            .collect();
        assert_eq!(adapter.latest(), 4);

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.expect("task completes"));
        }
        assert!(outcomes[..3].iter().all(|o| *o == SubmissionOutcome::Superseded), "{outcomes:?}");
        assert_eq!(outcomes[3], SubmissionOutcome::Applied(SentimentResult::from_score(0.9)));
        assert_eq!(adapter.panel(), SentimentPanel::Scored(SentimentResult::from_score(0.9)));
    }

    #[tokio::test]
    async fn sequence_is_taken_when_the_edit_happens() {
        let scorer = ScriptedScorer::new(vec![("first", 0, Ok(0.1)), ("second", 0, Ok(0.9))]);
        let adapter = SentimentAdapter::new(scorer);
        let first = adapter.text_changed("first");
        let second = adapter.text_changed("second");
        assert_eq!(adapter.panel(), SentimentPanel::Analysing);

        // Polling in reverse order must not let the older edit win.
        assert_eq!(second.await, SubmissionOutcome::Applied(SentimentResult::from_score(0.9)));
        assert_eq!(first.await, SubmissionOutcome::Superseded);
        assert_eq!(adapter.panel(), SentimentPanel::Scored(SentimentResult::from_score(0.9)));
    }

    #[tokio::test]
    async fn clear_button_resets_to_neutral() {
        let scorer = ScriptedScorer::new(vec![("great", 0, Ok(0.9))]);
        let adapter = SentimentAdapter::new(scorer);
        adapter.text_changed("great").await;
        adapter.clear();
        assert_eq!(adapter.panel(), SentimentPanel::Scored(SentimentResult::neutral()));
    }

    #[tokio::test]
    async fn http_scorer_posts_text_and_reads_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sentiment_demo/predict"))
            .and(body_json(serde_json::json!({ "text": "lovely day" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "score": 0.82 })))
            .expect(1)
            .mount(&server)
            .await;

        let config = SentimentConfig {
            endpoint: format!("{}/sentiment_demo/predict", server.uri()),
            timeout: Some(Duration::from_secs(5)),
        };
        let scorer = HttpSentimentScorer::new(&config).expect("client builds");
        let result = analyse_once(&scorer, "lovely day").await;
        assert_eq!(result, Ok(SentimentResult::from_score(0.82)));
    }

    #[tokio::test]
    async fn http_scorer_never_called_for_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "score": 0.1 })))
            .expect(0)
            .mount(&server)
            .await;

        let scorer = Arc::new(HttpSentimentScorer::with_client(
            reqwest::Client::new(),
            format!("{}/predict", server.uri()),
        ));
        let adapter = SentimentAdapter::new(scorer);
        assert_eq!(adapter.text_changed("").await, SubmissionOutcome::Neutral);

        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn http_errors_and_bad_bodies_are_failures() {
        let server = MockServer::start().await;
        Mock::given(path("/down"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        Mock::given(path("/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let down = HttpSentimentScorer::with_client(reqwest::Client::new(), format!("{}/down", server.uri()));
        assert_eq!(down.score("x").await, Err(SentimentError::Status(502)));

        let garbled =
            HttpSentimentScorer::with_client(reqwest::Client::new(), format!("{}/garbled", server.uri()));
        assert!(matches!(garbled.score("x").await, Err(SentimentError::Decode(_))));
    }
}
