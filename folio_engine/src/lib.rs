// THEORY:
// This file is the main entry point for the `folio_engine` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (the `folio_cli` runner and the
// `folio_site` server).
//
// The primary goal is to export the `DigitPipeline` and the `SentimentAdapter`
// as the clean, high-level interfaces for the two demos. The drawing internals
// (`core_modules`) stay reachable for tests and tooling, but the front ends only
// need the pipeline facade, the predictor service and the content catalogue.

pub mod config;
pub mod content;
pub mod core_modules;
pub mod pipeline;
pub mod stroke_file;

pub use config::{ConfigError, PipelineConfig, SentimentConfig};
pub use pipeline::{DigitPipeline, InferenceOutcome, PLACEHOLDER, PredictionRow};
