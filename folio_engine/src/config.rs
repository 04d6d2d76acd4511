// THEORY:
// Configuration for the two demos lives in plain structs with `Default` impls
// that reproduce the shipped page: a 280x280 drawing surface painted in 10-unit
// cells, downsampled to the 28x28 input the digit model was trained on, and a
// sentiment endpoint on the public site. Front ends override individual fields
// (the site reads environment variables, the CLI reads flags) and call
// `validate()` before building anything from them.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SENTIMENT_ENDPOINT: &str = "https://maxkendall.com/sentiment_demo/predict";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be non-zero")]
    Zero { field: &'static str },
    #[error("surface {surface} is not a multiple of cell size {cell}")]
    Misaligned { surface: u32, cell: u32 },
    #[error("invalid sentiment endpoint `{0}`")]
    Endpoint(String),
}

/// Geometry of the drawing surface and of the model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Width of the paint buffer in surface units.
    pub surface_width: u32,
    /// Height of the paint buffer in surface units.
    pub surface_height: u32,
    /// Side of one grid cell; every stamp is aligned to this.
    pub cell_size: u32,
    /// Width of the downsampled model input.
    pub input_width: u32,
    /// Height of the downsampled model input.
    pub input_height: u32,
    /// Length of the probability vector returned by the predictor.
    pub classes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            surface_width: 280,
            surface_height: 280,
            cell_size: 10,
            input_width: 28,
            input_height: 28,
            classes: 10,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("surface_width", self.surface_width),
            ("surface_height", self.surface_height),
            ("cell_size", self.cell_size),
            ("input_width", self.input_width),
            ("input_height", self.input_height),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.classes == 0 {
            return Err(ConfigError::Zero { field: "classes" });
        }
        for surface in [self.surface_width, self.surface_height] {
            if surface % self.cell_size != 0 {
                return Err(ConfigError::Misaligned {
                    surface,
                    cell: self.cell_size,
                });
            }
        }
        Ok(())
    }

    /// Number of values the downsampler produces.
    pub fn input_len(&self) -> usize {
        (self.input_width * self.input_height) as usize
    }
}

/// Where and how the sentiment scorer talks to the remote model.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentConfig {
    pub endpoint: String,
    /// The page never set one; `None` keeps that behaviour.
    pub timeout: Option<Duration>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SENTIMENT_ENDPOINT.to_string(),
            timeout: None,
        }
    }
}

impl SentimentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            Ok(())
        } else {
            Err(ConfigError::Endpoint(self.endpoint.clone()))
        }
    }
}
