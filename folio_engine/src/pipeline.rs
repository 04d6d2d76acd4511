// THEORY:
// The `pipeline` module is the top-level API for the digit demo. It encapsulates
// the whole drawing stack (surface, rasterizer, downsampler, predictor, display)
// behind the handful of events a drawing page actually produces: mount, pointer
// down/move/up, clear and unmount. Front ends translate their native input events
// into these calls and read `display()` back; they never touch the stages directly.
//
// Control flow for every processed input coordinate:
//   Stage 1: Stroke Rasterizer snaps the point and emits one or more brush stamps.
//   Stage 2: The stamps are painted onto the Raster Surface.
//   Stage 3: The Downsampler reduces the surface to the model input.
//   Stage 4: The Inference Adapter runs the shared predictor, synchronously.
//   Stage 5: The Prediction Display is replaced with the new vector.
//
// Inference runs on every input event, not only on release, so the bars move while
// the user draws. Failures in stage 4 are logged and the previous vector stays on
// screen; nothing here is fatal.

use crate::config::{ConfigError, PipelineConfig};
use crate::core_modules::downsampler::{Downsampler, InputVector};
use crate::core_modules::pointer::pointer::SurfacePoint;
use crate::core_modules::predictor::{PredictorError, PredictorService, ProbabilityVector};
use crate::core_modules::raster_surface::RasterSurface;
use crate::core_modules::stroke_rasterizer::{BrushStamp, StrokeRasterizer};
use log::{debug, warn};
use std::sync::Arc;

// Re-export key data structures for the public API.
pub use crate::core_modules::pointer::pointer::DisplayRect;
pub use crate::core_modules::prediction_display::{PLACEHOLDER, PredictionDisplay, PredictionRow};

/// What a single inference attempt did to the display.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    Updated(ProbabilityVector),
    /// No surface: the drawing view is not mounted.
    Unmounted,
    /// The model has not finished loading.
    NotReady,
    /// The predictor failed; the previous vector is still displayed.
    Failed(PredictorError),
}

/// One drawing session: owns the surface from mount to unmount.
pub struct DigitPipeline {
    config: PipelineConfig,
    surface: Option<RasterSurface>,
    rasterizer: StrokeRasterizer,
    downsampler: Downsampler,
    predictor: Arc<PredictorService>,
    display: PredictionDisplay,
    drawing: bool,
}

impl DigitPipeline {
    pub fn new(config: PipelineConfig, predictor: Arc<PredictorService>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rasterizer: StrokeRasterizer::new(
                config.cell_size,
                config.surface_width,
                config.surface_height,
            ),
            downsampler: Downsampler::new(config.input_width, config.input_height),
            surface: None,
            predictor,
            display: PredictionDisplay::new(),
            drawing: false,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Creates a fresh, empty surface. Remounting discards whatever was drawn.
    pub fn mount(&mut self) {
        self.surface = Some(RasterSurface::new(
            self.config.surface_width,
            self.config.surface_height,
        ));
        self.rasterizer.end_stroke();
        self.drawing = false;
    }

    pub fn unmount(&mut self) {
        self.surface = None;
        self.rasterizer.end_stroke();
        self.drawing = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    pub fn display(&self) -> &PredictionDisplay {
        &self.display
    }

    /// Mouse-down / touch-start.
    pub fn pointer_down(&mut self, point: SurfacePoint) -> InferenceOutcome {
        self.drawing = true;
        self.rasterizer.begin_stroke();
        self.draw(point)
    }

    /// Mouse-move / touch-move. Ignored unless a stroke is in progress.
    pub fn pointer_move(&mut self, point: SurfacePoint) -> Option<InferenceOutcome> {
        if !self.drawing {
            return None;
        }
        Some(self.draw(point))
    }

    /// Mouse-up, mouse-leave or touch-end: closes the stroke and runs a final pass.
    pub fn pointer_up(&mut self) -> InferenceOutcome {
        self.drawing = false;
        self.rasterizer.end_stroke();
        self.infer()
    }

    /// Wipes the surface, forgets the stroke and returns the display to its placeholder.
    pub fn clear(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
        }
        self.rasterizer.end_stroke();
        self.display.reset();
    }

    fn draw(&mut self, point: SurfacePoint) -> InferenceOutcome {
        let Some(surface) = self.surface.as_mut() else {
            return InferenceOutcome::Unmounted;
        };
        let stamps: Vec<BrushStamp> = self.rasterizer.extend(point);
        for stamp in &stamps {
            stamp.paint(surface, self.config.cell_size);
        }
        self.infer()
    }

    /// The current model input, or `None` while unmounted.
    pub fn input_vector(&self) -> Option<InputVector> {
        self.surface
            .as_ref()
            .map(|surface| self.downsampler.downsample(surface))
    }

    /// Downsamples the surface and refreshes the display from the predictor.
    pub fn infer(&mut self) -> InferenceOutcome {
        let Some(input) = self.input_vector() else {
            return InferenceOutcome::Unmounted;
        };
        if !self.predictor.ready() {
            debug!("skipping inference: model {}", self.predictor.readiness().state());
            return InferenceOutcome::NotReady;
        }
        match self.predictor.predict(&input) {
            Ok(vector) => {
                self.display.update(vector.clone());
                InferenceOutcome::Updated(vector)
            }
            Err(PredictorError::NotReady(_)) => InferenceOutcome::NotReady,
            Err(e) => {
                warn!("prediction error: {e}");
                InferenceOutcome::Failed(e)
            }
        }
    }
}
