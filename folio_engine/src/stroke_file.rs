//! Recorded pointer paths.
//!
//! A stroke file is JSON of the form `{"strokes": [[[x, y], ...], ...]}` in
//! surface units. Each inner list is one press-drag-release gesture. Replaying a
//! file drives a [`DigitPipeline`] through exactly the events a browser would have
//! produced: pointer-down on the first point, pointer-move for the rest, then
//! pointer-up.

use crate::core_modules::pointer::pointer::SurfacePoint;
use crate::pipeline::{DigitPipeline, InferenceOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrokeFileError {
    #[error("could not read stroke file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed stroke file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeFile {
    pub strokes: Vec<Vec<[f32; 2]>>,
}

/// Counts of what a replay fed into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub strokes: usize,
    pub events: usize,
    pub last_outcome: Option<InferenceOutcome>,
}

impl StrokeFile {
    pub fn from_json(json: &str) -> Result<Self, StrokeFileError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, StrokeFileError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, StrokeFileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Vec::len).sum()
    }

    /// Plays every non-empty stroke into `pipeline`. Mounts it first if needed.
    pub fn replay(&self, pipeline: &mut DigitPipeline) -> ReplaySummary {
        if !pipeline.is_mounted() {
            pipeline.mount();
        }
        let mut summary = ReplaySummary {
            strokes: 0,
            events: 0,
            last_outcome: None,
        };

        for stroke in self.strokes.iter().filter(|s| !s.is_empty()) {
            summary.strokes += 1;
            let mut points = stroke.iter().map(|[x, y]| SurfacePoint::new(*x, *y));
            if let Some(first) = points.next() {
                summary.last_outcome = Some(pipeline.pointer_down(first));
                summary.events += 1;
            }
            for point in points {
                if let Some(outcome) = pipeline.pointer_move(point) {
                    summary.last_outcome = Some(outcome);
                }
                summary.events += 1;
            }
            summary.last_outcome = Some(pipeline.pointer_up());
            summary.events += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::core_modules::predictor::test_support::{FixedModule, ready_service};
    use std::sync::atomic::Ordering;

    const SEVEN: &str = r#"{"strokes": [[[60, 60], [220, 60], [120, 240]], [], [[90, 150], [190, 150]]]}"#;

    #[test]
    fn parses_and_counts_points() {
        let file = StrokeFile::from_json(SEVEN).expect("valid json");
        assert_eq!(file.strokes.len(), 3);
        assert_eq!(file.point_count(), 5);
    }

    #[test]
    fn malformed_files_are_reported() {
        assert!(matches!(
            StrokeFile::from_json(r#"{"strokes": [[1, 2]]}"#),
            Err(StrokeFileError::Json(_))
        ));
        assert!(matches!(
            StrokeFile::load(Path::new("/definitely/not/here.json")),
            Err(StrokeFileError::Io(_))
        ));
    }

    #[test]
    fn replay_drives_down_move_up_per_stroke() {
        let module = FixedModule::new(vec![0.1; 10]);
        let calls = module.calls.clone();
        let mut pipeline =
            DigitPipeline::new(PipelineConfig::default(), ready_service(module)).expect("valid");

        let summary = StrokeFile::from_json(SEVEN).expect("valid json").replay(&mut pipeline);

        assert_eq!(summary.strokes, 2);
        // 5 points + 2 releases.
        assert_eq!(summary.events, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert!(matches!(summary.last_outcome, Some(InferenceOutcome::Updated(_))));
        let surface = pipeline.surface().expect("replay mounts");
        assert_eq!(surface.pixel(65, 65).0[0], 255);
        // The diagonal of the seven was interpolated, not skipped.
        assert_eq!(surface.pixel(205, 115).0[0], 255);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("strokes.json");
        let original = StrokeFile { strokes: vec![vec![[1.0, 2.0], [3.0, 4.0]]] };
        std::fs::write(&path, original.to_json().expect("serializes")).expect("write");
        assert_eq!(StrokeFile::load(&path).expect("loads"), original);
    }
}
