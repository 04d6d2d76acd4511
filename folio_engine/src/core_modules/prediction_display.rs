// THEORY:
// `PredictionDisplay` is the last stage of the digit pipeline and does no
// computation of its own. It holds the most recent probability vector (or nothing)
// and knows how to lay it out as ten rows of digit, bar and percentage. Each new
// vector replaces the previous one wholesale; there is no history and no smoothing
// between frames. Both front ends read the same `rows()` so the CLI and the web
// page agree on rounding and on the minimum bar width.

use crate::core_modules::predictor::ProbabilityVector;

pub const PLACEHOLDER: &str = "Draw a digit to see predictions";

/// Bars never shrink below this, so a 0% class is still visibly a bar.
const MIN_BAR_PERCENT: f32 = 1.0;
const TEXT_BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub digit: usize,
    pub probability: f32,
    /// Width of the bar as a percentage of the track.
    pub bar_percent: f32,
    /// e.g. "42.0%"
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionDisplay {
    current: Option<ProbabilityVector>,
}

impl PredictionDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, vector: ProbabilityVector) {
        self.current = Some(vector);
    }

    /// Back to the placeholder.
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&ProbabilityVector> {
        self.current.as_ref()
    }

    pub fn rows(&self) -> Vec<PredictionRow> {
        let Some(vector) = &self.current else {
            return Vec::new();
        };
        vector
            .values
            .iter()
            .enumerate()
            .map(|(digit, &probability)| PredictionRow {
                digit,
                probability,
                bar_percent: Self::bar_percent(probability),
                label: Self::label(probability),
            })
            .collect()
    }

    pub fn bar_percent(probability: f32) -> f32 {
        (probability * 100.0).clamp(MIN_BAR_PERCENT, 100.0)
    }

    pub fn label(probability: f32) -> String {
        format!("{:.1}%", probability * 100.0)
    }

    /// Plain-text rendering used by the CLI.
    pub fn render_text(&self) -> String {
        let rows = self.rows();
        if rows.is_empty() {
            return PLACEHOLDER.to_string();
        }
        rows.iter()
            .map(|row| {
                let filled = ((row.probability.clamp(0.0, 1.0) * TEXT_BAR_WIDTH as f32).round()) as usize;
                format!(
                    "{}: {}{} {:>6}",
                    row.digit,
                    "#".repeat(filled),
                    ".".repeat(TEXT_BAR_WIDTH - filled),
                    row.label
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [f32; 10] = [0.05, 0.1, 0.02, 0.03, 0.4, 0.1, 0.1, 0.1, 0.05, 0.05];

    fn display_with(values: &[f32]) -> PredictionDisplay {
        let mut display = PredictionDisplay::new();
        display.update(ProbabilityVector::new(values.to_vec()));
        display
    }

    #[test]
    fn empty_display_shows_the_placeholder() {
        let display = PredictionDisplay::new();
        assert!(display.rows().is_empty());
        assert_eq!(display.render_text(), PLACEHOLDER);
    }

    #[test]
    fn bars_are_proportional_to_probability() {
        let rows = display_with(&KNOWN).rows();
        assert_eq!(rows.len(), 10);
        for (row, p) in rows.iter().zip(KNOWN) {
            assert!((row.bar_percent - p * 100.0).abs() < 1e-4);
        }
        // 0.4 is eight times 0.05.
        assert!((rows[4].bar_percent / rows[0].bar_percent - 8.0).abs() < 1e-4);
    }

    #[test]
    fn labels_use_one_decimal() {
        let rows = display_with(&[0.4234, 0.0, 1.0, 0.00049]).rows();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["42.3%", "0.0%", "100.0%", "0.0%"]);
    }

    #[test]
    fn tiny_probabilities_keep_a_visible_bar() {
        let rows = display_with(&[0.0, 0.001]).rows();
        assert_eq!(rows[0].bar_percent, 1.0);
        assert_eq!(rows[1].bar_percent, 1.0);
    }

    #[test]
    fn update_replaces_and_reset_clears() {
        let mut display = display_with(&KNOWN);
        display.update(ProbabilityVector::new(vec![1.0; 10]));
        assert!(display.rows().iter().all(|r| r.label == "100.0%"));
        display.reset();
        assert!(display.current().is_none());
    }

    #[test]
    fn text_rendering_has_one_line_per_digit() {
        let text = display_with(&KNOWN).render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines[4].starts_with("4: ########"));
        assert!(lines[4].ends_with("40.0%"));
    }
}
