use super::ContentError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry of the work and projects timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Free text, e.g. "Nov 2024 – Dec 2024".
    pub period: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub results: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentUpdate {
    pub title: String,
    pub link: String,
    /// "Project", "Article", ...
    pub kind: String,
    /// Served outside the page router, so rendered as a plain anchor.
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default, rename = "experience")]
    pub experiences: Vec<Experience>,
    #[serde(default, rename = "update")]
    pub recent_updates: Vec<RecentUpdate>,
}

impl Portfolio {
    pub fn from_toml(source: &str, path: &Path) -> Result<Self, ContentError> {
        toml::from_str(source).map_err(|source| ContentError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// A missing file is an empty portfolio.
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        if !path.exists() {
            log::warn!("portfolio file {} does not exist; timeline is empty", path.display());
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let portfolio = Self::from_toml(&source, path)?;
        log::info!(
            "loaded {} timeline entries and {} updates from {}",
            portfolio.experiences.len(),
            portfolio.recent_updates.len(),
            path.display()
        );
        Ok(portfolio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTFOLIO: &str = r#"
[[experience]]
period = "Nov 2024 – Dec 2024"
title = "Convolutional Neural Network (from scratch in C++)"
link = "https://github.com/madmax755/cnn-from-scratch"
description = "Built a CNN library from scratch in C++ for image classification."
achievements = ["Implemented convolutional, pooling, and dense layers"]
results = "Achieved 99.4% accuracy on MNIST with augmentation"

[[experience]]
period = "Jul 2025 – Sep 2025"
title = "Software Engineer"

[[update]]
title = "CNN Demo"
link = "/cnn_demo"
kind = "Project"
external = true
"#;

    #[test]
    fn parses_timeline_and_updates_in_file_order() {
        let portfolio = Portfolio::from_toml(PORTFOLIO, Path::new("portfolio.toml")).expect("valid");
        assert_eq!(portfolio.experiences.len(), 2);
        assert_eq!(portfolio.experiences[1].title, "Software Engineer");
        assert!(portfolio.experiences[1].achievements.is_empty());
        assert_eq!(portfolio.experiences.iter().filter(|e| e.link.is_some()).count(), 1);
        assert_eq!(portfolio.recent_updates[0].kind, "Project");
        assert!(portfolio.recent_updates[0].external);
    }

    #[test]
    fn bad_toml_names_the_file() {
        let err = Portfolio::from_toml("[[experience]]\nperiod = 1", Path::new("portfolio.toml"))
            .expect_err("period must be a string");
        assert!(err.to_string().contains("portfolio.toml"));
    }

    #[test]
    fn load_handles_present_and_missing_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("portfolio.toml");
        assert_eq!(Portfolio::load(&path).expect("missing is empty"), Portfolio::default());
        std::fs::write(&path, PORTFOLIO).expect("write");
        assert_eq!(Portfolio::load(&path).expect("loads").experiences.len(), 2);
    }
}
