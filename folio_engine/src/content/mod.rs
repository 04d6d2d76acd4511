// THEORY:
// The site's written content lives on disk, not in code. Blog posts are
// Markdown files with a `+++`-fenced TOML header; the portfolio timeline and the
// "recent updates" sidebar come from a single `portfolio.toml`. Everything is
// parsed once at startup into plain owned structs, so the web layer only ever
// reads immutable data.
//
// Key architectural principles:
// 1.  **Parse, don't render:** Post bodies become a small list of `Block`s. The
//     page layer decides how each block looks and escapes all text itself.
// 2.  **Deterministic order:** Posts are ordered newest first by their
//     month-year date. A date that does not parse sorts after every dated post,
//     and ties fall back to the slug.

pub mod blog;
pub mod portfolio;

pub use blog::{Block, BlogCatalog, BlogPost, PostFrontmatter};
pub use portfolio::{Experience, Portfolio, RecentUpdate};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} has no +++ frontmatter block")]
    MissingFrontmatter { path: PathBuf },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("slug {slug:?} is used by more than one post")]
    DuplicateSlug { slug: String },
}
