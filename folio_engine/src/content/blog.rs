use super::ContentError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const FENCE: &str = "+++";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostFrontmatter {
    pub title: String,
    /// Month and year, e.g. "Dec 2024".
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Defaults to the file stem.
    #[serde(default)]
    pub slug: Option<String>,
}

impl PostFrontmatter {
    /// First day of the month named by `date`, if it parses.
    pub fn published(&self) -> Option<NaiveDate> {
        parse_month_year(&self.date)
    }
}

/// Accepts "Dec 2024" and "December 2024".
pub fn parse_month_year(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("1 {}", date.trim()), "%d %B %Y").ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    List(Vec<String>),
    /// Fenced code. The fence may name a language and a file, as in `cpp:conv.cpp`.
    Code {
        lang: Option<String>,
        filename: Option<String>,
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogPost {
    pub slug: String,
    pub frontmatter: PostFrontmatter,
    pub body: Vec<Block>,
}

impl BlogPost {
    pub fn parse(source: &str, path: &Path) -> Result<Self, ContentError> {
        let (header, body) = split_frontmatter(source).ok_or_else(|| ContentError::MissingFrontmatter {
            path: path.to_path_buf(),
        })?;
        let frontmatter: PostFrontmatter = toml::from_str(header).map_err(|source| ContentError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        let slug = frontmatter
            .slug
            .clone()
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();
        Ok(Self {
            slug,
            frontmatter,
            body: parse_blocks(body),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let source = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, path)
    }
}

fn split_frontmatter(source: &str) -> Option<(&str, &str)> {
    let rest = source.trim_start_matches('\u{feff}').trim_start();
    let rest = rest.strip_prefix(FENCE)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Headings, bullet lists, fenced code and paragraphs. Inline markup is kept as text.
pub fn parse_blocks(body: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Vec<String> = Vec::new();
    let mut code: Option<(Option<String>, Option<String>, Vec<&str>)> = None;

    fn flush(blocks: &mut Vec<Block>, paragraph: &mut Vec<&str>, list: &mut Vec<String>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
        if !list.is_empty() {
            blocks.push(Block::List(std::mem::take(list)));
        }
    }

    for line in body.lines() {
        let trimmed = line.trim();

        if let Some((lang, filename, lines)) = code.as_mut() {
            if trimmed.starts_with("```") {
                blocks.push(Block::Code {
                    lang: lang.take(),
                    filename: filename.take(),
                    code: lines.join("\n"),
                });
                code = None;
            } else {
                lines.push(line);
            }
            continue;
        }

        if let Some(fence) = trimmed.strip_prefix("```") {
            flush(&mut blocks, &mut paragraph, &mut list);
            let (lang, filename) = match fence.trim().split_once(':') {
                Some((lang, file)) => (lang, Some(file.trim().to_string())),
                None => (fence.trim(), None),
            };
            let lang = Some(lang.trim().to_string()).filter(|l| !l.is_empty());
            code = Some((lang, filename.filter(|f| !f.is_empty()), Vec::new()));
        } else if trimmed.is_empty() {
            flush(&mut blocks, &mut paragraph, &mut list);
        } else if let Some((level, text)) = heading(trimmed) {
            flush(&mut blocks, &mut paragraph, &mut list);
            blocks.push(Block::Heading {
                level,
                text: text.to_string(),
            });
        } else if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            if !paragraph.is_empty() {
                flush(&mut blocks, &mut paragraph, &mut list);
            }
            list.push(item.trim().to_string());
        } else {
            if !list.is_empty() {
                flush(&mut blocks, &mut paragraph, &mut list);
            }
            paragraph.push(trimmed);
        }
    }

    // An unterminated fence keeps what it collected.
    if let Some((lang, filename, lines)) = code {
        blocks.push(Block::Code {
            lang,
            filename,
            code: lines.join("\n"),
        });
    }
    flush(&mut blocks, &mut paragraph, &mut list);
    blocks
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let text = line[level..].strip_prefix(' ')?;
    Some((level as u8, text.trim()))
}

/// Newest first; undated posts after dated ones; then by slug.
fn newest_first(a: &BlogPost, b: &BlogPost) -> Ordering {
    match (a.frontmatter.published(), b.frontmatter.published()) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.slug.cmp(&b.slug))
}

#[derive(Debug, Clone, Default)]
pub struct BlogCatalog {
    posts: Vec<BlogPost>,
}

impl BlogCatalog {
    pub fn from_posts(mut posts: Vec<BlogPost>) -> Result<Self, ContentError> {
        let mut seen = HashSet::new();
        for post in &posts {
            if !seen.insert(post.slug.as_str()) {
                return Err(ContentError::DuplicateSlug {
                    slug: post.slug.clone(),
                });
            }
        }
        posts.sort_by(newest_first);
        Ok(Self { posts })
    }

    /// Loads every `*.md` file directly inside `dir`. A missing directory is an empty blog.
    pub fn load_dir(dir: &Path) -> Result<Self, ContentError> {
        if !dir.exists() {
            log::warn!("blog directory {} does not exist; serving no posts", dir.display());
            return Ok(Self::default());
        }
        let io_err = |source| ContentError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                paths.push(path);
            }
        }

        let posts = paths
            .iter()
            .map(|path| BlogPost::load(path))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("loaded {} blog posts from {}", posts.len(), dir.display());
        Self::from_posts(posts)
    }

    pub fn posts(&self) -> &[BlogPost] {
        &self.posts
    }

    pub fn find(&self, slug: &str) -> Option<&BlogPost> {
        self.posts.iter().find(|p| p.slug == slug)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
