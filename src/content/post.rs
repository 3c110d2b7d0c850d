//! Post and Page models

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// A blog post loaded from `_posts/`
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Post title
    pub title: String,

    /// Publication date
    pub date: DateTime<FixedOffset>,

    /// Slug (URL-friendly name taken from the filename)
    pub slug: String,

    pub description: Option<String>,

    pub author: String,

    /// Layout template to use
    pub layout: String,

    pub tags: Vec<String>,

    pub categories: Vec<String>,

    /// Raw markdown content
    pub raw: String,

    /// Rendered HTML content
    pub content: String,

    /// Rendered HTML excerpt
    pub excerpt: String,

    /// Source file path relative to the site root
    pub source: String,

    /// Full source file path
    #[serde(skip)]
    pub full_source: PathBuf,

    /// Site-relative URL (without baseurl)
    pub url: String,

    /// Absolute URL
    pub permalink: String,

    pub published: bool,

    /// Custom front-matter fields
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Post {
    /// Newest first; equal dates fall back to the slug so order never depends on
    /// directory iteration
    pub fn sort_newest_first(posts: &mut [Post]) {
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
    }

    /// The newer neighbour in a newest-first list
    pub fn newer<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.source == self.source)?;
        if pos > 0 {
            Some(&posts[pos - 1])
        } else {
            None
        }
    }

    /// The older neighbour in a newest-first list
    pub fn older<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.source == self.source)?;
        posts.get(pos + 1)
    }
}

/// A standalone page (a Markdown file with front-matter outside `_posts/`)
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub title: String,

    pub description: Option<String>,

    /// Layout template to use
    pub layout: String,

    /// Raw markdown content
    pub raw: String,

    /// Rendered HTML content
    pub content: String,

    /// Source file path relative to the site root
    pub source: String,

    #[serde(skip)]
    pub full_source: PathBuf,

    /// Site-relative URL (without baseurl)
    pub url: String,

    /// Absolute URL
    pub permalink: String,

    /// Custom front-matter fields
    pub extra: IndexMap<String, serde_yaml::Value>,
}
