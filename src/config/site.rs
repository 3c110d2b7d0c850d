//! Site configuration (_config.yml)

use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};

use crate::helpers::has_dot_segment;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    /// IANA zone name used for dates without an explicit offset; empty means UTC
    pub timezone: String,

    // URL
    pub url: String,
    /// Sub-path the site is served under (GitHub Pages project sites)
    pub baseurl: String,
    pub permalink: String,

    // Directory
    pub posts_dir: String,
    pub layouts_dir: String,
    pub destination: String,
    pub archive_dir: String,
    pub tag_dir: String,
    #[serde(default)]
    pub exclude: Vec<String>,

    // Writing
    pub default_layout: String,
    pub excerpt_separator: String,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Pagination
    pub paginate: usize,
    pub paginate_path: String,

    // Feed
    #[serde(default)]
    pub feed: FeedConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: String::new(),
            author: String::new(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            baseurl: String::new(),
            permalink: "/:year/:month/:day/:slug/".to_string(),

            posts_dir: "_posts".to_string(),
            layouts_dir: "_layouts".to_string(),
            destination: "_site".to_string(),
            archive_dir: "archives".to_string(),
            tag_dir: "tags".to_string(),
            exclude: Vec::new(),

            default_layout: "post".to_string(),
            excerpt_separator: "<!-- more -->".to_string(),
            highlight: HighlightConfig::default(),

            paginate: 10,
            paginate_path: "page".to_string(),

            feed: FeedConfig::default(),
            extra: IndexMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        // An empty file deserializes to unit, not a mapping
        let config: SiteConfig = if content.trim().is_empty() {
            SiteConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {:?}: {}", path, e))?
        };
        config.validate()?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Reject settings the build cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.paginate == 0 {
            bail!("paginate must be at least 1");
        }
        if self.feed.limit == 0 {
            bail!("feed.limit must be at least 1");
        }
        let destination = Path::new(self.destination.trim());
        let inside_site = destination
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            && destination
                .components()
                .any(|c| matches!(c, Component::Normal(_)));
        if !inside_site {
            bail!(
                "destination {:?} must name a directory inside the site",
                self.destination
            );
        }
        let url_settings = [
            ("permalink", &self.permalink),
            ("archive_dir", &self.archive_dir),
            ("tag_dir", &self.tag_dir),
            ("paginate_path", &self.paginate_path),
            ("feed.path", &self.feed.path),
        ];
        for (key, value) in url_settings {
            if has_dot_segment(value) {
                bail!("{} {:?} must not contain `.` or `..` segments", key, value);
            }
        }
        self.tz()?;
        Ok(())
    }

    /// Resolve the configured time zone
    pub fn tz(&self) -> Result<Tz> {
        if self.timezone.trim().is_empty() {
            return Ok(Tz::UTC);
        }
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| anyhow!("Unknown timezone: {}", self.timezone))
    }

    /// The baseurl normalized to either "" or "/segment" without a trailing slash
    pub fn base_path(&self) -> String {
        let trimmed = self.baseurl.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/// Syntax highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// syntect theme name
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}

/// Atom feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enable: bool,
    pub path: String,
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: "feed.xml".to_string(),
            limit: 20,
        }
    }
}
