//! Content loader - loads posts, pages and static files from the site directory

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use glob::Pattern;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::filename::{parse_post_filename, title_from_slug};
use super::{BuildErrors, ContentError, FrontMatter, MarkdownRenderer, Page, Post};
use crate::helpers::{
    expand_permalink, full_url_for, has_dot_segment, normalize_path, start_of_day,
};
use crate::Site;

/// Paths excluded even when the config does not mention them
const DEFAULT_EXCLUDES: &[&str] = &["Gemfile", "Gemfile.lock", "node_modules", "vendor"];

/// Loads content from the site directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
    tz: Tz,
    excludes: Vec<Pattern>,
    include_unpublished: bool,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Result<Self> {
        let config = &site.config;
        let renderer =
            MarkdownRenderer::with_options(&config.highlight.theme, config.highlight.line_number)?;

        let excludes = DEFAULT_EXCLUDES
            .iter()
            .map(|s| s.to_string())
            .chain(config.exclude.iter().cloned())
            .map(|p| {
                Pattern::new(p.trim_matches('/'))
                    .map_err(|e| anyhow!("Invalid exclude pattern {:?}: {}", p, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            site,
            renderer,
            tz: config.tz()?,
            excludes,
            include_unpublished: false,
        })
    }

    /// Also load posts marked `published: false`
    pub fn with_unpublished(mut self, include: bool) -> Self {
        self.include_unpublished = include;
        self
    }

    /// Load all posts from the posts directory, newest first.
    ///
    /// Every file is checked before anything is returned; if any of them is
    /// invalid the error is a [`BuildErrors`] listing all diagnostics.
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let posts_dir = &self.site.posts_dir;
        if !posts_dir.exists() {
            tracing::warn!("No posts directory at {:?}", posts_dir);
            return Ok(Vec::new());
        }

        let mut posts = Vec::new();
        let mut errors = Vec::new();

        for entry in WalkDir::new(posts_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| posts_dir.clone());
                    errors.push(ContentError::Io {
                        path,
                        source: e.into(),
                    });
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if !is_markdown_file(path) {
                tracing::debug!("Ignoring non-markdown file in posts: {:?}", path);
                continue;
            }

            match self.load_post(path) {
                Ok(post) => posts.push(post),
                Err(e) => {
                    tracing::error!("{}", e);
                    errors.push(e);
                }
            }
        }

        errors.extend(check_unique_slugs(&posts));

        if !errors.is_empty() {
            return Err(anyhow::Error::new(BuildErrors(errors)));
        }

        if !self.include_unpublished {
            let before = posts.len();
            posts.retain(|p| p.published);
            let skipped = before - posts.len();
            if skipped > 0 {
                tracing::info!("Skipped {} unpublished post(s)", skipped);
            }
        }

        Post::sort_newest_first(&mut posts);
        Ok(posts)
    }

    /// Load a single post from a file
    fn load_post(&self, path: &Path) -> Result<Post, ContentError> {
        let config = &self.site.config;
        let name = parse_post_filename(path)?;

        let text = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (fm, body) = FrontMatter::parse(&text).map_err(|e| e.with_path(path))?;

        let date = match fm.parse_date(self.tz).map_err(|e| e.with_path(path))? {
            Some(date) => date,
            None => start_of_day(name.date, self.tz).ok_or_else(|| ContentError::InvalidDate {
                path: path.to_path_buf(),
                date: name.date.to_string(),
            })?,
        };

        let (excerpt_md, full_md) = MarkdownRenderer::split_excerpt(body, &config.excerpt_separator);
        let url = expand_permalink(&config.permalink, &date, &name.slug, &fm.categories);

        Ok(Post {
            title: fm.title.unwrap_or_else(|| title_from_slug(&name.slug)),
            date,
            description: fm.description,
            author: fm.author.unwrap_or_else(|| config.author.clone()),
            layout: fm
                .layout
                .unwrap_or_else(|| config.default_layout.clone()),
            tags: fm.tags,
            categories: fm.categories,
            raw: body.to_string(),
            content: self.renderer.render(&full_md),
            excerpt: self.renderer.render(&excerpt_md),
            source: self.relative_source(path),
            full_source: path.to_path_buf(),
            permalink: full_url_for(config, &url),
            url,
            published: fm.published,
            slug: name.slug,
            extra: fm.extra,
        })
    }

    /// Load all standalone pages: Markdown files with front-matter outside
    /// underscore directories
    pub fn load_pages(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        let mut errors = Vec::new();

        for path in self.site_files()? {
            if !is_markdown_file(&path) {
                continue;
            }
            match self.load_page(&path) {
                Ok(Some(page)) => pages.push(page),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("{}", e);
                    errors.push(e);
                }
            }
        }

        if !errors.is_empty() {
            return Err(anyhow::Error::new(BuildErrors(errors)));
        }

        Ok(pages)
    }

    /// Load a page; `None` when the file has no front-matter and is copied as-is
    fn load_page(&self, path: &Path) -> Result<Option<Page>, ContentError> {
        let config = &self.site.config;
        let text = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !FrontMatter::is_present(&text) {
            return Ok(None);
        }
        let (fm, body) = FrontMatter::parse(&text).map_err(|e| e.with_path(path))?;

        let source = self.relative_source(path);
        let url = match fm.extra.get("permalink").and_then(|v| v.as_str()) {
            Some(permalink) if has_dot_segment(permalink) => {
                return Err(ContentError::InvalidPermalink {
                    path: path.to_path_buf(),
                    permalink: permalink.to_string(),
                });
            }
            Some(permalink) => normalize_path(permalink),
            None => page_url(&source),
        };

        let title = fm.title.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(title_from_slug)
                .unwrap_or_default()
        });

        Ok(Some(Page {
            title,
            description: fm.description,
            layout: fm.layout.unwrap_or_else(|| "page".to_string()),
            raw: body.to_string(),
            content: self.renderer.render(body),
            source,
            full_source: path.to_path_buf(),
            permalink: full_url_for(config, &url),
            url,
            extra: fm.extra,
        }))
    }

    /// Files copied verbatim into the destination
    pub fn static_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in self.site_files()? {
            if is_markdown_file(&path) {
                let text = fs::read_to_string(&path)?;
                if FrontMatter::is_present(&text) {
                    continue;
                }
            }
            files.push(path);
        }
        Ok(files)
    }

    /// Every regular file under the site root that is not special, hidden,
    /// excluded or part of the destination
    fn site_files(&self) -> Result<Vec<PathBuf>> {
        let base_dir = &self.site.base_dir;
        let dest_dir = &self.site.dest_dir;
        let mut files = Vec::new();

        let walker = WalkDir::new(base_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                if name.starts_with('_') || name.starts_with('.') {
                    return false;
                }
                if e.path() == dest_dir.as_path() {
                    return false;
                }
                !self.is_excluded(e.path())
            });

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let relative = self.relative_source(path);
        self.excludes.iter().any(|p| p.matches(&relative))
    }

    /// Path relative to the site root with `/` separators
    fn relative_source(&self, path: &Path) -> String {
        path.strip_prefix(&self.site.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// `about.md` -> `/about/`, `docs/index.md` -> `/docs/`
fn page_url(source: &str) -> String {
    let without_ext = source
        .trim_end_matches(".md")
        .trim_end_matches(".markdown");

    let path = if without_ext == "index" {
        String::new()
    } else if let Some(dir) = without_ext.strip_suffix("/index") {
        format!("{}/", dir)
    } else {
        format!("{}/", without_ext)
    };

    normalize_path(&format!("/{}", path))
}

/// Report every slug used by more than one post
fn check_unique_slugs(posts: &[Post]) -> Vec<ContentError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    let mut errors = Vec::new();

    for post in posts {
        if let Some(first) = seen.get(post.slug.as_str()) {
            errors.push(ContentError::DuplicateSlug {
                slug: post.slug.clone(),
                first: first.to_path_buf(),
                second: post.full_source.clone(),
            });
        } else {
            seen.insert(&post.slug, &post.full_source);
        }
    }

    errors
}

/// Check if a file is a markdown file
pub(crate) fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

pub(crate) fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
