//! quillpress: a static blog generator for GitHub Pages style sites
//!
//! A site is a directory with an optional `_config.yml`, dated Markdown posts
//! in `_posts/`, optional layouts in `_layouts/`, and any other files. Building
//! it renders every post and listing page with Tera and writes a static tree
//! to `_site/`.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

/// A site directory and its configuration
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Site root
    pub base_dir: PathBuf,
    /// Posts directory (`_posts`)
    pub posts_dir: PathBuf,
    /// Site layouts (`_layouts`)
    pub layouts_dir: PathBuf,
    /// Output directory (`_site`)
    pub dest_dir: PathBuf,
}

impl Site {
    /// Open a site directory; `_config.yml` is optional
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let posts_dir = base_dir.join(&config.posts_dir);
        let layouts_dir = base_dir.join(&config.layouts_dir);
        let dest_dir = base_dir.join(&config.destination);

        Ok(Self {
            config,
            base_dir,
            posts_dir,
            layouts_dir,
            dest_dir,
        })
    }

    /// The destination is deleted by `build` and `clean`, so it must not be
    /// the site root or any directory above it
    pub fn check_destination(&self) -> Result<()> {
        let base = lexical_normalize(&self.base_dir);
        let dest = lexical_normalize(&self.dest_dir);
        if base.starts_with(&dest) {
            bail!(
                "Refusing to use {:?} as the destination: it contains the site root {:?}",
                self.dest_dir,
                self.base_dir
            );
        }
        Ok(())
    }

    /// Build the site into the destination directory
    pub fn build(&self, drafts: bool) -> Result<()> {
        commands::generate::run(self, drafts)
    }

    /// Remove the destination directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Create a new post, returning its path
    pub fn new_post(&self, title: &str, date: Option<&str>) -> Result<PathBuf> {
        commands::new::run(self, title, date)
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}
