//! URL helper functions

use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;

use crate::config::SiteConfig;

/// Prefix a site-relative path with the baseurl
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.base_path();
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about/") // -> "https://example.com/blog/about/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    let host = config.url.trim_end_matches('/');
    format!("{}{}", host, url_for(config, path))
}

/// Expand a permalink pattern for one post.
///
/// The result always starts with `/` and never contains `//`, so an empty
/// `:categories` segment simply disappears.
pub fn expand_permalink(
    pattern: &str,
    date: &DateTime<FixedOffset>,
    slug: &str,
    categories: &[String],
) -> String {
    let categories = categories
        .iter()
        .map(|c| slug::slugify(c))
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    let expanded = pattern
        .replace(":categories", &categories)
        .replace(":year", &date.format("%Y").to_string())
        .replace(":i_month", &date.format("%-m").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":i_day", &date.format("%-d").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":title", slug)
        .replace(":slug", slug);

    normalize_path(&expanded)
}

/// Collapse repeated slashes and force a leading slash
pub fn normalize_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len() + 1);
    result.push('/');
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        result.push_str(segment);
        result.push('/');
    }
    if !path.ends_with('/') && result.len() > 1 {
        result.pop();
    }
    result
}

/// File (relative to the destination) that serves a site-relative URL.
///
/// `/a/b/` -> `a/b/index.html`, `/feed.xml` -> `feed.xml`, `/a/b` -> `a/b.html`
pub fn output_path_for_url(url: &str) -> PathBuf {
    let trimmed = url.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return PathBuf::from(trimmed).join("index.html");
    }
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if last.contains('.') {
        PathBuf::from(trimmed)
    } else {
        PathBuf::from(format!("{}.html", trimmed))
    }
}

/// Decode a percent-encoded request path
pub fn decode_url(path: &str) -> String {
    percent_encoding::percent_decode_str(path)
        .decode_utf8_lossy()
        .to_string()
}

/// Whether a URL path has a `.` or `..` segment, which would let its output
/// file land outside the destination
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\'])
        .any(|segment| segment == "." || segment == "..")
}

fn is_external(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}
