//! Layout templates using the Tera template engine
//!
//! A default theme is embedded in the binary. Files in the site's layouts
//! directory are loaded on top of it, so a site can replace any built-in
//! layout or add new ones that posts select with `layout:`.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as _;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::helpers;

/// Built-in layouts, by template name
const BUILTIN_LAYOUTS: &[(&str, &str)] = &[
    ("base.html", include_str!("default/base.html")),
    ("post.html", include_str!("default/post.html")),
    ("page.html", include_str!("default/page.html")),
    ("index.html", include_str!("default/index.html")),
    ("archive.html", include_str!("default/archive.html")),
    ("tag.html", include_str!("default/tag.html")),
    (
        "partials/macros.html",
        include_str!("default/partials/macros.html"),
    ),
];

/// Template renderer for the built-in theme plus site layouts
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a renderer with the built-in layouts and any found in `layouts_dir`
    pub fn new(config: &SiteConfig, layouts_dir: &Path) -> Result<Self> {
        let mut tera = Tera::default();

        // Post bodies are already HTML; templates escape metadata explicitly
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(BUILTIN_LAYOUTS.to_vec())
            .map_err(|e| anyhow!("Built-in layouts failed to load: {}", describe(&e)))?;

        let site_layouts = load_layouts(layouts_dir)?;
        if !site_layouts.is_empty() {
            tracing::debug!("Loaded {} layout(s) from {:?}", site_layouts.len(), layouts_dir);
            tera.add_raw_templates(site_layouts)
                .map_err(|e| anyhow!("Invalid layout in {:?}: {}", layouts_dir, describe(&e)))?;
        }

        let url_config = config.clone();
        tera.register_filter(
            "relative_url",
            move |value: &tera::Value, _: &HashMap<String, tera::Value>| {
                let s = tera::try_get_value!("relative_url", "value", String, value);
                Ok(tera::Value::String(helpers::url_for(&url_config, &s)))
            },
        );
        let url_config = config.clone();
        tera.register_filter(
            "absolute_url",
            move |value: &tera::Value, _: &HashMap<String, tera::Value>| {
                let s = tera::try_get_value!("absolute_url", "value", String, value);
                Ok(tera::Value::String(helpers::full_url_for(&url_config, &s)))
            },
        );
        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Whether a layout name (without `.html`) resolves to a template
    pub fn has_layout(&self, layout: &str) -> bool {
        let name = layout_template(layout);
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a layout by name
    pub fn render_layout(&self, layout: &str, context: &Context) -> Result<String> {
        self.render(&layout_template(layout), context)
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(template_name, context)
            .map_err(|e| anyhow!("Rendering {} failed: {}", template_name, describe(&e)))
    }
}

fn layout_template(layout: &str) -> String {
    format!("{}.html", layout)
}

/// Read every `.html` file under the layouts directory, named by relative path
fn load_layouts(layouts_dir: &Path) -> Result<Vec<(String, String)>> {
    let mut layouts = Vec::new();
    if !layouts_dir.exists() {
        return Ok(layouts);
    }

    for entry in WalkDir::new(layouts_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("html")
        {
            continue;
        }
        let name = path
            .strip_prefix(layouts_dir)?
            .to_string_lossy()
            .replace('\\', "/");
        layouts.push((name, fs::read_to_string(path)?));
    }

    Ok(layouts)
}

/// Tera nests the useful message in the error's source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(helpers::strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    Ok(tera::Value::String(helpers::truncate(
        s.trim(),
        length,
        Some(&omission),
    )))
}

/// Tera filter: format an RFC 3339 date string with a Moment.js style format
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "MMM DD, YYYY".to_string(),
    };

    let date = chrono::DateTime::parse_from_rfc3339(&s)
        .map_err(|e| tera::Error::msg(format!("date_format: {:?} is not a date: {}", s, e)))?;
    let formatted = helpers::format_date(&date, &format).map_err(|_| {
        tera::Error::msg(format!("date_format: cannot render format {:?}", format))
    })?;
    Ok(tera::Value::String(formatted))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub baseurl: String,
    pub feed_url: Option<String>,
    pub archive_url: String,
    /// Every published post, newest first, without bodies
    pub posts: Vec<PostData>,
    pub tags: Vec<TagSummary>,
    pub extra: indexmap::IndexMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    /// RFC 3339
    pub date: String,
    pub url: String,
    pub permalink: String,
    pub slug: String,
    pub description: Option<String>,
    pub author: String,
    pub tags: Vec<TagLink>,
    pub categories: Vec<String>,
    pub content: String,
    pub excerpt: String,
    pub extra: indexmap::IndexMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    pub title: String,
    pub url: String,
    pub permalink: String,
    pub description: Option<String>,
    pub content: String,
    pub extra: indexmap::IndexMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagSummary {
    pub name: String,
    pub url: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatorData {
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
    pub posts: Vec<PostData>,
    pub previous_page_url: Option<String>,
    pub next_page_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveYearData {
    pub year: i32,
    pub posts: Vec<PostData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagData {
    pub name: String,
    pub url: String,
    pub posts: Vec<PostData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer_with(layouts: &[(&str, &str)]) -> (tempfile::TempDir, TemplateRenderer) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in layouts {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut config = SiteConfig::default();
        config.url = "https://me.github.io".to_string();
        config.baseurl = "/blog".to_string();
        let renderer = TemplateRenderer::new(&config, dir.path()).unwrap();
        (dir, renderer)
    }

    #[test]
    fn test_builtin_layouts_present() {
        let (_dir, renderer) = renderer_with(&[]);
        for layout in ["post", "page", "index", "archive", "tag"] {
            assert!(renderer.has_layout(layout), "missing {}", layout);
        }
        assert!(!renderer.has_layout("gallery"));
    }

    #[test]
    fn test_site_layout_added_and_overrides() {
        let (_dir, renderer) = renderer_with(&[
            ("gallery.html", "G:{{ page.title }}"),
            ("post.html", "P:{{ page.title }}"),
        ]);
        assert!(renderer.has_layout("gallery"));

        let mut context = Context::new();
        context.insert("page", &serde_yaml::from_str::<serde_yaml::Value>("title: T").unwrap());
        assert_eq!(renderer.render_layout("gallery", &context).unwrap(), "G:T");
        assert_eq!(renderer.render_layout("post", &context).unwrap(), "P:T");
    }

    #[test]
    fn test_site_layout_can_extend_base() {
        let (_dir, renderer) = renderer_with(&[(
            "note.html",
            "{% extends \"base.html\" %}{% block content %}NOTE{% endblock content %}",
        )]);
        let mut context = Context::new();
        let site = "title: S\ndescription: ''\nauthor: ''\nfeed_url: null\narchive_url: /archives/";
        context.insert("site", &serde_yaml::from_str::<serde_yaml::Value>(site).unwrap());
        let html = renderer.render_layout("note", &context).unwrap();
        assert!(html.contains("NOTE"));
        assert!(html.contains("<html"));
    }

    #[test]
    fn test_url_filters() {
        let (_dir, renderer) = renderer_with(&[(
            "urls.html",
            "{{ \"/about/\" | relative_url }} {{ \"/feed.xml\" | absolute_url }}",
        )]);
        let out = renderer.render_layout("urls", &Context::new()).unwrap();
        assert_eq!(out, "/blog/about/ https://me.github.io/blog/feed.xml");
    }

    #[test]
    fn test_date_and_text_filters() {
        let (_dir, renderer) = renderer_with(&[(
            "f.html",
            "{{ d | date_format(format=\"YYYY-MM-DD\") }}|{{ h | strip_html }}|{{ t | truncate_chars(length=8) }}",
        )]);
        let mut context = Context::new();
        context.insert("d", "2025-10-14T00:00:00+00:00");
        context.insert("h", "<p>Hi <em>there</em></p>");
        context.insert("t", "Hello World");
        let out = renderer.render_layout("f", &context).unwrap();
        assert_eq!(out, "2025-10-14|Hi there|Hello...");
    }

    #[test]
    fn test_date_format_with_literal_percent() {
        let (_dir, renderer) = renderer_with(&[(
            "pct.html",
            "{{ d | date_format(format=\"YYYY 100%\") }}",
        )]);
        let mut context = Context::new();
        context.insert("d", "2025-10-14T00:00:00+00:00");
        assert_eq!(renderer.render_layout("pct", &context).unwrap(), "2025 100%");
    }

    #[test]
    fn test_broken_site_layout_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.html"), "{% if %}").unwrap();
        assert!(TemplateRenderer::new(&SiteConfig::default(), dir.path()).is_err());
    }
}
