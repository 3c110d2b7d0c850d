//! Generator module - renders the site and writes the static tree
//!
//! Every output is rendered in memory first. Nothing touches the destination
//! until all layouts resolve, every template renders and no two outputs claim
//! the same file, so a failed build never leaves a half-written site.

use anyhow::{Context as _, Result};
use chrono::Datelike;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;

use crate::content::{BuildErrors, ContentError, Page, Post};
use crate::helpers::{
    absolutize_urls, date_xml, escape_xml, full_url_for, normalize_path, output_path_for_url,
    strip_html, strip_invalid_xml_chars, truncate,
};
use crate::templates::{
    ArchiveYearData, NavPost, PageData, PaginatorData, PostData, SiteData, TagData, TagLink,
    TagSummary, TemplateRenderer,
};
use crate::Site;

/// Atom `updated` for a site without posts
const EMPTY_FEED_UPDATED: &str = "1970-01-01T00:00:00+00:00";

/// One file to be written, relative to the destination
#[derive(Debug)]
struct Rendered {
    path: PathBuf,
    /// What produced it, for collision diagnostics
    origin: String,
    contents: String,
}

/// A tag with the posts carrying it, keyed by slug
struct TagGroup<'a> {
    name: String,
    posts: Vec<&'a Post>,
}

/// Static site generator using Tera templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let renderer = TemplateRenderer::new(&site.config, &site.layouts_dir)?;

        Ok(Self {
            site: site.clone(),
            renderer,
        })
    }

    /// Generate the entire site.
    ///
    /// `posts` must be newest first, as returned by the content loader.
    pub fn generate(&self, posts: &[Post], pages: &[Page], static_files: &[PathBuf]) -> Result<()> {
        self.site.check_destination()?;
        self.check_layouts(posts, pages)?;

        let tags = group_tags(posts);
        let site_data = self.build_site_data(posts, &tags);

        let mut outputs = Vec::new();
        outputs.extend(self.render_posts(posts, &site_data)?);
        outputs.extend(self.render_index_pages(posts, &site_data)?);
        outputs.push(self.render_archive(posts, &site_data)?);
        outputs.extend(self.render_tag_pages(&tags, &site_data)?);
        if self.site.config.feed.enable {
            outputs.push(self.render_feed(posts));
        }
        outputs.extend(self.render_pages(pages, &site_data)?);

        let statics: Vec<(PathBuf, &Path)> = static_files
            .iter()
            .map(|p| {
                let relative = p.strip_prefix(&self.site.base_dir).unwrap_or(p);
                (relative.to_path_buf(), p.as_path())
            })
            .collect();

        check_collisions(&outputs, &statics)?;

        self.reset_destination()?;

        for (relative, source) in &statics {
            let dest = self.site.dest_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, &dest)
                .with_context(|| format!("Failed to copy {:?} to {:?}", source, dest))?;
            tracing::debug!("Copied: {:?}", dest);
        }
        tracing::info!("Copied {} static file(s)", statics.len());

        for output in &outputs {
            let dest = self.site.dest_dir.join(&output.path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create dir {:?}", parent))?;
            }
            fs::write(&dest, &output.contents)
                .with_context(|| format!("Failed to write {:?}", dest))?;
            tracing::debug!("Generated: {:?}", dest);
        }
        tracing::info!(
            "Wrote {} page(s) for {} post(s) and {} page source(s)",
            outputs.len(),
            posts.len(),
            pages.len()
        );

        Ok(())
    }

    fn check_layouts(&self, posts: &[Post], pages: &[Page]) -> Result<()> {
        let mut errors = Vec::new();
        let sources = posts
            .iter()
            .map(|p| (&p.full_source, &p.layout))
            .chain(pages.iter().map(|p| (&p.full_source, &p.layout)));
        for (path, layout) in sources {
            if !self.renderer.has_layout(layout) {
                errors.push(ContentError::LayoutNotFound {
                    path: path.clone(),
                    layout: layout.clone(),
                });
            }
        }

        if !errors.is_empty() {
            return Err(anyhow::Error::new(BuildErrors(errors)));
        }
        Ok(())
    }

    fn reset_destination(&self) -> Result<()> {
        let dest = &self.site.dest_dir;
        if dest.exists() {
            fs::remove_dir_all(dest).with_context(|| format!("Failed to remove {:?}", dest))?;
        }
        fs::create_dir_all(dest).with_context(|| format!("Failed to create {:?}", dest))?;
        Ok(())
    }

    /// Build site data for templates
    fn build_site_data(&self, posts: &[Post], tags: &BTreeMap<String, TagGroup>) -> SiteData {
        let config = &self.site.config;

        SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            url: config.url.clone(),
            baseurl: config.base_path(),
            feed_url: if config.feed.enable {
                Some(self.feed_url())
            } else {
                None
            },
            archive_url: self.archive_url(),
            posts: posts.iter().map(|p| self.post_data(p, false)).collect(),
            tags: tags
                .iter()
                .map(|(slug, group)| TagSummary {
                    name: group.name.clone(),
                    url: self.tag_url(slug),
                    count: group.posts.len(),
                })
                .collect(),
            extra: config.extra.clone(),
        }
    }

    /// Template view of a post; listings leave out the body
    fn post_data(&self, post: &Post, with_content: bool) -> PostData {
        PostData {
            title: post.title.clone(),
            date: post.date.to_rfc3339(),
            url: post.url.clone(),
            permalink: post.permalink.clone(),
            slug: post.slug.clone(),
            description: post.description.clone(),
            author: post.author.clone(),
            tags: post
                .tags
                .iter()
                .filter_map(|name| {
                    let slug = slug::slugify(name);
                    if slug.is_empty() {
                        None
                    } else {
                        Some(TagLink {
                            name: name.clone(),
                            url: self.tag_url(&slug),
                        })
                    }
                })
                .collect(),
            categories: post.categories.clone(),
            content: if with_content {
                post.content.clone()
            } else {
                String::new()
            },
            excerpt: post.excerpt.clone(),
            extra: post.extra.clone(),
        }
    }

    /// Create a base context with common variables
    fn create_base_context(&self, site_data: &SiteData) -> Context {
        let mut context = Context::new();
        context.insert("site", site_data);
        context
    }

    /// One page per post, with links to its neighbours
    fn render_posts(&self, posts: &[Post], site_data: &SiteData) -> Result<Vec<Rendered>> {
        let mut outputs = Vec::with_capacity(posts.len());

        for post in posts {
            let nav = |p: &Post| NavPost {
                title: p.title.clone(),
                url: p.url.clone(),
            };

            let mut context = self.create_base_context(site_data);
            context.insert("page", &self.post_data(post, true));
            context.insert("page_title", &post.title);
            if let Some(description) = page_description(post) {
                context.insert("page_description", &description);
            }
            context.insert("newer", &post.newer(posts).map(nav));
            context.insert("older", &post.older(posts).map(nav));

            let html = self
                .renderer
                .render_layout(&post.layout, &context)
                .with_context(|| format!("Failed to render {}", post.source))?;

            outputs.push(Rendered {
                path: output_path_for_url(&post.url),
                origin: post.source.clone(),
                contents: html,
            });
        }

        Ok(outputs)
    }

    /// Index pages with pagination
    fn render_index_pages(&self, posts: &[Post], site_data: &SiteData) -> Result<Vec<Rendered>> {
        let per_page = self.site.config.paginate;
        // An empty blog still gets a front page
        let total_pages = posts.len().div_ceil(per_page).max(1);
        let mut outputs = Vec::with_capacity(total_pages);

        for page_num in 1..=total_pages {
            let start = ((page_num - 1) * per_page).min(posts.len());
            let end = (start + per_page).min(posts.len());

            let paginator = PaginatorData {
                page: page_num,
                per_page,
                total_pages,
                total_posts: posts.len(),
                posts: posts[start..end]
                    .iter()
                    .map(|p| self.post_data(p, false))
                    .collect(),
                previous_page_url: if page_num > 1 {
                    Some(self.index_url(page_num - 1))
                } else {
                    None
                },
                next_page_url: if page_num < total_pages {
                    Some(self.index_url(page_num + 1))
                } else {
                    None
                },
            };

            let mut context = self.create_base_context(site_data);
            context.insert("paginator", &paginator);
            if page_num > 1 {
                context.insert(
                    "page_title",
                    &format!("{} - Page {}", self.site.config.title, page_num),
                );
            }

            let html = self.renderer.render_layout("index", &context)?;
            outputs.push(Rendered {
                path: output_path_for_url(&self.index_url(page_num)),
                origin: format!("index page {}", page_num),
                contents: html,
            });
        }

        Ok(outputs)
    }

    /// Archive page, grouped by year, newest first
    fn render_archive(&self, posts: &[Post], site_data: &SiteData) -> Result<Rendered> {
        let mut years_map: BTreeMap<i32, Vec<PostData>> = BTreeMap::new();
        for post in posts {
            years_map
                .entry(post.date.year())
                .or_default()
                .push(self.post_data(post, false));
        }

        let years: Vec<ArchiveYearData> = years_map
            .into_iter()
            .rev()
            .map(|(year, posts)| ArchiveYearData { year, posts })
            .collect();

        let mut context = self.create_base_context(site_data);
        context.insert("years", &years);
        context.insert("page_title", "Archives");

        let html = self.renderer.render_layout("archive", &context)?;
        Ok(Rendered {
            path: output_path_for_url(&self.archive_url()),
            origin: "archive".to_string(),
            contents: html,
        })
    }

    fn render_tag_pages(
        &self,
        tags: &BTreeMap<String, TagGroup>,
        site_data: &SiteData,
    ) -> Result<Vec<Rendered>> {
        let mut outputs = Vec::with_capacity(tags.len());

        for (slug, group) in tags {
            let url = self.tag_url(slug);
            let tag = TagData {
                name: group.name.clone(),
                url: url.clone(),
                posts: group
                    .posts
                    .iter()
                    .map(|p| self.post_data(p, false))
                    .collect(),
            };

            let mut context = self.create_base_context(site_data);
            context.insert("tag", &tag);
            context.insert("page_title", &format!("Tag: {}", group.name));

            let html = self.renderer.render_layout("tag", &context)?;
            outputs.push(Rendered {
                path: output_path_for_url(&url),
                origin: format!("tag {:?}", group.name),
                contents: html,
            });
        }

        tracing::info!("Rendered {} tag page(s)", outputs.len());
        Ok(outputs)
    }

    /// Atom feed of the newest posts
    fn render_feed(&self, posts: &[Post]) -> Rendered {
        let config = &self.site.config;
        let host = config.url.trim_end_matches('/');
        let home = full_url_for(config, "/");
        let updated = posts
            .first()
            .map(|p| date_xml(&p.date))
            .unwrap_or_else(|| EMPTY_FEED_UPDATED.to_string());

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        if !config.description.is_empty() {
            feed.push_str(&format!(
                "  <subtitle>{}</subtitle>\n",
                escape_xml(&config.description)
            ));
        }
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            escape_xml(&full_url_for(config, &self.feed_url()))
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", escape_xml(&home)));
        feed.push_str(&format!("  <updated>{}</updated>\n", updated));
        feed.push_str(&format!("  <id>{}</id>\n", escape_xml(&home)));
        if !config.author.is_empty() {
            feed.push_str(&format!(
                "  <author><name>{}</name></author>\n",
                escape_xml(&config.author)
            ));
        }

        for post in posts.iter().take(config.feed.limit) {
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!(
                "    <link href=\"{}\"/>\n",
                escape_xml(&post.permalink)
            ));
            feed.push_str(&format!("    <id>{}</id>\n", escape_xml(&post.permalink)));
            feed.push_str(&format!(
                "    <published>{}</published>\n",
                date_xml(&post.date)
            ));
            feed.push_str(&format!("    <updated>{}</updated>\n", date_xml(&post.date)));
            if !post.author.is_empty() && post.author != config.author {
                feed.push_str(&format!(
                    "    <author><name>{}</name></author>\n",
                    escape_xml(&post.author)
                ));
            }
            for tag in &post.tags {
                feed.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(tag)));
            }
            if let Some(description) = &post.description {
                feed.push_str(&format!(
                    "    <summary>{}</summary>\n",
                    escape_xml(description)
                ));
            }
            let content = strip_invalid_xml_chars(&absolutize_urls(&post.content, host));
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                content.replace("]]>", "]]]]><![CDATA[>")
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        Rendered {
            path: output_path_for_url(&self.feed_url()),
            origin: "feed".to_string(),
            contents: feed,
        }
    }

    /// Standalone pages
    fn render_pages(&self, pages: &[Page], site_data: &SiteData) -> Result<Vec<Rendered>> {
        let mut outputs = Vec::with_capacity(pages.len());

        for page in pages {
            let data = PageData {
                title: page.title.clone(),
                url: page.url.clone(),
                permalink: page.permalink.clone(),
                description: page.description.clone(),
                content: page.content.clone(),
                extra: page.extra.clone(),
            };

            let mut context = self.create_base_context(site_data);
            context.insert("page", &data);
            context.insert("page_title", &page.title);
            if let Some(description) = &page.description {
                context.insert("page_description", description);
            }

            let html = self
                .renderer
                .render_layout(&page.layout, &context)
                .with_context(|| format!("Failed to render {}", page.source))?;

            outputs.push(Rendered {
                path: output_path_for_url(&page.url),
                origin: page.source.clone(),
                contents: html,
            });
        }

        Ok(outputs)
    }

    /// `/` for the first page, `/<paginate_path>/N/` after that
    fn index_url(&self, page_num: usize) -> String {
        if page_num <= 1 {
            "/".to_string()
        } else {
            normalize_path(&format!(
                "/{}/{}/",
                self.site.config.paginate_path, page_num
            ))
        }
    }

    fn archive_url(&self) -> String {
        normalize_path(&format!("/{}/", self.site.config.archive_dir))
    }

    fn tag_url(&self, slug: &str) -> String {
        normalize_path(&format!("/{}/{}/", self.site.config.tag_dir, slug))
    }

    fn feed_url(&self) -> String {
        normalize_path(&self.site.config.feed.path)
    }
}

/// Posts grouped by tag slug; the first spelling seen names the tag
fn group_tags(posts: &[Post]) -> BTreeMap<String, TagGroup<'_>> {
    let mut tags: BTreeMap<String, TagGroup> = BTreeMap::new();

    for post in posts {
        for name in &post.tags {
            let slug = slug::slugify(name);
            if slug.is_empty() {
                continue;
            }
            let group = tags.entry(slug).or_insert_with(|| TagGroup {
                name: name.clone(),
                posts: Vec::new(),
            });
            // The same tag twice on one post
            if !group.posts.iter().any(|p| p.source == post.source) {
                group.posts.push(post);
            }
        }
    }

    tags
}

/// Front-matter description, else the excerpt as plain text
fn page_description(post: &Post) -> Option<String> {
    if let Some(description) = &post.description {
        return Some(description.clone());
    }
    let text = strip_html(&post.excerpt);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(truncate(&text, 160, None))
    }
}

/// Fail if two outputs, or an output and a static file, share a path
fn check_collisions(outputs: &[Rendered], statics: &[(PathBuf, &Path)]) -> Result<()> {
    let mut seen: HashMap<&Path, String> = HashMap::new();
    let mut errors = Vec::new();

    let claims = statics
        .iter()
        .map(|(relative, _)| (relative.as_path(), relative.to_string_lossy().replace('\\', "/")))
        .chain(outputs.iter().map(|o| (o.path.as_path(), o.origin.clone())));

    for (path, origin) in claims {
        match seen.get(path) {
            Some(first) => errors.push(ContentError::OutputCollision {
                output: path.to_string_lossy().replace('\\', "/"),
                first: first.clone(),
                second: origin,
            }),
            None => {
                seen.insert(path, origin);
            }
        }
    }

    if !errors.is_empty() {
        return Err(anyhow::Error::new(BuildErrors(errors)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentLoader;

    fn write_site(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        dir
    }

    fn build(site: &Site) -> Result<()> {
        let loader = ContentLoader::new(site)?;
        let posts = loader.load_posts()?;
        let pages = loader.load_pages()?;
        let statics = loader.static_files()?;
        Generator::new(site)?.generate(&posts, &pages, &statics)
    }

    fn read(site: &Site, path: &str) -> String {
        fs::read_to_string(site.dest_dir.join(path)).unwrap()
    }

    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(dir).unwrap().to_path_buf();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    fn collision_count(err: &anyhow::Error) -> usize {
        err.downcast_ref::<BuildErrors>()
            .expect("expected BuildErrors")
            .errors()
            .iter()
            .filter(|e| matches!(e, ContentError::OutputCollision { .. }))
            .count()
    }

    #[test]
    fn test_posts_and_index_order() {
        let dir = write_site(&[
            ("_posts/2025-10-14-a.md", "---\ntitle: Post A\n---\nAlpha."),
            ("_posts/2025-10-15-b.md", "---\ntitle: Post B\n---\nBravo."),
        ]);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();

        let a = read(&site, "2025/10/14/a/index.html");
        let b = read(&site, "2025/10/15/b/index.html");
        assert!(a.contains("Alpha."));
        assert!(b.contains("Bravo."));

        let index = read(&site, "index.html");
        let pos_a = index.find("/2025/10/14/a/").unwrap();
        let pos_b = index.find("/2025/10/15/b/").unwrap();
        assert!(pos_b < pos_a, "newer post must come first");

        // b is newer, so a links forward to it
        assert!(a.contains("class=\"newer\" rel=\"next\" href=\"/2025/10/15/b/\""));
        assert!(!b.contains("class=\"newer\""));
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let dir = write_site(&[
            ("_config.yml", "title: Notes\nauthor: Ada\n"),
            (
                "_posts/2025-10-14-a.md",
                "---\ntags: [rust, web]\n---\nHello\n\n```rust\nfn main() {}\n```\n",
            ),
            ("_posts/2025-10-15-b.md", "---\ntags: rust\n---\nWorld"),
            ("about.md", "---\ntitle: About\n---\nMe."),
            ("css/site.css", "body {}"),
        ]);
        let site = Site::new(dir.path()).unwrap();

        build(&site).unwrap();
        let first = snapshot(&site.dest_dir);
        fs::write(site.dest_dir.join("stale.html"), "old").unwrap();
        build(&site).unwrap();
        let second = snapshot(&site.dest_dir);

        assert_eq!(first, second);
        assert!(first.contains_key(Path::new("feed.xml")));
        assert!(first.contains_key(Path::new("css/site.css")));
    }

    #[test]
    fn test_pagination() {
        let files: Vec<(String, String)> = (1..=5)
            .map(|d| (format!("_posts/2025-01-0{}-p{}.md", d, d), "x".to_string()))
            .collect();
        let mut files: Vec<(&str, &str)> =
            files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
        files.push(("_config.yml", "paginate: 2\n"));
        let dir = write_site(&files);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();

        let first = read(&site, "index.html");
        assert!(first.contains("/2025/01/05/p5/"));
        assert!(first.contains("/2025/01/04/p4/"));
        assert!(!first.contains("/2025/01/03/p3/"));
        assert!(first.contains("href=\"/page/2/\""));

        let second = read(&site, "page/2/index.html");
        assert!(second.contains("/2025/01/03/p3/"));
        assert!(second.contains("rel=\"prev\" href=\"/\""));

        let last = read(&site, "page/3/index.html");
        assert!(last.contains("/2025/01/01/p1/"));
        assert!(!site.dest_dir.join("page/4").exists());
    }

    #[test]
    fn test_empty_site_has_index_and_feed() {
        let dir = write_site(&[]);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();
        assert!(read(&site, "index.html").contains("<html"));
        assert!(read(&site, "feed.xml").contains(EMPTY_FEED_UPDATED));
    }

    #[test]
    fn test_archive_and_tags() {
        let dir = write_site(&[
            ("_posts/2024-12-31-old.md", "---\ntags: [Rust]\n---\n"),
            ("_posts/2025-01-01-new.md", "---\ntags: [rust, Static Sites]\n---\n"),
        ]);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();

        let archive = read(&site, "archives/index.html");
        let pos_2025 = archive.find("<h2>2025</h2>").unwrap();
        let pos_2024 = archive.find("<h2>2024</h2>").unwrap();
        assert!(pos_2025 < pos_2024);

        // "Rust" and "rust" share a slug, named by the newest post's spelling
        let rust = read(&site, "tags/rust/index.html");
        assert!(rust.contains("&ldquo;rust&rdquo;"));
        assert!(rust.contains("/2024/12/31/old/"));
        assert!(rust.contains("/2025/01/01/new/"));
        assert!(site.dest_dir.join("tags/static-sites/index.html").exists());
    }

    #[test]
    fn test_feed() {
        let dir = write_site(&[
            (
                "_config.yml",
                "title: A & B\nurl: https://me.github.io\nbaseurl: /blog\nfeed:\n  limit: 1\n",
            ),
            ("_posts/2025-10-14-a.md", "Old [link](/about/)"),
            (
                "_posts/2025-10-15-b.md",
                "---\ndate: 2025-10-15 08:00:00 +0200\n---\nSee ![i](/img/x.png)",
            ),
        ]);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();

        let feed = read(&site, "feed.xml");
        assert!(feed.contains("<title>A &amp; B</title>"));
        assert!(feed.contains("<updated>2025-10-15T08:00:00+02:00</updated>"));
        assert!(feed.contains("<id>https://me.github.io/blog/2025/10/15/b/</id>"));
        assert!(feed.contains("src=\"https://me.github.io/img/x.png\""));
        assert!(!feed.contains("/2025/10/14/a/"));
        assert!(feed.contains("href=\"https://me.github.io/blog/feed.xml\" rel=\"self\""));
    }

    #[test]
    fn test_feed_disabled() {
        let dir = write_site(&[("_config.yml", "feed:\n  enable: false\n")]);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();
        assert!(!site.dest_dir.join("feed.xml").exists());
        assert!(!read(&site, "index.html").contains("application/atom+xml"));
    }

    #[test]
    fn test_baseurl_in_links() {
        let dir = write_site(&[
            ("_config.yml", "baseurl: /blog\n"),
            ("_posts/2025-10-14-a.md", "---\ntags: x\n---\n"),
        ]);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();

        let index = read(&site, "index.html");
        assert!(index.contains("href=\"/blog/2025/10/14/a/\""));
        assert!(index.contains("href=\"/blog/archives/\""));
        let post = read(&site, "2025/10/14/a/index.html");
        assert!(post.contains("href=\"/blog/tags/x/\""));
    }

    #[test]
    fn test_unknown_layout_fails_before_writing() {
        let dir = write_site(&[("_posts/2025-10-14-a.md", "---\nlayout: gallery\n---\n")]);
        let site = Site::new(dir.path()).unwrap();
        let err = build(&site).unwrap_err();
        let errors = err.downcast_ref::<BuildErrors>().unwrap().errors();
        assert!(matches!(
            errors[0],
            ContentError::LayoutNotFound { ref layout, .. } if layout == "gallery"
        ));
        assert!(!site.dest_dir.exists());
    }

    #[test]
    fn test_site_layout_used() {
        let dir = write_site(&[
            ("_layouts/gallery.html", "GALLERY {{ page.title }}"),
            ("_posts/2025-10-14-a.md", "---\nlayout: gallery\ntitle: Pics\n---\n"),
        ]);
        let site = Site::new(dir.path()).unwrap();
        build(&site).unwrap();
        assert_eq!(read(&site, "2025/10/14/a/index.html"), "GALLERY Pics");
    }

    #[test]
    fn test_collisions_fail_before_writing() {
        let dir = write_site(&[
            ("index.md", "---\ntitle: Home\n---\n"),
            ("feed.xml", "<feed/>"),
            ("_posts/2025-10-14-a.md", "a"),
        ]);
        let site = Site::new(dir.path()).unwrap();
        fs::create_dir_all(&site.dest_dir).unwrap();
        fs::write(site.dest_dir.join("keep.txt"), "x").unwrap();

        let err = build(&site).unwrap_err();
        assert_eq!(collision_count(&err), 2);
        assert!(site.dest_dir.join("keep.txt").exists());
    }

    #[test]
    fn test_permalink_collision() {
        let dir = write_site(&[
            ("_config.yml", "permalink: /:year/:month/\n"),
            ("_posts/2025-10-14-a.md", "a"),
            ("_posts/2025-10-15-b.md", "b"),
        ]);
        let site = Site::new(dir.path()).unwrap();
        let err = build(&site).unwrap_err();
        assert_eq!(collision_count(&err), 1);
    }

    #[test]
    fn test_destination_must_not_contain_root() {
        let dir = write_site(&[("_posts/2025-10-14-a.md", "a")]);
        let mut site = Site::new(dir.path()).unwrap();
        site.dest_dir = dir.path().join("_site").join("..");
        let err = build(&site).unwrap_err();
        assert!(err.to_string().contains("Refusing"));
        assert!(dir.path().join("_posts/2025-10-14-a.md").exists());
    }

    #[test]
    fn test_page_permalink_outside_destination_fails() {
        let dir = write_site(&[("evil.md", "---\npermalink: /../../escaped/\n---\nx")]);
        let site = Site::new(dir.path()).unwrap();
        let err = build(&site).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildErrors>().unwrap().errors()[0],
            ContentError::InvalidPermalink { .. }
        ));
        assert!(!site.dest_dir.exists());
    }
}
