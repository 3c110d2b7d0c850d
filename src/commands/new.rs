//! Create a new post

use anyhow::{anyhow, bail, Result};
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::content::loader::{is_hidden, is_markdown_file};
use crate::content::parse_post_filename;
use crate::Site;

/// Create `_posts/<date>-<slug>.md` with a front-matter scaffold.
///
/// `date` is `YYYY-MM-DD`; without it the post is stamped with the current
/// time in the site's time zone.
pub fn run(site: &Site, title: &str, date: Option<&str>) -> Result<PathBuf> {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        bail!("Title {:?} does not produce a usable slug", title);
    }

    let (day, stamp) = match date {
        Some(date) => {
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| anyhow!("Invalid date {:?} (expected YYYY-MM-DD): {}", date, e))?;
            (day, day.format("%Y-%m-%d").to_string())
        }
        None => {
            let now = Utc::now().with_timezone(&site.config.tz()?);
            (
                now.date_naive(),
                now.format("%Y-%m-%d %H:%M:%S %z").to_string(),
            )
        }
    };

    if let Some(existing) = find_slug(site, &slug)? {
        bail!("A post with slug {:?} already exists: {:?}", slug, existing);
    }

    let file_path = site
        .posts_dir
        .join(format!("{}-{}.md", day.format("%Y-%m-%d"), slug));
    if file_path.exists() {
        bail!("File already exists: {:?}", file_path);
    }

    let mut front_matter: IndexMap<&str, serde_yaml::Value> = IndexMap::new();
    front_matter.insert("title", title.into());
    front_matter.insert("date", stamp.into());
    front_matter.insert("tags", serde_yaml::Value::Sequence(Vec::new()));
    let content = format!("---\n{}---\n\n", serde_yaml::to_string(&front_matter)?);

    fs::create_dir_all(&site.posts_dir)?;
    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}

/// An existing post file whose slug matches, searching `_posts/` the same
/// way the loader does
fn find_slug(site: &Site, slug: &str) -> Result<Option<PathBuf>> {
    if !site.posts_dir.exists() {
        return Ok(None);
    }
    for entry in WalkDir::new(&site.posts_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_markdown_file(path) {
            continue;
        }
        if let Ok(name) = parse_post_filename(path) {
            if name.slug == slug {
                return Ok(Some(path.to_path_buf()));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FrontMatter;

    fn empty_site() -> (tempfile::TempDir, Site) {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    #[test]
    fn test_new_post_with_date() {
        let (_dir, site) = empty_site();
        let path = run(&site, "Hello: \"World\"", Some("2025-10-14")).unwrap();
        assert_eq!(path, site.posts_dir.join("2025-10-14-hello-world.md"));

        let text = fs::read_to_string(&path).unwrap();
        let (fm, body) = FrontMatter::parse(&text).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Hello: \"World\""));
        assert_eq!(fm.date.as_deref(), Some("2025-10-14"));
        assert!(fm.tags.is_empty());
        assert_eq!(body.trim(), "");
    }

    #[test]
    fn test_new_post_defaults_to_today() {
        let (_dir, site) = empty_site();
        let path = run(&site, "Today", None).unwrap();
        let name = parse_post_filename(&path).unwrap();
        assert_eq!(name.slug, "today");
    }

    #[test]
    fn test_refuses_existing_slug() {
        let (_dir, site) = empty_site();
        run(&site, "Same", Some("2025-10-14")).unwrap();
        assert!(run(&site, "Same", Some("2025-10-14")).is_err());
        assert!(run(&site, "same", Some("2025-10-15")).is_err());
    }

    #[test]
    fn test_rejects_bad_input() {
        let (_dir, site) = empty_site();
        assert!(run(&site, "!!!", Some("2025-10-14")).is_err());
        assert!(run(&site, "Fine", Some("2025-02-30")).is_err());
        assert!(run(&site, "Fine", Some("14/10/2025")).is_err());
    }

    #[test]
    fn test_refuses_slug_of_nested_post() {
        let (_dir, site) = empty_site();
        let nested = site.posts_dir.join("2024");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("2024-01-01-same.md"), "old").unwrap();

        let err = run(&site, "Same", Some("2025-10-14")).unwrap_err();
        assert!(err.to_string().contains("2024-01-01-same.md"));
        assert!(!site.posts_dir.join("2025-10-14-same.md").exists());

        // Hidden directories are not posts
        fs::create_dir_all(site.posts_dir.join(".trash")).unwrap();
        fs::write(site.posts_dir.join(".trash/2023-01-01-gone.md"), "x").unwrap();
        assert!(run(&site, "Gone", Some("2025-10-14")).is_ok());
    }
}
