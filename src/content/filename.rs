//! Post filename parsing (`YYYY-MM-DD-slug.md`)

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

use super::ContentError;

lazy_static! {
    static ref POST_FILENAME: Regex =
        Regex::new(r"^(\d{4}-\d{2}-\d{2})-(.+)\.(?:md|markdown)$").unwrap();
}

/// Date and slug encoded in a post's filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilename {
    pub date: NaiveDate,
    pub slug: String,
}

/// Split a post filename into its date and slug
pub fn parse_post_filename(path: &Path) -> Result<PostFilename, ContentError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ContentError::InvalidFilename {
            path: path.to_path_buf(),
        })?;

    let caps = POST_FILENAME
        .captures(name)
        .ok_or_else(|| ContentError::InvalidFilename {
            path: path.to_path_buf(),
        })?;

    let date_str = &caps[1];
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
        ContentError::InvalidDate {
            path: path.to_path_buf(),
            date: date_str.to_string(),
        }
    })?;

    let slug = slug::slugify(&caps[2]);
    if slug.is_empty() {
        return Err(ContentError::EmptySlug {
            path: path.to_path_buf(),
        });
    }

    Ok(PostFilename { date, slug })
}

/// Default title for a post without one: `hello-world` -> `Hello World`
pub fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_filename() {
        let parsed = parse_post_filename(Path::new("_posts/2025-10-14-hello-world.md")).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 10, 14).unwrap());
        assert_eq!(parsed.slug, "hello-world");
    }

    #[test]
    fn test_markdown_extension() {
        let parsed = parse_post_filename(Path::new("2024-02-29-leap.markdown")).unwrap();
        assert_eq!(parsed.slug, "leap");
    }

    #[test]
    fn test_slug_is_normalized() {
        let parsed = parse_post_filename(Path::new("2025-01-02-Rust_And Friends.md")).unwrap();
        assert_eq!(parsed.slug, "rust-and-friends");
    }

    #[test]
    fn test_missing_date_prefix() {
        let err = parse_post_filename(Path::new("_posts/hello.md")).unwrap_err();
        assert!(matches!(err, ContentError::InvalidFilename { .. }));
    }

    #[test]
    fn test_impossible_date() {
        let err = parse_post_filename(Path::new("2025-02-30-nope.md")).unwrap_err();
        assert!(matches!(err, ContentError::InvalidDate { ref date, .. } if date == "2025-02-30"));
    }

    #[test]
    fn test_empty_slug() {
        let err = parse_post_filename(Path::new("2025-01-01-!!!.md")).unwrap_err();
        assert!(matches!(err, ContentError::EmptySlug { .. }));
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(title_from_slug("hello-world"), "Hello World");
        assert_eq!(title_from_slug("a"), "A");
    }
}
