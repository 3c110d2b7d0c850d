//! Front-matter parsing

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use super::ContentError;
use crate::helpers::parse_date_string;

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            // Jekyll also accepts space separated tags in a single string
            Ok(value.split_whitespace().map(str::to_string).collect())
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Front-matter data from a post or page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub layout: Option<String>,
    pub date: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub categories: Vec<String>,
    pub published: bool,

    /// Additional custom fields, in source order
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            author: None,
            layout: None,
            date: None,
            tags: Vec::new(),
            categories: Vec::new(),
            published: true,
            extra: IndexMap::new(),
        }
    }
}

impl FrontMatter {
    /// Split content into front-matter and body.
    ///
    /// Content whose first line is `---` must contain a closing `---` (or
    /// `...`) line; otherwise the file is rejected rather than rendered with
    /// its metadata leaking into the body. Content that does not open a block
    /// has no front-matter.
    ///
    /// Errors carry an empty path; callers attach one with
    /// [`ContentError::with_path`].
    pub fn parse(content: &str) -> Result<(Self, &str), ContentError> {
        match Self::split(content)? {
            Some((yaml, body)) => Ok((Self::from_yaml(yaml)?, body)),
            None => Ok((FrontMatter::default(), strip_bom(content))),
        }
    }

    /// Whether the content opens a front-matter block
    pub fn is_present(content: &str) -> bool {
        opening_fence(strip_bom(content)).is_some()
    }

    /// Locate the YAML block and the body that follows it
    fn split(content: &str) -> Result<Option<(&str, &str)>, ContentError> {
        let content = strip_bom(content);
        let Some(rest) = opening_fence(content) else {
            return Ok(None);
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed == "---" || trimmed == "..." {
                let yaml = &rest[..offset];
                let body = &rest[offset + line.len()..];
                return Ok(Some((yaml, body)));
            }
            offset += line.len();
        }

        Err(ContentError::UnterminatedFrontMatter {
            path: PathBuf::new(),
        })
    }

    fn from_yaml(yaml: &str) -> Result<Self, ContentError> {
        if yaml.trim().is_empty() {
            return Ok(FrontMatter::default());
        }

        let malformed = |message: String| ContentError::MalformedFrontMatter {
            path: PathBuf::new(),
            message,
        };

        let value: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| malformed(e.to_string()))?;
        if !value.is_mapping() {
            return Err(malformed("expected a mapping of keys to values".to_string()));
        }
        serde_yaml::from_value(value).map_err(|e| malformed(e.to_string()))
    }

    /// Parse the `date` field, if present, in the given zone
    pub fn parse_date(&self, tz: Tz) -> Result<Option<DateTime<FixedOffset>>, ContentError> {
        match &self.date {
            None => Ok(None),
            Some(s) => parse_date_string(s, tz)
                .map(Some)
                .ok_or_else(|| ContentError::InvalidDate {
                    path: PathBuf::new(),
                    date: s.clone(),
                }),
        }
    }
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Returns the text after an opening `---` line
fn opening_fence(content: &str) -> Option<&str> {
    let (first, rest) = match content.find('\n') {
        Some(i) => (&content[..i], &content[i + 1..]),
        None => (content, ""),
    };
    if first.trim_end() == "---" {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: Hello World
date: 2024-01-15 10:30:00
tags:
  - rust
  - blog
categories:
  - programming
---

This is the content.
"#;

        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, Some("Hello World".to_string()));
        assert_eq!(fm.tags, vec!["rust", "blog"]);
        assert_eq!(fm.categories, vec!["programming"]);
        assert!(fm.published);
        assert!(remaining.contains("This is the content."));
        assert!(!remaining.contains("title:"));
    }

    #[test]
    fn test_single_string_tags() {
        let content = "---\ntags: notes rust\ncategories: Blog\n---\nbody\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.tags, vec!["notes", "rust"]);
        assert_eq!(fm.categories, vec!["Blog"]);
    }

    #[test]
    fn test_extra_fields_keep_order() {
        let content = "---\ntitle: T\nzeta: 1\nalpha: two\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        let keys: Vec<_> = fm.extra.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_no_frontmatter() {
        let content = "# Just markdown\n\nText.";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, None);
        assert_eq!(remaining, content);
        assert!(!FrontMatter::is_present(content));
    }

    #[test]
    fn test_empty_block() {
        let (fm, remaining) = FrontMatter::parse("---\n---\nBody").unwrap();
        assert_eq!(fm.title, None);
        assert_eq!(remaining, "Body");
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let content = "---\ntitle: Oops\n\nThe closing fence never comes.\n";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ContentError::UnterminatedFrontMatter { .. }));
    }

    #[test]
    fn test_lone_fence_is_error() {
        assert!(FrontMatter::parse("---").is_err());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let content = "---\ntitle: [unclosed\n---\nBody";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ContentError::MalformedFrontMatter { .. }));
    }

    #[test]
    fn test_non_mapping_yaml_is_error() {
        let content = "---\n- just\n- a list\n---\nBody";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ContentError::MalformedFrontMatter { .. }));
    }

    #[test]
    fn test_crlf_and_dots_terminator() {
        let content = "---\r\ntitle: Windows\r\n...\r\nBody";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Windows"));
        assert_eq!(remaining, "Body");
    }

    #[test]
    fn test_fence_inside_body_is_not_closing_of_later_block() {
        let content = "---\ntitle: A\n---\nIntro\n\n---\n\nAfter a rule.";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("A"));
        assert!(remaining.contains("After a rule."));
    }

    #[test]
    fn test_unpublished() {
        let (fm, _) = FrontMatter::parse("---\npublished: false\n---\n").unwrap();
        assert!(!fm.published);
    }

    #[test]
    fn test_parse_date() {
        let fm = FrontMatter {
            date: Some("2024-01-15 10:30:00".to_string()),
            ..Default::default()
        };

        let dt = fm.parse_date(Tz::UTC).unwrap().unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 10:30");
    }

    #[test]
    fn test_parse_bad_date() {
        let fm = FrontMatter {
            date: Some("next tuesday".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            fm.parse_date(Tz::UTC),
            Err(ContentError::InvalidDate { .. })
        ));
    }
}
