//! Content diagnostics

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A problem with one source file or with the collection as a whole
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("{path:?}: post filenames must look like YYYY-MM-DD-slug.md")]
    InvalidFilename { path: PathBuf },

    #[error("{path:?}: invalid date {date:?}")]
    InvalidDate { path: PathBuf, date: String },

    #[error("{path:?}: front-matter opened with `---` is never closed")]
    UnterminatedFrontMatter { path: PathBuf },

    #[error("{path:?}: malformed front-matter: {message}")]
    MalformedFrontMatter { path: PathBuf, message: String },

    #[error("{path:?}: slug is empty after normalization")]
    EmptySlug { path: PathBuf },

    #[error("duplicate slug {slug:?} in {first:?} and {second:?}")]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{path:?}: permalink {permalink:?} must not contain `.` or `..` segments")]
    InvalidPermalink { path: PathBuf, permalink: String },

    #[error("{path:?}: layout {layout:?} not found")]
    LayoutNotFound { path: PathBuf, layout: String },

    #[error("output {output:?} is produced by both {first} and {second}")]
    OutputCollision {
        output: String,
        first: String,
        second: String,
    },

    #[error("{path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ContentError {
    /// Attach a path to an error raised while parsing text that had no path yet
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match self {
            ContentError::UnterminatedFrontMatter { .. } => {
                ContentError::UnterminatedFrontMatter { path }
            }
            ContentError::MalformedFrontMatter { message, .. } => {
                ContentError::MalformedFrontMatter { path, message }
            }
            ContentError::InvalidDate { date, .. } => ContentError::InvalidDate { path, date },
            other => other,
        }
    }
}

/// Every diagnostic collected during one load
#[derive(Debug)]
pub struct BuildErrors(pub Vec<ContentError>);

impl BuildErrors {
    pub fn errors(&self) -> &[ContentError] {
        &self.0
    }
}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.len();
        write!(
            f,
            "build failed with {} error{}",
            count,
            if count == 1 { "" } else { "s" }
        )?;
        for err in &self.0 {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_path_fills_in_location() {
        let err = ContentError::UnterminatedFrontMatter {
            path: PathBuf::new(),
        }
        .with_path("_posts/2025-10-14-a.md");
        assert!(err.to_string().contains("2025-10-14-a.md"));
    }

    #[test]
    fn test_build_errors_display_lists_each() {
        let errors = BuildErrors(vec![
            ContentError::EmptySlug {
                path: PathBuf::from("_posts/2025-01-01-!!.md"),
            },
            ContentError::InvalidFilename {
                path: PathBuf::from("_posts/notes.md"),
            },
        ]);
        let text = errors.to_string();
        assert!(text.starts_with("build failed with 2 errors"));
        assert!(text.contains("notes.md"));
        assert!(text.contains("!!.md"));
    }
}
