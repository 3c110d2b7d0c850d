//! Content module - handles posts, pages, and content processing

mod error;
mod filename;
mod frontmatter;
pub mod loader;
mod markdown;
mod post;

pub use error::{BuildErrors, ContentError};
pub use filename::{parse_post_filename, title_from_slug, PostFilename};
pub use frontmatter::FrontMatter;
pub use loader::ContentLoader;
pub use markdown::MarkdownRenderer;
pub use post::{Page, Post};
