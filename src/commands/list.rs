//! List site posts

use anyhow::Result;
use std::io::Write;

use crate::content::{ContentLoader, Post};
use crate::Site;

/// Print every post, newest first, as `date  slug  url`
pub fn run(site: &Site, drafts: bool) -> Result<()> {
    let loader = ContentLoader::new(site)?.with_unpublished(drafts);
    let posts = loader.load_posts()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_posts(&mut out, &posts)?;

    Ok(())
}

fn write_posts<W: Write>(out: &mut W, posts: &[Post]) -> std::io::Result<()> {
    let width = posts.iter().map(|p| p.slug.len()).max().unwrap_or(0);
    for post in posts {
        writeln!(
            out,
            "{}  {:width$}  {}",
            post.date.format("%Y-%m-%d"),
            post.slug,
            post.url,
            width = width
        )?;
    }
    Ok(())
}
