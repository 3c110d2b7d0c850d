//! Build the static site

use anyhow::Result;
use notify::Watcher;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::content::ContentLoader;
use crate::generator::Generator;
use crate::Site;

/// Build the whole site; `drafts` includes posts marked `published: false`
pub fn run(site: &Site, drafts: bool) -> Result<()> {
    let start = Instant::now();

    let loader = ContentLoader::new(site)?.with_unpublished(drafts);
    let posts = loader.load_posts()?;
    let pages = loader.load_pages()?;
    let static_files = loader.static_files()?;

    tracing::info!(
        "Loaded {} posts, {} pages and {} static files",
        posts.len(),
        pages.len(),
        static_files.len()
    );

    let generator = Generator::new(site)?;
    generator.generate(&posts, &pages, &static_files)?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {:?} in {:.2}s",
        site.dest_dir,
        duration.as_secs_f64()
    );

    Ok(())
}

/// Re-open the site (the config may have changed) and build it
pub fn rebuild(base_dir: &Path, drafts: bool) -> Result<Site> {
    let site = Site::new(base_dir)?;
    run(&site, drafts)?;
    Ok(site)
}

/// Whether a changed path should trigger a rebuild: anything in the site
/// except the output itself and hidden files such as `.git`
pub fn is_source_change(site: &Site, path: &Path) -> bool {
    if path.starts_with(&site.dest_dir) {
        return false;
    }
    let relative = path.strip_prefix(&site.base_dir).unwrap_or(path);
    !relative.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name.starts_with('.') || name == "node_modules" || name.ends_with('~')
    })
}

/// Watch the site and rebuild on every change. Blocks until the watcher
/// goes away.
pub fn watch(site: &Site, drafts: bool) -> Result<()> {
    let (tx, rx) = channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;
    watcher.watch(&site.base_dir, notify::RecursiveMode::Recursive)?;

    tracing::info!("Watching {:?} for changes. Press Ctrl+C to stop.", site.base_dir);

    let mut site = site.clone();
    let mut last_rebuild = Instant::now();

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                if !event.paths.iter().any(|p| is_source_change(&site, p)) {
                    continue;
                }
                // Debounce: editors emit bursts of events per save
                if last_rebuild.elapsed() > Duration::from_millis(500) {
                    tracing::info!("File changed, regenerating...");
                    match rebuild(&site.base_dir, drafts) {
                        Ok(updated) => site = updated,
                        Err(e) => tracing::error!("Generation failed: {:#}", e),
                    }
                    last_rebuild = Instant::now();
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
