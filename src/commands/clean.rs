//! Clean the destination directory

use anyhow::Result;
use std::fs;

use crate::Site;

/// Delete the destination directory; there is no other build state
pub fn run(site: &Site) -> Result<()> {
    site.check_destination()?;

    if site.dest_dir.exists() {
        fs::remove_dir_all(&site.dest_dir)?;
        tracing::info!("Deleted: {:?}", site.dest_dir);
    } else {
        tracing::info!("Nothing to clean at {:?}", site.dest_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removes_destination_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("_site/a")).unwrap();
        fs::write(dir.path().join("_site/a/index.html"), "x").unwrap();
        fs::create_dir_all(dir.path().join("_posts")).unwrap();

        let site = Site::new(dir.path()).unwrap();
        run(&site).unwrap();
        assert!(!site.dest_dir.exists());
        assert!(site.posts_dir.exists());

        // Cleaning twice is fine
        run(&site).unwrap();
    }

    #[test]
    fn test_clean_refuses_destination_above_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        fs::create_dir_all(root.join("_posts")).unwrap();
        fs::write(dir.path().join("sibling.txt"), "keep").unwrap();

        fs::write(root.join("_config.yml"), "destination: ..\n").unwrap();
        assert!(Site::new(&root).is_err());

        fs::remove_file(root.join("_config.yml")).unwrap();
        let mut site = Site::new(&root).unwrap();
        site.dest_dir = root.join("..");
        assert!(run(&site).is_err());
        assert!(dir.path().join("sibling.txt").exists());
        assert!(site.posts_dir.exists());

        site.dest_dir = root.clone();
        assert!(run(&site).is_err());
        assert!(site.posts_dir.exists());
    }
}
