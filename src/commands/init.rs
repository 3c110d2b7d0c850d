//! Initialize a new site

use anyhow::{bail, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# Site settings
title: My Blog
description: ''
author: ''
# IANA zone for post dates without an offset, e.g. Europe/Berlin (empty = UTC)
timezone: ''

# URL
## For a project site served at https://user.github.io/blog set baseurl: /blog
url: http://localhost:4000
baseurl: ''
permalink: /:year/:month/:day/:slug/

# Directories
posts_dir: _posts
layouts_dir: _layouts
destination: _site
archive_dir: archives
tag_dir: tags
exclude: []

# Writing
default_layout: post
excerpt_separator: <!-- more -->
highlight:
  theme: base16-ocean.dark
  line_number: false

# Pagination
paginate: 10
paginate_path: page

# Atom feed
feed:
  enable: true
  path: feed.xml
  limit: 20
"#;

const SAMPLE_POST: &str = r#"Welcome to your new blog. This post lives in `_posts/`; its filename
gives its date and slug.

<!-- more -->

## Writing

```bash
quillpress new "My New Post"
```

## Previewing

```bash
quillpress serve
```

## Publishing

```bash
quillpress build
```

Then push the `_site/` directory to GitHub Pages.
"#;

/// Create the skeleton of a site in `target_dir`
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        bail!("{:?} already contains a site", target_dir);
    }

    fs::create_dir_all(target_dir.join("_posts"))?;
    fs::create_dir_all(target_dir.join("_layouts"))?;
    fs::write(&config_path, CONFIG_TEMPLATE)?;

    let gitignore = target_dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, "_site/\n")?;
    }

    let today = Utc::now().date_naive();
    let post = format!(
        "---\ntitle: Welcome\ndate: {}\ntags: [meta]\n---\n\n{}",
        today.format("%Y-%m-%d"),
        SAMPLE_POST
    );
    fs::write(
        target_dir
            .join("_posts")
            .join(format!("{}-welcome.md", today.format("%Y-%m-%d"))),
        post,
    )?;

    tracing::info!("Initialized site in {:?}", target_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Site;

    #[test]
    fn test_init_then_build() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("blog");
        init_site(&root).unwrap();

        assert!(root.join("_layouts").is_dir());
        assert_eq!(fs::read_to_string(root.join(".gitignore")).unwrap(), "_site/\n");

        let site = Site::new(&root).unwrap();
        assert_eq!(site.config.title, "My Blog");
        site.build(false).unwrap();
        assert!(site.dest_dir.join("index.html").exists());
        assert!(site.dest_dir.join("tags/meta/index.html").exists());
    }

    #[test]
    fn test_init_refuses_existing_site() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();
        assert!(init_site(dir.path()).is_err());
    }
}
