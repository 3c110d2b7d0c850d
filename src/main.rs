//! CLI entry point for quillpress

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quillpress::commands;
use quillpress::server::{self, ServeOptions};
use quillpress::Site;

#[derive(Parser)]
#[command(name = "quillpress")]
#[command(version)]
#[command(about = "A static blog generator for GitHub Pages style sites", long_about = None)]
struct Cli {
    /// Set the site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to the site directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post in _posts/
    New {
        /// Title of the new post
        title: String,

        /// Post date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Build the site into the destination directory
    #[command(visible_alias = "generate", alias = "g")]
    Build {
        /// Include posts marked `published: false`
        #[arg(long)]
        drafts: bool,

        /// Rebuild when files change
        #[arg(short, long)]
        watch: bool,
    },

    /// Build, then serve the site locally
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Disable file watching and live reload
        #[arg(long)]
        r#static: bool,

        /// Include posts marked `published: false`
        #[arg(long)]
        drafts: bool,
    },

    /// Delete the destination directory
    Clean,

    /// List posts as `date  slug  url`
    List {
        /// Include posts marked `published: false`
        #[arg(long)]
        drafts: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "quillpress=debug,info"
    } else {
        "quillpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            commands::init::init_site(&target_dir)?;
            println!("Initialized empty site in {:?}", target_dir);
        }

        Commands::New { title, date } => {
            let site = Site::new(&base_dir)?;
            let path = site.new_post(&title, date.as_deref())?;
            println!("Created: {:?}", path);
        }

        Commands::Build { drafts, watch } => {
            let site = open_site(&base_dir)?;
            tracing::info!("Building site...");
            site.build(drafts)?;
            println!("Generated successfully!");

            if watch {
                tokio::task::spawn_blocking(move || commands::generate::watch(&site, drafts))
                    .await??;
            }
        }

        Commands::Serve {
            port,
            host,
            open,
            r#static,
            drafts,
        } => {
            let site = open_site(&base_dir)?;
            tracing::info!("Building site...");
            site.build(drafts)?;

            let options = ServeOptions {
                host,
                port,
                live_reload: !r#static,
                open,
                drafts,
            };
            server::start(&site, &options).await?;
        }

        Commands::Clean => {
            let site = open_site(&base_dir)?;
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { drafts } => {
            let site = Site::new(&base_dir)?;
            commands::list::run(&site, drafts)?;
        }

        Commands::Version => {
            println!("quillpress version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Open the site with an absolute root, so watcher events (always absolute)
/// compare against it
fn open_site(base_dir: &std::path::Path) -> Result<Site> {
    let base_dir = base_dir
        .canonicalize()
        .with_context(|| format!("Site directory {:?} does not exist", base_dir))?;
    Site::new(base_dir)
}
