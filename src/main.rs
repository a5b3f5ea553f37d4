mod config;
mod contact;
mod error;
mod frontmatter;
mod reconcile;
mod remote;
mod sync;
mod vcard_io;
mod vdir;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Overrides;
use remote::carddav::CardDavRemote;
use sync::SyncEngine;

/// Mirror a CardDAV address book into a folder of text files with YAML
/// front matter, one file per contact.
#[derive(Parser, Debug)]
#[command(name = "carddav2txt", version)]
struct Cli {
    /// Configuration file (defaults to <config dir>/carddav2txt/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Destination folder, overriding CARDDAV2TXT_DESTINATION_PATH
    #[arg(long, value_name = "DIR")]
    destination: Option<PathBuf>,

    /// Contact file extension, overriding CARDDAV2TXT_FILE_EXTENSION
    #[arg(long)]
    extension: Option<String>,

    /// Show what would be archived, created and updated without touching files
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(&Overrides {
        config: cli.config,
        destination: cli.destination,
        extension: cli.extension,
    })?;

    if let Some(path) = &config.config_path {
        tracing::info!("Loaded configuration from {}", path.display());
    }

    let remote = CardDavRemote::new(&config.remote)?;
    SyncEngine::new(&config, cli.dry_run)
        .sync(&remote)
        .with_context(|| format!("sync into {} failed", config.destination.display()))?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "carddav2txt=debug,info"
    } else {
        "carddav2txt=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
