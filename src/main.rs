mod cli;

use localreel::{
    assets::{AssetCache, HttpFetcher},
    capability::{CapabilityStore, ConsentProvider, FsPermissionAuthority, PathConsent, StdinConsent},
    config::{self, Config},
    events::{StatusBus, StatusEvent},
    library::Library,
    playback::{PipeEngine, Player},
    scanner::{DirectoryScanner, Listing},
    server::{self, ServerContext},
};
use localreel_common::{DeliveryMode, PlaybackState};
use localreel_db::pool::init_pool;
use localreel_media::{ChunkedFeeder, ObjectRegistry};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

fn build_library(config: &Config, consent: Arc<dyn ConsentProvider>) -> Result<Library> {
    let db_path = config::expand_path(&config.storage.database);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
    }
    tracing::debug!("Opening database at {:?}", db_path);
    let pool = init_pool(&db_path.to_string_lossy())?;

    let status = Arc::new(StatusBus::default());
    let registry = ObjectRegistry::new();
    let engine = Arc::new(PipeEngine::new(&config.player, registry.clone()));
    let feeder = ChunkedFeeder::new(config.stream.window_bytes)?;

    let player = Player::new(engine, registry, Arc::clone(&status)).with_feeder(feeder);
    let store = CapabilityStore::new(pool, Arc::new(FsPermissionAuthority), consent)
        .with_status(Arc::clone(&status));
    let scanner = DirectoryScanner::new().with_status(Arc::clone(&status));

    Ok(Library::new(store, scanner, player, status))
}

/// Print every status line published so far.
fn drain_status(rx: &mut broadcast::Receiver<StatusEvent>) {
    loop {
        match rx.try_recv() {
            Ok(event) => println!("{}", event.message()),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

fn print_listing(listing: &Listing) {
    for (index, entry) in listing.iter().enumerate() {
        println!(
            "  [{}] {} ({}, {} bytes)",
            index,
            entry.name,
            entry.kind.extension(),
            entry.file.size()
        );
    }
}

/// Restore the saved directory, failing if there is none.
async fn open_library(config: &Config) -> Result<(Library, broadcast::Receiver<StatusEvent>)> {
    let library = build_library(config, Arc::new(StdinConsent))?;
    let mut rx = library.status().subscribe();

    let restored = library.initialize().await;
    drain_status(&mut rx);
    if restored?.is_none() {
        anyhow::bail!("No directory handle available. Run `localreel select <DIR>` first");
    }

    Ok((library, rx))
}

async fn select(config: &Config, dir: Option<&Path>) -> Result<()> {
    let consent: Arc<dyn ConsentProvider> = match dir {
        Some(dir) => Arc::new(PathConsent::new(dir)),
        None => Arc::new(StdinConsent),
    };
    let library = build_library(config, consent)?;
    let mut rx = library.status().subscribe();

    let listing = library.select_directory().await;
    drain_status(&mut rx);
    print_listing(&listing?);
    Ok(())
}

/// Restoring the saved directory rescans it.
async fn scan(config: &Config) -> Result<()> {
    open_library(config).await?;
    Ok(())
}

async fn list(config: &Config, json: bool) -> Result<()> {
    if !json {
        let (library, _rx) = open_library(config).await?;
        print_listing(&library.entries());
        return Ok(());
    }

    // Keep stdout clean for the JSON document.
    let library = build_library(config, Arc::new(StdinConsent))?;
    if library.initialize().await?.is_none() {
        anyhow::bail!("No directory handle available. Run `localreel select <DIR>` first");
    }
    let entries: Vec<_> = library
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::json!({
                "index": index,
                "name": entry.name,
                "kind": entry.kind,
                "size": entry.file.size(),
                "path": entry.file.path(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

async fn play(config: &Config, index: usize, mode: Option<DeliveryMode>) -> Result<()> {
    let (library, mut rx) = open_library(config).await?;
    let mode = mode.unwrap_or(config.stream.default_mode);

    let started = library.play(index, mode).await;
    drain_status(&mut rx);
    started?;

    let player = library.player();
    let finished = player.wait();
    tokio::pin!(finished);

    let state = loop {
        tokio::select! {
            state = &mut finished => break state,
            event = rx.recv() => match event {
                Ok(event) => println!("{}", event.message()),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break player.wait().await,
            },
        }
    };
    drain_status(&mut rx);
    player.stop().await;

    if state == PlaybackState::Error {
        anyhow::bail!("Playback failed");
    }
    Ok(())
}

fn forget(config: &Config) -> Result<()> {
    let library = build_library(config, Arc::new(PathConsent::cancelled()))?;
    if library.forget()? {
        println!("Forgot saved directory");
    } else {
        println!("No saved directory");
    }
    Ok(())
}

async fn serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let assets = &config.assets;
    let origin = assets
        .origin
        .as_deref()
        .context("assets.origin must be set to serve the application shell")?;

    let fetcher = Arc::new(HttpFetcher::new(origin)?);
    let cache = Arc::new(AssetCache::new(
        config::expand_path(&assets.cache_dir),
        assets.version.clone(),
    ));

    match cache.install(&assets.manifest, fetcher.as_ref()).await {
        Ok(count) => {
            tracing::info!("Installed {} assets into {}", count, cache.version());
            cache.activate().await?;
        }
        Err(e) => {
            tracing::warn!("Asset install failed, serving existing cache: {}", e);
        }
    }

    let ctx = ServerContext { cache, fetcher };
    let host = host.unwrap_or_else(|| assets.host.clone());
    let port = port.unwrap_or(assets.port);
    server::start_server(ctx, &host, port).await
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Database: {}", config.storage.database.display());
            println!("  Window: {} bytes", config.stream.window_bytes);
            println!("  Default mode: {:?}", config.stream.default_mode);
            println!(
                "  Player: {} {}",
                config.player.command,
                config.player.args.join(" ")
            );
            println!("  Asset cache: {}", config.assets.version);
            println!(
                "  Asset origin: {}",
                config.assets.origin.as_deref().unwrap_or("(none)")
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Database: {}", config.storage.database.display());
            println!("  Player: {}", config.player.command);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "localreel=trace,localreel_media=trace,localreel_db=debug,localreel_common=debug,tower_http=debug".to_string()
        } else {
            "localreel=info,localreel_media=info,localreel_db=warn,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("localreel {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Select { dir } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(select(&config, dir.as_deref()))
        }
        Commands::Scan => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan(&config))
        }
        Commands::List { json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list(&config, json))
        }
        Commands::Play { index, mode } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(&config, index, mode))
        }
        Commands::Forget => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            forget(&config)
        }
        Commands::Serve { host, port } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(&config, host, port))
        }
    }
}
