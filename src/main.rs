mod cli;

use marquee::{catalog::Catalog, config, server};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use marquee_common::ContentId;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting Marquee server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "marquee=trace,marquee_player=trace,marquee_common=debug,tower_http=debug".to_string()
        } else {
            "marquee=info,marquee_player=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Resolve { id } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resolve_source(&id, cli.config.as_deref()))
        }
        Commands::Version => {
            println!("marquee {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn resolve_source(id: &str, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = Catalog::new(config.catalog.path.clone());

    let id = ContentId::from(id);
    let record = catalog
        .get(&id)
        .with_context(|| format!("No catalog record with id {id}"))?;

    let player = config.player.clone();
    let ctx = server::AppContext::from_config(config, catalog)?;
    let source = ctx.resolver.resolve(&record.playable()).await?;

    let response = server::routes_playback::SourceResponse::from(source);
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!(
        "Player: load timeout {}s, controls hide {}s, progress saved every {}s",
        player.load_timeout_secs, player.controls_hide_secs, player.progress_save_interval_secs
    );
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!(
                "  TMDB: {}",
                if config.tmdb.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
                    "configured"
                } else {
                    "not configured"
                }
            );
            println!(
                "  Storage: {} (bucket {})",
                config.storage.base_url.as_deref().unwrap_or("not configured"),
                config.storage.bucket
            );
            match &config.catalog.path {
                Some(path) => println!("  Catalog: {:?}", path),
                None => println!("  Catalog: in-memory"),
            }
            println!(
                "  Player: load timeout {}s, controls hide {}s",
                config.player.load_timeout_secs, config.player.controls_hide_secs
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
