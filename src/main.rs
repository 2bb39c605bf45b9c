//! Endpoint registry entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use endpoint_registry::api::{build_app, default_loader};
use endpoint_registry::bootstrap::{Bootstrap, BootstrapOptions, Bootstrapped};
use endpoint_registry::config::{Config, VERBOSE_LOG_DIRECTIVE};
use endpoint_registry::metrics;
use endpoint_registry::utils::shutdown_signal;

/// Self-describing HTTP endpoint registry.
#[derive(Parser, Debug)]
#[command(name = "endpoint-registry")]
#[command(about = "Serve endpoint modules with a live /api discovery document")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load all modules and serve them (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load all modules and print the discovery document without serving.
    Routes,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Loaded before the subscriber so RUST_LOG and VERBOSE from .env apply.
    let loaded = Config::load();

    let filter = match &loaded {
        Ok(config) => EnvFilter::try_new(config.log_directive(args.verbose))
            .unwrap_or_else(|_| EnvFilter::new("info")),
        Err(_) if args.verbose => EnvFilter::new(VERBOSE_LOG_DIRECTIVE),
        Err(_) => EnvFilter::new("info"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve { port }) => cmd_serve(loaded, port.or(args.port)).await,
        Some(Command::Routes) => cmd_routes(loaded),
        Some(Command::CheckConfig) => cmd_check_config(loaded),
        None => cmd_serve(loaded, args.port).await,
    }
}

/// Validate loaded configuration, logging failures.
fn load_config(loaded: endpoint_registry::Result<Config>) -> endpoint_registry::Result<Config> {
    let config = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    config.validate().map_err(|e| {
        error!("{}", e);
        e
    })?;

    Ok(config)
}

/// Run the bootstrap; any error is fatal.
fn bootstrap(config: &Config) -> endpoint_registry::Result<Bootstrapped> {
    let loader = default_loader(config)?;
    let boot = Bootstrap::new(BootstrapOptions::from_config(config))
        .run(&loader)
        .map_err(|e| {
            error!("Bootstrap failed: {}", e);
            e
        })?;

    for module in &boot.report {
        info!(
            "Module {:<16} {} ({} endpoints)",
            module.id, module.state, module.endpoints
        );
    }

    Ok(boot)
}

/// Serve the bootstrapped route surface.
async fn cmd_serve(
    loaded: endpoint_registry::Result<Config>,
    port_override: Option<u16>,
) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config(loaded)?;
    if let Some(port) = port_override {
        config.port = port;
    }

    let metrics_handle = if config.metrics_enabled {
        match metrics::install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Metrics disabled, failed to install recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let boot = bootstrap(&config)?;
    info!(
        "Registered {} endpoints from {} modules",
        boot.aggregator.len(),
        boot.report.len()
    );

    let app = build_app(boot, &config, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    info!("Discovery document at {}", config.discovery_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Print the discovery document.
fn cmd_routes(loaded: endpoint_registry::Result<Config>) -> anyhow::Result<()> {
    let config = load_config(loaded)?;
    let boot = bootstrap(&config)?;

    let doc = boot.aggregator.snapshot();
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(loaded: endpoint_registry::Result<Config>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("ENDPOINT REGISTRY - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match loaded {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Loading endpoint modules... ");
    let loader = match default_loader(&config) {
        Ok(loader) => loader,
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Module loader setup failed"));
        }
    };
    match Bootstrap::new(BootstrapOptions::from_config(&config)).run(&loader) {
        Ok(boot) => {
            println!("OK");
            println!("  Modules: {}", boot.report.len());
            println!("  Endpoints: {}", boot.aggregator.len());
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Bootstrap failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Listen: {}:{}", config.host, config.port);
    println!("  API: {} v{}", config.api_name, config.api_version);
    println!("  Discovery Path: {}", config.discovery_path);
    println!("  Default Cache TTL: {}ms", config.cache_default_ttl_ms);
    println!("  Stats Cache TTL: {}ms", config.stats_ttl_ms);
    println!("  Duplicate Policy: {}", config.duplicate_policy);
    match &config.module_dir {
        Some(dir) => println!("  Module Directory: {}", dir.display()),
        None => println!("  Module Directory: (none)"),
    }
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("  OpenAPI: {}", if config.openapi_enabled { "Enabled" } else { "Disabled" });
    println!("  Log Filter: {}", config.log_directive(false));
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
