//! Assetgate - multi-root static resource server built on Pingora
//!
//! This is the main entry point for the Assetgate CLI.

use assetgate_core::config::{AssetgateConfig, ConfigLoader, StaticFileConfig};
use assetgate_proxy::StaticProxy;
use assetgate_static::{EmbeddedAssets, HandlerRegistry};
use clap::{Parser, Subcommand};
use rust_embed::RustEmbed;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Files compiled into the binary; `bundle/public` backs the default root
#[derive(RustEmbed)]
#[folder = "bundle/"]
struct Bundle;

#[derive(Parser)]
#[command(name = "assetgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server with a configuration file
    Run {
        /// Path to the configuration file (.json or .toml)
        #[arg(default_value = "assetgate.toml")]
        config: String,
    },

    /// Start a quick file server
    #[command(name = "file-server")]
    FileServer {
        /// Address to listen on
        #[arg(long, default_value = ":8080")]
        listen: String,

        /// Root directory to serve
        #[arg(long, default_value = ".")]
        root: String,

        /// Path prefix the directory is served under
        #[arg(long, default_value = "/")]
        hosted_path: String,

        /// Serve prepared .br/.zst/.gz variants
        #[arg(long)]
        precompress: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (.json or .toml)
        #[arg(default_value = "assetgate.toml")]
        config: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config: config_path } => {
            let config = load_config(&config_path, cli.verbose);
            tracing::info!("Starting Assetgate with config: {}", config_path);
            run_server(config)?;
        }

        Commands::FileServer {
            listen,
            root,
            hosted_path,
            precompress,
        } => {
            init_tracing("info", cli.verbose);
            tracing::info!("Starting file server on {} serving {}", listen, root);

            // Resolve absolute path
            let root_path = std::fs::canonicalize(&root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or(root);

            let config = AssetgateConfig {
                listen: vec![listen],
                static_files: vec![
                    StaticFileConfig::filesystem(root_path)
                        .hosted_at(hosted_path)
                        .with_precompress(precompress),
                ],
                ..Default::default()
            };

            run_server(config)?;
        }

        Commands::Validate { config } => {
            init_tracing("warn", cli.verbose);

            let result = ConfigLoader::load(&config).and_then(|c| {
                let registry = build_registry(&c);
                for root in c.static_files {
                    registry.add_static_file_config(root)?;
                }
                registry.server_started()?;
                Ok(registry.roots().len())
            });

            match result {
                Ok(roots) => {
                    println!("✅ Configuration '{}' is valid! ({} static root(s))", config, roots);
                }
                Err(e) => {
                    eprintln!("❌ Configuration Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Assetgate v{}", assetgate_core::VERSION);
            println!("Built with ❤️ in Rust");
        }
    }

    Ok(())
}

fn init_tracing(level: &str, verbose: bool) {
    let fallback = if verbose { "debug" } else { level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();
}

fn load_config(path: &str, verbose: bool) -> AssetgateConfig {
    match ConfigLoader::load(path) {
        Ok(config) => {
            init_tracing(&config.logging.level, verbose);
            config
        }
        Err(e) => {
            init_tracing("info", verbose);
            tracing::error!("❌ Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

/// Registry over the bundled assets with the configured compression
fn build_registry(config: &AssetgateConfig) -> HandlerRegistry {
    let assets = Arc::new(EmbeddedAssets::new());
    assets.mount::<Bundle>("");
    HandlerRegistry::new(assets).with_compression(&config.compression)
}

fn normalize_listen(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

fn run_server(config: AssetgateConfig) -> anyhow::Result<()> {
    tracing::info!("🚀 Starting Assetgate v{}", assetgate_core::VERSION);
    tracing::info!("🔧 Configured {} static root(s)", config.static_files.len());

    if config.static_files.is_empty() {
        tracing::warn!("⚠️ No static roots configured! Every request will be answered with 404");
    }

    let registry = Arc::new(build_registry(&config));

    // Registered before the server starts, so these only queue
    for root in config.static_files.iter().cloned() {
        registry.add_static_file_config(root)?;
    }

    // Create Pingora Server
    let mut server = pingora::server::Server::new(Some(pingora::server::configuration::Opt {
        upgrade: false,
        daemon: false,
        nocapture: false,
        test: false,
        conf: None, // We handle config manually
    }))
    .map_err(|e| anyhow::anyhow!("Failed to create Pingora server: {}", e))?;

    server.bootstrap();

    if let Err(e) = registry.server_started() {
        tracing::error!("❌ Failed to start static roots: {}", e);
        std::process::exit(1);
    }

    let proxy = StaticProxy::new(registry);
    for addr in config.listen.iter().map(|a| normalize_listen(a)) {
        let mut service = pingora::proxy::http_proxy_service(&server.configuration, proxy.clone());
        service.add_tcp(&addr);
        tracing::info!("   🌐 Server listening on {}", addr);
        server.add_service(service);
    }

    println!("🚀 Assetgate running...");
    server.run_forever();
}
