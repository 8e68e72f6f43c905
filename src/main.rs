mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use vr_core::config::Config;

/// Load the configuration file (if any) and apply environment overrides.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env()?;
    Ok(config)
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vidrelay {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        profile = ?config.conversion.profile,
        temp_dir = %config.storage.temp_dir.display(),
        public_dir = %config.storage.public_dir.display(),
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    vr_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use defaults based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidrelay=trace,vr_server=debug,vr_av=debug,vr_core=debug,tower_http=debug".to_string()
        } else {
            "vidrelay=info,vr_server=info,vr_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Serve { port, directory } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(vr_server::serve_directory(port, &directory))
                .with_context(|| format!("serving {}", directory.display()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidrelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = load_config(config_path)?;
    let registry = vr_av::ToolRegistry::discover(&config.tools);

    for tool in registry.check_all() {
        let status = if tool.available { "✓" } else { "✗" };
        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if registry.has("ffmpeg") {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is missing; video conversion will not work")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            if !p.exists() {
                anyhow::bail!("Config file does not exist: {}", p.display());
            }
            load_config(Some(p))?
        }
        None => {
            println!("No config file specified, using defaults");
            load_config(None)?
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Temp dir: {}", config.storage.temp_dir.display());
    println!("  Public dir: {}", config.storage.public_dir.display());
    println!("  Profile: {:?}", config.conversion.profile);
    println!("  Max concurrent: {}", config.conversion.permits());
    println!(
        "  Retention: {}",
        if config.retention.enabled {
            format!("{}s", config.retention.max_age_secs)
        } else {
            "disabled".to_string()
        }
    );

    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }

    Ok(())
}
