//! gremlin - Command-line client for Gremlin Server
//!
//! Provides both a REPL and one-shot script evaluation.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::QueryOptions;
use gremlin_client::{Client, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gremlin")]
#[command(about = "Command-line client for Gremlin Server")]
#[command(version)]
struct Cli {
    /// Server addresses, tried in order (e.g. ws://localhost:8182/gremlin)
    #[arg(short, long, env = "GREMLIN_SERVERS", value_delimiter = ',')]
    server: Vec<String>,

    /// YAML config file
    #[arg(short, long, env = "GREMLIN_CONFIG")]
    config: Option<PathBuf>,

    /// User name for SASL authentication
    #[arg(short, long, env = "GREMLIN_USER")]
    user: Option<String>,

    /// Password for SASL authentication
    #[arg(short, long, env = "GREMLIN_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Per-frame response timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    // ===== TLS Options =====
    /// Enable TLS connection
    #[arg(long, env = "GREMLIN_TLS")]
    tls: bool,

    /// Path to CA certificate for server verification
    #[arg(long, env = "GREMLIN_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Path to client certificate (for mTLS)
    #[arg(long, env = "GREMLIN_CLIENT_CERT")]
    client_cert: Option<PathBuf>,

    /// Path to client private key (for mTLS)
    #[arg(long, env = "GREMLIN_CLIENT_KEY")]
    client_key: Option<PathBuf>,

    /// Skip server certificate verification (INSECURE)
    #[arg(long, short = 'k')]
    insecure: bool,

    /// Server name for TLS SNI (defaults to server hostname)
    #[arg(long)]
    server_name: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive REPL
    Repl,

    /// Evaluate a Gremlin script
    Query {
        /// Script text
        script: String,

        /// Script bindings as a JSON object (or @file.json to read from file)
        #[arg(short, long)]
        bindings: Option<String>,

        /// Evaluate in a server-side session
        #[arg(long)]
        session: Option<String>,

        /// Results per response frame
        #[arg(long)]
        batch_size: Option<u32>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },
}

/// Layers command-line flags over the loaded configuration.
fn apply_cli(config: &mut Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let servers: Vec<String> = cli
        .server
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if !servers.is_empty() {
        config.servers = servers;
    }

    if cli.user.is_some() {
        config.auth.user = cli.user.clone();
    }
    if cli.pass.is_some() {
        config.auth.pass = cli.pass.clone();
    }
    if let Some(ms) = cli.timeout_ms {
        config.network.request_timeout_ms = Some(ms);
    }

    let tls = &mut config.tls;
    if cli.tls || cli.ca_cert.is_some() || cli.client_cert.is_some() || cli.insecure {
        tls.enabled = true;
    }
    if let Some(ref path) = cli.ca_cert {
        tls.ca_cert_path = Some(path.clone());
    }
    match (&cli.client_cert, &cli.client_key) {
        (Some(cert), Some(key)) => {
            tls.client_cert_path = Some(cert.clone());
            tls.client_key_path = Some(key.clone());
        }
        (None, None) => {}
        _ => return Err("--client-cert and --client-key must be used together".into()),
    }
    if cli.insecure {
        tls.insecure = true;
    }
    if cli.server_name.is_some() {
        tls.server_name = cli.server_name.clone();
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env_overrides();
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => Config::load()?,
    };
    apply_cli(&mut config, cli)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli).map_err(|e| {
        eprintln!("{}: {}", "Configuration error".red(), e);
        e
    })?;
    if config.tls.insecure {
        tracing::warn!("TLS certificate verification is disabled");
    }

    let cluster = config.cluster().map_err(|e| {
        eprintln!("{}: {}", "Configuration error".red(), e);
        e
    })?;

    let client = Client::open_cluster(&cluster, |endpoint| config.connection_config(endpoint))
        .await
        .map_err(|e| {
            eprintln!("{}: {}", "Connection failed".red(), e);
            e
        })?;

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(
                client,
                QueryOptions {
                    pretty: true,
                    ..Default::default()
                },
            )
            .await?;
        }
        Some(Commands::Query {
            script,
            bindings,
            session,
            batch_size,
            pretty,
        }) => {
            let options = QueryOptions {
                bindings: bindings.as_deref().map(commands::parse_bindings).transpose()?,
                session,
                batch_size,
                pretty,
            };

            match commands::execute(&client, &script, &options).await {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    let _ = client.close().await;
                    std::process::exit(1);
                }
            }

            client.close().await?;
        }
    }

    Ok(())
}
