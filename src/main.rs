//! throughline: relay and command-line client for the Anthropic Messages API
//!
//! `serve` runs the credential-injecting relay; `ask`, `stream` and `search`
//! talk to a running relay the way a browser front-end would.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

use throughline::{config::AppConfig, run_server, AiClient};

#[derive(Parser)]
#[command(name = "throughline")]
#[command(version = "0.1.0")]
#[command(about = "Credential-injecting relay and streaming client for the Anthropic Messages API")]
#[command(long_about = "
throughline keeps the Anthropic API key on the server:
  - `serve` answers POST /ai, adds the key, and relays buffered or streamed responses
  - `ask`, `stream` and `search` call a running relay from the command line

Example usage:
  ANTHROPIC_API_KEY=sk-... throughline serve --port 8787
  throughline stream \"Summarize our positioning in one paragraph\"
  throughline search \"List three competitors as a JSON array\"
")]
struct Cli {
    /// Path to config file (defaults to ./config.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override upstream API base URL (e.g., "https://api.anthropic.com")
        #[arg(long)]
        upstream_url: Option<String>,
    },

    /// Send a prompt and print the buffered answer
    Ask {
        prompt: String,
        #[command(flatten)]
        target: ClientArgs,
    },

    /// Send a prompt and print the answer as it streams in
    Stream {
        prompt: String,
        #[command(flatten)]
        target: ClientArgs,
    },

    /// Send a prompt with web search enabled and print the extracted JSON
    Search {
        prompt: String,
        #[command(flatten)]
        target: ClientArgs,
    },

    /// Validate configuration file
    CheckConfig,
}

#[derive(clap::Args)]
struct ClientArgs {
    /// Override relay URL (e.g., "http://127.0.0.1:8787/ai")
    #[arg(long)]
    relay_url: Option<String>,
    /// Token budget for this call
    #[arg(long)]
    max_tokens: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { port, upstream_url } => {
            serve(config_path, port, upstream_url).await?;
        }
        Commands::Ask { prompt, target } => {
            let client = build_client(config_path, &target)?;
            match client.try_call(&prompt, target.max_tokens).await {
                Ok(text) => println!("{}", text),
                Err(e) => exit_with("No answer", e),
            }
        }
        Commands::Stream { prompt, target } => {
            let client = build_client(config_path, &target)?;
            stream_to_stdout(&client, &prompt, target.max_tokens).await;
        }
        Commands::Search { prompt, target } => {
            let client = build_client(config_path, &target)?;
            match client.try_search_json(&prompt, target.max_tokens).await {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(e) => exit_with("No JSON result", e),
            }
        }
        Commands::CheckConfig => {
            check_config(config_path)?;
        }
    }

    Ok(())
}

/// Run the relay server
async fn serve(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    upstream_url_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_or_exit(config_path);

    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(url) = upstream_url_override {
        config.upstream.url = url;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error in configuration: {}", e);
        std::process::exit(1);
    }

    let api_key = config.upstream.resolve_api_key();
    run_server(config, api_key).await
}

fn build_client(config_path: Option<&Path>, target: &ClientArgs) -> Result<AiClient, Box<dyn std::error::Error>> {
    let mut config = load_config_or_exit(config_path);
    if let Some(ref url) = target.relay_url {
        config.client.relay_url = url.clone();
    }
    Ok(AiClient::new(&config.client)?)
}

/// Print only the newly arrived suffix of each increment
async fn stream_to_stdout(client: &AiClient, prompt: &str, max_tokens: Option<u32>) {
    let mut shown = String::new();
    let mut stdout = std::io::stdout();

    let result = client
        .stream(
            prompt,
            |text| {
                // A buffered fallback may not extend what was already shown
                let suffix = match text.strip_prefix(shown.as_str()) {
                    Some(suffix) => suffix,
                    None => {
                        let _ = writeln!(stdout);
                        text
                    }
                };
                let _ = write!(stdout, "{}", suffix);
                let _ = stdout.flush();
                shown.clear();
                shown.push_str(text);
            },
            max_tokens,
        )
        .await;

    match result {
        Some(_) => println!(),
        None => {
            eprintln!("✗ No answer from {}", client.relay_url());
            std::process::exit(1);
        }
    }
}

/// Validate configuration file
fn check_config(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(config_path);
    match config.validate() {
        Ok(()) => {
            println!("✓ Configuration is valid\n");
            println!("Server:");
            println!("  Listen: {}:{}", config.server.host, config.server.port);
            println!("\nUpstream:");
            println!("  URL: {}", config.upstream.messages_url());
            println!("  API version: {}", config.upstream.api_version);
            println!(
                "  API key: ${} ({})",
                config.upstream.api_key_env,
                if config.upstream.resolve_api_key().is_some() { "set" } else { "not set" }
            );
            println!("  Timeout: {}s", config.upstream.timeout_seconds);
            println!("  Default model: {}", config.upstream.default_model);
            println!("  Default max_tokens: {}", config.upstream.default_max_tokens);
            println!("\nClient:");
            println!("  Relay URL: {}", config.client.relay_url);
            println!("  Model: {}", config.client.model);
            println!("  max_tokens: {} (search: {})", config.client.max_tokens, config.client.search_max_tokens);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Load configuration or exit with error
fn load_config_or_exit(config_path: Option<&Path>) -> AppConfig {
    match AppConfig::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nYou can copy config.yaml.default and modify it:");
            eprintln!("  cp config.yaml.default config.yaml");
            std::process::exit(1);
        }
    }
}

fn exit_with(what: &str, err: throughline::client::ClientError) -> ! {
    eprintln!("✗ {}: {}", what, err);
    std::process::exit(1);
}
