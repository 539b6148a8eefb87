use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mcp_core::messages::Implementation;
use mcp_core::{AuthConfig, ClientConfig, McpClient};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcp-cli")]
#[command(about = "Talk to an MCP server over Streamable HTTP or legacy SSE")]
#[command(version)]
pub struct Cli {
    /// Client configuration file (JSON, YAML or TOML)
    #[arg(short, long, conflicts_with = "url")]
    pub config: Option<PathBuf>,

    /// MCP endpoint URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Bearer token sent in the Authorization header
    #[arg(long)]
    pub bearer: Option<String>,

    /// Per-request timeout (e.g. "30s", "2m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the server answers
    Ping,
    /// List available tools
    Tools,
    /// Call a tool
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },
    /// List available prompts
    Prompts,
    /// Render a prompt
    Prompt {
        /// Prompt name
        name: String,

        /// Prompt argument as key=value, repeatable
        #[arg(short, long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },
    /// List available resources
    Resources,
    /// Print server notifications until interrupted
    Watch {
        /// Stop after this long (e.g. "60s")
        #[arg(short, long, value_parser = humantime::parse_duration)]
        duration: Option<Duration>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let client = McpClient::new(load_config(&cli)?).context("Failed to create MCP client")?;
    let outcome = run(&client, cli.command).await;
    let closed = client.close().await;

    outcome?;
    closed.context("Failed to close MCP session")
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        (None, Some(url)) => ClientConfig::new(url)
            .context("Invalid endpoint URL")?
            .with_client_info(Implementation::new(
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
            )),
        (None, None) => bail!("Either --config or --url is required"),
    };

    if let Some(token) = &cli.bearer {
        config = config.with_auth(AuthConfig::bearer(token.clone()));
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_request_timeout(timeout);
    }

    debug!(endpoint = %config.endpoint, "Configuration loaded");
    Ok(config)
}

async fn run(client: &McpClient, command: Commands) -> Result<()> {
    match command {
        Commands::Ping => {
            client.ping().await.context("Ping failed")?;
            println!("pong");
        }
        Commands::Tools => {
            let tools = client.list_tools().await.context("Failed to list tools")?;
            print_json(&tools)?;
        }
        Commands::Call { name, args } => {
            let arguments = args
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()
                .context("--args must be valid JSON")?;

            let result = client
                .call_tool(&name, arguments)
                .await
                .with_context(|| format!("Failed to call tool '{name}'"))?;
            print_json(&result)?;
            if result.is_error {
                bail!("Tool '{name}' reported an error");
            }
        }
        Commands::Prompts => {
            let prompts = client.list_prompts().await.context("Failed to list prompts")?;
            print_json(&prompts)?;
        }
        Commands::Prompt { name, args } => {
            let arguments: HashMap<String, String> = args.into_iter().collect();
            let prompt = client
                .get_prompt(&name, arguments)
                .await
                .with_context(|| format!("Failed to get prompt '{name}'"))?;
            print_json(&prompt)?;
        }
        Commands::Resources => {
            let resources = client
                .list_resources()
                .await
                .context("Failed to list resources")?;
            print_json(&resources)?;
        }
        Commands::Watch { duration } => watch(client, duration).await?,
    }

    Ok(())
}

async fn watch(client: &McpClient, duration: Option<Duration>) -> Result<()> {
    client.set_notification_handler(|method: &str, params: Option<&Value>| {
        let params = params.cloned().unwrap_or(Value::Null);
        println!("{method} {params}");
    });

    let server = client.initialize().await.context("Failed to initialize")?;
    let listening = client.is_listening().await;
    info!(
        server = %server.implementation.name,
        listening,
        "Watching for notifications"
    );

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = deadline => {}
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
    }

    client.clear_notification_handler();
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    Ok((key.to_string(), value.to_string()))
}
