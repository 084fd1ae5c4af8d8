mod config;
mod error;

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use mcp::Endpoint;
use runtime::{
    Agent, AnthropicBackend, CapabilityHost, CapabilityKind, Catalog, Dispatcher, McpHost,
};
use tokio::io::BufReader;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "tiller.toml";
const ENV_FILE: &str = ".env";

#[derive(Parser)]
#[command(name = "tiller")]
#[command(about = "Chat with a model that can use an MCP server's tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: tiller.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Streamable HTTP endpoint of the MCP server
    #[arg(long, global = true, conflicts_with = "server_command")]
    url: Option<String>,

    /// Model to use
    #[arg(long, global = true)]
    model: Option<String>,

    /// Spawn the MCP server and talk to it over stdio
    #[arg(long, global = true)]
    server_command: Option<String>,

    /// Argument for --server-command (repeatable)
    #[arg(long = "server-arg", global = true, allow_hyphen_values = true)]
    server_args: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (default)
    Chat,
    /// List the server's tools and resources, then exit
    Capabilities,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(CONFIG_FILE)?,
        };
        self.apply_overrides(&mut config);
        config.server.endpoint()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.backend.model = model.clone();
        }
        if let Some(url) = &self.url {
            config.server.url = Some(url.clone());
            config.server.command = None;
        }
        if let Some(command) = &self.server_command {
            config.server.command = Some(command.clone());
            config.server.args = self.server_args.clone();
            config.server.url = None;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let result = rt.block_on(run());
    // A pending stdin read holds a blocking thread; don't wait for it.
    rt.shutdown_background();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(config).await,
        Some(Commands::Capabilities) => cmd_capabilities(config).await,
    }
}

async fn cmd_chat(config: Config) -> Result<()> {
    println!("tiller v{}", env!("CARGO_PKG_VERSION"));

    // Fail on a missing credential before starting the server.
    let api_key = config.api_key(Path::new(ENV_FILE))?;

    let (host, catalog) = connect(&config).await?;
    print_catalog(&host, &catalog);
    let _listener = host.spawn_notification_listener();

    let mut backend = AnthropicBackend::builder(api_key, &config.backend.model)
        .max_tokens(config.backend.max_tokens)
        .parallel_tool_use(config.backend.parallel_tool_use);
    if let Some(url) = &config.backend.base_url {
        backend = backend.url(url);
    }
    let backend = backend.build();
    println!("Model: {backend}");
    println!("Type 'exit' or Ctrl+D to quit.\n");

    let dispatcher = Dispatcher::new(host, catalog).with_timeout(config.agent.call_timeout());
    let mut agent = Agent::new(backend, dispatcher)
        .with_system(&config.agent.system_prompt)
        .with_turn_timeout(config.agent.turn_timeout());
    if !config.agent.opening_prompt.is_empty() {
        agent.push_user_text(&config.agent.opening_prompt);
    }

    let stdin = BufReader::new(tokio::io::stdin());
    agent.run(stdin, io::stdout(), interrupted()).await?;

    println!("\nSession ended.");
    Ok(())
}

async fn cmd_capabilities(config: Config) -> Result<()> {
    let (host, catalog) = connect(&config).await?;
    print_catalog(&host, &catalog);
    host.close().await;
    Ok(())
}

async fn connect(config: &Config) -> Result<(McpHost, Catalog)> {
    let endpoint: Endpoint = config.server.endpoint()?;
    let host = McpHost::connect(endpoint.clone())
        .await
        .map_err(|source| Error::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let catalog = Catalog::load(&host, host.supports_tools(), host.supports_resources()).await;
    Ok((host, catalog))
}

fn print_catalog(host: &McpHost, catalog: &Catalog) {
    let info = host.server_info();
    println!("Connected to {} {}", info.name, info.version);

    if catalog.is_empty() {
        println!("No tools or resources discovered.");
        return;
    }

    println!("Discovered {} capabilities:", catalog.len());
    for (i, entry) in catalog.entries().iter().enumerate() {
        let kind = match &entry.kind {
            CapabilityKind::Tool { .. } => "tool".to_string(),
            CapabilityKind::Resource { uri } => format!("resource {uri}"),
        };
        if entry.description.is_empty() {
            println!("{:>3}. {} ({kind})", i + 1, entry.name);
        } else {
            println!("{:>3}. {} ({kind}) - {}", i + 1, entry.name, entry.description);
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal can't be watched.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
