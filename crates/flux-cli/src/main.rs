use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flux_core::{
    AgentRegistry, ChatMode, ChatRequest, Collaboration, CollaborationEvent, CompletionClient,
    GroqClient, UploadedFile,
};
use flux_gateway::GatewayServer;

mod config;

use config::FluxConfig;

#[derive(Parser)]
#[command(name = "flux")]
#[command(version)]
#[command(about = "FLUX - a team of LLM agents behind one chat endpoint")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket gateway
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Send a one-shot message to the team
    Ask {
        /// The message to send
        message: String,

        /// Chat mode: team or single
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ChatMode>,

        /// Address one agent directly
        #[arg(long)]
        agent: Option<String>,

        /// Attach a document (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },

    /// List the agents and their models
    Agents,

    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,
}

fn parse_mode(s: &str) -> std::result::Result<ChatMode, String> {
    ChatMode::from_string(s).ok_or_else(|| format!("unknown mode '{}', expected team or single", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins when set
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Agents => cmd_agents(&cli.config).await,
        Commands::Serve { bind } => cmd_serve(&cli.config, bind).await,
        Commands::Ask {
            message,
            mode,
            agent,
            files,
        } => cmd_ask(&cli.config, message, mode, agent, &files).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config::default_config_path();
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        tokio::fs::write(&config_path, config::DEFAULT_CONFIG).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("FLUX initialized at {}", config_dir.display());
    println!("Export GROQ_API_KEY or edit {} to enable the team.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = FluxConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

async fn cmd_agents(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = FluxConfig::load(config_path)?;
    let registry = build_registry(&cfg)?;

    println!("{:<10} {:<14} {:<22} MODEL", "ID", "NAME", "ROLE");
    for def in registry.iter() {
        println!("{:<10} {:<14} {:<22} {}", def.id, def.name, def.role, def.model);
    }
    println!("\n{} agents, coordinator: {}", registry.len(), registry.coordinator().id);
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let mut cfg = FluxConfig::load(config_path)?;
    if let Some(bind) = bind {
        cfg.gateway.bind = bind;
    }
    let addr = cfg.bind_addr()?;
    let collaboration = Arc::new(build_collaboration(&cfg)?);

    info!(
        "Starting FLUX gateway with {} agents (provider configured: {})",
        collaboration.registry().len(),
        collaboration.is_configured()
    );

    let cancel = CancellationToken::new();
    let server = GatewayServer::new(addr, collaboration).spawn(cancel.clone());

    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    cancel.cancel();

    server.await.context("Gateway task panicked")??;
    println!("FLUX stopped.");
    Ok(())
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    message: String,
    mode: Option<ChatMode>,
    agent: Option<String>,
    files: &[PathBuf],
) -> Result<()> {
    let cfg = FluxConfig::load(config_path)?;
    let collaboration = build_collaboration(&cfg)?;

    let mut uploaded = Vec::with_capacity(files.len());
    for path in files {
        uploaded.push(read_upload(path).await?);
    }
    let request = ChatRequest {
        message,
        uploaded_files: uploaded,
        chat_mode: mode,
        agent,
    };

    let (tx, mut rx) = mpsc::channel::<CollaborationEvent>(32);
    let printer = async {
        while let Some(event) = rx.recv().await {
            match event {
                CollaborationEvent::RoundStarted { round, agents } => {
                    let names: Vec<&str> = agents.iter().map(|a| a.as_str()).collect();
                    println!("── Round {} ({}) ──\n", round, names.join(", "));
                }
                CollaborationEvent::Response(record) => {
                    println!("{}:\n{}\n", record.agent_name, record.message);
                }
                CollaborationEvent::NotConfigured(message) => println!("{}", message),
                CollaborationEvent::Typing { .. } => {}
            }
        }
    };

    let (outcome, ()) = tokio::join!(collaboration.run(&request, Some(tx)), printer);
    let outcome = outcome?;
    println!(
        "{} responses from {} agents over {} round(s), {} document(s) analyzed",
        outcome.agents_responded(),
        outcome.distinct_agents(),
        outcome.rounds,
        outcome.documents_analyzed
    );
    Ok(())
}

fn build_registry(cfg: &FluxConfig) -> Result<AgentRegistry> {
    AgentRegistry::builtin()
        .with_model_overrides(&cfg.agents.models)
        .context("Invalid [agents.models] entry")
}

fn build_collaboration(cfg: &FluxConfig) -> Result<Collaboration> {
    let registry = Arc::new(build_registry(cfg)?);

    let client: Option<Arc<dyn CompletionClient>> = if cfg.is_provider_configured() {
        let groq = GroqClient::new(cfg.provider.api_key.clone(), cfg.provider.base_url.clone())
            .context("Failed to build Groq client")?;
        info!("Groq client ready ({})", cfg.provider.base_url);
        Some(Arc::new(groq))
    } else {
        warn!("GROQ_API_KEY not set, chat requests will report the provider as not configured");
        None
    };

    Ok(Collaboration::new(
        registry,
        client,
        cfg.collaboration_config(),
    ))
}

/// Read a local file as an upload. Non-UTF-8 files are sent without content.
async fn read_upload(path: &Path) -> Result<UploadedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(UploadedFile {
        name,
        mime_type: mime_guess::from_path(path).first_or_octet_stream().to_string(),
        size: bytes.len() as u64,
        content: String::from_utf8(bytes).ok(),
    })
}
