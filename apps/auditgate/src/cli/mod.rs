//! # AuditGate CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create a new audit session
//! - `list` - List stored sessions
//! - `status` - Show stage, completion and inventory size
//! - `ingest` - Merge a CSV tool inventory
//! - `discover` - Probe DNS and tool APIs, merge the findings
//! - `gate` - Evaluate the gate guarding a stage
//! - `advance` - Move to the next stage
//! - `add-integration` - Record an integration (Assessment)
//! - `add-opportunity` - Record an automation opportunity (Opportunities)
//! - `summary` - Print the audit roll-up
//! - `server` - Serve one session over HTTP

mod commands;

use crate::config::AppConfig;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// AuditGate - stage-gated technology audits
///
/// Sessions move Discovery -> Assessment -> Opportunities -> Delivery, one
/// gate at a time.
#[derive(Parser, Debug)]
#[command(name = "auditgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Session storage directory (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend: "file", "redb" or "memory" (overrides config)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new audit session
    Init {
        /// Client display name
        client_name: String,

        /// Client domain used for DNS discovery
        #[arg(short, long)]
        domain: Option<String>,

        /// Use this session id instead of a generated one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// List stored sessions
    List,

    /// Show session status
    Status {
        session: String,
    },

    /// Merge a CSV tool inventory into the session
    Ingest {
        session: String,

        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Discover tools from DNS records and check tool APIs
    Discover {
        session: String,

        /// Domain to probe (defaults to the session's client domain)
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Evaluate the gate guarding a stage
    Gate {
        session: String,

        /// Stage name or number (defaults to the next stage)
        #[arg(short = 't', long)]
        stage: Option<String>,
    },

    /// Advance to the next stage
    Advance {
        session: String,

        /// Expected target stage name or number (defaults to the next stage)
        #[arg(short = 't', long)]
        stage: Option<String>,
    },

    /// Record an integration between two tools
    AddIntegration {
        session: String,
        source: String,
        target: String,

        /// api, webhook, database, file-sync, email-sync, calendar-sync, sso,
        /// manual, none, unknown
        #[arg(short = 't', long = "type", default_value = "unknown")]
        integration_type: String,

        /// healthy, degraded, broken, missing, unknown
        #[arg(short = 'H', long, default_value = "unknown")]
        health: String,

        /// Known issue (repeatable)
        #[arg(short, long = "issue")]
        issues: Vec<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Record an automation opportunity
    AddOpportunity {
        session: String,
        name: String,

        /// Priority score (0 means unscored)
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        score: i64,

        /// Tools involved (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tools: Vec<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Print the audit summary
    Summary {
        session: String,
    },

    /// Serve one session over HTTP
    Server {
        /// Session to serve (created if missing)
        session: String,

        /// Client name used when the session has to be created
        #[arg(long)]
        client: Option<String>,

        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration from file, environment and global flags.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(backend) = &cli.backend {
        config.storage.backend = backend.parse()?;
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let config = resolve_config(&cli)?;
    let ctx = Context {
        config,
        json_mode: cli.json_mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Init {
            client_name,
            domain,
            session,
        } => cmd_init(&ctx, &client_name, domain, session.as_deref()),
        Commands::List => cmd_list(&ctx),
        Commands::Status { session } => cmd_status(&ctx, &session),
        Commands::Ingest { session, file } => cmd_ingest(&ctx, &session, &file),
        Commands::Discover { session, domain } => {
            cmd_discover(&ctx, &session, domain.as_deref()).await
        }
        Commands::Gate { session, stage } => cmd_gate(&ctx, &session, stage.as_deref()),
        Commands::Advance { session, stage } => cmd_advance(&ctx, &session, stage.as_deref()),
        Commands::AddIntegration {
            session,
            source,
            target,
            integration_type,
            health,
            issues,
            notes,
        } => {
            let record = integration_record(&source, &target, &integration_type, &health)?;
            let record = auditgate_core::IntegrationRecord {
                issues,
                notes,
                ..record
            };
            cmd_add_integration(&ctx, &session, record)
        }
        Commands::AddOpportunity {
            session,
            name,
            score,
            tools,
            description,
        } => {
            let record = auditgate_core::OpportunityRecord {
                description,
                ..auditgate_core::OpportunityRecord::new(name, score).with_tools(tools)
            };
            cmd_add_opportunity(&ctx, &session, record)
        }
        Commands::Summary { session } => cmd_summary(&ctx, &session),
        Commands::Server {
            session,
            client,
            host,
            port,
        } => cmd_server(&ctx, &session, client.as_deref(), host, port).await,
    }
}
