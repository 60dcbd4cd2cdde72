//! # AuditGate
//!
//! Stage-gated technology audits from the command line or over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    apps/auditgate (THE BINARY)                │
//! │                                                               │
//! │   ┌─────────────┐      ┌─────────────┐      ┌─────────────┐   │
//! │   │    CLI      │      │  HTTP API   │      │   Config    │   │
//! │   │   (clap)    │      │   (axum)    │      │   (toml)    │   │
//! │   └──────┬──────┘      └──────┬──────┘      └─────────────┘   │
//! │          └──────────┬─────────┘                               │
//! │                     ▼                                         │
//! │   ┌──────────────────────┐       ┌─────────────────────────┐  │
//! │   │    auditgate-core    │◀──────│   auditgate-discovery   │  │
//! │   │  (sessions, gates)   │ merge │ (DNS + API probes)      │  │
//! │   └──────────────────────┘       └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! auditgate init "Acme Corp" --domain acme.com
//! auditgate ingest audit_1a2b3c4d -f inventory.csv
//! auditgate discover audit_1a2b3c4d
//! auditgate gate audit_1a2b3c4d
//! auditgate advance audit_1a2b3c4d
//! auditgate server audit_1a2b3c4d --port 8080
//! ```

use auditgate::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // AUDITGATE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("AUDITGATE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "auditgate=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
