//! # CLI Command Implementations

use crate::api;
use crate::config::AppConfig;
use crate::enrichment::{DiscoveryTargets, EnrichmentOutcome, build_engine};
use crate::error::AppError;
use auditgate_core::{
    AuditError, GateReport, HealthStatus, Ingestor, IntegrationRecord, IntegrationType,
    MergeOutcome, OpportunityRecord, SessionStore, Stage, StageGateManager, StorageBackend,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Maximum inventory file size (16 MB).
const MAX_INGEST_FILE_SIZE: u64 = 16 * 1024 * 1024;

// =============================================================================
// CONTEXT
// =============================================================================

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: AppConfig,
    pub json_mode: bool,
    pub verbose: bool,
}

impl Context {
    fn store(&self) -> Result<StorageBackend, AppError> {
        let storage = &self.config.storage;
        if self.verbose {
            eprintln!(
                "storage: {:?} at {}",
                storage.backend,
                storage.data_dir.display()
            );
        }
        Ok(StorageBackend::open(storage.backend, &storage.data_dir)?)
    }

    fn manager(&self, session_id: &str) -> Result<StageGateManager, AppError> {
        let manager = StageGateManager::open(self.store()?, session_id)?;
        Ok(manager
            .with_policy(self.config.gates)
            .with_versions(self.config.versions.clone()))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| AppError::Io(e.to_string()))?;
    println!("{text}");
    Ok(())
}

/// Stage named by `stage`, or the one after the current stage.
fn target_stage(manager: &StageGateManager, stage: Option<&str>) -> Result<Stage, AppError> {
    match stage {
        Some(stage) => Ok(stage.parse()?),
        None => {
            let current = manager.current_stage();
            current
                .next()
                .ok_or(AppError::Audit(AuditError::TerminalStage(current)))
        }
    }
}

/// Build an integration record from command-line strings.
pub fn integration_record(
    source: &str,
    target: &str,
    integration_type: &str,
    health: &str,
) -> Result<IntegrationRecord, AppError> {
    let integration_type: IntegrationType = integration_type.parse()?;
    let health: HealthStatus = health.parse()?;
    Ok(IntegrationRecord::new(
        source.trim(),
        target.trim(),
        integration_type,
        health,
    ))
}

/// Resolve an input path to a regular file of acceptable size.
fn validate_input_file(path: &Path, max_size: u64) -> Result<PathBuf, AppError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| AppError::Io(format!("invalid file path '{}': {e}", path.display())))?;
    if !canonical.is_file() {
        return Err(AppError::Io(format!(
            "'{}' is not a regular file",
            path.display()
        )));
    }
    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| AppError::Io(format!("cannot read file metadata: {e}")))?;
    if metadata.len() > max_size {
        return Err(AppError::Io(format!(
            "file size {} bytes exceeds maximum allowed {max_size} bytes",
            metadata.len()
        )));
    }
    Ok(canonical)
}

fn print_merge(outcome: &MergeOutcome) {
    println!("Added:     {}", list_or_dash(&outcome.added));
    println!("Augmented: {}", list_or_dash(&outcome.augmented));
    println!("Unchanged: {}", list_or_dash(&outcome.unchanged));
}

fn print_gate(report: &GateReport) {
    let verdict = if report.passed { "PASS" } else { "FAIL" };
    println!("Gate for {} ({}): {verdict}", report.target, report.target.index());
    for reason in &report.reasons {
        println!("  - {reason}");
    }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

// =============================================================================
// SESSION COMMANDS
// =============================================================================

/// Create a new session.
pub fn cmd_init(
    ctx: &Context,
    client_name: &str,
    domain: Option<String>,
    session_id: Option<&str>,
) -> Result<(), AppError> {
    if client_name.trim().is_empty() {
        return Err(AppError::Usage("client name must not be empty".to_string()));
    }
    let store = ctx.store()?;
    let manager = match session_id {
        Some(id) => StageGateManager::create_with_id(store, id, client_name.trim(), domain)?,
        None => StageGateManager::create(store, client_name.trim(), domain)?,
    };
    tracing::info!(session_id = manager.session_id(), "session created");

    if ctx.json_mode {
        return print_json(manager.session());
    }
    println!("Created session {}", manager.session_id());
    println!("Client: {}", manager.session().client_name);
    if let Some(domain) = &manager.session().client_domain {
        println!("Domain: {domain}");
    }
    if !manager.store().is_persistent() {
        println!("Note: memory backend, the session is not kept after exit");
    }
    Ok(())
}

/// List stored session ids.
pub fn cmd_list(ctx: &Context) -> Result<(), AppError> {
    let ids = ctx.store()?.list()?;
    if ctx.json_mode {
        return print_json(&ids);
    }
    if ids.is_empty() {
        println!("No sessions in {}", ctx.config.storage.data_dir.display());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

/// Show stage and inventory status.
pub fn cmd_status(ctx: &Context, session_id: &str) -> Result<(), AppError> {
    let manager = ctx.manager(session_id)?;
    let session = manager.session();

    if ctx.json_mode {
        let output = serde_json::json!({
            "session_id": session.session_id,
            "client_name": session.client_name,
            "client_domain": session.client_domain,
            "current_stage": session.current_stage,
            "stage_completion": session.stage_completion,
            "tools": session.tool_inventory.len(),
            "integrations": session.integrations.len(),
            "opportunities": session.opportunities.len(),
            "updated_at": session.updated_at,
        });
        return print_json(&output);
    }

    println!("AuditGate Session Status");
    println!("========================");
    println!("Session:  {}", session.session_id);
    println!("Client:   {}", session.client_name);
    println!(
        "Domain:   {}",
        session.client_domain.as_deref().unwrap_or("-")
    );
    println!(
        "Stage:    {} ({}/4)",
        session.current_stage,
        session.current_stage.index()
    );
    for stage in Stage::ALL {
        let mark = if session.is_stage_complete(stage) { "x" } else { " " };
        println!("  [{mark}] {}", stage);
    }
    println!();
    println!("Tools:         {}", session.tool_inventory.len());
    println!("Integrations:  {}", session.integrations.len());
    println!("Opportunities: {}", session.opportunities.len());
    println!("Updated:       {}", session.updated_at.to_rfc3339());
    Ok(())
}

/// Print the audit roll-up.
pub fn cmd_summary(ctx: &Context, session_id: &str) -> Result<(), AppError> {
    let manager = ctx.manager(session_id)?;
    let summary = manager.summary();

    if ctx.json_mode {
        return print_json(&summary);
    }

    let info = &summary.audit_info;
    println!("Audit Summary: {} ({})", info.client_name, info.session_id);
    println!("Stage: {}", info.current_stage);
    println!();
    println!("Inventory: {} tools", summary.inventory.total_tools);
    for (category, tools) in &summary.inventory.tools_by_category {
        println!("  {category}: {}", tools.join(", "));
    }
    let coverage = &summary.integrations.coverage;
    println!(
        "Integrations: {} ({}/{} pairs, {}%)",
        summary.integrations.total_integrations,
        coverage.covered_pairs,
        coverage.possible_pairs,
        coverage.percent
    );
    println!(
        "Opportunities: {} ({} high priority, {} unscored)",
        summary.automation.total_opportunities,
        summary.automation.high_priority_count,
        summary.automation.unscored_count
    );
    for (method, count) in &summary.discovery.by_method {
        println!("  found by {method}: {count}");
    }
    let versions = &summary.versions;
    println!(
        "Versions: {} current, {} outdated, {} unknown",
        versions.current_count,
        versions.outdated.len(),
        versions.unknown_count
    );
    for check in &versions.outdated {
        println!(
            "  {}: {} -> {}",
            check.tool,
            check.current,
            check.latest.as_deref().unwrap_or("?")
        );
    }
    println!();
    if let Some(gate) = &summary.next_gate {
        print_gate(gate);
    }
    let ready = &summary.delivery_readiness;
    println!(
        "Client-ready: {}",
        if ready.passed { "yes" } else { "no" }
    );
    for reason in &ready.reasons {
        println!("  - {reason}");
    }
    Ok(())
}

// =============================================================================
// INVENTORY COMMANDS
// =============================================================================

/// Merge a CSV inventory.
pub fn cmd_ingest(ctx: &Context, session_id: &str, file: &Path) -> Result<(), AppError> {
    let path = validate_input_file(file, MAX_INGEST_FILE_SIZE)?;
    let mut manager = ctx.manager(session_id)?;
    let patches = Ingestor::ingest_path(&path)?;
    let rows = patches.len();
    let outcome = manager.merge_tool_inventory(patches)?;
    tracing::info!(
        session_id,
        rows,
        added = outcome.added.len(),
        augmented = outcome.augmented.len(),
        "inventory ingested"
    );

    if ctx.json_mode {
        return print_json(&outcome);
    }
    println!("Ingested {rows} rows from {}", file.display());
    print_merge(&outcome);
    Ok(())
}

/// Probe DNS and tool APIs, then merge the findings.
pub async fn cmd_discover(
    ctx: &Context,
    session_id: &str,
    domain: Option<&str>,
) -> Result<(), AppError> {
    let mut manager = ctx.manager(session_id)?;
    let targets = DiscoveryTargets::of(manager.session(), domain);
    if targets.domain.is_none() && targets.tool_names.is_empty() {
        return Err(AppError::Usage(
            "nothing to probe: the session has no tools and no client domain".to_string(),
        ));
    }

    let engine = build_engine(&ctx.config)?;
    let report = targets.probe(&engine).await?;
    let stats = report.stats;
    let merge = manager.merge_tool_inventory(report.patches)?;
    tracing::info!(
        session_id,
        added = merge.added.len(),
        augmented = merge.augmented.len(),
        elapsed_ms = stats.elapsed_ms,
        "discovery merged"
    );

    let outcome = EnrichmentOutcome { merge, stats };
    if ctx.json_mode {
        return print_json(&outcome);
    }
    println!(
        "Discovery finished in {} ms ({} DNS queries, {} API checks)",
        stats.elapsed_ms, stats.dns_queries, stats.api_probed
    );
    println!(
        "API: {} active, {} unreachable, {} errors",
        stats.api_active, stats.api_unreachable, stats.api_errors
    );
    print_merge(&outcome.merge);
    Ok(())
}

// =============================================================================
// STAGE COMMANDS
// =============================================================================

/// Evaluate a gate without changing anything.
pub fn cmd_gate(ctx: &Context, session_id: &str, stage: Option<&str>) -> Result<(), AppError> {
    let manager = ctx.manager(session_id)?;
    let target = target_stage(&manager, stage)?;
    let report = manager.evaluate_gate(target);

    if ctx.json_mode {
        return print_json(&report);
    }
    print_gate(&report);
    Ok(())
}

/// Advance to the next stage.
pub fn cmd_advance(ctx: &Context, session_id: &str, stage: Option<&str>) -> Result<(), AppError> {
    let mut manager = ctx.manager(session_id)?;
    let target = target_stage(&manager, stage)?;
    let from = manager.current_stage();
    let session = manager.advance(target)?;
    tracing::info!(session_id, from = %from, to = %target, "stage advanced");

    if ctx.json_mode {
        return print_json(session);
    }
    println!("Advanced {from} -> {}", session.current_stage);
    Ok(())
}

// =============================================================================
// RECORD COMMANDS
// =============================================================================

/// Append an integration record.
pub fn cmd_add_integration(
    ctx: &Context,
    session_id: &str,
    record: IntegrationRecord,
) -> Result<(), AppError> {
    let mut manager = ctx.manager(session_id)?;
    manager.append_integration(record.clone())?;
    let coverage = manager.summary().integrations.coverage;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "integration": record,
            "coverage": coverage,
        }));
    }
    println!(
        "Recorded {} -> {} ({:?}, {})",
        record.source_tool,
        record.target_tool,
        record.integration_type,
        record.health_status.as_str()
    );
    println!(
        "Coverage: {}/{} pairs ({}%)",
        coverage.covered_pairs, coverage.possible_pairs, coverage.percent
    );
    Ok(())
}

/// Append an opportunity record.
pub fn cmd_add_opportunity(
    ctx: &Context,
    session_id: &str,
    record: OpportunityRecord,
) -> Result<(), AppError> {
    let mut manager = ctx.manager(session_id)?;
    manager.append_opportunity(record.clone())?;

    if ctx.json_mode {
        return print_json(&record);
    }
    println!(
        "Recorded opportunity '{}' (score {})",
        record.name, record.priority_score
    );
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Serve one session over HTTP.
pub async fn cmd_server(
    ctx: &Context,
    session_id: &str,
    client_name: Option<&str>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), AppError> {
    let store = ctx.store()?;
    let manager = StageGateManager::load_or_create(store, session_id, client_name.unwrap_or(session_id))?
        .with_policy(ctx.config.gates)
        .with_versions(ctx.config.versions.clone());
    let engine = build_engine(&ctx.config)?;

    let mut server = ctx.config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    println!("AuditGate Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", server.host);
    println!("  Port:     {}", server.port);
    println!("  Backend:  {:?}", ctx.config.storage.backend);
    println!("  Data dir: {}", ctx.config.storage.data_dir.display());
    println!("  Session:  {}", manager.session_id());
    println!();
    println!("Endpoints:");
    println!("  GET  /health          - Health check");
    println!("  GET  /session         - Session snapshot");
    println!("  GET  /gates/{{stage}}   - Evaluate a gate");
    println!("  POST /advance         - Advance to the next stage");
    println!("  POST /tools           - Merge tool patches");
    println!("  POST /integrations    - Record an integration");
    println!("  POST /opportunities   - Record an opportunity");
    println!("  POST /discover        - Run discovery and merge");
    println!("  GET  /summary         - Audit summary");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(manager, engine, &server).await
}
