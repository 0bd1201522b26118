//! Handlers for `planner plan` subcommands.
//!
//! Implements:
//! - `planner plan create [name]`     -- create a plan, optionally seeded
//! - `planner plan list`              -- list all plans
//! - `planner plan show <plan-id>`    -- stage-by-stage summary
//! - `planner plan delete <plan-id>`  -- delete a plan
//! - `planner plan export <plan-id>`  -- JSON export (see `export_cmd`)

use std::time::Duration;

use anyhow::{Context, Result};

use planner_core::aggregate::{StageSummary, group_stage};
use planner_core::model::{PlanRecord, Stage};
use planner_core::presets::{ReferenceData, fetch_reference_data};

use crate::PlanCommands;
use crate::export_cmd;
use crate::resolve::{require_text, resolve_plan_id};
use crate::session::Session;

const REFERENCE_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(
    command: PlanCommands,
    session: &Session,
    reference_url: Option<&str>,
) -> Result<()> {
    match command {
        PlanCommands::Create {
            name,
            description,
            seed,
        } => {
            cmd_create(
                session,
                name.as_deref(),
                description.as_deref(),
                seed,
                reference_url,
            )
            .await
        }
        PlanCommands::List => cmd_list(session).await,
        PlanCommands::Show { plan_id } => cmd_show(session, &plan_id).await,
        PlanCommands::Delete { plan_id } => cmd_delete(session, &plan_id).await,
        PlanCommands::Export { plan_id, output } => {
            export_cmd::run_export(session, &plan_id, output.as_deref()).await
        }
    }
}

/// Reference data from the configured endpoint, or the embedded set.
pub async fn load_reference(reference_url: Option<&str>) -> ReferenceData {
    match reference_url {
        Some(url) => fetch_reference_data(url, REFERENCE_TIMEOUT).await,
        None => ReferenceData::embedded(),
    }
}

// -----------------------------------------------------------------------
// planner plan create
// -----------------------------------------------------------------------

async fn cmd_create(
    session: &Session,
    name: Option<&str>,
    description: Option<&str>,
    seed: bool,
    reference_url: Option<&str>,
) -> Result<()> {
    let name = name.map(|n| require_text(n, "plan name")).transpose()?;
    let plan_id = session
        .store
        .create(name, description)
        .await
        .context("failed to create plan")?;

    println!("Plan created.");
    println!();
    println!("  Plan ID: {plan_id}");
    if let Some(name) = name {
        println!("  Name:    {name}");
    }

    if seed {
        let reference = load_reference(reference_url).await;
        let seeded = session
            .lifecycle()
            .seed_heuristics(plan_id, &reference)
            .await
            .context("failed to seed preset heuristics")?;
        println!(
            "  Seeded:  {} heuristics into {seeded} stages",
            reference.heuristics.len()
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// planner plan list
// -----------------------------------------------------------------------

async fn cmd_list(session: &Session) -> Result<()> {
    let ids = session.store.list().await?;
    if ids.is_empty() {
        println!("No plans found. Use `planner plan create` to create one.");
        return Ok(());
    }

    let mut plans = Vec::with_capacity(ids.len());
    for result in session.store.load_many(&ids).await {
        match result {
            Ok(plan) => plans.push(plan),
            Err(e) => eprintln!("warning: {e}"),
        }
    }
    plans.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

    let name_w = plans
        .iter()
        .map(|p| display_name(p).len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!("{:<36}  {:<name_w$}  {:<6}  {:<16}", "ID", "NAME", "ZONE", "UPDATED");
    println!("{}", "-".repeat(36 + 2 + name_w + 2 + 6 + 2 + 16));
    for plan in &plans {
        let zone = plan.zone().map_or("-".to_string(), |z| z.to_string().replace("Zone ", ""));
        println!(
            "{:<36}  {:<name_w$}  {:<6}  {}",
            plan.id,
            display_name(plan),
            zone,
            plan.last_updated.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

fn display_name(plan: &PlanRecord) -> &str {
    plan.name.as_deref().unwrap_or("(untitled)")
}

// -----------------------------------------------------------------------
// planner plan show <plan-id>
// -----------------------------------------------------------------------

async fn cmd_show(session: &Session, input: &str) -> Result<()> {
    let plan_id = resolve_plan_id(&session.store, input).await?;
    let plan = session.store.load(plan_id).await?;

    println!("Plan: {}", display_name(&plan));
    println!("  ID:          {}", plan.id);
    if let Some(description) = &plan.description {
        println!("  Description: {description}");
    }
    println!("  Created:     {}", plan.created.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Updated:     {}", plan.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "  Zone:        {}",
        plan.zone().map_or("not set".to_string(), |z| z.to_string())
    );
    let frameworks = &plan.stage(Stage::Identification).good_practice.frameworks;
    if !frameworks.is_empty() {
        println!("  Frameworks:  {}", frameworks.join(", "));
    }
    println!();

    println!(
        "{:<16}  {:>10}  {:>8}  {:>6}  {:>9}",
        "STAGE", "HEURISTICS", "MAPPINGS", "POLICY", "PROGRESS"
    );
    for stage in Stage::ALL {
        let data = plan.stage(stage);
        let summary = StageSummary::from_groups(&group_stage(&plan, stage));
        println!(
            "{:<16}  {:>10}  {:>8}  {:>6}  {:>9}",
            stage.as_str(),
            data.personal_heuristics.len(),
            data.mappings.len(),
            data.policy_tasks.len(),
            format!("{}/{}", summary.completed, summary.total),
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// planner plan delete <plan-id>
// -----------------------------------------------------------------------

async fn cmd_delete(session: &Session, input: &str) -> Result<()> {
    let plan_id = resolve_plan_id(&session.store, input).await?;
    if session.store.delete(plan_id).await? {
        println!("Plan {plan_id} deleted.");
    } else {
        println!("Plan {plan_id} did not exist.");
    }
    Ok(())
}
