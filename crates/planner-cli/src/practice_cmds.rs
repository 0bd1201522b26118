//! Handlers for zone, framework, good-practice and custom framework
//! commands.

use anyhow::{Context, Result, bail};

use planner_core::presets::framework_catalog;
use planner_core::zone::{Scope, Uncertainty, Zone, calculate_zone, frameworks_for_zone, zone_description};

use crate::resolve::{applied, require_text, resolve_plan_id};
use crate::session::Session;
use crate::{CustomCommands, FrameworkCommands, GpCommands, ZoneCommands};

// -----------------------------------------------------------------------
// Zone
// -----------------------------------------------------------------------

pub fn cmd_zone_calc(scope: Option<Scope>, uncertainty: Option<Uncertainty>) {
    let Some(zone) = calculate_zone(scope, uncertainty) else {
        println!("Both --scope and --uncertainty are needed to recommend a zone.");
        return;
    };
    println!("{zone}: {}", zone_description(zone));
    println!("Recommended frameworks: {}", frameworks_for_zone(zone).join(", "));
}

pub async fn run_zone_command(command: ZoneCommands, session: &Session) -> Result<()> {
    match command {
        ZoneCommands::Calc { scope, uncertainty } => cmd_zone_calc(scope, uncertainty),
        ZoneCommands::Set {
            plan_id,
            zone,
            clear,
        } => {
            if zone.is_none() && !clear {
                bail!("give a zone (A..E) or --clear");
            }
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            applied(session.lifecycle().set_zone(plan_id, zone).await, "set zone")?;
            match zone {
                Some(zone) => println!("Zone set to {zone}."),
                None => println!("Zone cleared."),
            }
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Frameworks
// -----------------------------------------------------------------------

pub fn cmd_framework_list(zone: Option<Zone>) {
    let catalog = framework_catalog();
    let codes: Vec<&str> = match zone {
        Some(zone) => frameworks_for_zone(zone).to_vec(),
        None => catalog.iter().map(|f| f.code.as_str()).collect(),
    };

    let code_w = codes.iter().map(|c| c.len()).max().unwrap_or(4).max(4);
    println!("{:<code_w$}  NAME", "CODE");
    for code in codes {
        if let Some(framework) = catalog.iter().find(|f| f.code == code) {
            println!("{:<code_w$}  {}", framework.code, framework.name);
        }
    }
}

pub async fn run_framework_command(command: FrameworkCommands, session: &Session) -> Result<()> {
    match command {
        FrameworkCommands::Toggle { plan_id, code } => {
            let code = require_text(&code, "framework code")?;
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let lifecycle = session.lifecycle();
            applied(lifecycle.toggle_framework(plan_id, code).await, "toggle framework")?;

            let plan = session.store.load(plan_id).await?;
            let selected = plan
                .stages
                .iter()
                .any(|(_, data)| data.good_practice.frameworks.iter().any(|c| c == code));
            let state = if selected { "selected" } else { "deselected" };
            println!("Framework {code} {state}.");
        }
        FrameworkCommands::List { zone } => cmd_framework_list(zone),
    }
    Ok(())
}

pub async fn run_gp_command(command: GpCommands, session: &Session) -> Result<()> {
    match command {
        GpCommands::Toggle {
            plan_id,
            stage,
            code,
            text,
        } => {
            let text = require_text(&text, "task text")?;
            let code = require_text(&code, "framework code")?;
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            applied(
                session.lifecycle().toggle_gp_task(plan_id, text, code, stage).await,
                "toggle good-practice task",
            )?;
            println!("Toggled {code} task in {stage}.");
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Custom frameworks
// -----------------------------------------------------------------------

pub async fn run_custom_command(command: CustomCommands, session: &Session) -> Result<()> {
    let lifecycle = session.lifecycle();
    match command {
        CustomCommands::Create { plan_id, name } => {
            let name = require_text(&name, "framework name")?;
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let id = lifecycle
                .create_custom_framework(plan_id, name)
                .await
                .context("could not create custom framework")?;
            println!("Custom framework {id} created.");
        }
        CustomCommands::Add {
            plan_id,
            framework_id,
            stage,
            text,
        } => {
            let text = require_text(&text, "task text")?;
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            applied(
                lifecycle
                    .add_task_to_custom_framework(plan_id, &framework_id, stage, text)
                    .await,
                "add task to custom framework",
            )?;
            println!("Task added to {framework_id} in {stage}.");
        }
        CustomCommands::RemoveTask {
            plan_id,
            framework_id,
            stage,
            index,
        } => {
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            applied(
                lifecycle
                    .remove_task_from_custom_framework(plan_id, &framework_id, stage, index)
                    .await,
                "remove custom framework task",
            )?;
            println!("Task {index} removed from {framework_id} in {stage}.");
        }
        CustomCommands::Remove {
            plan_id,
            framework_id,
        } => {
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            applied(
                lifecycle.remove_custom_framework(plan_id, &framework_id).await,
                "remove custom framework",
            )?;
            println!("Custom framework {framework_id} removed.");
        }
    }
    Ok(())
}
