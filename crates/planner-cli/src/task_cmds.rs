//! Handlers for heuristic, mapping, task and policy commands.

use anyhow::{Context, Result};

use planner_core::model::{NewTask, Stage};

use crate::plan_cmds::load_reference;
use crate::resolve::{applied, require_text, resolve_plan_id};
use crate::session::Session;
use crate::{HeuristicCommands, PolicyCommands, TaskCommands};

pub async fn run_heuristic_command(command: HeuristicCommands, session: &Session) -> Result<()> {
    let lifecycle = session.lifecycle();
    match command {
        HeuristicCommands::Add {
            plan_id,
            stage,
            text,
        } => {
            let text = require_text(&text, "heuristic text")?;
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let id = lifecycle
                .add_heuristic(plan_id, stage, text)
                .await
                .context("could not add heuristic")?;
            println!("Heuristic {id} added to {stage}.");
        }
        HeuristicCommands::Favourite {
            plan_id,
            stage,
            heuristic_id,
            unset,
        } => {
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let ok = lifecycle
                .set_heuristic_favourite(plan_id, stage, &heuristic_id, !unset)
                .await;
            applied(ok, "update favourite (at most three favourites per stage)")?;
            let state = if unset { "unmarked" } else { "marked" };
            println!("Heuristic {heuristic_id} {state} as favourite.");
        }
    }
    Ok(())
}

pub async fn run_map(
    session: &Session,
    plan_id: &str,
    stage: Stage,
    heuristic_id: &str,
    factor_id: Option<&str>,
) -> Result<()> {
    let plan_id = resolve_plan_id(&session.store, plan_id).await?;
    let ok = session
        .lifecycle()
        .add_mapping(plan_id, heuristic_id, factor_id, stage)
        .await;
    applied(ok, "save mapping")?;
    match factor_id {
        Some(factor) => println!("Heuristic {heuristic_id} mapped to {factor} in {stage}."),
        None => println!("Heuristic {heuristic_id} mapped to no factor in {stage}."),
    }
    Ok(())
}

pub async fn run_task_command(
    command: TaskCommands,
    session: &Session,
    reference_url: Option<&str>,
) -> Result<()> {
    let lifecycle = session.lifecycle();
    match command {
        TaskCommands::Add {
            plan_id,
            stage,
            text,
            origin,
            source,
            priority,
            due,
        } => {
            let text = require_text(&text, "task text")?;
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let mut task = NewTask::new(text, origin);
            task.source_id = source;
            task.priority = priority;
            task.due_date = due;
            let id = lifecycle
                .add_task(plan_id, task, stage)
                .await
                .context("could not add task")?;
            println!("Task {id} added to {stage}.");
        }
        TaskCommands::Done {
            plan_id,
            stage,
            task_id,
            undo,
        } => {
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let ok = lifecycle
                .update_task_status(plan_id, &task_id, !undo, stage)
                .await;
            applied(ok, "update task")?;
            let state = if undo { "not done" } else { "done" };
            println!("Task {task_id} marked {state}.");
        }
        TaskCommands::Remove {
            plan_id,
            stage,
            task_id,
        } => {
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            applied(
                lifecycle.remove_task(plan_id, &task_id, stage).await,
                "remove task",
            )?;
            println!("Task {task_id} removed.");
        }
        TaskCommands::Import {
            plan_id,
            stage,
            factor_id,
        } => {
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let reference = load_reference(reference_url).await;
            let added = lifecycle
                .import_factor_tasks(plan_id, &factor_id, stage, &reference)
                .await;
            println!("Imported {added} tasks for {factor_id} into {stage}.");
        }
    }
    Ok(())
}

pub async fn run_policy_command(command: PolicyCommands, session: &Session) -> Result<()> {
    let lifecycle = session.lifecycle();
    match command {
        PolicyCommands::Add {
            plan_id,
            stage,
            text,
        } => {
            let text = require_text(&text, "policy text")?;
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            let id = lifecycle
                .add_policy_task(plan_id, text, stage)
                .await
                .context("could not add policy task")?;
            println!("Policy task {id} added to {stage}.");
        }
        PolicyCommands::Remove {
            plan_id,
            stage,
            task_id,
        } => {
            let plan_id = resolve_plan_id(&session.store, &plan_id).await?;
            applied(
                lifecycle.remove_policy_task(plan_id, &task_id, stage).await,
                "remove policy task",
            )?;
            println!("Policy task {task_id} removed.");
        }
    }
    Ok(())
}
