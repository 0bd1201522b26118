use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use planner_core::model::Stage;

use crate::resolve::resolve_plan_id;
use crate::session::Session;

/// Export a plan and its grouped checklist as pretty JSON.
pub async fn run_export(session: &Session, input: &str, output: Option<&Path>) -> Result<()> {
    let plan_id = resolve_plan_id(&session.store, input).await?;
    let export = session.aggregator().export(plan_id).await?;

    let mut writer: Box<dyn Write> = if let Some(path) = output {
        Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("cannot create output file: {}", path.display()))?,
        )
    } else {
        Box::new(std::io::stdout().lock())
    };

    serde_json::to_writer_pretty(&mut writer, &export).context("failed to write export")?;
    writeln!(writer)?;

    if let Some(path) = output {
        let total: usize = export.checklist.iter().map(|c| c.summary.total).sum();
        println!("Exported plan {plan_id} ({total} tasks) to {}", path.display());
    }

    Ok(())
}

/// Print a stage's tasks grouped by parent.
pub async fn run_parents(session: &Session, input: &str, stage: Stage) -> Result<()> {
    let plan_id = resolve_plan_id(&session.store, input).await?;
    let groups = session.aggregator().parents_by_stage(plan_id, stage).await?;

    if groups.is_empty() {
        println!("No tasks in {stage}.");
        return Ok(());
    }

    for group in &groups {
        println!("{} [{}]", group.label, group.source);
        for task in &group.tasks {
            let mark = if task.completed { "x" } else { " " };
            match &task.id {
                Some(id) => println!("  [{mark}] {}  ({id})", task.display_name),
                None => println!("  [{mark}] {}", task.display_name),
            }
        }
    }

    Ok(())
}
