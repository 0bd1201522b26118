//! Argument checks shared by the command handlers.
//!
//! - [`resolve_plan_id`] accepts a full plan UUID or a unique prefix of one.
//! - [`require_text`] rejects empty text before it reaches the core.
//! - [`applied`] turns a lifecycle `false` into an error for the user.

use anyhow::{Result, bail};
use uuid::Uuid;

use planner_core::PlanStore;

/// Resolve `input` to a plan id. A full UUID is returned as is; anything
/// else must be a prefix matching exactly one stored plan.
pub async fn resolve_plan_id(store: &PlanStore, input: &str) -> Result<Uuid> {
    let input = input.trim();
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    if input.len() < 4 {
        bail!("plan ID prefix {input:?} is too short (use at least 4 characters)");
    }

    let prefix = input.to_ascii_lowercase();
    let matches: Vec<Uuid> = store
        .list()
        .await?
        .into_iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no plan matches {input:?}"),
        _ => bail!("plan ID prefix {input:?} is ambiguous ({} matches)", matches.len()),
    }
}

/// Trimmed `text`, or an error naming `what` when it is empty.
pub fn require_text<'a>(text: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bail!("{what} must not be empty");
    }
    Ok(trimmed)
}

/// Map a lifecycle result to an error describing what failed.
pub fn applied(ok: bool, action: &str) -> Result<()> {
    if !ok {
        bail!("could not {action}: the plan or item was not found, or the change could not be saved");
    }
    Ok(())
}
