//! Database query functions for the `plan_records` key-value table.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;

/// Fetch the JSON value stored under `key`.
pub async fn get_record(pool: &PgPool, key: &str) -> Result<Option<Value>> {
    let row: Option<(Value,)> = sqlx::query_as("SELECT value FROM plan_records WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to fetch record {key:?}"))?;

    Ok(row.map(|(value,)| value))
}

/// Insert or replace the value stored under `key`, bumping `updated_at`.
pub async fn upsert_record(pool: &PgPool, key: &str, value: &Value) -> Result<()> {
    sqlx::query(
        "INSERT INTO plan_records (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert record {key:?}"))?;

    Ok(())
}

/// Delete the record stored under `key`. Returns `true` if a row was removed.
pub async fn delete_record(pool: &PgPool, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM plan_records WHERE key = $1")
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete record {key:?}"))?;

    Ok(result.rows_affected() > 0)
}

/// List every key starting with `prefix`, ordered by key.
pub async fn list_keys(pool: &PgPool, prefix: &str) -> Result<Vec<String>> {
    let pattern = format!("{}%", escape_like(prefix));
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT key FROM plan_records WHERE key LIKE $1 ESCAPE '\\' ORDER BY key",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list records with prefix {prefix:?}"))?;

    Ok(rows.into_iter().map(|(key,)| key).collect())
}

/// Escape LIKE metacharacters so the prefix matches literally.
fn escape_like(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_passes_plain_prefix() {
        assert_eq!(escape_like("plan:"), "plan:");
    }

    #[test]
    fn escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("a_b%c\\"), "a\\_b\\%c\\\\");
    }
}
