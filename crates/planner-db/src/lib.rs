//! PostgreSQL plumbing for the planner: connection config, pool creation,
//! embedded migrations, and key-value queries over the `plan_records` table.

pub mod config;
pub mod pool;
pub mod queries;
