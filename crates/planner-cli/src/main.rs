mod config;
mod export_cmd;
mod plan_cmds;
mod practice_cmds;
mod resolve;
mod session;
mod task_cmds;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use planner_core::model::{Priority, Stage, TaskOrigin};
use planner_core::zone::{Scope, Uncertainty, Zone};
use planner_db::config::DbConfig;
use planner_db::pool;

use config::{Backend, Overrides, PlannerConfig};
use session::Session;

#[derive(Parser)]
#[command(name = "planner", about = "Staged project planning: heuristics, factors, frameworks, checklists")]
struct Cli {
    /// Database URL (overrides PLANNER_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Storage backend: file or postgres (overrides PLANNER_STORAGE env var)
    #[arg(long, global = true)]
    storage: Option<Backend>,

    /// Directory for the file backend
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a planner config file
    Init {
        /// Storage backend to record in the config file
        #[arg(long, default_value = "file")]
        backend: Backend,
        /// Directory for the file backend
        #[arg(long)]
        dir: Option<PathBuf>,
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Reference data endpoint (preset heuristics and success factors)
        #[arg(long)]
        reference_url: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the PostgreSQL database
    DbInit,
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Personal heuristics
    Heuristic {
        #[command(subcommand)]
        command: HeuristicCommands,
    },
    /// Map a heuristic to a success factor (or to none)
    Map {
        plan_id: String,
        stage: Stage,
        heuristic_id: String,
        /// Success factor id (omit to map to no factor)
        #[arg(long)]
        factor: Option<String>,
    },
    /// Stage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Organizational policy tasks
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
    /// Zone recommendation
    Zone {
        #[command(subcommand)]
        command: ZoneCommands,
    },
    /// Good-practice framework selection
    Framework {
        #[command(subcommand)]
        command: FrameworkCommands,
    },
    /// Good-practice tasks
    Gp {
        #[command(subcommand)]
        command: GpCommands,
    },
    /// User-defined frameworks
    Custom {
        #[command(subcommand)]
        command: CustomCommands,
    },
    /// Show a stage's tasks grouped by where they came from
    Parents { plan_id: String, stage: Stage },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a new plan
    Create {
        /// Plan name
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Copy the preset heuristics into every stage
        #[arg(long)]
        seed: bool,
    },
    /// List all plans
    List,
    /// Show plan details
    Show { plan_id: String },
    /// Delete a plan
    Delete { plan_id: String },
    /// Export a plan and its checklist as JSON
    Export {
        plan_id: String,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum HeuristicCommands {
    /// Add a personal heuristic to a stage
    Add {
        plan_id: String,
        stage: Stage,
        text: String,
    },
    /// Mark a heuristic as a favourite (at most three per stage)
    Favourite {
        plan_id: String,
        stage: Stage,
        heuristic_id: String,
        /// Remove the favourite mark instead
        #[arg(long)]
        unset: bool,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to a stage
    Add {
        plan_id: String,
        stage: Stage,
        text: String,
        /// heuristic, factor, or policy
        #[arg(long, default_value = "factor")]
        origin: TaskOrigin,
        /// Id of the originating heuristic or factor
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Mark a task as done
    Done {
        plan_id: String,
        stage: Stage,
        task_id: String,
        /// Mark as not done instead
        #[arg(long)]
        undo: bool,
    },
    /// Remove a task
    Remove {
        plan_id: String,
        stage: Stage,
        task_id: String,
    },
    /// Import a success factor's suggested tasks for a stage
    Import {
        plan_id: String,
        stage: Stage,
        factor_id: String,
    },
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Add a policy task
    Add {
        plan_id: String,
        stage: Stage,
        text: String,
    },
    /// Remove a policy task
    Remove {
        plan_id: String,
        stage: Stage,
        task_id: String,
    },
}

#[derive(Subcommand)]
pub enum ZoneCommands {
    /// Recommend a zone from scope and uncertainty
    Calc {
        /// small, medium, or large
        #[arg(long)]
        scope: Option<Scope>,
        /// low, medium, or high
        #[arg(long)]
        uncertainty: Option<Uncertainty>,
    },
    /// Set the plan's zone
    Set {
        plan_id: String,
        /// A..E or "Zone A".."Zone E"
        zone: Option<Zone>,
        /// Clear the zone instead
        #[arg(long, conflicts_with = "zone")]
        clear: bool,
    },
}

#[derive(Subcommand)]
pub enum FrameworkCommands {
    /// Select or deselect a framework (deselecting drops its tasks)
    Toggle { plan_id: String, code: String },
    /// List built-in frameworks
    List {
        /// Only frameworks recommended for this zone
        #[arg(long)]
        zone: Option<Zone>,
    },
}

#[derive(Subcommand)]
pub enum GpCommands {
    /// Add or remove a good-practice task
    Toggle {
        plan_id: String,
        stage: Stage,
        code: String,
        text: String,
    },
}

#[derive(Subcommand)]
pub enum CustomCommands {
    /// Create a custom framework
    Create { plan_id: String, name: String },
    /// Add a task to a custom framework
    Add {
        plan_id: String,
        framework_id: String,
        stage: Stage,
        text: String,
    },
    /// Remove a task by position (0-based)
    RemoveTask {
        plan_id: String,
        framework_id: String,
        stage: Stage,
        index: usize,
    },
    /// Delete a custom framework and its tasks
    Remove { plan_id: String, framework_id: String },
}

/// Execute the `planner init` command: write config file.
fn cmd_init(
    backend: Backend,
    dir: Option<PathBuf>,
    db_url: &str,
    reference_url: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        storage: config::StorageSection {
            backend,
            data_dir: dir,
        },
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        reference: config::ReferenceSection { url: reference_url },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  storage.backend = {backend}");
    if let Some(dir) = &cfg.storage.data_dir {
        println!("  storage.data_dir = {}", dir.display());
    }
    println!("  database.url = {db_url}");
    if let Some(url) = &cfg.reference.url {
        println!("  reference.url = {url}");
    }
    if backend == Backend::Postgres {
        println!();
        println!("Next: run `planner db-init` to create and migrate the database.");
    }

    Ok(())
}

/// Execute the `planner db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &PlannerConfig) -> anyhow::Result<()> {
    println!("Initializing planner database...");

    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database {}", resolved.db_config.database_name().unwrap_or("-"));
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let count = pool::record_count(&db_pool).await?;
    println!("Database ready. plan_records: {count} rows");

    db_pool.close().await;

    println!("planner db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        database_url: cli.database_url.as_deref(),
        storage: cli.storage,
        data_dir: cli.data_dir.as_deref(),
    };

    match cli.command {
        Commands::Init {
            backend,
            dir,
            db_url,
            reference_url,
            force,
        } => {
            cmd_init(backend, dir, &db_url, reference_url, force)?;
        }
        Commands::DbInit => {
            let resolved = PlannerConfig::resolve(&overrides)?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Zone {
            command: ZoneCommands::Calc { scope, uncertainty },
        } => {
            practice_cmds::cmd_zone_calc(scope, uncertainty);
        }
        Commands::Framework {
            command: FrameworkCommands::List { zone },
        } => {
            practice_cmds::cmd_framework_list(zone);
        }
        command => {
            let resolved = PlannerConfig::resolve(&overrides)?;
            let session = Session::open(&resolved).await?;
            let result = run_store_command(command, &session, &resolved).await;
            session.close().await;
            result?;
        }
    }

    Ok(())
}

/// Commands that need the plan store.
async fn run_store_command(
    command: Commands,
    session: &Session,
    resolved: &PlannerConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::Plan { command } => {
            plan_cmds::run_plan_command(command, session, resolved.reference_url.as_deref()).await
        }
        Commands::Parents { plan_id, stage } => {
            export_cmd::run_parents(session, &plan_id, stage).await
        }
        Commands::Heuristic { command } => {
            task_cmds::run_heuristic_command(command, session).await
        }
        Commands::Map {
            plan_id,
            stage,
            heuristic_id,
            factor,
        } => task_cmds::run_map(session, &plan_id, stage, &heuristic_id, factor.as_deref()).await,
        Commands::Task { command } => {
            task_cmds::run_task_command(command, session, resolved.reference_url.as_deref()).await
        }
        Commands::Policy { command } => task_cmds::run_policy_command(command, session).await,
        Commands::Zone { command } => practice_cmds::run_zone_command(command, session).await,
        Commands::Framework { command } => {
            practice_cmds::run_framework_command(command, session).await
        }
        Commands::Gp { command } => practice_cmds::run_gp_command(command, session).await,
        Commands::Custom { command } => practice_cmds::run_custom_command(command, session).await,
        Commands::Init { .. } | Commands::DbInit => {
            anyhow::bail!("this command does not use the plan store")
        }
    }
}
