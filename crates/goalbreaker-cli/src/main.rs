mod config;
mod goal_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use goalbreaker_core::generation::{GeminiClient, GoalDecomposer};
use goalbreaker_db::pool;

use config::AppConfig;

#[derive(Parser)]
#[command(
    name = "goalbreaker",
    about = "Break vague goals into five actionable steps with an LLM"
)]
struct Cli {
    /// Database URL (overrides GOALBREAKER_DATABASE_URL / DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a goalbreaker config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/goalbreaker")]
        db_url: String,
        /// Gemini API key
        #[arg(long)]
        api_key: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if missing and run migrations
    DbInit,
    /// Run migrations and start the HTTP API
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Goal management
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
}

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Break a goal into five steps and store it
    Create {
        /// Goal text (3 to 200 characters)
        text: String,
    },
    /// Show a goal and its tasks
    Show {
        /// Goal ID
        goal_id: String,
    },
    /// Replace a goal's tasks with a fresh decomposition
    Regenerate {
        /// Goal ID
        goal_id: String,
    },
    /// List all goals, newest first
    List,
    /// Delete a goal and its tasks
    Delete {
        /// Goal ID
        goal_id: String,
    },
}

impl GoalCommands {
    /// Whether the command calls the generation service.
    pub fn needs_generation(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Regenerate { .. })
    }
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Set a task's status
    Status {
        /// Task ID
        task_id: String,
        /// New status: pending or completed
        status: String,
    },
}

/// Execute the `goalbreaker init` command: write the config file.
fn cmd_init(db_url: &str, api_key: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if api_key.trim().is_empty() {
        anyhow::bail!("--api-key must not be empty");
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generation: config::GenerationSection {
            api_key: api_key.to_string(),
            ..Default::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  generation.api_key = <{} chars>", api_key.chars().count());
    println!();
    println!("Next: run `goalbreaker db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `goalbreaker db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let db_config = AppConfig::resolve_db(cli_db_url)?;

    println!("Initializing goalbreaker database...");

    pool::ensure_database_exists(&db_config).await?;
    let db_pool = pool::create_pool(&db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        let counts = pool::table_counts(&db_pool).await?;
        println!("Database ready.");
        println!("  goals: {}", counts.goals);
        println!(
            "  tasks: {} ({} completed)",
            counts.tasks, counts.completed_tasks
        );
        anyhow::Ok(())
    }
    .await;
    db_pool.close().await;
    result?;

    println!("goalbreaker db-init complete.");
    Ok(())
}

/// Execute the `goalbreaker serve` command.
async fn cmd_serve(cli_db_url: Option<&str>, bind: &str, port: u16) -> anyhow::Result<()> {
    let resolved = AppConfig::resolve(cli_db_url)?;
    tracing::info!(
        model = %resolved.generation.model,
        timeout_secs = resolved.generation.timeout.as_secs(),
        max_retries = resolved.generation.max_retries,
        "generation service configured"
    );
    let decomposer: Arc<dyn GoalDecomposer> = Arc::new(GeminiClient::new(resolved.generation)?);

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        let state = serve_cmd::AppState {
            pool: db_pool.clone(),
            decomposer,
        };
        serve_cmd::run_serve(state, bind, port).await
    }
    .await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            force,
        } => {
            cmd_init(&db_url, &api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), &bind, port).await?;
        }
        Commands::Goal { command } => {
            let decomposer = if command.needs_generation() {
                let resolved = AppConfig::resolve(cli.database_url.as_deref())?;
                Some((resolved.db_config, GeminiClient::new(resolved.generation)?))
            } else {
                None
            };
            let db_config = match &decomposer {
                Some((db_config, _)) => db_config.clone(),
                None => AppConfig::resolve_db(cli.database_url.as_deref())?,
            };
            let db_pool = pool::create_pool(&db_config).await?;
            let result = goal_cmds::run_goal_command(
                command,
                &db_pool,
                decomposer
                    .as_ref()
                    .map(|(_, client)| client as &dyn GoalDecomposer),
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Task { command } => {
            let db_config = AppConfig::resolve_db(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&db_config).await?;
            let result = goal_cmds::run_task_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
