//! Shared test utilities for goalbreaker integration tests.
//!
//! Provides a PostgreSQL instance shared across tests (each test gets its own
//! database within the instance) and [`ScriptedDecomposer`], a stand-in for
//! the generation service.
//!
//! Two modes for PostgreSQL:
//! - **`GOALBREAKER_TEST_PG_URL`** set: use that server directly. The URL
//!   points at the server root, without a database name.
//! - **No env var**: spin up a container via testcontainers, shared per test
//!   binary through a `OnceCell`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use goalbreaker_core::generation::{Decomposition, GenerationError, GoalDecomposer, StepDraft};
use goalbreaker_db::pool;

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// Shared server state: base URL and optional container handle (kept alive).
struct SharedPg {
    base_url: String,
    /// Held to keep the container alive. `None` when using an external URL.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("GOALBREAKER_TEST_PG_URL") {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_string(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("17")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Base URL for the shared PostgreSQL (server root, no database name).
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

async fn maintenance_pool() -> PgPool {
    let maint_url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&maint_url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a temporary database with migrations applied.
///
/// Returns `(pool, db_name)`. Call [`drop_test_db`] with the returned
/// `db_name` when the test is done.
pub async fn create_test_db() -> (PgPool, String) {
    let maint_pool = maintenance_pool().await;

    let db_name = format!("goalbreaker_test_{}", Uuid::new_v4().simple());
    let stmt = format!("CREATE DATABASE {db_name}");
    maint_pool
        .execute(stmt.as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let temp_url = format!("{}/{db_name}", pg_url().await);
    let temp_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&temp_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a temporary database, terminating any remaining connections first.
pub async fn drop_test_db(db_name: &str) {
    let maint_pool = maintenance_pool().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint_pool.execute(terminate.as_str()).await;

    let stmt = format!("DROP DATABASE IF EXISTS {db_name}");
    let _ = maint_pool.execute(stmt.as_str()).await;
    maint_pool.close().await;
}

// ---------------------------------------------------------------------------
// Generation stub
// ---------------------------------------------------------------------------

/// A five-step decomposition whose titles are `"{prefix} step 1"` .. `"{prefix} step 5"`.
pub fn decomposition(complexity: i32, prefix: &str) -> Decomposition {
    Decomposition {
        complexity,
        tasks: (1..=5)
            .map(|n| StepDraft {
                title: format!("{prefix} step {n}"),
            })
            .collect(),
    }
}

/// One scripted reply of a [`ScriptedDecomposer`].
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return this decomposition as-is (it is not validated by the stub).
    Steps(Decomposition),
    /// Fail with `GenerationError::Api { status: 503, message }`.
    Fail(String),
}

/// Replays scripted replies in order. The last reply repeats once the script
/// runs out. Records every goal text it was asked to decompose.
pub struct ScriptedDecomposer {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedDecomposer {
    /// # Panics
    ///
    /// Panics if `script` is empty.
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        let script: VecDeque<Scripted> = script.into_iter().collect();
        assert!(!script.is_empty(), "script needs at least one reply");
        Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always succeed with `decomposition`.
    pub fn succeeding(decomposition: Decomposition) -> Self {
        Self::new([Scripted::Steps(decomposition)])
    }

    /// Always fail.
    pub fn failing(message: &str) -> Self {
        Self::new([Scripted::Fail(message.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Goal texts received so far, in call order.
    pub fn seen_goals(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Scripted {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl GoalDecomposer for ScriptedDecomposer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decompose(&self, goal_text: &str) -> Result<Decomposition, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(goal_text.to_string());
        match self.next_reply() {
            Scripted::Steps(d) => Ok(d),
            Scripted::Fail(message) => Err(GenerationError::Api {
                status: 503,
                message,
            }),
        }
    }
}
