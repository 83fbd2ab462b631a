//! Embedded PostgreSQL helpers for the store integration tests.
//!
//! Each test gets a temporary database cloned from a template that carries
//! `fixtures/pricing_schema.sql`. Set `SKIP_TEST_CLUSTER=1` where the
//! embedded cluster cannot start.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock};

use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};
use uuid::Uuid;

const PRICING_SCHEMA: &str = include_str!("../fixtures/pricing_schema.sql");

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Render a `postgres` error with the SQLSTATE and server message.
///
/// `Display` on `postgres::Error` often collapses to `db error`.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    if let Some(where_) = db_error.where_() {
        summary.push_str("; where: ");
        summary.push_str(where_);
    }
    summary
}

/// True when `SKIP_TEST_CLUSTER` is "1", "true" or "yes" (any case).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Returns `None` with a skip marker when skipping is allowed, else panics.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// Process-wide embedded cluster.
pub fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    ensure_stable_password();
    pg_embedded_setup_unpriv::test_support::shared_cluster_handle()
}

/// Keeps the superuser password stable when the data directory is reused.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster bootstrap spawns any threads.
        unsafe {
            std::env::set_var("PG_PASSWORD", "pricing_embedded_test");
        }
    }
}

fn template_database_name() -> String {
    let mut hasher = DefaultHasher::new();
    PRICING_SCHEMA.hash(&mut hasher);
    format!("pricing_template_{:08x}", hasher.finish() & 0xffff_ffff)
}

fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, String> {
    let template_name = template_database_name();
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        let url = cluster.connection().database_url(&template_name);
        let mut client =
            Client::connect(url.as_str(), NoTls).map_err(|err| format_postgres_error(&err))?;
        client
            .batch_execute(PRICING_SCHEMA)
            .map_err(|err| format_postgres_error(&err))?;
    }
    Ok(template_name)
}

/// Temporary database with the pricing schema, dropped with the handle.
pub fn provision_pricing_database(cluster: &ClusterHandle) -> Result<TemporaryDatabase, String> {
    let template_name = ensure_template_database(cluster)?;
    let db_name = format!("test_{}", Uuid::new_v4().simple());
    cluster
        .temporary_database_from_template(db_name.as_str(), template_name.as_str())
        .map_err(|err| format!("create database from template: {err:?}"))
}
