//! Run one pricing index refresh and print the summary as JSON.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use pricing_backend::bootstrap::build_refresh_service;
use pricing_backend::domain::ports::PricingRefreshCommand;
use pricing_backend::outbound::persistence::{DbPool, PoolConfig};
use pricing_backend::settings::RefreshSettings;

/// `refresh-pricing` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "refresh-pricing",
    about = "Refresh CPI and regional price parity indices and recompute location pricing",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Pretty-print the JSON summary.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: CliArgs) -> Result<()> {
    let database_url = resolve_database_url(args.database_url)?;
    // Settings come from the environment and config files only; the CLI
    // flags above belong to this binary.
    let settings = RefreshSettings::load_from_iter([OsString::from("refresh-pricing")])
        .map_err(|error| eyre!("load refresh settings: {error}"))?;

    // One run holds one connection for its whole transaction.
    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(1))
        .await
        .wrap_err("create database pool")?;
    let service = build_refresh_service(&settings, pool).wrap_err("build refresh service")?;

    let run = service
        .run_refresh()
        .await
        .wrap_err("pricing refresh failed")?;

    let summary = if args.pretty {
        serde_json::to_string_pretty(&run)
    } else {
        serde_json::to_string(&run)
    }
    .wrap_err("serialise refresh summary")?;
    println!("{summary}");
    Ok(())
}

fn resolve_database_url(explicit: Option<String>) -> Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(eyre!("--database-url must not be empty when provided"));
        }
        return Ok(value);
    }

    let from_env = env::var("DATABASE_URL")
        .map_err(|_| eyre!("database URL missing: set --database-url or DATABASE_URL"))?;
    if from_env.trim().is_empty() {
        return Err(eyre!("DATABASE_URL must not be empty"));
    }
    Ok(from_env)
}
