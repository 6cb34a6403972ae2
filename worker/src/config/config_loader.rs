use anyhow::{Context, Result, bail};

use super::config_model::{Database, DotEnvyConfig, InternalApi, Sweeps, WorkerServer};

pub const DEFAULT_SUBSCRIPTION_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_DELETION_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_ERASURE_STATEMENT_TIMEOUT_SECS: u64 = 30;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: std::env::var("SERVER_PORT_WORKER")
            .context("SERVER_PORT_WORKER is invalid")?
            .parse()
            .context("SERVER_PORT_WORKER must be a port number")?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .context("SERVER_BODY_LIMIT is invalid")?
            .parse()
            .context("SERVER_BODY_LIMIT must be a whole number of MiB")?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .context("SERVER_TIMEOUT is invalid")?
            .parse()
            .context("SERVER_TIMEOUT must be a whole number of seconds")?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
    };

    let internal_api = InternalApi {
        token: std::env::var("INTERNAL_WORKER_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    };

    let sweeps = Sweeps {
        subscription_interval_secs: parse_interval(
            "SUBSCRIPTION_SWEEP_INTERVAL_SECS",
            std::env::var("SUBSCRIPTION_SWEEP_INTERVAL_SECS").ok().as_deref(),
            DEFAULT_SUBSCRIPTION_SWEEP_INTERVAL_SECS,
        )?,
        deletion_interval_secs: parse_interval(
            "DELETION_SWEEP_INTERVAL_SECS",
            std::env::var("DELETION_SWEEP_INTERVAL_SECS").ok().as_deref(),
            DEFAULT_DELETION_SWEEP_INTERVAL_SECS,
        )?,
        delete_buffer_days: parse_delete_buffer_days(
            std::env::var("DELETE_BUFFER_DAYS").ok().as_deref(),
        )?,
        erasure_statement_timeout_secs: parse_interval(
            "ERASURE_STATEMENT_TIMEOUT_SECS",
            std::env::var("ERASURE_STATEMENT_TIMEOUT_SECS").ok().as_deref(),
            DEFAULT_ERASURE_STATEMENT_TIMEOUT_SECS,
        )?,
    };

    Ok(DotEnvyConfig {
        worker_server,
        database,
        internal_api,
        sweeps,
    })
}

/// Extra days on top of the stored deletion schedule. Unset means 0.
pub fn parse_delete_buffer_days(raw: Option<&str>) -> Result<u32> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(0),
        Some(value) => {
            let days: i64 = value
                .parse()
                .with_context(|| format!("DELETE_BUFFER_DAYS is invalid: {value:?}"))?;
            if days < 0 {
                bail!("DELETE_BUFFER_DAYS must not be negative (got {days})");
            }
            u32::try_from(days).context("DELETE_BUFFER_DAYS is too large")
        }
    }
}

fn parse_interval(name: &str, raw: Option<&str>, default: u64) -> Result<u64> {
    let secs = match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => return Ok(default),
        Some(value) => value
            .parse::<u64>()
            .with_context(|| format!("{name} is invalid: {value:?}"))?,
    };

    if secs == 0 {
        bail!("{name} must be greater than zero");
    }

    Ok(secs)
}
