use anyhow::{Context, Result};

use super::config_model::{AuthSecret, BackendServer, Database, DotEnvyConfig};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .context("SERVER_PORT_BACKEND is invalid")?
            .parse()
            .context("SERVER_PORT_BACKEND must be a port number")?,
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

    let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET is invalid")?;
    if jwt_secret.trim().is_empty() {
        anyhow::bail!("JWT_SECRET must not be empty");
    }

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth: AuthSecret { jwt_secret },
    })
}
