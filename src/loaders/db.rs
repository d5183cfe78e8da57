// src/loaders/db.rs
//! Connection pool for paging the voter file out of PostgreSQL.
//!
//! Settings come from `VOTERFILE_DB_*` variables, each falling back to the
//! matching `POSTGRES_*` variable so a shared `.env` keeps working.

use anyhow::{Context, Result};
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::info;
use std::env;
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

const APPLICATION_NAME: &str = "voter_linkage";

/// Pages are read one at a time, so the pool stays small.
const POOL_SIZE: u32 = 2;

fn db_var(suffix: &str) -> Option<String> {
    env::var(format!("VOTERFILE_DB_{}", suffix))
        .or_else(|_| env::var(format!("POSTGRES_{}", suffix)))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoterDbSettings {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub connect_timeout_secs: u64,
}

impl Default for VoterDbSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            dbname: "fl_election".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            connect_timeout_secs: 10,
        }
    }
}

impl VoterDbSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: db_var("HOST").unwrap_or(defaults.host),
            port: db_var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dbname: db_var("DB").unwrap_or(defaults.dbname),
            user: db_var("USER").unwrap_or(defaults.user),
            password: db_var("PASSWORD").unwrap_or(defaults.password),
            connect_timeout_secs: db_var("CONNECT_TIMEOUT")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.connect_timeout_secs),
        }
    }

    pub fn pg_config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .application_name(APPLICATION_NAME)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs));
        config
    }

    pub fn log_config(&self) {
        info!("🗄️  Voter-file database");
        info!("   {}@{}:{}/{}", self.user, self.host, self.port, self.dbname);
    }
}

/// Builds the pool and checks one connection with `SELECT 1`.
pub async fn connect(settings: &VoterDbSettings) -> Result<PgPool> {
    settings.log_config();
    let manager = PostgresConnectionManager::new(settings.pg_config(), NoTls);
    let pool = Pool::builder()
        .max_size(POOL_SIZE)
        .connection_timeout(Duration::from_secs(settings.connect_timeout_secs + 5))
        .build(manager)
        .await
        .with_context(|| {
            format!(
                "Failed to build voter-file pool for {}:{}/{}",
                settings.host, settings.port, settings.dbname
            )
        })?;

    let conn = pool
        .get()
        .await
        .context("Failed to get a voter-file connection from the pool")?;
    conn.query_one("SELECT 1", &[])
        .await
        .context("Voter-file database did not answer SELECT 1")?;
    drop(conn);
    info!("Voter-file database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voterfile_vars_override_postgres_vars() {
        env::set_var("POSTGRES_HOST", "shared-host");
        env::set_var("POSTGRES_DB", "shared_db");
        env::set_var("VOTERFILE_DB_DB", "voters");
        env::set_var("VOTERFILE_DB_PORT", "6543");

        let settings = VoterDbSettings::from_env();
        assert_eq!(settings.host, "shared-host");
        assert_eq!(settings.dbname, "voters");
        assert_eq!(settings.port, 6543);

        for var in ["POSTGRES_HOST", "POSTGRES_DB", "VOTERFILE_DB_DB", "VOTERFILE_DB_PORT"] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_pg_config_carries_settings() {
        let settings = VoterDbSettings {
            dbname: "voters".to_string(),
            user: "linker".to_string(),
            ..Default::default()
        };
        let config = settings.pg_config();
        assert_eq!(config.get_dbname(), Some("voters"));
        assert_eq!(config.get_user(), Some("linker"));
        assert_eq!(config.get_ports(), &[5432]);
        assert_eq!(config.get_application_name(), Some(APPLICATION_NAME));
    }
}
