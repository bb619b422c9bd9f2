//! Typed process configuration, read once from the environment at startup.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};

use taskdash_core::{config as core_config, ExportSettings};
use taskdash_store::{DriveConfig, DriveStore, ObjectStore, S3Config, S3Store};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub interval_minutes: i64,
    pub s3_enabled: bool,
    pub drive_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let interval_minutes = env::var("EXPORT_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<i64>()
            .context("EXPORT_INTERVAL_MINUTES must be an integer")?;
        core_config::validate_interval(interval_minutes)?;

        Ok(Self {
            port,
            database_url,
            interval_minutes,
            s3_enabled: env_flag("AWS_S3_ENABLED"),
            drive_enabled: env_flag("GOOGLE_DRIVE_ENABLED"),
        })
    }

    pub fn export_settings(&self, enabled: bool) -> Result<ExportSettings> {
        Ok(ExportSettings::new(enabled, self.interval_minutes)?)
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn s3_config_from_env() -> S3Config {
    S3Config {
        access_key_id: env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
        secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
        region: env::var("AWS_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        bucket: env_opt("AWS_S3_BUCKET_NAME"),
        endpoint: env_opt("AWS_S3_ENDPOINT"),
    }
}

pub fn drive_config_from_env() -> DriveConfig {
    DriveConfig {
        service_account_key: env::var("GOOGLE_SERVICE_ACCOUNT_KEY").unwrap_or_default(),
        folder_id: env_opt("GOOGLE_DRIVE_FOLDER_ID"),
    }
}

/// Connect the S3 store from env credentials. Failures are logged and
/// reported as an absent client; the exporter then refuses to start rather
/// than crash the process.
pub async fn connect_s3_store() -> Option<Arc<dyn ObjectStore>> {
    match S3Store::connect(s3_config_from_env()).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::error!(error = %e, "S3 store unavailable");
            None
        }
    }
}

pub async fn connect_drive_store() -> Option<Arc<dyn ObjectStore>> {
    match DriveStore::connect(drive_config_from_env()).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::error!(error = %e, "Drive store unavailable");
            None
        }
    }
}
