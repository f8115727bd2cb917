use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: String,
    pub database_url: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    /// Fixed public host that blob URLs are concatenated from, e.g.
    /// `https://myaccount.blob.example.net`.
    pub storage_public_url: String,
    pub original_container: String,
    pub thumbnail_container: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_busy_timeout_seconds: u64,
    pub session_ttl_hours: u64,
    pub upload_max_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
        let app_mode = env_or("APP_MODE", "api");

        Ok(Self {
            http_addr,
            app_mode,
            database_url: env_or_err("DATABASE_URL")?,
            s3_endpoint: env_or_err("S3_ENDPOINT")?,
            s3_region: env_or("S3_REGION", "fr-par"),
            storage_public_url: env_or_err("STORAGE_PUBLIC_URL")?,
            original_container: env_or("ORIGINAL_CONTAINER", "original"),
            thumbnail_container: env_or("THUMBNAIL_CONTAINER", "thumbnail"),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "5")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_busy_timeout_seconds: env_or_parse("DB_BUSY_TIMEOUT_SECONDS", "5")?,
            session_ttl_hours: env_or_parse("SESSION_TTL_HOURS", "168")?,
            upload_max_bytes: env_or_parse("UPLOAD_MAX_BYTES", "10485760")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
