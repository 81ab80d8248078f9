use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub client_url: String,
    pub jwt_secret: String,
    pub payos: PayOsConfig,
}

#[derive(Debug, Clone)]
pub struct PayOsConfig {
    pub client_id: String,
    pub api_key: String,
    pub checksum_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let client_url =
            env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        Ok(Self {
            port,
            database_url,
            host,
            client_url,
            jwt_secret,
            payos: PayOsConfig::from_env()?,
        })
    }
}

impl PayOsConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id = env::var("PAYOS_CLIENT_ID").context("PAYOS_CLIENT_ID is not set")?;
        let api_key = env::var("PAYOS_API_KEY").context("PAYOS_API_KEY is not set")?;
        let checksum_key =
            env::var("PAYOS_CHECKSUM_KEY").context("PAYOS_CHECKSUM_KEY is not set")?;
        let base_url = env::var("PAYOS_BASE_URL")
            .unwrap_or_else(|_| "https://api-merchant.payos.vn".to_string());
        let timeout_secs = env::var("PAYOS_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(15);
        Ok(Self {
            client_id,
            api_key,
            checksum_key,
            base_url,
            timeout_secs,
        })
    }
}
