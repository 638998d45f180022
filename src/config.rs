use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Bearer token required on admin routes (reconciliation trigger, ledger search).
    pub admin_token: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/propad_wallet".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            admin_token: std::env::var("ADMIN_TOKEN")
                .map_err(|_| config::ConfigError::NotFound("ADMIN_TOKEN".to_string()))?,
        })
    }
}
