// src/config/mod.rs
// Environment-driven configuration with typed defaults.

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    // ── Server
    pub host: String,
    pub port: u16,
    pub cors_origin: String,

    // ── Database
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── File storage
    pub upload_dir: String,
    pub max_upload_bytes: usize,

    // ── Provider endpoints
    pub openai_base_url: String,
    pub anthropic_base_url: String,

    // ── Server-wide default credentials (fallback when a request carries none)
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,

    // ── Turn orchestration
    pub provider_timeout_secs: u64,
    pub memory_context_limit: i64,

    // ── Dev seed
    pub seed_session_token: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean = val.split('#').next().unwrap_or("").trim();
            clean.parse::<T>().unwrap_or(default)
        }
        Err(_) => default,
    }
}

fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        // Pick up a .env file when present; plain env vars otherwise.
        let _ = dotenvy::dotenv();

        Self {
            host: env_var_or("SWITCHBOARD_HOST", "0.0.0.0".to_string()),
            port: env_var_or("SWITCHBOARD_PORT", 3001),
            cors_origin: env_var_or("SWITCHBOARD_CORS_ORIGIN", "http://localhost:3000".to_string()),
            database_url: env_var_or("DATABASE_URL", "sqlite:./switchboard.db".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 10),
            upload_dir: env_var_or("SWITCHBOARD_UPLOAD_DIR", "./uploads".to_string()),
            max_upload_bytes: env_var_or("SWITCHBOARD_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com".to_string()),
            anthropic_base_url: env_var_or(
                "ANTHROPIC_BASE_URL",
                "https://api.anthropic.com".to_string(),
            ),
            openai_api_key: env_var_opt("OPENAI_API_KEY"),
            anthropic_api_key: env_var_opt("ANTHROPIC_API_KEY"),
            provider_timeout_secs: env_var_or("SWITCHBOARD_PROVIDER_TIMEOUT", 60),
            memory_context_limit: env_var_or("SWITCHBOARD_MEMORY_CONTEXT_LIMIT", 10),
            seed_session_token: env_var_or(
                "SWITCHBOARD_SEED_SESSION_TOKEN",
                "dev-session-token".to_string(),
            ),
        }
    }

    /// Server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
