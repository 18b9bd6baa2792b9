//! Environment-driven configuration.
//!
//! Everything is read once at startup; secret material (AES key, token
//! secret) only ever enters through the environment. `.env` files are loaded
//! by `main` before this runs.

use anyhow::{bail, Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub token: TokenConfig,
    /// 64-character hex encoding of the 32-byte AES-256-GCM key.
    pub aes_key_hex: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub expiry_secs: i64,
    pub issuer: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Fails fast on missing or malformed secret material rather than
    /// starting a gateway that cannot unseal its own balances.
    pub fn from_env() -> Result<Self> {
        let host = env_or("SERVER_HOST", "0.0.0.0");
        let port: u16 = env_or("SERVER_PORT", "8080")
            .parse()
            .context("SERVER_PORT must be a port number")?;

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections: u32 = env_or("DATABASE_MAX_CONNS", "20")
            .parse()
            .context("DATABASE_MAX_CONNS must be an integer")?;

        let redis_url = env_or("REDIS_URL", "redis://127.0.0.1:6379");

        let aes_key_hex = env::var("AES_KEY").context("AES_KEY must be set")?;
        if aes_key_hex.len() != 64 || hex::decode(&aes_key_hex).is_err() {
            bail!("AES_KEY must be 64 hex characters (32 bytes)");
        }

        let token_secret = env::var("TOKEN_SECRET").context("TOKEN_SECRET must be set")?;
        if token_secret.len() < 32 {
            bail!("TOKEN_SECRET must be at least 32 characters");
        }
        let expiry_secs: i64 = env_or("TOKEN_EXPIRY_SECS", "86400")
            .parse()
            .context("TOKEN_EXPIRY_SECS must be an integer")?;
        let issuer = env_or("TOKEN_ISSUER", "payment-gateway");

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            redis: RedisConfig { url: redis_url },
            token: TokenConfig {
                secret: token_secret,
                expiry_secs,
                issuer,
            },
            aes_key_hex,
        })
    }
}
