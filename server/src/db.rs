//! PostgreSQL connection pool.
//!
//! Diesel is synchronous; every query runs inside `web::block` or
//! `spawn_blocking` so the actix workers never stall on database I/O.

use anyhow::{Context, Result};
use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Create the connection pool.
pub fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    let pool = r2d2::Pool::builder()
        .max_size(max_connections)
        .connection_timeout(std::time::Duration::from_secs(30))
        .build(manager)
        .context("Failed to create database connection pool")?;

    Ok(pool)
}
