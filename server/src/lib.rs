pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod ports;
pub mod redis_pool;
pub mod response;
pub mod schema;
pub mod services;
pub mod stores;
pub mod telemetry;
pub mod validation;
