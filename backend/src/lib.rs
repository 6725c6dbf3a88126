pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use db::connection::get_db_pool;
pub use error::EngineError;
pub use services::MatchEngine;
pub use utils::config::Config;

// Re-export common types
pub use anyhow::Result;
pub use chrono::{DateTime, Utc};
pub use sqlx::{PgPool, Row};
pub use uuid::Uuid;
