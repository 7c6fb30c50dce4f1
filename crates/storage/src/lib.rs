//! Storage Layer
//!
//! Append-only SQLite persistence for sensor readings, exposed through
//! [`ReadingRepository`].

mod reading;
mod repository;

pub use reading::{NewReading, Reading};
pub use repository::{ReadingRepository, DEFAULT_POOL_SIZE};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(String),
}
