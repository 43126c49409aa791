//! Error types for the physics core

use thiserror::Error;

use crate::sim::{BallId, ItemId};

/// Physics errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Settings failed validation
    #[error("Invalid physics settings: {0}")]
    InvalidSettings(String),

    /// Settings JSON could not be parsed or written
    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings file could not be read or written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No live ball with this id
    #[error("Unknown ball: {0:?}")]
    UnknownBall(BallId),

    /// No hit object belongs to this item
    #[error("Unknown item: {0:?}")]
    UnknownItem(ItemId),

    /// The item exists but cannot be actuated this way
    #[error("Item {0:?} does not support {1}")]
    Unsupported(ItemId, &'static str),

    /// Degenerate geometry handed to a shape builder
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
}

/// Result type for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
