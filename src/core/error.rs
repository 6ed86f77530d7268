//! Error types for globe terrain

use thiserror::Error;

use crate::render::buffer::BufferHandle;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Terrain error: {0}")]
    Terrain(String),

    #[error("Invalid grid size: {0}")]
    InvalidGrid(u32),

    #[error("Mesh built for grid {mesh} but index buffer built for grid {indices}")]
    MeshMismatch { mesh: u32, indices: u32 },

    #[error("Unknown buffer handle: {0:?}")]
    UnknownBuffer(BufferHandle),
}
