//! Error types for threehit-core.

use thiserror::Error;

/// Result type alias for threehit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for threehit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A hit in a simulated event carries no link to its truth record.
    #[error("hit {hit} has no truth link")]
    MissingTruthLink { hit: usize },

    /// Simulation mode was asked to classify without a truth window.
    #[error("simulation analysis requires a truth window")]
    MissingTruthWindow,

    /// A hit points past the end of the truth window.
    #[error("truth index {index} out of range (truth window holds {len} hits)")]
    TruthIndexOutOfRange { index: usize, len: usize },

    /// An operation that needs a three-hit event received another multiplicity.
    #[error("expected a three-hit event, got {0} hits")]
    NotThreeHits(usize),

    /// Configuration error.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration JSON could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
