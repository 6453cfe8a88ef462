//! Error types for the search engine
//!
//! Cancellation and timeouts are not errors: they surface as a
//! `SearchResult` with `complete == false`.

use thiserror::Error;

/// Errors returned by the engine entry points
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// `choose_move` was called on a checkmate or stalemate position
    #[error("No legal moves in position {fen}")]
    NoLegalMoves { fen: String },

    /// The rules library rejected the position
    #[error("Invalid position `{fen}`: {reason}")]
    InvalidPosition { fen: String, reason: String },

    /// A move that is not legal in the current position
    #[error("Illegal move {mv} in position {fen}")]
    InvalidMove { mv: String, fen: String },

    /// Search configuration out of range
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}
