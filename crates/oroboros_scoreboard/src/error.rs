//! # Scoreboard Error Types
//!
//! Precondition violations are returned to the caller. Render failures
//! never are: they stop the board at the scheduler boundary.

use thiserror::Error;

use crate::session::SessionId;

/// Errors returned by scoreboard operations.
///
/// Everything except [`ScoreboardError::InvalidConfig`] and
/// [`ScoreboardError::SchedulerUnavailable`] indicates a caller bug and is
/// not worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreboardError {
    /// `show` was called for a session that already views the board.
    #[error("session {session} is already viewing {board}")]
    AlreadyViewing {
        /// Display form of the board.
        board: String,
        /// The offending session.
        session: SessionId,
    },

    /// `hide` was called for a session that does not view the board.
    #[error("session {session} is not viewing {board}")]
    NotViewing {
        /// Display form of the board.
        board: String,
        /// The offending session.
        session: SessionId,
    },

    /// The board was started while its render task was already scheduled.
    #[error("{0} already running")]
    AlreadyRunning(String),

    /// The board was stopped while no render task was scheduled.
    #[error("{0} not running")]
    NotRunning(String),

    /// The session directory does not know the session.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Row index past the end of the row list.
    #[error("row index {index} out of bounds for {len} rows")]
    RowIndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of rows.
        len: usize,
    },

    /// Update interval must be at least one tick.
    #[error("update interval must be at least 1 tick, got {0}")]
    InvalidUpdateInterval(u32),

    /// The scheduler could not run the render task.
    #[error("scheduler unavailable: {0}")]
    SchedulerUnavailable(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for scoreboard operations.
pub type ScoreboardResult<T> = Result<T, ScoreboardError>;

/// Failure inside one render cycle.
///
/// Raised by hooks and resolvers; fatal to the board that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A hook or resolver panicked. Carries the panic message.
    #[error("render panicked: {0}")]
    Panicked(String),

    /// The per-tick hook failed.
    #[error("update hook failed: {0}")]
    Hook(String),

    /// A variable could not be resolved in a row.
    #[error("cannot resolve variables in row {row:?}: {reason}")]
    Variable {
        /// The template row.
        row: String,
        /// Why resolution failed.
        reason: String,
    },
}
