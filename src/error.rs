//! Router error type.
//!
//! Every failure is recovered at the router and turned into a direct error
//! reply. The kind decides how it is logged and whether its message may be
//! shown to the caller.

use derive_more::{Display, Error};
use reversi_engine::MoveError;
use tracing::instrument;

use crate::lobby::{CreateError, JoinError, LeaveError, StartError};
use crate::protocol::ProtocolError;
use crate::session::SessionError;

/// Message shown to callers instead of internal details.
pub const GENERIC_FAILURE: &str = "Something went wrong, please try again";

/// Category of a router failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ErrorKind {
    /// Inbound payload does not have the expected shape.
    Validation,
    /// Referenced room, game or player is absent.
    NotFound,
    /// Request conflicts with current state.
    StateConflict,
    /// A supposedly impossible state was reached.
    Internal,
}

/// Router error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} error: {} at {}:{}", kind, message, file, line)]
pub struct RouterError {
    /// Category.
    pub kind: ErrorKind,
    /// Human readable message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RouterError {
    /// Creates a new router error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for [`ErrorKind::NotFound`].
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for [`ErrorKind::Internal`].
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Message safe to send to the caller.
    pub fn public_message(&self) -> &str {
        match self.kind {
            ErrorKind::Internal => GENERIC_FAILURE,
            _ => &self.message,
        }
    }
}

impl From<ProtocolError> for RouterError {
    #[track_caller]
    fn from(err: ProtocolError) -> Self {
        Self::new(ErrorKind::Validation, err.to_string())
    }
}

impl From<CreateError> for RouterError {
    #[track_caller]
    fn from(err: CreateError) -> Self {
        let kind = match err {
            CreateError::PasswordTooLong { .. } => ErrorKind::Validation,
            CreateError::AlreadyInRoom(_) => ErrorKind::StateConflict,
            CreateError::IdsExhausted => ErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<JoinError> for RouterError {
    #[track_caller]
    fn from(err: JoinError) -> Self {
        let kind = match err {
            JoinError::NotFound(_) => ErrorKind::NotFound,
            JoinError::RoomFull
            | JoinError::AlreadyJoined
            | JoinError::AlreadyInRoom(_)
            | JoinError::GameInProgress
            | JoinError::WrongPassword => ErrorKind::StateConflict,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<LeaveError> for RouterError {
    #[track_caller]
    fn from(err: LeaveError) -> Self {
        Self::new(ErrorKind::NotFound, err.to_string())
    }
}

impl From<StartError> for RouterError {
    #[track_caller]
    fn from(err: StartError) -> Self {
        let kind = match err {
            StartError::NotFound(_) => ErrorKind::NotFound,
            StartError::CannotStart(_) => ErrorKind::StateConflict,
            StartError::Session(_) => ErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<SessionError> for RouterError {
    #[track_caller]
    fn from(err: SessionError) -> Self {
        Self::new(ErrorKind::Internal, err.to_string())
    }
}

impl From<MoveError> for RouterError {
    #[track_caller]
    fn from(err: MoveError) -> Self {
        let kind = match err {
            MoveError::OutOfBounds { .. } => ErrorKind::Validation,
            MoveError::IllegalMove(_) | MoveError::NotYourTurn(_) | MoveError::GameOver => {
                ErrorKind::StateConflict
            }
            MoveError::NotAPlayer => ErrorKind::NotFound,
            MoveError::InvariantViolation(_) => ErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}
