//! Caller-facing errors for the assignment service.
//!
//! These errors are transport agnostic. The command layer turns them into
//! replies; [`AssignmentError::is_retry_later`] groups the conditions shown
//! to users as "try again later".

use super::{PairingError, ParticipantName, ParticipantValidationError};

/// Failures surfaced by [`AssignmentService`](super::AssignmentService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    /// The caller has no participant mapping and must register first.
    #[error("caller is not registered as a participant")]
    Unregistered,
    /// No participant carries the requested name.
    #[error("no participant named '{name}'")]
    UnknownParticipant { name: ParticipantName },
    /// The supplied name failed validation.
    #[error("invalid participant name: {0}")]
    InvalidName(#[from] ParticipantValidationError),
    /// Fewer than two participants are registered.
    #[error("pairing needs at least two participants, found {count}")]
    InsufficientParticipants { count: usize },
    /// The randomised search exceeded its attempt ceiling.
    #[error("no valid pairing found after {max_attempts} attempts")]
    PairingExhausted { max_attempts: u32 },
    /// A round was already drawn this epoch without the caller.
    #[error("this round was drawn before the caller registered")]
    RoundClosed,
    /// The caller is not on the administrator allow-list.
    #[error("operation requires an administrator")]
    Forbidden,
    /// Storage failed or timed out; nothing partial was committed.
    #[error("storage unavailable: {message}")]
    Storage { message: String },
    /// An internal invariant was violated.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AssignmentError {
    /// Construct a storage failure.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Construct an internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for conditions that clear up on their own or after more
    /// participants register, so the caller should simply retry later.
    pub const fn is_retry_later(&self) -> bool {
        matches!(
            self,
            Self::InsufficientParticipants { .. }
                | Self::PairingExhausted { .. }
                | Self::Storage { .. }
        )
    }
}

impl From<PairingError> for AssignmentError {
    fn from(error: PairingError) -> Self {
        match error {
            PairingError::InsufficientParticipants { count } => {
                Self::InsufficientParticipants { count }
            }
            PairingError::PairingExhausted { max_attempts } => {
                Self::PairingExhausted { max_attempts }
            }
            PairingError::InvalidRound(err) => Self::internal(err.to_string()),
        }
    }
}
