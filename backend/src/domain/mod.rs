//! Domain primitives and services.
//!
//! Purpose: pair participants into gift rounds and hand each participant
//! their committed assignment. Nothing in this module performs I/O
//! directly; stores are reached through [`ports`].
//!
//! Public surface:
//! - [`generate_pairs`] / [`PairingEngine`] — derangement generation.
//! - [`AssignmentService`] — commit-once orchestration over the ports.
//! - [`AssignmentError`] — caller-facing failures.

pub mod access;
pub mod assignment_service;
pub mod error;
pub mod pairing;
pub mod participant;
pub mod ports;
pub mod round;

pub use self::access::AdminAllowList;
pub use self::assignment_service::{AssignmentService, DEFAULT_COMMIT_TIMEOUT, DrawOutcome};
pub use self::error::AssignmentError;
pub use self::pairing::{
    DEFAULT_MAX_ATTEMPTS, MaxAttempts, PairingEngine, PairingError, PermutationSource,
    generate_pairs,
};
pub use self::participant::{
    ChatUserId, PARTICIPANT_NAME_MAX, Participant, ParticipantId, ParticipantName,
    ParticipantValidationError,
};
pub use self::round::{AssignmentPair, EpochState, Round, RoundEntry, RoundValidationError};
