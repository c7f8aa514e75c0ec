//! Port for persisting gift rounds.
//!
//! The store keys rows by giver and enforces one outgoing assignment per
//! giver. That constraint is the last line of defence against two rounds
//! landing in the same epoch; adapters report its violation as
//! [`AssignmentRepositoryError::Conflict`] so callers can re-read the
//! winning round instead of failing.

use async_trait::async_trait;

use crate::domain::{ParticipantId, Round, RoundEntry};

use super::define_port_error;

define_port_error! {
    /// Errors raised by assignment repository adapters.
    pub enum AssignmentRepositoryError {
        /// Repository connection could not be established or was lost.
        Connection { message: String } =>
            "assignment repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "assignment repository query failed: {message}",
        /// Another round already holds assignments for these givers.
        Conflict { message: String } =>
            "assignment round conflicts with a committed round: {message}",
    }
}

/// Durable giver to receiver assignments.
///
/// Implementations must provide read-after-write consistency: once
/// [`commit_round`](Self::commit_round) returns `Ok`, every subsequent read
/// observes the whole round.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Receiver assigned to `giver`, if any.
    async fn find_receiver(
        &self,
        giver: ParticipantId,
    ) -> Result<Option<ParticipantId>, AssignmentRepositoryError>;

    /// Number of committed assignment rows.
    async fn count_assignments(&self) -> Result<u64, AssignmentRepositoryError>;

    /// Persist every pair of `round` atomically.
    ///
    /// Either all pairs become visible together or none do. A unique-giver
    /// violation must surface as [`AssignmentRepositoryError::Conflict`].
    async fn commit_round(&self, round: &Round) -> Result<(), AssignmentRepositoryError>;

    /// Committed pairs with names resolved, ordered by giver name.
    async fn list_round(&self) -> Result<Vec<RoundEntry>, AssignmentRepositoryError>;

    /// Remove every assignment and user link in one atomic step.
    ///
    /// Returns the number of assignment rows removed.
    async fn reset_epoch(&self) -> Result<u64, AssignmentRepositoryError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(AssignmentRepositoryError::conflict("giver 3"), "giver 3")]
    #[case(AssignmentRepositoryError::query("bad sql"), "bad sql")]
    fn errors_keep_adapter_detail(#[case] err: AssignmentRepositoryError, #[case] detail: &str) {
        assert!(err.to_string().contains(detail));
    }
}
