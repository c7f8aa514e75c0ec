//! Port linking chat users to participants.

use async_trait::async_trait;

use crate::domain::{ChatUserId, Participant, ParticipantId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user link repository adapters.
    pub enum UserLinkRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "user link repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "user link repository query failed: {message}",
        /// The participant referenced by the link does not exist.
        UnknownParticipant { participant: ParticipantId } =>
            "participant {participant} does not exist",
    }
}

/// Mapping from chat users to the participant they registered as.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLinkRepository: Send + Sync {
    /// Participant linked to `user`, if any.
    async fn find_participant(
        &self,
        user: ChatUserId,
    ) -> Result<Option<Participant>, UserLinkRepositoryError>;

    /// Link `user` to `participant` unless a link already exists.
    ///
    /// Returns the participant id the user is linked to afterwards, which is
    /// the earlier one when the user was already linked.
    async fn link(
        &self,
        user: ChatUserId,
        participant: ParticipantId,
    ) -> Result<ParticipantId, UserLinkRepositoryError>;
}
