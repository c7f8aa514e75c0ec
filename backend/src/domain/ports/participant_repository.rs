//! Port for reading the participant registry.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{Participant, ParticipantId, ParticipantName};

use super::define_port_error;

define_port_error! {
    /// Errors raised by participant repository adapters.
    pub enum ParticipantRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "participant repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "participant repository query failed: {message}",
    }
}

/// Read access to registered participants.
///
/// Reads reflect the registry at call time; a participant registered while
/// a round is being drawn may or may not be included in it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Ids of every registered participant.
    async fn list_participant_ids(
        &self,
    ) -> Result<BTreeSet<ParticipantId>, ParticipantRepositoryError>;

    /// Resolve a participant by normalised name.
    async fn find_by_name(
        &self,
        name: &ParticipantName,
    ) -> Result<Option<Participant>, ParticipantRepositoryError>;

    /// Resolve a participant by id.
    async fn find_by_id(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, ParticipantRepositoryError>;
}
