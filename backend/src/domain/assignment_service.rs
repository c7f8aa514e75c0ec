//! Assignment orchestration.
//!
//! [`AssignmentService`] answers "who do I give to?" for a participant. The
//! first request in an epoch draws and commits a full round; every later
//! request, from any participant, reads the committed round back.
//!
//! Two mechanisms keep an epoch to a single round:
//!
//! - an in-process pairing gate serialises the "draw, commit" step, so
//!   concurrent first requests in one process compute exactly one round;
//! - the store's unique-giver constraint rejects a second commit from
//!   another process, which this service treats as "someone else won" and
//!   answers from the committed rows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ports::{
    AssignmentRepository, AssignmentRepositoryError, ParticipantRepository,
    ParticipantRepositoryError, UserLinkRepository, UserLinkRepositoryError,
};
use super::{
    AdminAllowList, AssignmentError, ChatUserId, EpochState, PairingEngine, Participant,
    ParticipantId, ParticipantName, PermutationSource, RoundEntry,
};

/// Default ceiling on how long a round commit may take.
pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(5);

fn map_participant_error(error: ParticipantRepositoryError) -> AssignmentError {
    AssignmentError::storage(error.to_string())
}

fn map_assignment_error(error: AssignmentRepositoryError) -> AssignmentError {
    AssignmentError::storage(error.to_string())
}

fn map_user_link_error(error: UserLinkRepositoryError) -> AssignmentError {
    AssignmentError::storage(error.to_string())
}

/// Result of a user-facing draw request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    /// Participant making the request.
    pub giver: Participant,
    /// Participant they give to.
    pub receiver: Participant,
    /// True only for the request that committed the round.
    pub newly_drawn: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Draw {
    Existing(ParticipantId),
    Fresh(ParticipantId),
}

impl Draw {
    const fn receiver(self) -> ParticipantId {
        match self {
            Self::Existing(receiver) | Self::Fresh(receiver) => receiver,
        }
    }
}

/// Commit-once assignment service.
///
/// The pairing gate owns the permutation source: holding the gate is what
/// entitles a caller to draw.
pub struct AssignmentService<P, A, U, S> {
    participants: Arc<P>,
    assignments: Arc<A>,
    user_links: Arc<U>,
    engine: PairingEngine,
    admins: AdminAllowList,
    commit_timeout: Duration,
    pairing_gate: Mutex<S>,
}

impl<P, A, U, S> AssignmentService<P, A, U, S> {
    /// Create a service over the given stores and permutation source.
    pub fn new(participants: Arc<P>, assignments: Arc<A>, user_links: Arc<U>, source: S) -> Self {
        Self {
            participants,
            assignments,
            user_links,
            engine: PairingEngine::default(),
            admins: AdminAllowList::default(),
            commit_timeout: DEFAULT_COMMIT_TIMEOUT,
            pairing_gate: Mutex::new(source),
        }
    }

    /// Use a specific pairing engine.
    #[must_use]
    pub fn with_engine(mut self, engine: PairingEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Restrict resets to the given administrators.
    #[must_use]
    pub fn with_admins(mut self, admins: AdminAllowList) -> Self {
        self.admins = admins;
        self
    }

    /// Bound how long a round commit may take before it counts as failed.
    #[must_use]
    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }
}

impl<P, A, U, S> AssignmentService<P, A, U, S>
where
    P: ParticipantRepository,
    A: AssignmentRepository,
    U: UserLinkRepository,
    S: PermutationSource + Send,
{
    /// Return the receiver for `giver`, drawing the epoch's round if none
    /// exists yet.
    ///
    /// Repeated calls return the same receiver until the epoch is reset.
    ///
    /// # Errors
    ///
    /// - [`AssignmentError::Unregistered`] if `giver` is not a participant.
    /// - [`AssignmentError::RoundClosed`] if a round exists without `giver`.
    /// - [`AssignmentError::InsufficientParticipants`] or
    ///   [`AssignmentError::PairingExhausted`] if no round could be drawn;
    ///   nothing is committed and a later call may retry.
    /// - [`AssignmentError::Storage`] on store failures or commit timeout.
    pub async fn request_assignment(
        &self,
        giver: ParticipantId,
    ) -> Result<ParticipantId, AssignmentError> {
        self.draw(giver).await.map(Draw::receiver)
    }

    /// Resolve the chat user's participant and return their assignment.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::Unregistered`] when the user has no participant
    /// link; otherwise as [`request_assignment`](Self::request_assignment).
    pub async fn request_assignment_for_user(
        &self,
        user: ChatUserId,
    ) -> Result<DrawOutcome, AssignmentError> {
        let giver = self
            .user_links
            .find_participant(user)
            .await
            .map_err(map_user_link_error)?
            .ok_or(AssignmentError::Unregistered)?;

        let draw = self.draw(giver.id()).await?;
        let receiver = self
            .participants
            .find_by_id(draw.receiver())
            .await
            .map_err(map_participant_error)?
            .ok_or_else(|| {
                AssignmentError::internal(format!(
                    "receiver {} is no longer registered",
                    draw.receiver()
                ))
            })?;

        Ok(DrawOutcome {
            giver,
            receiver,
            newly_drawn: matches!(draw, Draw::Fresh(_)),
        })
    }

    /// Link a chat user to the participant with the given name.
    ///
    /// The name is normalised first. A user who is already linked keeps
    /// their existing participant, which is returned.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::InvalidName`] or
    /// [`AssignmentError::UnknownParticipant`] when the name does not
    /// resolve; [`AssignmentError::Storage`] on store failures.
    pub async fn register_user(
        &self,
        user: ChatUserId,
        raw_name: &str,
    ) -> Result<Participant, AssignmentError> {
        let name = ParticipantName::new(raw_name)?;
        let participant = self
            .participants
            .find_by_name(&name)
            .await
            .map_err(map_participant_error)?
            .ok_or_else(|| AssignmentError::UnknownParticipant { name: name.clone() })?;

        let linked = self
            .user_links
            .link(user, participant.id())
            .await
            .map_err(|err| match err {
                UserLinkRepositoryError::UnknownParticipant { .. } => {
                    AssignmentError::UnknownParticipant { name: name.clone() }
                }
                other => map_user_link_error(other),
            })?;

        if linked == participant.id() {
            info!(user = %user, participant = %linked, "user linked");
            return Ok(participant);
        }

        debug!(user = %user, participant = %linked, "user already linked");
        self.participants
            .find_by_id(linked)
            .await
            .map_err(map_participant_error)?
            .ok_or_else(|| {
                AssignmentError::internal(format!("linked participant {linked} is missing"))
            })
    }

    /// Clear every assignment and user link, starting a new epoch.
    ///
    /// Waits for any in-flight pairing to finish first. Returns the number
    /// of assignments removed.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::Storage`] when the store rejects the reset.
    pub async fn reset_epoch(&self) -> Result<u64, AssignmentError> {
        let _gate = self.pairing_gate.lock().await;
        let cleared = self
            .assignments
            .reset_epoch()
            .await
            .map_err(map_assignment_error)?;
        info!(cleared, "epoch reset");
        Ok(cleared)
    }

    /// [`reset_epoch`](Self::reset_epoch) on behalf of `requester`, who must
    /// be on the administrator allow-list.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::Forbidden`] for non-administrators.
    pub async fn reset_epoch_as(&self, requester: ChatUserId) -> Result<u64, AssignmentError> {
        if !self.admins.permits(requester) {
            warn!(user = %requester, "reset refused for non-administrator");
            return Err(AssignmentError::Forbidden);
        }
        self.reset_epoch().await
    }

    /// Every committed pair with names, ordered by giver name.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::Storage`] on store failures.
    pub async fn round_overview(&self) -> Result<Vec<RoundEntry>, AssignmentError> {
        self.assignments
            .list_round()
            .await
            .map_err(map_assignment_error)
    }

    /// Current position in the pairing lifecycle.
    ///
    /// Reports [`EpochState::PairingInProgress`] while the pairing gate is
    /// held.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::Storage`] on store failures.
    pub async fn epoch_state(&self) -> Result<EpochState, AssignmentError> {
        let Ok(gate) = self.pairing_gate.try_lock() else {
            return Ok(EpochState::PairingInProgress);
        };
        drop(gate);

        let committed = self
            .assignments
            .count_assignments()
            .await
            .map_err(map_assignment_error)?;
        Ok(if committed > 0 {
            EpochState::Paired
        } else {
            EpochState::Unpaired
        })
    }

    async fn find_receiver(
        &self,
        giver: ParticipantId,
    ) -> Result<Option<ParticipantId>, AssignmentError> {
        self.assignments
            .find_receiver(giver)
            .await
            .map_err(map_assignment_error)
    }

    async fn draw(&self, giver: ParticipantId) -> Result<Draw, AssignmentError> {
        if let Some(receiver) = self.find_receiver(giver).await? {
            return Ok(Draw::Existing(receiver));
        }

        let mut source = self.pairing_gate.lock().await;

        // A caller ahead of us in the gate may have committed the round.
        if let Some(receiver) = self.find_receiver(giver).await? {
            return Ok(Draw::Existing(receiver));
        }

        let ids = self
            .participants
            .list_participant_ids()
            .await
            .map_err(map_participant_error)?;
        if !ids.contains(&giver) {
            return Err(AssignmentError::Unregistered);
        }

        let committed = self
            .assignments
            .count_assignments()
            .await
            .map_err(map_assignment_error)?;
        if committed > 0 {
            // Another process may have committed since the re-check above.
            if let Some(receiver) = self.find_receiver(giver).await? {
                return Ok(Draw::Existing(receiver));
            }
            warn!(giver = %giver, committed, "caller missing from the committed round");
            return Err(AssignmentError::RoundClosed);
        }

        let round = self
            .engine
            .generate_round(&ids, &mut *source)
            .inspect_err(|err| warn!(giver = %giver, error = %err, "pairing failed"))?;

        let commit = tokio::time::timeout(self.commit_timeout, self.assignments.commit_round(&round))
            .await
            .map_err(|_| {
                warn!(
                    timeout_ms = self.commit_timeout.as_millis(),
                    "round commit timed out"
                );
                AssignmentError::storage("round commit timed out")
            })?;

        let fresh = match commit {
            Ok(()) => {
                info!(giver = %giver, participants = round.len(), "round committed");
                true
            }
            Err(AssignmentRepositoryError::Conflict { message }) => {
                warn!(giver = %giver, %message, "round already committed elsewhere");
                false
            }
            Err(err) => return Err(map_assignment_error(err)),
        };
        drop(source);

        match (self.find_receiver(giver).await?, fresh) {
            (Some(receiver), true) => Ok(Draw::Fresh(receiver)),
            (Some(receiver), false) => Ok(Draw::Existing(receiver)),
            (None, false) => Err(AssignmentError::RoundClosed),
            (None, true) => Err(AssignmentError::internal(format!(
                "committed round has no row for giver {giver}"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "assignment_service_tests.rs"]
mod tests;
