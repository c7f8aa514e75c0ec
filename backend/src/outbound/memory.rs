//! In-process store implementing every assignment port.
//!
//! All three tables live behind one lock, so a round commit or an epoch
//! reset is atomic with respect to every other call. The store mirrors the
//! PostgreSQL constraints that matter to the service: one assignment per
//! giver (reported as a conflict) and links only to known participants.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{
    AssignmentRepository, AssignmentRepositoryError, ParticipantRepository,
    ParticipantRepositoryError, UserLinkRepository, UserLinkRepositoryError,
};
use crate::domain::{
    ChatUserId, Participant, ParticipantId, ParticipantName, ParticipantValidationError, Round,
    RoundEntry,
};

const POISONED: &str = "in-memory store lock poisoned";

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i32,
    participants: BTreeMap<ParticipantId, ParticipantName>,
    assignments: BTreeMap<ParticipantId, ParticipantId>,
    user_links: HashMap<ChatUserId, ParticipantId>,
}

impl MemoryState {
    fn insert_participant(&mut self, name: ParticipantName) -> Participant {
        if let Some((id, existing)) = self
            .participants
            .iter()
            .find(|(_, existing)| **existing == name)
        {
            return Participant::new(*id, existing.clone());
        }

        self.next_id += 1;
        let id = ParticipantId::new(self.next_id);
        self.participants.insert(id, name.clone());
        Participant::new(id, name)
    }

    fn participant(&self, id: ParticipantId) -> Option<Participant> {
        self.participants
            .get(&id)
            .map(|name| Participant::new(id, name.clone()))
    }
}

/// Shared in-memory participant, assignment and user link store.
#[derive(Debug, Default)]
pub struct InMemorySantaStore {
    state: Mutex<MemoryState>,
}

impl InMemorySantaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with participants, numbered from 1 in order.
    ///
    /// Names are normalised; a name repeated after normalisation is stored
    /// once.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the first invalid name.
    pub fn with_participants<I>(names: I) -> Result<Self, ParticipantValidationError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut state = MemoryState::default();
        for raw in names {
            state.insert_participant(ParticipantName::new(raw)?);
        }
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    /// Register a participant, returning the existing one when the name is
    /// already taken.
    ///
    /// # Errors
    ///
    /// Fails only if the store lock is poisoned.
    pub fn add_participant(
        &self,
        name: ParticipantName,
    ) -> Result<Participant, ParticipantRepositoryError> {
        let mut state = self.lock().map_err(ParticipantRepositoryError::query)?;
        Ok(state.insert_participant(name))
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, &'static str> {
        self.state.lock().map_err(|_| POISONED)
    }
}

#[async_trait]
impl ParticipantRepository for InMemorySantaStore {
    async fn list_participant_ids(
        &self,
    ) -> Result<BTreeSet<ParticipantId>, ParticipantRepositoryError> {
        let state = self.lock().map_err(ParticipantRepositoryError::query)?;
        Ok(state.participants.keys().copied().collect())
    }

    async fn find_by_name(
        &self,
        name: &ParticipantName,
    ) -> Result<Option<Participant>, ParticipantRepositoryError> {
        let state = self.lock().map_err(ParticipantRepositoryError::query)?;
        Ok(state
            .participants
            .iter()
            .find(|(_, stored)| *stored == name)
            .map(|(id, stored)| Participant::new(*id, stored.clone())))
    }

    async fn find_by_id(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, ParticipantRepositoryError> {
        let state = self.lock().map_err(ParticipantRepositoryError::query)?;
        Ok(state.participant(id))
    }
}

#[async_trait]
impl AssignmentRepository for InMemorySantaStore {
    async fn find_receiver(
        &self,
        giver: ParticipantId,
    ) -> Result<Option<ParticipantId>, AssignmentRepositoryError> {
        let state = self.lock().map_err(AssignmentRepositoryError::query)?;
        Ok(state.assignments.get(&giver).copied())
    }

    async fn count_assignments(&self) -> Result<u64, AssignmentRepositoryError> {
        let state = self.lock().map_err(AssignmentRepositoryError::query)?;
        u64::try_from(state.assignments.len())
            .map_err(|err| AssignmentRepositoryError::query(err.to_string()))
    }

    async fn commit_round(&self, round: &Round) -> Result<(), AssignmentRepositoryError> {
        let mut state = self.lock().map_err(AssignmentRepositoryError::query)?;

        for pair in round.pairs() {
            if state.assignments.contains_key(&pair.giver) {
                return Err(AssignmentRepositoryError::conflict(format!(
                    "giver {} already has an assignment",
                    pair.giver
                )));
            }
            for id in [pair.giver, pair.receiver] {
                if !state.participants.contains_key(&id) {
                    return Err(AssignmentRepositoryError::query(format!(
                        "participant {id} does not exist"
                    )));
                }
            }
        }

        state.assignments.extend(
            round
                .pairs()
                .iter()
                .map(|pair| (pair.giver, pair.receiver)),
        );
        Ok(())
    }

    async fn list_round(&self) -> Result<Vec<RoundEntry>, AssignmentRepositoryError> {
        let state = self.lock().map_err(AssignmentRepositoryError::query)?;
        let mut entries = state
            .assignments
            .iter()
            .map(|(giver, receiver)| {
                let giver = state.participant(*giver);
                let receiver = state.participant(*receiver);
                giver
                    .zip(receiver)
                    .map(|(giver, receiver)| RoundEntry { giver, receiver })
                    .ok_or_else(|| {
                        AssignmentRepositoryError::query("assignment references missing participant")
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by(|left, right| left.giver.name().cmp(right.giver.name()));
        Ok(entries)
    }

    async fn reset_epoch(&self) -> Result<u64, AssignmentRepositoryError> {
        let mut state = self.lock().map_err(AssignmentRepositoryError::query)?;
        let cleared = state.assignments.len();
        state.assignments.clear();
        state.user_links.clear();
        u64::try_from(cleared).map_err(|err| AssignmentRepositoryError::query(err.to_string()))
    }
}

#[async_trait]
impl UserLinkRepository for InMemorySantaStore {
    async fn find_participant(
        &self,
        user: ChatUserId,
    ) -> Result<Option<Participant>, UserLinkRepositoryError> {
        let state = self.lock().map_err(UserLinkRepositoryError::query)?;
        Ok(state
            .user_links
            .get(&user)
            .and_then(|id| state.participant(*id)))
    }

    async fn link(
        &self,
        user: ChatUserId,
        participant: ParticipantId,
    ) -> Result<ParticipantId, UserLinkRepositoryError> {
        let mut state = self.lock().map_err(UserLinkRepositoryError::query)?;
        if !state.participants.contains_key(&participant) {
            return Err(UserLinkRepositoryError::unknown_participant(participant));
        }
        Ok(*state.user_links.entry(user).or_insert(participant))
    }
}
