//! Derangement generation for gift rounds.
//!
//! The engine is a pure function of the participant set and a
//! [`PermutationSource`]. It draws uniformly random permutations and
//! rejects any that map a participant to themselves. For two or more
//! participants roughly one permutation in three (exactly one in two for a
//! pair) is a derangement, so the attempt ceiling only guards against a
//! broken random source.

use std::collections::BTreeSet;
use std::num::NonZeroU32;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, trace, warn};

use super::{AssignmentPair, ParticipantId, Round, RoundValidationError};

/// Default ceiling on shuffle attempts per pairing.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Errors raised while generating a round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    /// Fewer than two participants are registered.
    #[error("pairing needs at least two participants, found {count}")]
    InsufficientParticipants { count: usize },
    /// No derangement was found within the attempt ceiling.
    #[error("no valid pairing found after {max_attempts} attempts")]
    PairingExhausted { max_attempts: u32 },
    /// The generated pairs failed round validation.
    #[error("generated pairs do not form a round: {0}")]
    InvalidRound(#[from] RoundValidationError),
}

/// Positive ceiling on the number of shuffles tried per pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAttempts(NonZeroU32);

impl MaxAttempts {
    /// Build a ceiling, returning `None` for zero.
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Raw attempt count.
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for MaxAttempts {
    fn default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_MAX_ATTEMPTS - 1))
    }
}

/// Source of random permutations.
///
/// Every [`rand::Rng`] is a source through a Fisher-Yates shuffle; tests can
/// supply scripted sources to force specific outcomes.
pub trait PermutationSource {
    /// Reorder `ids` in place.
    fn permute(&mut self, ids: &mut [ParticipantId]);
}

impl<R: Rng + ?Sized> PermutationSource for R {
    fn permute(&mut self, ids: &mut [ParticipantId]) {
        ids.shuffle(self);
    }
}

/// Generate giver to receiver pairs forming a derangement of `ids`.
///
/// Givers appear in ascending id order; `receiver[i]` is position `i` of the
/// accepted permutation.
///
/// # Errors
///
/// - [`PairingError::InsufficientParticipants`] when `ids` has fewer than
///   two members. No pairs are produced.
/// - [`PairingError::PairingExhausted`] when `max_attempts` shuffles all
///   contained a fixed point.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
///
/// use santa_backend::domain::{MaxAttempts, ParticipantId, generate_pairs};
///
/// let ids: BTreeSet<_> = (1..=4).map(ParticipantId::new).collect();
/// let pairs = generate_pairs(&ids, MaxAttempts::default(), &mut rand::rng())
///     .expect("four participants can always be paired");
/// assert_eq!(pairs.len(), 4);
/// assert!(pairs.iter().all(|pair| pair.giver != pair.receiver));
/// ```
pub fn generate_pairs<S>(
    ids: &BTreeSet<ParticipantId>,
    max_attempts: MaxAttempts,
    source: &mut S,
) -> Result<Vec<AssignmentPair>, PairingError>
where
    S: PermutationSource + ?Sized,
{
    if ids.len() < 2 {
        return Err(PairingError::InsufficientParticipants { count: ids.len() });
    }

    let givers: Vec<ParticipantId> = ids.iter().copied().collect();
    let mut receivers = givers.clone();

    for attempt in 1..=max_attempts.get() {
        receivers.copy_from_slice(&givers);
        source.permute(&mut receivers);

        if is_derangement(&givers, &receivers) {
            debug!(attempt, participants = givers.len(), "derangement found");
            return Ok(givers
                .iter()
                .zip(&receivers)
                .map(|(giver, receiver)| AssignmentPair::new(*giver, *receiver))
                .collect());
        }
        trace!(attempt, "shuffle rejected");
    }

    warn!(
        max_attempts = max_attempts.get(),
        participants = givers.len(),
        "pairing attempts exhausted"
    );
    Err(PairingError::PairingExhausted {
        max_attempts: max_attempts.get(),
    })
}

/// True when `receivers` is a permutation of `givers` with no fixed point.
fn is_derangement(givers: &[ParticipantId], receivers: &[ParticipantId]) -> bool {
    if givers.iter().zip(receivers).any(|(giver, receiver)| giver == receiver) {
        return false;
    }
    let mut sorted = receivers.to_vec();
    sorted.sort_unstable();
    sorted == givers
}

/// Stateless pairing engine configured with an attempt ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingEngine {
    max_attempts: MaxAttempts,
}

impl PairingEngine {
    /// Create an engine with the given attempt ceiling.
    pub const fn new(max_attempts: MaxAttempts) -> Self {
        Self { max_attempts }
    }

    /// Configured attempt ceiling.
    pub const fn max_attempts(&self) -> MaxAttempts {
        self.max_attempts
    }

    /// Generate a validated [`Round`] over `ids`.
    ///
    /// # Errors
    ///
    /// See [`generate_pairs`].
    pub fn generate_round<S>(
        &self,
        ids: &BTreeSet<ParticipantId>,
        source: &mut S,
    ) -> Result<Round, PairingError>
    where
        S: PermutationSource + ?Sized,
    {
        let pairs = generate_pairs(ids, self.max_attempts, source)?;
        Ok(Round::try_from_pairs(pairs)?)
    }
}

#[cfg(test)]
#[path = "pairing_tests.rs"]
mod tests;
