//! Assignment pairs, rounds, and the pairing epoch state machine.

use std::collections::BTreeSet;
use std::fmt;

use super::{Participant, ParticipantId};

/// A single giver to receiver assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssignmentPair {
    /// Participant giving the gift.
    pub giver: ParticipantId,
    /// Participant receiving the gift.
    pub receiver: ParticipantId,
}

impl AssignmentPair {
    /// Pair a giver with a receiver.
    pub const fn new(giver: ParticipantId, receiver: ParticipantId) -> Self {
        Self { giver, receiver }
    }
}

/// Reasons a set of pairs does not form a valid round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundValidationError {
    /// A round needs at least two participants.
    #[error("a round needs at least two pairs, got {count}")]
    TooFewPairs { count: usize },
    /// A giver appeared more than once.
    #[error("participant {giver} gives more than once")]
    DuplicateGiver { giver: ParticipantId },
    /// A participant was assigned to themselves.
    #[error("participant {participant} is assigned to themselves")]
    SelfAssignment { participant: ParticipantId },
    /// The receivers are not exactly the givers.
    #[error("receivers do not match the set of givers")]
    ReceiversMismatch,
}

/// Complete set of pairs computed and committed together for an epoch.
///
/// ## Invariants
/// - At least two pairs.
/// - Every giver is unique and the receivers are exactly the givers, so
///   the pairs form a permutation of the participant set.
/// - No participant is assigned to themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pairs: Vec<AssignmentPair>,
}

impl Round {
    /// Validate pairs as a derangement over their givers.
    ///
    /// # Examples
    /// ```
    /// use santa_backend::domain::{AssignmentPair, ParticipantId, Round};
    ///
    /// let a = ParticipantId::new(1);
    /// let b = ParticipantId::new(2);
    /// let round = Round::try_from_pairs(vec![
    ///     AssignmentPair::new(a, b),
    ///     AssignmentPair::new(b, a),
    /// ])
    /// .expect("swap is a derangement");
    /// assert_eq!(round.receiver_of(a), Some(b));
    /// ```
    pub fn try_from_pairs(pairs: Vec<AssignmentPair>) -> Result<Self, RoundValidationError> {
        if pairs.len() < 2 {
            return Err(RoundValidationError::TooFewPairs { count: pairs.len() });
        }

        let mut givers = BTreeSet::new();
        for pair in &pairs {
            if pair.giver == pair.receiver {
                return Err(RoundValidationError::SelfAssignment {
                    participant: pair.giver,
                });
            }
            if !givers.insert(pair.giver) {
                return Err(RoundValidationError::DuplicateGiver { giver: pair.giver });
            }
        }

        let receivers: BTreeSet<_> = pairs.iter().map(|pair| pair.receiver).collect();
        if receivers != givers {
            return Err(RoundValidationError::ReceiversMismatch);
        }

        Ok(Self { pairs })
    }

    /// Pairs in giver order as produced by the pairing engine.
    pub fn pairs(&self) -> &[AssignmentPair] {
        &self.pairs
    }

    /// Number of participants covered by the round.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false for a validated round.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Receiver assigned to `giver`, if the giver takes part in the round.
    pub fn receiver_of(&self, giver: ParticipantId) -> Option<ParticipantId> {
        self.pairs
            .iter()
            .find(|pair| pair.giver == giver)
            .map(|pair| pair.receiver)
    }

    /// Participants covered by the round.
    pub fn participants(&self) -> BTreeSet<ParticipantId> {
        self.pairs.iter().map(|pair| pair.giver).collect()
    }

    /// Consume the round, returning its pairs.
    pub fn into_pairs(self) -> Vec<AssignmentPair> {
        self.pairs
    }
}

/// Committed pair with both participants resolved, for overviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundEntry {
    /// Participant giving the gift.
    pub giver: Participant,
    /// Participant receiving the gift.
    pub receiver: Participant,
}

/// Where the current epoch sits in the pairing lifecycle.
///
/// `Unpaired -> PairingInProgress -> Paired`; a failed pairing returns to
/// `Unpaired`, and only a reset leaves `Paired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochState {
    /// No assignment rows exist.
    Unpaired,
    /// A pairing computation holds the gate and has not committed yet.
    PairingInProgress,
    /// A round has been committed.
    Paired,
}

impl EpochState {
    /// Stable lowercase label used in logs and CLI output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaired => "unpaired",
            Self::PairingInProgress => "pairing_in_progress",
            Self::Paired => "paired",
        }
    }
}

impl fmt::Display for EpochState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    //! Round validation coverage.

    use rstest::rstest;

    use super::*;

    fn pair(giver: i32, receiver: i32) -> AssignmentPair {
        AssignmentPair::new(ParticipantId::new(giver), ParticipantId::new(receiver))
    }

    #[rstest]
    fn three_cycle_is_accepted() {
        let round =
            Round::try_from_pairs(vec![pair(1, 2), pair(2, 3), pair(3, 1)]).expect("valid round");
        assert_eq!(round.len(), 3);
        assert_eq!(round.receiver_of(ParticipantId::new(3)), Some(ParticipantId::new(1)));
        assert_eq!(round.receiver_of(ParticipantId::new(9)), None);
    }

    #[rstest]
    #[case(vec![], RoundValidationError::TooFewPairs { count: 0 })]
    #[case(vec![pair(1, 2)], RoundValidationError::TooFewPairs { count: 1 })]
    #[case(
        vec![pair(1, 1), pair(2, 2)],
        RoundValidationError::SelfAssignment { participant: ParticipantId::new(1) }
    )]
    #[case(
        vec![pair(1, 2), pair(1, 3), pair(3, 1)],
        RoundValidationError::DuplicateGiver { giver: ParticipantId::new(1) }
    )]
    #[case(vec![pair(1, 2), pair(2, 3)], RoundValidationError::ReceiversMismatch)]
    fn invalid_rounds_are_rejected(
        #[case] pairs: Vec<AssignmentPair>,
        #[case] expected: RoundValidationError,
    ) {
        assert_eq!(Round::try_from_pairs(pairs), Err(expected));
    }

    #[rstest]
    fn participants_lists_every_giver() {
        let round = Round::try_from_pairs(vec![pair(4, 7), pair(7, 4)]).expect("valid round");
        let expected: BTreeSet<_> = [4, 7].into_iter().map(ParticipantId::new).collect();
        assert_eq!(round.participants(), expected);
    }
}
