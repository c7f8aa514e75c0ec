//! Participant identities.
//!
//! Participants are owned by the registry; the pairing core only references
//! them by [`ParticipantId`]. Names are stored and compared in their
//! normalised form so uniqueness is case-insensitive.

use std::fmt;

/// Maximum number of characters in a participant name.
pub const PARTICIPANT_NAME_MAX: usize = 255;

/// Validation errors returned by [`ParticipantName::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParticipantValidationError {
    /// The name was empty once trimmed.
    #[error("participant name must not be empty")]
    EmptyName,
    /// The name exceeded [`PARTICIPANT_NAME_MAX`] characters.
    #[error("participant name must be at most {max} characters")]
    NameTooLong { max: usize },
}

/// Stable integer identifier assigned by the participant registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(i32);

impl ParticipantId {
    /// Wrap a raw registry id.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Access the raw id as stored in the database.
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for ParticipantId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Case-normalised participant name.
///
/// ## Invariants
/// - Surrounding whitespace is trimmed and the value is lowercased before
///   any comparison or storage.
/// - The normalised value is non-empty and at most
///   [`PARTICIPANT_NAME_MAX`] characters.
///
/// # Examples
/// ```
/// use santa_backend::domain::ParticipantName;
///
/// let name = ParticipantName::new("  Dilnoza ").expect("valid name");
/// assert_eq!(name.as_ref(), "dilnoza");
/// assert_eq!(name, ParticipantName::new("DILNOZA").expect("valid name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantName(String);

impl ParticipantName {
    /// Normalise and validate a raw name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ParticipantValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.is_empty() {
            return Err(ParticipantValidationError::EmptyName);
        }
        if normalised.chars().count() > PARTICIPANT_NAME_MAX {
            return Err(ParticipantValidationError::NameTooLong {
                max: PARTICIPANT_NAME_MAX,
            });
        }
        Ok(Self(normalised))
    }

    /// Render the name title-cased for replies, e.g. `"ali vali"` becomes
    /// `"Ali Vali"`.
    pub fn display(&self) -> String {
        self.0
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AsRef<str> for ParticipantName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ParticipantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl TryFrom<String> for ParticipantName {
    type Error = ParticipantValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Registered participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    id: ParticipantId,
    name: ParticipantName,
}

impl Participant {
    /// Build a participant from its parts.
    pub const fn new(id: ParticipantId, name: ParticipantName) -> Self {
        Self { id, name }
    }

    /// Registry id.
    pub const fn id(&self) -> ParticipantId {
        self.id
    }

    /// Normalised name.
    pub const fn name(&self) -> &ParticipantName {
        &self.name
    }
}

/// Identifier of a chat-platform user linked to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChatUserId(i64);

impl ChatUserId {
    /// Wrap a raw chat user id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Access the raw id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
