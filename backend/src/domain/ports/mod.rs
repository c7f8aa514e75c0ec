//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the assignment service expects to interact with the
//! participant registry and the assignment store. Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants instead of returning opaque errors.

mod macros;
pub(crate) use macros::define_port_error;

mod assignment_repository;
mod participant_repository;
mod user_link_repository;

#[cfg(test)]
pub use assignment_repository::MockAssignmentRepository;
pub use assignment_repository::{AssignmentRepository, AssignmentRepositoryError};
#[cfg(test)]
pub use participant_repository::MockParticipantRepository;
pub use participant_repository::{ParticipantRepository, ParticipantRepositoryError};
#[cfg(test)]
pub use user_link_repository::MockUserLinkRepository;
pub use user_link_repository::{UserLinkRepository, UserLinkRepositoryError};
