//! PostgreSQL persistence adapters.
//!
//! Diesel-backed implementations of the assignment ports. Every repository
//! shares one [`DbPool`]; schema changes ship as embedded migrations.

mod diesel_assignment_repository;
mod diesel_error_mapping;
mod diesel_participant_repository;
mod diesel_user_link_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_assignment_repository::DieselAssignmentRepository;
pub use diesel_participant_repository::DieselParticipantRepository;
pub use diesel_user_link_repository::DieselUserLinkRepository;
pub use migrations::{MigrationError, migrate_schema, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
