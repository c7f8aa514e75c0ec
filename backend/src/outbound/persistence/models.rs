//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer; adapters convert them to
//! domain types at the port boundary.

use diesel::prelude::*;

use super::schema::{assignments, participants, user_links};

/// Row read from the participants table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ParticipantRow {
    pub id: i32,
    pub name: String,
}

/// Insertable assignment row.
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = assignments)]
pub(crate) struct NewAssignmentRow {
    pub giver_id: i32,
    pub receiver_id: i32,
}

/// Insertable user link row.
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = user_links)]
pub(crate) struct NewUserLinkRow {
    pub chat_user_id: i64,
    pub participant_id: i32,
}
