//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate them with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered participants, keyed by serial id.
    participants (id) {
        /// Primary key assigned by the registry.
        id -> Int4,
        /// Normalised (trimmed, lowercase) name; unique.
        name -> Varchar,
    }
}

diesel::table! {
    /// Chat users linked to the participant they registered as.
    user_links (chat_user_id) {
        /// Chat platform user id.
        chat_user_id -> Int8,
        /// Linked participant.
        participant_id -> Int4,
    }
}

diesel::table! {
    /// Committed giver to receiver assignments; one row per giver.
    assignments (giver_id) {
        /// Giving participant; primary key, so unique per epoch.
        giver_id -> Int4,
        /// Receiving participant.
        receiver_id -> Int4,
    }
}

diesel::joinable!(user_links -> participants (participant_id));

diesel::allow_tables_to_appear_in_same_query!(assignments, participants, user_links);
