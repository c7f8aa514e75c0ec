//! PostgreSQL-backed `ParticipantRepository`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ParticipantRepository, ParticipantRepositoryError};
use crate::domain::{Participant, ParticipantId, ParticipantName};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, map_pool_error};
use super::models::ParticipantRow;
use super::pool::{DbPool, PoolError};
use super::schema::participants;

diesel::define_sql_function! {
    /// PostgreSQL `lower(text)`, matching the unique index on participant names.
    fn lower(value: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// Diesel-backed read access to the participant registry.
#[derive(Clone)]
pub struct DieselParticipantRepository {
    pool: DbPool,
}

impl DieselParticipantRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_connection_error(error: PoolError) -> ParticipantRepositoryError {
    map_pool_error(error, ParticipantRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ParticipantRepositoryError {
    match classify_diesel_error(&error) {
        DieselFailure::Connection => {
            ParticipantRepositoryError::connection(DieselFailure::Connection.message())
        }
        failure => ParticipantRepositoryError::query(failure.message()),
    }
}

/// Convert a stored row into a domain participant.
pub(crate) fn row_to_participant(row: ParticipantRow) -> Result<Participant, String> {
    let name = ParticipantName::new(&row.name)
        .map_err(|err| format!("corrupted participant name for id {}: {err}", row.id))?;
    Ok(Participant::new(ParticipantId::new(row.id), name))
}

#[async_trait]
impl ParticipantRepository for DieselParticipantRepository {
    async fn list_participant_ids(
        &self,
    ) -> Result<BTreeSet<ParticipantId>, ParticipantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let ids: Vec<i32> = participants::table
            .select(participants::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(ids.into_iter().map(ParticipantId::new).collect())
    }

    async fn find_by_name(
        &self,
        name: &ParticipantName,
    ) -> Result<Option<Participant>, ParticipantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let row = participants::table
            .filter(lower(participants::name).eq(lower(name.as_ref())))
            .select(ParticipantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_participant)
            .transpose()
            .map_err(ParticipantRepositoryError::query)
    }

    async fn find_by_id(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, ParticipantRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let row = participants::table
            .find(id.get())
            .select(ParticipantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_participant)
            .transpose()
            .map_err(ParticipantRepositoryError::query)
    }
}
