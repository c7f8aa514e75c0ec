//! PostgreSQL-backed `AssignmentRepository`.
//!
//! A round is written as one multi-row insert inside a transaction, so the
//! rows land together or not at all. The primary key on `giver_id` rejects
//! a second round for the same givers; that violation is reported as
//! [`AssignmentRepositoryError::Conflict`].

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{AssignmentRepository, AssignmentRepositoryError};
use crate::domain::{Participant, ParticipantId, Round, RoundEntry};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, map_pool_error};
use super::diesel_participant_repository::row_to_participant;
use super::models::{NewAssignmentRow, ParticipantRow};
use super::pool::{DbPool, PoolError};
use super::schema::{assignments, participants, user_links};

/// Diesel-backed assignment store.
#[derive(Clone)]
pub struct DieselAssignmentRepository {
    pool: DbPool,
}

impl DieselAssignmentRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_connection_error(error: PoolError) -> AssignmentRepositoryError {
    map_pool_error(error, AssignmentRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> AssignmentRepositoryError {
    match classify_diesel_error(&error) {
        DieselFailure::UniqueViolation => {
            AssignmentRepositoryError::conflict("giver already has an assignment")
        }
        DieselFailure::Connection => {
            AssignmentRepositoryError::connection(DieselFailure::Connection.message())
        }
        failure => AssignmentRepositoryError::query(failure.message()),
    }
}

fn count_to_u64(count: i64) -> Result<u64, AssignmentRepositoryError> {
    u64::try_from(count)
        .map_err(|_| AssignmentRepositoryError::query(format!("negative row count {count}")))
}

fn usize_to_u64(count: usize) -> Result<u64, AssignmentRepositoryError> {
    u64::try_from(count)
        .map_err(|_| AssignmentRepositoryError::query(format!("row count {count} overflows")))
}

/// Join assignment rows with participant rows, ordered by giver name.
fn build_entries(
    pairs: Vec<(i32, i32)>,
    participant_rows: Vec<ParticipantRow>,
) -> Result<Vec<RoundEntry>, AssignmentRepositoryError> {
    let by_id: HashMap<ParticipantId, Participant> = participant_rows
        .into_iter()
        .map(|row| row_to_participant(row).map(|participant| (participant.id(), participant)))
        .collect::<Result<_, _>>()
        .map_err(AssignmentRepositoryError::query)?;

    let lookup = |id: i32| {
        by_id.get(&ParticipantId::new(id)).cloned().ok_or_else(|| {
            AssignmentRepositoryError::query(format!("assignment references missing participant {id}"))
        })
    };

    let mut entries = pairs
        .into_iter()
        .map(|(giver, receiver)| -> Result<RoundEntry, AssignmentRepositoryError> {
            Ok(RoundEntry {
                giver: lookup(giver)?,
                receiver: lookup(receiver)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|left, right| left.giver.name().cmp(right.giver.name()));
    Ok(entries)
}

#[async_trait]
impl AssignmentRepository for DieselAssignmentRepository {
    async fn find_receiver(
        &self,
        giver: ParticipantId,
    ) -> Result<Option<ParticipantId>, AssignmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let receiver: Option<i32> = assignments::table
            .find(giver.get())
            .select(assignments::receiver_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(receiver.map(ParticipantId::new))
    }

    async fn count_assignments(&self) -> Result<u64, AssignmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let count: i64 = assignments::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        count_to_u64(count)
    }

    async fn commit_round(&self, round: &Round) -> Result<(), AssignmentRepositoryError> {
        let rows: Vec<NewAssignmentRow> = round
            .pairs()
            .iter()
            .map(|pair| NewAssignmentRow {
                giver_id: pair.giver.get(),
                receiver_id: pair.receiver.get(),
            })
            .collect();
        let expected = rows.len();
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let inserted = conn
            .transaction(|conn| {
                async move {
                    let inserted = diesel::insert_into(assignments::table)
                        .values(&rows)
                        .execute(conn)
                        .await?;
                    if inserted != expected {
                        // Roll back rather than leave a partial round.
                        return Err(diesel::result::Error::RollbackTransaction);
                    }
                    Ok(inserted)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        debug!(inserted, "assignment round inserted");
        Ok(())
    }

    async fn list_round(&self) -> Result<Vec<RoundEntry>, AssignmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        // Read both tables in one transaction so the rows agree.
        let (pairs, participant_rows) = conn
            .transaction(|conn| {
                async move {
                    let pairs: Vec<(i32, i32)> = assignments::table
                        .select((assignments::giver_id, assignments::receiver_id))
                        .load(conn)
                        .await?;
                    let participant_rows: Vec<ParticipantRow> = participants::table
                        .select(ParticipantRow::as_select())
                        .load(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>((pairs, participant_rows))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        build_entries(pairs, participant_rows)
    }

    async fn reset_epoch(&self) -> Result<u64, AssignmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let (cleared, unlinked) = conn
            .transaction(|conn| {
                async move {
                    let cleared = diesel::delete(assignments::table).execute(conn).await?;
                    let unlinked = diesel::delete(user_links::table).execute(conn).await?;
                    Ok::<_, diesel::result::Error>((cleared, unlinked))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        debug!(cleared, unlinked, "assignment epoch cleared");
        usize_to_u64(cleared)
    }
}
