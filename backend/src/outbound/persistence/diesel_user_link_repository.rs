//! PostgreSQL-backed `UserLinkRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{UserLinkRepository, UserLinkRepositoryError};
use crate::domain::{ChatUserId, Participant, ParticipantId};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, map_pool_error};
use super::diesel_participant_repository::row_to_participant;
use super::models::{NewUserLinkRow, ParticipantRow};
use super::pool::{DbPool, PoolError};
use super::schema::{participants, user_links};

/// Diesel-backed chat user links.
#[derive(Clone)]
pub struct DieselUserLinkRepository {
    pool: DbPool,
}

impl DieselUserLinkRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_connection_error(error: PoolError) -> UserLinkRepositoryError {
    map_pool_error(error, UserLinkRepositoryError::connection)
}

fn map_diesel_error(
    error: diesel::result::Error,
    participant: ParticipantId,
) -> UserLinkRepositoryError {
    match classify_diesel_error(&error) {
        DieselFailure::ForeignKeyViolation => UserLinkRepositoryError::unknown_participant(participant),
        DieselFailure::Connection => {
            UserLinkRepositoryError::connection(DieselFailure::Connection.message())
        }
        failure => UserLinkRepositoryError::query(failure.message()),
    }
}

#[async_trait]
impl UserLinkRepository for DieselUserLinkRepository {
    async fn find_participant(
        &self,
        user: ChatUserId,
    ) -> Result<Option<Participant>, UserLinkRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;

        let row = user_links::table
            .inner_join(participants::table)
            .filter(user_links::chat_user_id.eq(user.get()))
            .select(ParticipantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| match classify_diesel_error(&err) {
                DieselFailure::Connection => {
                    UserLinkRepositoryError::connection(DieselFailure::Connection.message())
                }
                failure => UserLinkRepositoryError::query(failure.message()),
            })?;

        row.map(row_to_participant)
            .transpose()
            .map_err(UserLinkRepositoryError::query)
    }

    async fn link(
        &self,
        user: ChatUserId,
        participant: ParticipantId,
    ) -> Result<ParticipantId, UserLinkRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_connection_error)?;
        let new_link = NewUserLinkRow {
            chat_user_id: user.get(),
            participant_id: participant.get(),
        };

        let linked: i32 = conn
            .transaction(|conn| {
                async move {
                    diesel::insert_into(user_links::table)
                        .values(&new_link)
                        .on_conflict(user_links::chat_user_id)
                        .do_nothing()
                        .execute(conn)
                        .await?;

                    user_links::table
                        .find(new_link.chat_user_id)
                        .select(user_links::participant_id)
                        .first(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, participant))?;

        Ok(ParticipantId::new(linked))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let err = map_connection_error(PoolError::build("invalid url"));
        assert_eq!(err, UserLinkRepositoryError::connection("invalid url"));
    }

    #[rstest]
    fn query_failures_keep_a_stable_message() {
        let err = map_diesel_error(diesel::result::Error::NotFound, ParticipantId::new(1));
        assert_eq!(err, UserLinkRepositoryError::query("database error"));
    }
}
