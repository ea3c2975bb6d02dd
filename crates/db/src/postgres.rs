//! Postgres implementation of [`LibraryRepository`].

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::library::{
    BookSummary, EntryUpdate, LibraryEntry, LibraryRepository, ReadingStatus, RepositoryError,
    ShelfBook,
};

const ENTRY_COLUMNS: &str = "user_id, book_id, status, progress_percentage, \
     started_reading_at, finished_reading_at, last_progress_update_at";

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    user_id: Uuid,
    book_id: Uuid,
    status: String,
    progress_percentage: i16,
    started_reading_at: Option<OffsetDateTime>,
    finished_reading_at: Option<OffsetDateTime>,
    last_progress_update_at: OffsetDateTime,
}

impl EntryRow {
    fn into_entry(self, operation: &'static str) -> Result<LibraryEntry, RepositoryError> {
        let status = self.status.parse::<ReadingStatus>().map_err(|err| {
            tracing::error!(
                operation,
                user_id = %self.user_id,
                book_id = %self.book_id,
                error = %err,
                "stored entry has an unknown status"
            );
            RepositoryError::Storage { operation }
        })?;

        Ok(LibraryEntry {
            user_id: self.user_id,
            book_id: self.book_id,
            status,
            progress_percentage: self.progress_percentage,
            started_reading_at: self.started_reading_at,
            finished_reading_at: self.finished_reading_at,
            last_progress_update_at: self.last_progress_update_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShelfRow {
    book_id: Uuid,
    status: Option<String>,
    progress_percentage: i16,
    started_reading_at: Option<OffsetDateTime>,
    finished_reading_at: Option<OffsetDateTime>,
    last_progress_update_at: OffsetDateTime,
    catalog_id: Option<Uuid>,
    title: Option<String>,
    author: Option<String>,
    cover_image_url: Option<String>,
}

impl From<ShelfRow> for ShelfBook {
    fn from(row: ShelfRow) -> Self {
        let book = match (row.catalog_id, row.title) {
            (Some(id), Some(title)) => Some(BookSummary {
                id,
                title,
                author: row.author,
                cover_image_url: row.cover_image_url,
            }),
            _ => None,
        };

        ShelfBook {
            book_id: row.book_id,
            status: row.status.as_deref().and_then(|s| s.parse().ok()),
            progress_percentage: row.progress_percentage,
            started_reading_at: row.started_reading_at,
            finished_reading_at: row.finished_reading_at,
            last_progress_update_at: row.last_progress_update_at,
            book,
        }
    }
}

/// Library repository backed by the `user_reading_progress` table.
#[derive(Clone)]
pub struct PgLibraryRepository {
    pool: PgPool,
}

impl PgLibraryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn storage_error(
        operation: &'static str,
        user_id: Uuid,
        book_id: Option<Uuid>,
        err: sqlx::Error,
    ) -> RepositoryError {
        tracing::error!(
            operation,
            table = "user_reading_progress",
            user_id = %user_id,
            book_id = ?book_id,
            error = %err,
            "storage operation failed"
        );
        RepositoryError::Storage { operation }
    }
}

#[async_trait]
impl LibraryRepository for PgLibraryRepository {
    async fn add_entry(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<LibraryEntry, RepositoryError> {
        const OPERATION: &str = "add_entry";

        let sql = format!(
            "INSERT INTO user_reading_progress \
                 (user_id, book_id, status, progress_percentage, last_progress_update_at) \
             VALUES ($1, $2, $3, 0, $4) \
             RETURNING {ENTRY_COLUMNS}"
        );

        let result = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(user_id)
            .bind(book_id)
            .bind(ReadingStatus::ToRead.as_str())
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => {
                tracing::info!(user_id = %user_id, book_id = %book_id, "book added to library");
                row.into_entry(OPERATION)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::warn!(user_id = %user_id, book_id = %book_id, "book already in library");
                Err(RepositoryError::Conflict)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                tracing::warn!(user_id = %user_id, book_id = %book_id, "book is not in the catalog");
                Err(RepositoryError::UnknownBook)
            }
            Err(err) => Err(Self::storage_error(OPERATION, user_id, Some(book_id), err)),
        }
    }

    async fn fetch_entries_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ShelfBook>, RepositoryError> {
        const OPERATION: &str = "fetch_entries_for_user";

        let rows = sqlx::query_as::<_, ShelfRow>(
            r#"
            SELECT p.book_id,
                   p.status,
                   p.progress_percentage,
                   p.started_reading_at,
                   p.finished_reading_at,
                   p.last_progress_update_at,
                   b.id AS catalog_id,
                   b.title,
                   b.author,
                   b.cover_image_url
            FROM user_reading_progress p
            LEFT JOIN books b ON b.id = p.book_id
            WHERE p.user_id = $1
            ORDER BY p.last_progress_update_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Self::storage_error(OPERATION, user_id, None, err))?;

        tracing::debug!(user_id = %user_id, count = rows.len(), "fetched library entries");
        Ok(rows.into_iter().map(ShelfBook::from).collect())
    }

    async fn find_entry(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<LibraryEntry, RepositoryError> {
        const OPERATION: &str = "find_entry";

        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM user_reading_progress \
             WHERE user_id = $1 AND book_id = $2"
        );

        sqlx::query_as::<_, EntryRow>(&sql)
            .bind(user_id)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Self::storage_error(OPERATION, user_id, Some(book_id), err))?
            .ok_or(RepositoryError::NotFound)?
            .into_entry(OPERATION)
    }

    async fn update_entry(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        update: &EntryUpdate,
    ) -> Result<LibraryEntry, RepositoryError> {
        const OPERATION: &str = "update_entry";

        // Mirrors EntryUpdate::apply_to.
        let sql = format!(
            "UPDATE user_reading_progress SET \
                 status = COALESCE($3, status), \
                 progress_percentage = CASE \
                     WHEN COALESCE($3, status) = 'finished' THEN 100 \
                     ELSE COALESCE($4, progress_percentage) \
                 END, \
                 started_reading_at = COALESCE(started_reading_at, $5), \
                 finished_reading_at = COALESCE($6, finished_reading_at), \
                 last_progress_update_at = $7 \
             WHERE user_id = $1 AND book_id = $2 \
             RETURNING {ENTRY_COLUMNS}"
        );

        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(user_id)
            .bind(book_id)
            .bind(update.status.map(ReadingStatus::as_str))
            .bind(update.progress_percentage)
            .bind(update.started_reading_at)
            .bind(update.finished_reading_at)
            .bind(update.last_progress_update_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Self::storage_error(OPERATION, user_id, Some(book_id), err))?;

        match row {
            Some(row) => {
                tracing::info!(user_id = %user_id, book_id = %book_id, "library entry updated");
                row.into_entry(OPERATION)
            }
            None => {
                tracing::warn!(user_id = %user_id, book_id = %book_id, "no library entry to update");
                Err(RepositoryError::NotFound)
            }
        }
    }
}
