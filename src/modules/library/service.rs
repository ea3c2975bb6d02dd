use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use shelf_db::{LibraryEntry, LibraryRepository};

use super::error::{LibraryError, ValidationError};
use super::models::UpdateProgressRequest;
use super::progress::compute_update;
use super::shelves::{group, Shelves};

/// Library operations for an authenticated user.
#[derive(Clone)]
pub struct LibraryService {
    repository: Arc<dyn LibraryRepository>,
}

impl LibraryService {
    pub fn new(repository: Arc<dyn LibraryRepository>) -> Self {
        Self { repository }
    }

    /// Add a book to the user's library with status `to_read`.
    pub async fn add_book(&self, user_id: Uuid, book_id: &str) -> Result<LibraryEntry, LibraryError> {
        let book_id = parse_book_id(book_id)?;

        self.repository
            .add_entry(user_id, book_id)
            .await
            .map_err(|err| LibraryError::from_repository(err, book_id))
    }

    /// Apply a status and/or progress change to one of the user's books.
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        book_id: &str,
        request: &UpdateProgressRequest,
    ) -> Result<LibraryEntry, LibraryError> {
        let book_id = parse_book_id(book_id)?;
        let update = compute_update(request, OffsetDateTime::now_utc())?;

        tracing::debug!(
            user_id = %user_id,
            book_id = %book_id,
            status = ?update.status,
            progress = ?update.progress_percentage,
            "updating reading progress"
        );

        self.repository
            .update_entry(user_id, book_id, &update)
            .await
            .map_err(|err| LibraryError::from_repository(err, book_id))
    }

    /// One entry of the user's library.
    pub async fn get_entry(&self, user_id: Uuid, book_id: &str) -> Result<LibraryEntry, LibraryError> {
        let book_id = parse_book_id(book_id)?;

        self.repository
            .find_entry(user_id, book_id)
            .await
            .map_err(|err| LibraryError::from_repository(err, book_id))
    }

    /// The user's whole library, grouped into status shelves.
    pub async fn get_library(&self, user_id: Uuid) -> Result<Shelves, LibraryError> {
        let entries = self
            .repository
            .fetch_entries_for_user(user_id)
            .await
            .map_err(|_| LibraryError::Storage)?;

        let shelves = group(entries);
        tracing::debug!(user_id = %user_id, books = shelves.len(), "library fetched");
        Ok(shelves)
    }
}

fn parse_book_id(raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::InvalidBookId(raw.to_string()))
}
