//! Library repository contract: one row per (user, book) with reading state.
//!
//! The contract owns no business rules beyond the ones the store itself
//! enforces: composite-key uniqueness, scoping by user, and the status-derived
//! column rules spelled out on [`EntryUpdate`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Reading state of a library entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    ToRead,
    Reading,
    Finished,
    Abandoned,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 4] = [
        ReadingStatus::ToRead,
        ReadingStatus::Reading,
        ReadingStatus::Finished,
        ReadingStatus::Abandoned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReadingStatus::ToRead => "to_read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Finished => "finished",
            ReadingStatus::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown reading status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ReadingStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ReadingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// A persisted (user, book) reading-progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub status: ReadingStatus,
    pub progress_percentage: i16,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_reading_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_reading_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_progress_update_at: OffsetDateTime,
}

impl LibraryEntry {
    /// A freshly added entry: `to_read`, no progress.
    pub fn new(user_id: Uuid, book_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            user_id,
            book_id,
            status: ReadingStatus::ToRead,
            progress_percentage: 0,
            started_reading_at: None,
            finished_reading_at: None,
            last_progress_update_at: now,
        }
    }
}

/// Display fields of a catalog book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub cover_image_url: Option<String>,
}

/// A library entry joined with its book summary, as listed for a user.
///
/// `status` is `None` when the stored value is missing or unrecognised;
/// `book` is `None` when the catalog has no row for `book_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShelfBook {
    pub book_id: Uuid,
    pub status: Option<ReadingStatus>,
    pub progress_percentage: i16,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_reading_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_reading_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_progress_update_at: OffsetDateTime,
    #[serde(flatten)]
    pub book: Option<BookSummary>,
}

impl ShelfBook {
    pub fn from_entry(entry: &LibraryEntry, book: Option<BookSummary>) -> Self {
        Self {
            book_id: entry.book_id,
            status: Some(entry.status),
            progress_percentage: entry.progress_percentage,
            started_reading_at: entry.started_reading_at,
            finished_reading_at: entry.finished_reading_at,
            last_progress_update_at: entry.last_progress_update_at,
            book,
        }
    }
}

/// Partial update of a library entry.
///
/// Store-side rules every implementation applies:
/// - `started_reading_at` is written only if the entry has none yet.
/// - when the resulting status is `finished`, progress is stored as 100.
/// - `None` fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    pub status: Option<ReadingStatus>,
    pub progress_percentage: Option<i16>,
    pub started_reading_at: Option<OffsetDateTime>,
    pub finished_reading_at: Option<OffsetDateTime>,
    pub last_progress_update_at: OffsetDateTime,
}

impl EntryUpdate {
    /// Apply the update to an in-memory entry following the store-side rules.
    pub fn apply_to(&self, entry: &mut LibraryEntry) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(progress) = self.progress_percentage {
            entry.progress_percentage = progress;
        }
        if entry.status == ReadingStatus::Finished {
            entry.progress_percentage = 100;
        }
        if entry.started_reading_at.is_none() {
            entry.started_reading_at = self.started_reading_at;
        }
        if let Some(finished_at) = self.finished_reading_at {
            entry.finished_reading_at = Some(finished_at);
        }
        entry.last_progress_update_at = self.last_progress_update_at;
    }
}

/// Typed outcomes of repository operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// The (user, book) pair is already present.
    #[error("already_exists")]
    Conflict,
    /// No entry matches the (user, book) pair.
    #[error("entry not found")]
    NotFound,
    /// The book id has no row in the catalog.
    #[error("book not in catalog")]
    UnknownBook,
    /// Transport or storage failure; details are logged where it happened.
    #[error("storage failure during {operation}")]
    Storage { operation: &'static str },
}

/// Persistence contract for library entries. Every operation is scoped by
/// the caller's user id.
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Insert a `to_read` entry; `Conflict` when the pair already exists,
    /// `UnknownBook` when the catalog has no such book.
    async fn add_entry(&self, user_id: Uuid, book_id: Uuid)
        -> Result<LibraryEntry, RepositoryError>;

    /// All entries of a user with book summaries, most recently updated first.
    async fn fetch_entries_for_user(&self, user_id: Uuid)
        -> Result<Vec<ShelfBook>, RepositoryError>;

    /// A single entry of a user; `NotFound` when the book is not tracked.
    async fn find_entry(&self, user_id: Uuid, book_id: Uuid)
        -> Result<LibraryEntry, RepositoryError>;

    /// Apply `update` to the user's entry for `book_id`; `NotFound` when absent.
    async fn update_entry(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        update: &EntryUpdate,
    ) -> Result<LibraryEntry, RepositoryError>;
}
