//! In-memory [`LibraryRepository`] for tests and local development without a
//! database. Applies the same rules as the Postgres implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::library::{
    BookSummary, EntryUpdate, LibraryEntry, LibraryRepository, RepositoryError, ShelfBook,
};

#[derive(Default)]
struct Tables {
    entries: HashMap<(Uuid, Uuid), (u64, LibraryEntry)>,
    books: HashMap<Uuid, BookSummary>,
    next_seq: u64,
}

#[derive(Default)]
pub struct InMemoryLibraryRepository {
    tables: RwLock<Tables>,
    operations: AtomicUsize,
}

impl InMemoryLibraryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog book so listings can join its summary.
    pub async fn insert_book(&self, book: BookSummary) {
        self.tables.write().await.books.insert(book.id, book);
    }

    /// Number of repository operations served so far.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LibraryRepository for InMemoryLibraryRepository {
    async fn add_entry(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<LibraryEntry, RepositoryError> {
        self.record_operation();
        let mut tables = self.tables.write().await;

        // Catalog is enforced once any book has been registered.
        if !tables.books.is_empty() && !tables.books.contains_key(&book_id) {
            tracing::warn!(user_id = %user_id, book_id = %book_id, "book is not in the catalog");
            return Err(RepositoryError::UnknownBook);
        }

        if tables.entries.contains_key(&(user_id, book_id)) {
            tracing::warn!(user_id = %user_id, book_id = %book_id, "book already in library");
            return Err(RepositoryError::Conflict);
        }

        let entry = LibraryEntry::new(user_id, book_id, OffsetDateTime::now_utc());
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables
            .entries
            .insert((user_id, book_id), (seq, entry.clone()));

        tracing::info!(user_id = %user_id, book_id = %book_id, "book added to library");
        Ok(entry)
    }

    async fn fetch_entries_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ShelfBook>, RepositoryError> {
        self.record_operation();
        let tables = self.tables.read().await;

        let mut rows: Vec<&(u64, LibraryEntry)> = tables
            .entries
            .values()
            .filter(|(_, entry)| entry.user_id == user_id)
            .collect();
        // Most recently touched first; later writes win ties.
        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            b.last_progress_update_at
                .cmp(&a.last_progress_update_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        Ok(rows
            .into_iter()
            .map(|(_, entry)| ShelfBook::from_entry(entry, tables.books.get(&entry.book_id).cloned()))
            .collect())
    }

    async fn find_entry(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<LibraryEntry, RepositoryError> {
        self.record_operation();
        self.tables
            .read()
            .await
            .entries
            .get(&(user_id, book_id))
            .map(|(_, entry)| entry.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_entry(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        update: &EntryUpdate,
    ) -> Result<LibraryEntry, RepositoryError> {
        self.record_operation();
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq;

        let Some((row_seq, entry)) = tables.entries.get_mut(&(user_id, book_id)) else {
            tracing::warn!(user_id = %user_id, book_id = %book_id, "no library entry to update");
            return Err(RepositoryError::NotFound);
        };

        update.apply_to(entry);
        *row_seq = seq;
        let updated = entry.clone();
        tables.next_seq += 1;

        tracing::info!(user_id = %user_id, book_id = %book_id, "library entry updated");
        Ok(updated)
    }
}
