//! Groups a user's tracked books into one bucket per reading status.

use serde::Serialize;

use shelf_db::{ReadingStatus, ShelfBook};

/// A user's library partitioned by status. All four buckets are always
/// present in the serialized form, empty or not.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Shelves {
    pub to_read: Vec<ShelfBook>,
    pub reading: Vec<ShelfBook>,
    pub finished: Vec<ShelfBook>,
    pub abandoned: Vec<ShelfBook>,
}

impl Shelves {
    pub fn bucket(&self, status: ReadingStatus) -> &[ShelfBook] {
        match status {
            ReadingStatus::ToRead => &self.to_read,
            ReadingStatus::Reading => &self.reading,
            ReadingStatus::Finished => &self.finished,
            ReadingStatus::Abandoned => &self.abandoned,
        }
    }

    fn bucket_mut(&mut self, status: ReadingStatus) -> &mut Vec<ShelfBook> {
        match status {
            ReadingStatus::ToRead => &mut self.to_read,
            ReadingStatus::Reading => &mut self.reading,
            ReadingStatus::Finished => &mut self.finished,
            ReadingStatus::Abandoned => &mut self.abandoned,
        }
    }

    pub fn len(&self) -> usize {
        ReadingStatus::ALL
            .into_iter()
            .map(|status| self.bucket(status).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `entries` by status, keeping their order within each bucket.
///
/// Entries without a recognised status belong to no bucket; each one is
/// logged so the exclusion is visible.
pub fn group(entries: Vec<ShelfBook>) -> Shelves {
    let mut shelves = Shelves::default();

    for entry in entries {
        match entry.status {
            Some(status) => shelves.bucket_mut(status).push(entry),
            None => tracing::warn!(
                book_id = %entry.book_id,
                "library entry without a known status left out of every shelf"
            ),
        }
    }

    shelves
}
