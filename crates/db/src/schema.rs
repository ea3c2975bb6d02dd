//! Tables owned by the library repository.

use shelf_kernel::Migration;

/// Module name the library migrations are recorded under.
pub const LIBRARY_MODULE: &str = "my-books";

/// Schema for `books` (created only if the catalog has not) and
/// `user_reading_progress`.
pub fn library_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_books",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id              UUID        PRIMARY KEY,
                    title           TEXT        NOT NULL,
                    author          TEXT,
                    cover_image_url TEXT,
                    created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
                );
                "#,
        },
        Migration {
            id: "002_user_reading_progress",
            up: r#"
                CREATE TABLE IF NOT EXISTS user_reading_progress (
                    user_id                 UUID        NOT NULL,
                    book_id                 UUID        NOT NULL REFERENCES books (id),
                    status                  TEXT        NOT NULL DEFAULT 'to_read'
                        CHECK (status IN ('to_read', 'reading', 'finished', 'abandoned')),
                    progress_percentage     SMALLINT    NOT NULL DEFAULT 0
                        CHECK (progress_percentage BETWEEN 0 AND 100),
                    started_reading_at      TIMESTAMPTZ,
                    finished_reading_at     TIMESTAMPTZ,
                    last_progress_update_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    PRIMARY KEY (user_id, book_id),
                    CHECK (status <> 'finished'
                           OR (progress_percentage = 100 AND finished_reading_at IS NOT NULL)),
                    CHECK (status <> 'reading' OR started_reading_at IS NOT NULL)
                );
                CREATE INDEX IF NOT EXISTS user_reading_progress_recent_idx
                    ON user_reading_progress (user_id, last_progress_update_at DESC);
                "#,
        },
    ]
}

/// `(module, migration)` pairs ready for [`crate::migrate`].
pub fn library_migration_set() -> Vec<(String, Migration)> {
    library_migrations()
        .into_iter()
        .map(|migration| (LIBRARY_MODULE.to_string(), migration))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_ids_are_ordered_and_unique() {
        let ids: Vec<&str> = library_migrations().iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }
}
