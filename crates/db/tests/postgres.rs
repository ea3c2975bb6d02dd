//! `PgLibraryRepository` against a live Postgres.
//!
//! Every test returns early when `DATABASE_URL` is unset. Tests share one
//! schema and stay isolated by using fresh user and book ids.

use sqlx::{postgres::PgPoolOptions, PgPool};
use time::{macros::datetime, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use shelf_db::{
    schema::library_migration_set, EntryUpdate, LibraryRepository, PgLibraryRepository,
    ReadingStatus, RepositoryError,
};

static MIGRATED: Mutex<bool> = Mutex::const_new(false);

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set; skipping Postgres repository test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to create test database pool");

    let mut migrated = MIGRATED.lock().await;
    if !*migrated {
        shelf_db::migrate(&pool, &library_migration_set())
            .await
            .expect("Failed to run migrations");
        *migrated = true;
    }

    Some(pool)
}

async fn catalog_book(pool: &PgPool, title: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO books (id, title, author) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(title)
        .bind("Test Author")
        .execute(pool)
        .await
        .expect("Failed to insert catalog book");
    id
}

fn update(at: OffsetDateTime) -> EntryUpdate {
    EntryUpdate {
        status: None,
        progress_percentage: None,
        started_reading_at: None,
        finished_reading_at: None,
        last_progress_update_at: at,
    }
}

#[tokio::test]
async fn duplicate_add_is_conflict() {
    let Some(pool) = test_pool().await else { return };
    let repo = PgLibraryRepository::new(pool.clone());
    let user = Uuid::new_v4();
    let book = catalog_book(&pool, "Piranesi").await;

    let entry = repo.add_entry(user, book).await.unwrap();
    assert_eq!(entry.status, ReadingStatus::ToRead);
    assert_eq!(entry.progress_percentage, 0);
    assert!(entry.started_reading_at.is_none());

    assert_eq!(
        repo.add_entry(user, book).await,
        Err(RepositoryError::Conflict)
    );
    assert_eq!(repo.fetch_entries_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_adds_yield_one_entry_and_one_conflict() {
    let Some(pool) = test_pool().await else { return };
    let repo = PgLibraryRepository::new(pool.clone());
    let user = Uuid::new_v4();
    let book = catalog_book(&pool, "Gilead").await;

    let (first, second) = tokio::join!(repo.add_entry(user, book), repo.add_entry(user, book));

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| outcome == &Err(RepositoryError::Conflict)));
}

#[tokio::test]
async fn book_missing_from_catalog_is_unknown() {
    let Some(pool) = test_pool().await else { return };
    let repo = PgLibraryRepository::new(pool);

    assert_eq!(
        repo.add_entry(Uuid::new_v4(), Uuid::new_v4()).await,
        Err(RepositoryError::UnknownBook)
    );
}

#[tokio::test]
async fn update_keeps_first_start_and_pins_finished_progress() {
    let Some(pool) = test_pool().await else { return };
    let repo = PgLibraryRepository::new(pool.clone());
    let user = Uuid::new_v4();
    let book = catalog_book(&pool, "Stoner").await;
    repo.add_entry(user, book).await.unwrap();

    let started = datetime!(2024-03-01 09:00 UTC);
    let mut reading = update(started);
    reading.status = Some(ReadingStatus::Reading);
    reading.progress_percentage = Some(20);
    reading.started_reading_at = Some(started);
    let entry = repo.update_entry(user, book, &reading).await.unwrap();
    assert_eq!(entry.started_reading_at, Some(started));
    assert_eq!(entry.progress_percentage, 20);

    let later = datetime!(2024-03-05 09:00 UTC);
    reading.started_reading_at = Some(later);
    reading.last_progress_update_at = later;
    let entry = repo.update_entry(user, book, &reading).await.unwrap();
    assert_eq!(entry.started_reading_at, Some(started));
    assert_eq!(entry.last_progress_update_at, later);

    let finished_at = datetime!(2024-03-10 21:30 UTC);
    let mut finish = update(finished_at);
    finish.status = Some(ReadingStatus::Finished);
    finish.finished_reading_at = Some(finished_at);
    let entry = repo.update_entry(user, book, &finish).await.unwrap();
    assert_eq!(entry.status, ReadingStatus::Finished);
    assert_eq!(entry.progress_percentage, 100);
    assert_eq!(entry.finished_reading_at, Some(finished_at));

    let mut tick = update(datetime!(2024-03-11 08:00 UTC));
    tick.progress_percentage = Some(30);
    let entry = repo.update_entry(user, book, &tick).await.unwrap();
    assert_eq!(entry.status, ReadingStatus::Finished);
    assert_eq!(entry.progress_percentage, 100);
    assert_eq!(entry.started_reading_at, Some(started));
}

#[tokio::test]
async fn update_and_find_are_scoped_to_owner() {
    let Some(pool) = test_pool().await else { return };
    let repo = PgLibraryRepository::new(pool.clone());
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let book = catalog_book(&pool, "Housekeeping").await;
    repo.add_entry(owner, book).await.unwrap();

    let mut tick = update(OffsetDateTime::now_utc());
    tick.progress_percentage = Some(10);

    assert_eq!(
        repo.update_entry(stranger, book, &tick).await,
        Err(RepositoryError::NotFound)
    );
    assert_eq!(
        repo.find_entry(stranger, book).await,
        Err(RepositoryError::NotFound)
    );
    assert_eq!(
        repo.find_entry(owner, book).await.unwrap().progress_percentage,
        0
    );
}

#[tokio::test]
async fn fetch_joins_books_newest_update_first() {
    let Some(pool) = test_pool().await else { return };
    let repo = PgLibraryRepository::new(pool.clone());
    let user = Uuid::new_v4();
    let older = catalog_book(&pool, "The Remains of the Day").await;
    let newer = catalog_book(&pool, "Never Let Me Go").await;

    repo.add_entry(user, older).await.unwrap();
    repo.add_entry(user, newer).await.unwrap();

    let mut touch_older = update(datetime!(2030-01-01 00:00 UTC));
    touch_older.progress_percentage = Some(5);
    repo.update_entry(user, older, &touch_older).await.unwrap();
    let mut touch_newer = update(datetime!(2030-06-01 00:00 UTC));
    touch_newer.progress_percentage = Some(50);
    repo.update_entry(user, newer, &touch_newer).await.unwrap();

    let shelf = repo.fetch_entries_for_user(user).await.unwrap();
    let order: Vec<Uuid> = shelf.iter().map(|book| book.book_id).collect();
    assert_eq!(order, vec![newer, older]);

    let summary = shelf[0].book.as_ref().expect("catalog row joined");
    assert_eq!(summary.id, newer);
    assert_eq!(summary.title, "Never Let Me Go");
    assert_eq!(shelf[0].status, Some(ReadingStatus::ToRead));

    assert!(repo
        .fetch_entries_for_user(Uuid::new_v4())
        .await
        .unwrap()
        .is_empty());
}
