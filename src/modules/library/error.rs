use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use shelf_db::RepositoryError;
use shelf_http::error::AppError;

/// Malformed input, detected before any repository call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("nothing to update")]
    NothingToUpdate,
    #[error("invalid status")]
    InvalidStatus(String),
    #[error("progress out of range")]
    ProgressOutOfRange(serde_json::Value),
    #[error("invalid book id")]
    InvalidBookId(String),
}

impl ValidationError {
    fn detail(&self) -> serde_json::Value {
        match self {
            ValidationError::NothingToUpdate => {
                json!({"field": "status|progress", "error": "required"})
            }
            ValidationError::InvalidStatus(value) => json!({
                "field": "status",
                "error": "invalid",
                "value": value,
                "allowed": ["to_read", "reading", "finished", "abandoned"],
            }),
            ValidationError::ProgressOutOfRange(value) => json!({
                "field": "progress",
                "error": "out_of_range",
                "value": value,
                "min": 0,
                "max": 100,
            }),
            ValidationError::InvalidBookId(value) => {
                json!({"field": "book_id", "error": "invalid_uuid", "value": value})
            }
        }
    }
}

/// Outcomes of library operations other than success.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LibraryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("book {0} is already in the library")]
    AlreadyInLibrary(Uuid),
    #[error("book {0} is not in the library")]
    NotInLibrary(Uuid),
    #[error("book {0} is not in the catalog")]
    UnknownBook(Uuid),
    #[error("library storage failure")]
    Storage,
}

impl LibraryError {
    pub(crate) fn from_repository(err: RepositoryError, book_id: Uuid) -> Self {
        match err {
            RepositoryError::Conflict => LibraryError::AlreadyInLibrary(book_id),
            RepositoryError::NotFound => LibraryError::NotInLibrary(book_id),
            RepositoryError::UnknownBook => LibraryError::UnknownBook(book_id),
            RepositoryError::Storage { .. } => LibraryError::Storage,
        }
    }
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Validation(validation) => {
                AppError::validation(vec![validation.detail()], validation.to_string())
            }
            LibraryError::AlreadyInLibrary(book_id) => AppError::conflict(
                vec![json!({"book_id": book_id})],
                "Book is already in your library",
            )
            .with_code("already_exists"),
            LibraryError::NotInLibrary(_) => {
                AppError::not_found("Book not found in your library")
            }
            LibraryError::UnknownBook(_) => {
                AppError::not_found("Book not found in the catalog").with_code("book_not_found")
            }
            LibraryError::Storage => AppError::Internal(anyhow::anyhow!("library storage failure")),
        }
    }
}
