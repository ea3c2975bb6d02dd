//! HTTP handlers for the library module.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use shelf_authz::CurrentUser;
use shelf_db::LibraryEntry;
use shelf_http::error::AppError;

use super::models::{AddBookRequest, UpdateProgressRequest};
use super::service::LibraryService;
use super::shelves::Shelves;

pub fn router(service: LibraryService) -> Router {
    Router::new()
        .route("/", get(get_library).post(add_book))
        .route("/health", get(health_check))
        .route("/{book_id}", get(get_entry).patch(update_progress))
        .with_state(service)
}

async fn health_check() -> &'static str {
    "library module is healthy"
}

/// The caller's library grouped into status shelves
async fn get_library(
    State(service): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Shelves>, AppError> {
    let shelves = service.get_library(user_id).await?;
    Ok(Json(shelves))
}

/// Add a book to the caller's library
async fn add_book(
    State(service): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<AddBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LibraryEntry>), AppError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let entry = service.add_book(user_id, &request.book_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn get_entry(
    State(service): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    Path(book_id): Path<String>,
) -> Result<Json<LibraryEntry>, AppError> {
    let entry = service.get_entry(user_id, &book_id).await?;
    Ok(Json(entry))
}

/// Update status and/or progress of one of the caller's books
async fn update_progress(
    State(service): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    Path(book_id): Path<String>,
    payload: Result<Json<UpdateProgressRequest>, JsonRejection>,
) -> Result<Json<LibraryEntry>, AppError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let entry = service.update_progress(user_id, &book_id, &request).await?;
    Ok(Json(entry))
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::bad_request(rejection.body_text()).with_code("invalid_body")
}
