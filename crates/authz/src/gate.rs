//! Request guards for handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use shelf_http::error::AppError;

use crate::identity::RequestIdentity;

/// Extractor for operations that require a resolved identity.
///
/// Rejects with 401 before the handler runs when the request is anonymous or
/// identity resolution never ran for this route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts
            .extensions
            .get::<RequestIdentity>()
            .and_then(|identity| identity.user_id)
        {
            Some(user_id) => Ok(CurrentUser(user_id)),
            None => {
                tracing::warn!(path = %parts.uri.path(), "unauthorized access attempt");
                Err(AppError::unauthorized("Authentication required"))
            }
        }
    }
}
