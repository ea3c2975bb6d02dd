//! Bearer identity resolution and authorization guards.
//!
//! [`resolve_identity`] runs once per request and stores a [`RequestIdentity`]
//! in the request extensions; handlers receive it through the [`CurrentUser`]
//! extractor.

use std::sync::Arc;

use axum::{middleware, Router};

pub mod gate;
pub mod identity;

pub use gate::CurrentUser;
pub use identity::{
    resolve_identity, CredentialError, IdentityResolver, RequestIdentity, TokenRejection,
};

/// Run identity resolution for every route of `router`.
pub fn protect<S>(router: Router<S>, resolver: Arc<IdentityResolver>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(resolver, resolve_identity))
}
