use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use shelf_http::error::AppError;
use shelf_kernel::settings::AuthSettings;

const BEARER_PREFIX: &str = "Bearer ";
const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// Identity attached to a request after credential resolution. Read-only
/// once inserted into the request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_id: Option<Uuid>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl RequestIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// The `Authorization` header is present but unusable. Distinct from an
/// absent header, which is simply anonymous.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid authorization header format")]
    MalformedHeader,
}

/// Why a bearer token did not yield an identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("signing secret is not configured")]
    MissingSecret,
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token audience is not accepted")]
    InvalidAudience,
    #[error("token has no subject claim")]
    MissingSubject,
    #[error("subject claim is not a valid user id: {0}")]
    MalformedSubject(String),
    #[error("token is invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
}

/// Verifies HS256 bearer tokens against the configured secret.
#[derive(Clone)]
pub struct IdentityResolver {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl IdentityResolver {
    pub fn new(settings: &AuthSettings) -> Self {
        let key = settings
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(|secret| DecodingKey::from_secret(secret.as_bytes()));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[settings.jwt_audience.as_str()]);
        // No grace window past `exp`; tokens without `exp` stay rejected.
        validation.leeway = 0;

        Self { key, validation }
    }

    /// Resolve the caller from request headers.
    ///
    /// A missing header is anonymous. A token that fails verification is also
    /// anonymous, with the cause logged; only a malformed header is an error.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<RequestIdentity, CredentialError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            tracing::debug!("authorization header is missing; request is anonymous");
            return Ok(RequestIdentity::anonymous());
        };

        let token = value
            .to_str()
            .ok()
            .and_then(|header| header.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                tracing::warn!("invalid authorization header format");
                CredentialError::MalformedHeader
            })?;

        let refresh_token = headers
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if refresh_token.is_none() {
            tracing::debug!("refresh token header is missing");
        }

        let user_id = match self.verify(token) {
            Ok(user_id) => {
                tracing::debug!(user_id = %user_id, "bearer token accepted");
                Some(user_id)
            }
            Err(TokenRejection::MissingSecret) => {
                tracing::error!("signing secret is not configured; cannot verify bearer tokens");
                None
            }
            Err(rejection) => {
                tracing::warn!(
                    reason = %rejection,
                    token = %mask_token(token),
                    "bearer token rejected"
                );
                None
            }
        };

        Ok(RequestIdentity {
            user_id,
            access_token: Some(token.to_owned()),
            refresh_token,
        })
    }

    /// Verify a token and extract the user id from its `sub` claim.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenRejection> {
        let key = self.key.as_ref().ok_or(TokenRejection::MissingSecret)?;

        let data = jsonwebtoken::decode::<Claims>(token, key, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                ErrorKind::InvalidSignature => TokenRejection::InvalidSignature,
                ErrorKind::InvalidAudience => TokenRejection::InvalidAudience,
                _ => TokenRejection::Invalid(err.to_string()),
            }
        })?;

        let subject = data
            .claims
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(TokenRejection::MissingSubject)?;

        Uuid::parse_str(&subject).map_err(|_| TokenRejection::MalformedSubject(subject))
    }
}

fn mask_token(token: &str) -> String {
    if token.len() > 10 && token.is_ascii() {
        format!("{}...{}", &token[..5], &token[token.len() - 5..])
    } else {
        "<short>".to_string()
    }
}

/// Middleware storing the caller's [`RequestIdentity`] in request extensions.
pub async fn resolve_identity(
    State(resolver): State<Arc<IdentityResolver>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = resolver.resolve(request.headers()).map_err(|err| {
        AppError::bad_request(err.to_string()).with_code("invalid_authorization_header")
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
