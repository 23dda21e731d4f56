pub mod firebase;

use async_trait::async_trait;
use axum::extract::{ FromRef, FromRequestParts };
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use log::warn;
use std::sync::Arc;
use thiserror::Error;

use crate::error::ApiError;

pub use firebase::FirebaseVerifier;

/// The caller as established by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token header has no key id")]
    MissingKeyId,

    #[error("unsupported signing algorithm {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    #[error("no public key matches kid '{0}'")]
    UnknownKey(String),

    #[error("token subject is empty")]
    EmptySubject,

    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Guard run before every protected operation.
pub async fn authenticate(
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap
) -> Result<Identity, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::AuthenticationMissing)?;
    verifier.verify(token).await.map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::AuthenticationInvalid
    })
}

/// Extractor form of [`authenticate`] for handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
    where S: Send + Sync, Arc<dyn IdentityVerifier>: FromRef<S>
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<dyn IdentityVerifier>::from_ref(state);
        let identity = authenticate(verifier.as_ref(), &parts.headers).await?;
        Ok(AuthUser(identity))
    }
}
