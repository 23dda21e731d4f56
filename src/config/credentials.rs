use async_trait::async_trait;
use log::{ info, warn };
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;
use yup_oauth2::{ read_service_account_key, AccessToken, ServiceAccountAuthenticator, ServiceAccountKey };

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Service account key IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No Firebase project id: set FIREBASE_PROJECT_ID or use a service account key with project_id")]
    MissingProjectId,

    #[error("OAuth token error: {0}")]
    Auth(String),
}

/// Supplies OAuth2 bearer tokens for Google REST APIs.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, CredentialsError>;
}

/// Reads the service account key if the file exists.
pub async fn load_service_account(path: &str) -> Result<Option<ServiceAccountKey>, CredentialsError> {
    if !Path::new(path).exists() {
        warn!("Service account key '{}' not found", path);
        return Ok(None);
    }
    let key = read_service_account_key(Path::new(path)).await?;
    info!("Loaded service account {}", key.client_email);
    Ok(Some(key))
}

/// An explicit project id wins over the one recorded in the key.
pub fn resolve_project_id(
    explicit: Option<&str>,
    key: Option<&ServiceAccountKey>
) -> Result<String, CredentialsError> {
    explicit
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .or_else(|| key.and_then(|k| k.project_id.clone()))
        .ok_or(CredentialsError::MissingProjectId)
}

/// Service-account flow, reusing the last token until it expires.
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, scopes: &[&str]) -> Self {
        Self {
            key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<AccessToken, CredentialsError> {
        let auth = ServiceAccountAuthenticator::builder(self.key.clone())
            .build().await
            .map_err(|e| CredentialsError::Auth(e.to_string()))?;
        auth.token(self.scopes.as_slice()).await.map_err(|e| CredentialsError::Auth(e.to_string()))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, CredentialsError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                if let Some(value) = token.token() {
                    return Ok(value.to_string());
                }
            }
        }

        let token = self.fetch().await?;
        let value = token
            .token()
            .ok_or_else(|| CredentialsError::Auth("OAuth token was None".to_string()))?
            .to_string();
        *cached = Some(token);
        Ok(value)
    }
}

/// A fixed token, for tests against a mock Firestore endpoint.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        StaticToken(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, CredentialsError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_project_id_is_required_without_key() {
        assert_eq!(resolve_project_id(Some("demo"), None).unwrap(), "demo");
        assert!(matches!(resolve_project_id(None, None), Err(CredentialsError::MissingProjectId)));
        assert!(matches!(resolve_project_id(Some("  "), None), Err(CredentialsError::MissingProjectId)));
    }

    #[tokio::test]
    async fn missing_key_file_is_not_an_error() {
        let key = load_service_account("/nonexistent/serviceAccountKey.json").await.unwrap();
        assert!(key.is_none());
    }

    #[test]
    fn errors_render_their_cause() {
        let err = CredentialsError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "Service account key IO error: gone");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let source = StaticToken::new("owner");
        assert_eq!(source.access_token().await.unwrap(), "owner");
    }
}
