use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{ decode, decode_header, Algorithm, DecodingKey, Validation };
use log::{ debug, info };
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::time::{ Duration, Instant };
use tokio::sync::RwLock;

use super::{ AuthError, Identity, IdentityVerifier };

pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
const CLOCK_SKEW_LEEWAY_SECS: u64 = 60;
/// An unknown `kid` only triggers a refetch once the cached set is at least this old.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

impl CachedKeys {
    /// `None` when the cache cannot answer for `kid` and a fetch is due.
    fn lookup(&self, kid: &str, now: Instant) -> Option<Result<DecodingKey, AuthError>> {
        if self.expires_at <= now {
            return None;
        }
        match self.set.find(kid) {
            Some(jwk) => Some(DecodingKey::from_jwk(jwk).map_err(AuthError::from)),
            None if now.duration_since(self.fetched_at) < MIN_REFETCH_INTERVAL => {
                Some(Err(AuthError::UnknownKey(kid.to_string())))
            }
            None => None,
        }
    }
}

/// Verifies Firebase Authentication ID tokens against Google's published keys.
pub struct FirebaseVerifier {
    http: reqwest::Client,
    project_id: String,
    jwks_url: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self::with_jwks_url(project_id, GOOGLE_JWKS_URL)
    }

    pub fn with_jwks_url(project_id: impl Into<String>, jwks_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            keys: RwLock::new(None),
        }
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, AuthError> {
        debug!("Fetching Firebase signing keys from {}", self.jwks_url);
        let resp = self.http
            .get(&self.jwks_url)
            .send().await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let ttl = resp
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let set = resp.json::<JwkSet>().await.map_err(|e| AuthError::KeyFetch(e.to_string()))?;
        info!("Loaded {} Firebase signing keys (ttl {}s)", set.keys.len(), ttl.as_secs());

        let fetched_at = Instant::now();
        Ok(CachedKeys {
            set,
            fetched_at,
            expires_at: fetched_at + ttl,
        })
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let guard = self.keys.read().await;
            if let Some(answer) = guard.as_ref().and_then(|c| c.lookup(kid, Instant::now())) {
                return answer;
            }
        }

        // Held across the fetch so concurrent misses share one request.
        let mut guard = self.keys.write().await;
        if let Some(answer) = guard.as_ref().and_then(|c| c.lookup(kid, Instant::now())) {
            return answer;
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh.set
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()?
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()));
        *guard = Some(fresh);
        key
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_LEEWAY_SECS;
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let data = decode::<FirebaseClaims>(token, &key, &validation)?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::EmptySubject);
        }

        Ok(Identity {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
