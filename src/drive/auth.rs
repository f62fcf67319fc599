//! Service-account authentication for the Drive API.
//!
//! Tokens come from the OAuth2 JWT bearer grant: an RS256-signed assertion is exchanged at the
//! credentials' `token_uri` for a short-lived access token, which is cached until shortly
//! before it expires.

use super::DriveError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Client;
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// OAuth scope granting read-only access to Drive files.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for Drive requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a currently valid access token.
    async fn access_token(&self) -> Result<String, DriveError>;
}

/// Fields of a Google service-account key that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    /// Service account e-mail, used as the assertion issuer.
    pub client_email: String,
    /// PKCS#8 private key in PEM form.
    pub private_key: String,
    /// Token endpoint the assertion is posted to.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountCredentials {
    /// Parse the credentials JSON document.
    pub fn from_json(raw: &str) -> Result<Self, DriveError> {
        let mut credentials: Self = serde_json::from_str(raw)
            .map_err(|err| DriveError::Credentials(format!("invalid credentials JSON: {err}")))?;
        // Keys pasted into a single-line env value keep literal `\n` escapes.
        credentials.private_key = credentials.private_key.replace("\\n", "\n");
        Ok(credentials)
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Token source backed by a service-account key.
pub struct ServiceAccountAuth {
    http: Client,
    client_email: String,
    token_uri: String,
    scope: String,
    key_pair: RsaKeyPair,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Build a token source for `scope`.
    ///
    /// The private key is parsed here, so a malformed key fails construction instead of the
    /// first token exchange.
    pub fn new(
        credentials: ServiceAccountCredentials,
        scope: impl Into<String>,
    ) -> Result<Self, DriveError> {
        let key_pair = parse_private_key(&credentials.private_key)?;
        let http = Client::builder().user_agent("docqna/auth").build()?;
        Ok(Self {
            http,
            client_email: credentials.client_email,
            token_uri: credentials.token_uri,
            scope: scope.into(),
            key_pair,
            cached: RwLock::new(None),
        })
    }

    fn signed_assertion(&self, issued_at: u64) -> Result<String, DriveError> {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = build_claims(&self.client_email, &self.scope, &self.token_uri, issued_at);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        let signing_input = format!("{header}.{payload}");

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| DriveError::Auth("failed to sign JWT assertion".into()))?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(&signature)))
    }

    async fn exchange(&self) -> Result<CachedToken, DriveError> {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let assertion = self.signed_assertion(issued_at)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Auth(format!(
                "token exchange failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained Drive access token");
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

#[async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, DriveError> {
        if let Some(token) = usable_token(self.cached.read().await.as_ref()) {
            return Ok(token);
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while this one waited for the write lock.
        if let Some(token) = usable_token(cached.as_ref()) {
            return Ok(token);
        }
        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }
}

fn usable_token(cached: Option<&CachedToken>) -> Option<String> {
    cached
        .filter(|token| token.expires_at > Instant::now() + REFRESH_MARGIN)
        .map(|token| token.access_token.clone())
}

fn parse_private_key(private_key: &str) -> Result<RsaKeyPair, DriveError> {
    let pem = pem::parse(private_key)
        .map_err(|err| DriveError::Credentials(format!("invalid private key PEM: {err}")))?;
    RsaKeyPair::from_pkcs8(pem.contents())
        .map_err(|err| DriveError::Credentials(format!("unusable private key: {err}")))
}

fn build_claims(issuer: &str, scope: &str, audience: &str, issued_at: u64) -> serde_json::Value {
    json!({
        "iss": issuer,
        "scope": scope,
        "aud": audience,
        "iat": issued_at,
        "exp": issued_at + ASSERTION_LIFETIME_SECS,
    })
}
