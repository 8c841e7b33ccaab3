//! Google OAuth 2.0 client.

use async_trait::async_trait;
use quizdeck_db::models::user::ExternalProfile;
use serde::Deserialize;

use super::identity::{IdentityProvider, OAuthError};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid profile email";

/// OAuth client credentials.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered with Google.
    pub callback_url: String,
}

impl GoogleConfig {
    /// Read `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and
    /// `GOOGLE_CALLBACK_URL`. Returns `None` unless all three are set.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let callback_url = std::env::var("GOOGLE_CALLBACK_URL").ok()?;
        Some(Self {
            client_id,
            client_secret,
            callback_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// [`IdentityProvider`] backed by Google's OAuth endpoints.
pub struct GoogleOAuth {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, OAuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
        Err(OAuthError::Provider {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuth {
    fn authorize_url(&self, state: &str) -> String {
        let query = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.callback_url.as_str()),
            ("response_type", "code"),
            ("scope", SCOPES),
            ("state", state),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={}", encode_component(v)))
        .collect::<Vec<_>>()
        .join("&");
        format!("{AUTHORIZE_URL}?{query}")
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalProfile, OAuthError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let token: TokenResponse = Self::ensure_success(response).await?.json().await?;

        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        let info: UserInfo = Self::ensure_success(response).await?.json().await?;

        let email = info.email.ok_or(OAuthError::IncompleteProfile("email"))?;
        let name = info.name.unwrap_or_else(|| email.clone());
        Ok(ExternalProfile {
            external_id: info.sub,
            email,
            name,
            image: info.picture,
        })
    }
}

/// Percent-encode a query component (RFC 3986 unreserved set kept as is).
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
