//! Bearer token acquisition for ARM requests

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::client::ArmError;
use crate::config::ProviderConfig;

/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Source of bearer tokens
pub enum Credential {
    /// Pre-issued token (`ARM_ACCESS_TOKEN`)
    Static(String),
    /// OAuth2 client-credentials flow against Microsoft Entra ID
    ClientSecret(ClientSecretCredential),
}

impl Credential {
    pub fn from_config(config: &ProviderConfig, http: reqwest::Client) -> Result<Self, ArmError> {
        if let Some(token) = &config.access_token {
            return Ok(Credential::Static(token.clone()));
        }

        match (&config.tenant_id, &config.client_id, &config.client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                let token_url = config
                    .authority_host
                    .join(&format!("{}/oauth2/v2.0/token", tenant_id))?;
                let scope = format!("{}/.default", config.endpoint.as_str().trim_end_matches('/'));
                Ok(Credential::ClientSecret(ClientSecretCredential {
                    http,
                    token_url,
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    scope,
                    cache: Mutex::new(None),
                }))
            }
            _ => Err(ArmError::Auth(
                "no access token or client secret configured".to_string(),
            )),
        }
    }

    pub async fn token(&self) -> Result<String, ArmError> {
        match self {
            Credential::Static(token) => Ok(token.clone()),
            Credential::ClientSecret(credential) => credential.token().await,
        }
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl ClientSecretCredential {
    async fn token(&self) -> Result<String, ArmError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.value.clone());
        }

        log::debug!("requesting token from {}", self.token_url);
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ArmError::Auth(format!("requesting token: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ArmError::Auth(format!("reading token response: {}", e)))?;
        if !status.is_success() {
            return Err(ArmError::Auth(format!(
                "token endpoint returned {}: {}",
                status,
                crate::client::sanitize_for_log(&body)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ArmError::Auth(format!("decoding token response: {}", e)))?;

        // expires_in arrives as a number or a numeric string depending on the endpoint
        let lifetime = parsed
            .expires_in
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));

        *cache = Some(CachedToken {
            value: parsed.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });
        Ok(parsed.access_token)
    }
}
