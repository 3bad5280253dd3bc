//! Provider configuration
//!
//! Settings come from `ARM_*` environment variables, optionally overridden by
//! the `provider` block of the configuration file.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("subscription_id must be set (or ARM_SUBSCRIPTION_ID)")]
    MissingSubscription,

    #[error(
        "no credentials configured: set ARM_ACCESS_TOKEN, or ARM_TENANT_ID, ARM_CLIENT_ID and ARM_CLIENT_SECRET"
    )]
    MissingCredentials,

    #[error("invalid URL for {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid value {value:?} for {name}")]
    InvalidNumber { name: &'static str, value: String },
}

/// `provider` block of the configuration file; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderBlock {
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub endpoint: Option<String>,
    pub authority_host: Option<String>,
    pub max_retries: Option<u32>,
    pub overwrite_existing: Option<bool>,
    pub poll_interval_seconds: Option<u64>,
}

/// Resolved provider settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub endpoint: Url,
    pub authority_host: Url,
    pub max_retries: u32,
    /// Skip the already-exists check on create
    pub overwrite_existing: bool,
    /// Delay between long-running operation polls when the API gives no Retry-After
    pub poll_interval: Duration,
}

impl ProviderConfig {
    /// Read settings from the process environment, then apply `block` on top
    pub fn resolve(block: &ProviderBlock) -> Result<Self, ConfigError> {
        Self::resolve_with(block, |name| std::env::var(name).ok())
    }

    /// Same as [`ProviderConfig::resolve`] with an injectable variable lookup
    pub fn resolve_with(
        block: &ProviderBlock,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let pick = |file: &Option<String>, var: &str| {
            file.clone()
                .or_else(|| env(var))
                .filter(|v| !v.trim().is_empty())
        };

        let subscription_id =
            pick(&block.subscription_id, "ARM_SUBSCRIPTION_ID").ok_or(ConfigError::MissingSubscription)?;

        let endpoint = pick(&block.endpoint, "ARM_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = Url::parse(&endpoint).map_err(|source| ConfigError::InvalidUrl {
            name: "endpoint",
            source,
        })?;

        let authority_host = pick(&block.authority_host, "ARM_AUTHORITY_HOST")
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        let authority_host = Url::parse(&authority_host).map_err(|source| ConfigError::InvalidUrl {
            name: "authority_host",
            source,
        })?;

        let max_retries = match block.max_retries {
            Some(n) => n,
            None => match env("ARM_MAX_RETRIES") {
                Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                    name: "ARM_MAX_RETRIES",
                    value: v.clone(),
                })?,
                None => DEFAULT_MAX_RETRIES,
            },
        };

        let config = Self {
            subscription_id,
            tenant_id: pick(&block.tenant_id, "ARM_TENANT_ID"),
            client_id: pick(&block.client_id, "ARM_CLIENT_ID"),
            client_secret: pick(&block.client_secret, "ARM_CLIENT_SECRET"),
            access_token: env("ARM_ACCESS_TOKEN").filter(|v| !v.trim().is_empty()),
            endpoint,
            authority_host,
            max_retries,
            overwrite_existing: block.overwrite_existing.unwrap_or(false),
            poll_interval: Duration::from_secs(block.poll_interval_seconds.unwrap_or(10)),
        };

        if config.access_token.is_none()
            && (config.tenant_id.is_none() || config.client_id.is_none() || config.client_secret.is_none())
        {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(config)
    }

    /// Configuration for tests against a local mock endpoint
    pub fn for_endpoint(endpoint: &str, subscription_id: &str, token: &str) -> Result<Self, ConfigError> {
        let block = ProviderBlock {
            subscription_id: Some(subscription_id.to_string()),
            endpoint: Some(endpoint.to_string()),
            poll_interval_seconds: Some(0),
            ..Default::default()
        };
        let token = token.to_string();
        Self::resolve_with(&block, move |name| {
            (name == "ARM_ACCESS_TOKEN").then(|| token.clone())
        })
    }
}
