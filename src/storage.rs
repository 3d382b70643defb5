//! Object-storage location for the source image.
//!
//! Resolves the `[storage]` config section plus two environment variables
//! into a [`BlobLocation`]: account credentials, the service/container/blob
//! URLs and a retry policy. This is plain data handed to whatever client
//! talks to the storage service; no client is built here, and nothing in
//! this module is shared with the [`pipeline`](crate::pipeline).

use crate::config::StorageConfig;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StorageError {
    #[error("Environment variable {0} is not set or empty")]
    MissingVariable(String),
    #[error("Invalid storage account name {0:?}: expected 3-24 lowercase letters or digits")]
    InvalidAccountName(String),
}

/// Shared-key credential material. The key never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_name: String,
    account_key: String,
}

impl Credentials {
    pub fn account_key(&self) -> &str {
        &self.account_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .finish()
    }
}

/// Exponential retry settings for storage requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_tries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << shift)
    }
}

/// Fully resolved location of one blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub credentials: Credentials,
    pub container: String,
    pub blob: String,
    pub retry: RetryPolicy,
}

impl BlobLocation {
    /// Resolve from config, reading credentials from the process environment.
    pub fn from_env(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve from config with an explicit variable lookup.
    pub fn resolve<F>(config: &StorageConfig, lookup: F) -> Result<Self, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| StorageError::MissingVariable(name.to_string()))
        };

        let account_name = require(&config.account_name_env)?;
        let account_key = require(&config.account_key_env)?;
        if !is_valid_account_name(&account_name) {
            return Err(StorageError::InvalidAccountName(account_name));
        }

        Ok(Self {
            credentials: Credentials {
                account_name,
                account_key,
            },
            container: config.container.clone(),
            blob: config.blob.clone(),
            retry: RetryPolicy {
                max_tries: config.max_retries,
                base_delay: Duration::from_millis(config.retry_delay_ms),
            },
        })
    }

    pub fn service_url(&self) -> String {
        format!(
            "https://{}.blob.core.windows.net",
            self.credentials.account_name
        )
    }

    pub fn container_url(&self) -> String {
        format!("{}/{}", self.service_url(), self.container)
    }

    pub fn blob_url(&self) -> String {
        format!("{}/{}", self.container_url(), self.blob)
    }
}

fn is_valid_account_name(name: &str) -> bool {
    (3..=24).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}
