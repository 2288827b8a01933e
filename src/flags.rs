//! Feature flags read live from the SSM parameter store.
//!
//! Flags are fetched on every request, never cached. A fetch failure is
//! logged and degrades to an empty map so callers always have something
//! usable.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_sdk_ssm::Client;

use crate::error::BackendError;
use crate::models::FeatureFlags;

/// When true, exports are queued instead of generated inline.
pub const EXPORT_QUEUE_FLAG: &str = "useQueueForExports";

#[async_trait]
pub trait FlagSource: Send + Sync {
    /// Current flags. Never fails; errors yield an empty map.
    async fn fetch_all(&self) -> FeatureFlags;
}

/// Only the exact word "true", in any letter case, is true. Surrounding
/// whitespace is not trimmed.
pub fn coerce_flag(value: &str) -> bool {
    value.to_lowercase() == "true"
}

/// Builds the flag map from `(name, value)` parameter pairs, stripping
/// `prefix` from each name. Parameters with an empty name or value are
/// skipped.
pub fn flags_from_parameters<'a, I>(prefix: &str, parameters: I) -> FeatureFlags
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    parameters
        .into_iter()
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .map(|(name, value)| {
            let flag = name.strip_prefix(prefix).unwrap_or(name);
            (flag.to_string(), coerce_flag(value))
        })
        .collect()
}

pub fn is_enabled(flags: &FeatureFlags, name: &str) -> bool {
    flags.get(name).copied().unwrap_or(false)
}

/// Flag source backed by SSM `GetParametersByPath` under a fixed prefix.
#[derive(Clone)]
pub struct SsmFlagSource {
    client: Client,
    prefix: String,
}

impl SsmFlagSource {
    pub fn new(client: Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    async fn try_fetch(&self) -> Result<FeatureFlags, BackendError> {
        let mut parameters: Vec<(String, String)> = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .get_parameters_by_path()
                .path(&self.prefix)
                .recursive(true)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| BackendError::from_aws(&e, "Parameter store request failed"))?;

            for parameter in output.parameters() {
                if let (Some(name), Some(value)) = (parameter.name(), parameter.value()) {
                    parameters.push((name.to_string(), value.to_string()));
                }
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(flags_from_parameters(
            &self.prefix,
            parameters.iter().map(|(n, v)| (n.as_str(), v.as_str())),
        ))
    }
}

#[async_trait]
impl FlagSource for SsmFlagSource {
    async fn fetch_all(&self) -> FeatureFlags {
        match self.try_fetch().await {
            Ok(flags) => {
                tracing::debug!(?flags, "Feature flags loaded");
                flags
            }
            Err(e) => {
                tracing::warn!(
                    prefix = %self.prefix,
                    code = %e.code,
                    "Failed to fetch feature flags from Parameter Store: {}",
                    e.message
                );
                FeatureFlags::new()
            }
        }
    }
}

/// Fixed, settable flags. Used for tests and `serve --in-memory`.
#[derive(Clone, Default)]
pub struct StaticFlagSource {
    flags: Arc<Mutex<FeatureFlags>>,
}

impl StaticFlagSource {
    pub fn new(flags: FeatureFlags) -> Self {
        Self {
            flags: Arc::new(Mutex::new(flags)),
        }
    }

    pub fn set(&self, name: impl Into<String>, value: bool) {
        let mut flags = self.flags.lock().expect("flag source lock poisoned");
        flags.insert(name.into(), value);
    }
}

#[async_trait]
impl FlagSource for StaticFlagSource {
    async fn fetch_all(&self) -> FeatureFlags {
        self.flags.lock().expect("flag source lock poisoned").clone()
    }
}
