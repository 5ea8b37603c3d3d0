use std::{env, time::Duration};

use log::*;
use loyalty_common::helpers::env_or_default;
use url::Url;

use crate::{AccrualApiError, RetryPolicy};

const DEFAULT_ACCRUAL_SYSTEM_ADDRESS: &str = "http://127.0.0.1:8081";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Base URL of the accrual service, e.g. `http://localhost:8081`. The order lookup path is appended to it.
    pub base_url: String,
    /// Connect and read timeout for a single request.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ACCRUAL_SYSTEM_ADDRESS.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl AccrualConfig {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.to_string(), ..Default::default() }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parses `base_url`, which must be an absolute `http` or `https` URL with a host. The returned URL always ends
    /// in `/`, so relative paths join onto it rather than replacing its last segment.
    pub fn parse_base_url(&self) -> Result<Url, AccrualApiError> {
        let raw = self.base_url.trim();
        let mut url =
            Url::parse(raw).map_err(|e| AccrualApiError::InvalidUrl(format!("'{raw}' is not a valid URL. {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AccrualApiError::InvalidUrl(format!("'{raw}' must use http or https")));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(AccrualApiError::InvalidUrl(format!("'{raw}' has no host")));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("LPS_ACCRUAL_SYSTEM_ADDRESS").unwrap_or_else(|_| {
            warn!("🪛️ LPS_ACCRUAL_SYSTEM_ADDRESS not set, using {DEFAULT_ACCRUAL_SYSTEM_ADDRESS} as default");
            DEFAULT_ACCRUAL_SYSTEM_ADDRESS.to_string()
        });
        let timeout = Duration::from_secs(env_or_default("LPS_ACCRUAL_TIMEOUT", DEFAULT_TIMEOUT.as_secs()));
        let defaults = RetryPolicy::default();
        let max_attempts = env_or_default("LPS_ACCRUAL_RETRY_ATTEMPTS", defaults.max_attempts);
        #[allow(clippy::cast_possible_truncation)]
        let min_delay = env_or_default("LPS_ACCRUAL_RETRY_MIN_DELAY_MS", defaults.min_delay.as_millis() as u64);
        #[allow(clippy::cast_possible_truncation)]
        let max_delay = env_or_default("LPS_ACCRUAL_RETRY_MAX_DELAY_MS", defaults.max_delay.as_millis() as u64);
        let retry = RetryPolicy::new(max_attempts, Duration::from_millis(min_delay), Duration::from_millis(max_delay));
        Self { base_url, timeout, retry }
    }
}
