use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

pub const BASE_URL: &str = "https://obd.hcraontario.ca/api/";
pub const INPUT_FILE: &str = "builders.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub input_path: Utf8PathBuf,
    pub cache_root: Utf8PathBuf,
    pub account_delay: Duration,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            input_path: Utf8PathBuf::from(INPUT_FILE),
            cache_root: Utf8PathBuf::from("."),
            account_delay: Duration::from_secs(2),
            http_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl Settings {
    pub fn with_root(mut self, root: impl AsRef<Utf8Path>) -> Self {
        let root = root.as_ref();
        self.input_path = root.join(INPUT_FILE);
        self.cache_root = root.to_path_buf();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn with_account_delay(mut self, delay: Duration) -> Self {
        self.account_delay = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_consecutive_failures: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the `failures`-th consecutive failure (1-based).
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}
