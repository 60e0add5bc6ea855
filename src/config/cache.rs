use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_SCAN_PAGE_SIZE;
use crate::Error;
use crate::Result;

const MAX_SCAN_PAGE_SIZE: usize = 10_000;

/// Parameters of the tag rule cache reconciliation engine
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Fixed delay between two full-table scan passes (seconds)
    #[serde(default = "default_scan_interval_in_secs")]
    pub scan_interval_in_secs: u64,

    /// Rows fetched per page during a scan pass
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,

    /// When false the periodic scanner is not spawned; the warm-up scan
    /// and notification path still run
    #[serde(default = "default_scan_enabled")]
    pub scan_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            scan_interval_in_secs: default_scan_interval_in_secs(),
            scan_page_size: default_scan_page_size(),
            scan_enabled: default_scan_enabled(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "scan_interval_in_secs must be at least 1".into(),
            )));
        }

        if self.scan_page_size == 0 || self.scan_page_size > MAX_SCAN_PAGE_SIZE {
            return Err(Error::Config(ConfigError::Message(format!(
                "scan_page_size must be within 1..={}, got {}",
                MAX_SCAN_PAGE_SIZE, self.scan_page_size
            ))));
        }

        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_in_secs)
    }
}

fn default_scan_interval_in_secs() -> u64 {
    60
}
fn default_scan_page_size() -> usize {
    DEFAULT_SCAN_PAGE_SIZE
}
fn default_scan_enabled() -> bool {
    true
}
