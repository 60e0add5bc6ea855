use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Prometheus exporter for the rule cache counters (scan passes, merges,
/// release messages, index sizes).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    /// Serve `/metrics` over HTTP
    #[serde(default = "default_prometheus_enabled")]
    pub prometheus_enabled: bool,

    /// Unprivileged port of the exporter
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: default_prometheus_enabled(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    /// Only an enabled exporter needs a bindable port; a port set while the
    /// exporter is off is ignored with a warning.
    pub fn validate(&self) -> Result<()> {
        if !self.prometheus_enabled {
            if self.prometheus_port != default_prometheus_port() {
                tracing::warn!(
                    "monitoring.prometheus_port={} ignored, exporter disabled",
                    self.prometheus_port
                );
            }
            return Ok(());
        }

        match self.prometheus_port {
            0 => Err(invalid("monitoring.prometheus_port must be set when the exporter is enabled".to_string())),
            port if port < 1024 => Err(invalid(format!(
                "monitoring.prometheus_port {} is privileged, pick a port >= 1024",
                port
            ))),
            _ => Ok(()),
        }
    }
}

fn invalid(message: String) -> Error {
    Error::Config(ConfigError::Message(message))
}

fn default_prometheus_enabled() -> bool {
    false
}

fn default_prometheus_port() -> u16 {
    9090
}
