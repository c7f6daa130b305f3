//! Configuration for the settings gateway driver

use serde::Deserialize;
use serde_json::Value;

/// Gateway driver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider used by gateways that do not name one
    #[serde(default)]
    pub default_provider: Option<String>,

    /// Gateways to register
    #[serde(default)]
    pub gateways: Vec<GatewayConfig>,

    /// Initialize gateways concurrently instead of one by one
    #[serde(default = "default_true")]
    pub concurrent_init: bool,
}

/// Per-gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Gateway name, also the table name
    pub name: String,

    /// Provider name
    #[serde(default)]
    pub provider: Option<String>,

    /// Host context forwarded with change events
    #[serde(default)]
    pub ambient_context: Option<Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            gateways: Vec::new(),
            concurrent_init: true,
        }
    }
}

impl Config {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

fn default_true() -> bool {
    true
}
