//! Tooling Configuration

use serde::{Deserialize, Serialize};
use xt_tree::{MarshallOptions, UnmarshallOptions};

/// Configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,

    /// Whether new message contexts build missing subcontexts on lookup
    pub auto_create_subcontexts: bool,

    pub marshall: MarshallConfig,

    pub unmarshall: UnmarshallConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            auto_create_subcontexts: false,
            marshall: MarshallConfig::default(),
            unmarshall: UnmarshallConfig::default(),
        }
    }
}

/// Serializer settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshallConfig {
    /// Write an XML declaration first
    pub xml_declaration: bool,

    /// Spaces per nesting level; compact output when unset
    pub indent: Option<usize>,
}

/// Parser settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnmarshallConfig {
    /// Treat `prefix:local` attribute values with a bound prefix as QNames
    pub infer_qname_values: bool,
}

impl Default for UnmarshallConfig {
    fn default() -> Self {
        Self {
            infer_qname_values: true,
        }
    }
}

impl From<&MarshallConfig> for MarshallOptions {
    fn from(config: &MarshallConfig) -> Self {
        Self {
            xml_declaration: config.xml_declaration,
            indent: config.indent,
        }
    }
}

impl From<&UnmarshallConfig> for UnmarshallOptions {
    fn from(config: &UnmarshallConfig) -> Self {
        Self {
            infer_qname_values: config.infer_qname_values,
        }
    }
}
