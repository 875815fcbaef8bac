//! Middleware configuration: JSON5 files, environment switches and key overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RmwError};
use crate::transport::MemoryPolicy;

/// Path of a JSON5 file holding an [`RmwConfig`].
pub const CONFIG_FILE_ENV: &str = "RMW_DDS_CONFIG_FILE";
/// `key=value;key=value` overrides applied after every other source.
pub const CONFIG_OVERRIDE_ENV: &str = "RMW_DDS_CONFIG_OVERRIDE";
/// When `1`, transport default QoS profiles are left alone.
pub const USE_QOS_FROM_XML_ENV: &str = "RMW_DDS_USE_QOS_FROM_XML";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RmwConfig {
    /// Keep the transport's reader defaults instead of forcing `history_memory_policy`.
    pub leave_middleware_default_qos: bool,
    pub history_memory_policy: MemoryPolicy,
    /// Whether subscriptions get a listener unless asked otherwise.
    pub create_listeners: bool,
}

impl Default for RmwConfig {
    fn default() -> Self {
        Self {
            leave_middleware_default_qos: false,
            history_memory_policy: MemoryPolicy::PreallocatedWithRealloc,
            create_listeners: true,
        }
    }
}

impl RmwConfig {
    pub fn from_json5(text: &str) -> Result<Self> {
        json5::from_str(text).map_err(|e| RmwError::configuration(format!("invalid config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RmwError::configuration(format!("cannot read config file {}: {e}", path.display()))
        })?;
        debug!("[CFG] Loaded config file {}", path.display());
        Self::from_json5(&text)
    }

    /// Replaces the value of one top-level key.
    pub fn apply_override(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut current = serde_json::to_value(&*self)
            .map_err(|e| RmwError::configuration(format!("cannot serialize config: {e}")))?;
        let slot = current
            .as_object_mut()
            .and_then(|fields| fields.get_mut(key))
            .ok_or_else(|| RmwError::configuration(format!("unknown config key '{key}'")))?;
        *slot = value;
        *self = serde_json::from_value(current).map_err(|e| {
            RmwError::configuration(format!("invalid value for config key '{key}': {e}"))
        })?;
        debug!("[CFG] Override: {key}");
        Ok(())
    }
}

/// Parses `key=value;key=value`, values in JSON5.
///
/// ```
/// use rmw_dds::config::parse_overrides;
///
/// let overrides = parse_overrides("create_listeners=false; history_memory_policy=\"Dynamic\"").unwrap();
/// assert_eq!(overrides.len(), 2);
/// assert_eq!(overrides[0].0, "create_listeners");
/// ```
pub fn parse_overrides(text: &str) -> Result<Vec<(String, serde_json::Value)>> {
    let mut overrides = Vec::new();
    for pair in text.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            return Err(RmwError::configuration(format!(
                "invalid {CONFIG_OVERRIDE_ENV} format: '{pair}'. Expected 'key=value'"
            )));
        };
        let (key, value) = (key.trim(), value.trim());
        let json_value = json5::from_str::<serde_json::Value>(value).map_err(|e| {
            RmwError::configuration(format!(
                "failed to parse {CONFIG_OVERRIDE_ENV} value for key '{key}': {e} (value: {value})"
            ))
        })?;
        overrides.push((key.to_owned(), json_value));
    }
    Ok(overrides)
}
