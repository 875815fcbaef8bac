use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::{
    CONFIG_FILE_ENV, CONFIG_OVERRIDE_ENV, RmwConfig, USE_QOS_FROM_XML_ENV, parse_overrides,
};
use crate::error::{Result, RmwError};
use crate::graph::{GraphIndex, NodeHandle};
use crate::graph_cache::GraphCache;
use crate::participant::ParticipantInfo;
use crate::transport::DdsParticipant;
use crate::{Builder, RMW_DDS_IDENTIFIER};

#[derive(Default)]
pub struct ContextBuilder {
    config_file: Option<PathBuf>,
    config_overrides: Vec<(String, serde_json::Value)>,
    graph: Option<Arc<dyn GraphIndex>>,
}

impl ContextBuilder {
    /// Load the configuration from a JSON5 file instead of `RMW_DDS_CONFIG_FILE`.
    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Override one configuration key.
    ///
    /// # Example
    /// ```
    /// use rmw_dds::context::ContextBuilder;
    /// use rmw_dds::Builder;
    ///
    /// let ctx = ContextBuilder::default()
    ///     .with_json("create_listeners", false)
    ///     .build()
    ///     .expect("Failed to build context");
    /// assert!(!ctx.config().create_listeners);
    /// ```
    pub fn with_json<K: Into<String>, V: serde::Serialize>(mut self, key: K, value: V) -> Self {
        let key = key.into();
        match serde_json::to_value(&value) {
            Ok(value) => self.config_overrides.push((key, value)),
            // keeps the key so that build() reports it
            Err(e) => {
                debug!("[CTX] Cannot serialize value for key '{key}': {e}");
                self.config_overrides
                    .push((key, serde_json::Value::String(format!("<unserializable: {e}>"))));
            }
        }
        self
    }

    /// Query this graph index instead of a fresh [`GraphCache`].
    pub fn with_graph(mut self, graph: Arc<dyn GraphIndex>) -> Self {
        self.graph = Some(graph);
        self
    }

    fn load_config(&self) -> Result<RmwConfig> {
        let mut config = if let Some(path) = &self.config_file {
            RmwConfig::from_file(path)?
        } else if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            debug!("[CTX] Using {CONFIG_FILE_ENV}={path}");
            RmwConfig::from_file(path)?
        } else {
            RmwConfig::default()
        };

        if std::env::var(USE_QOS_FROM_XML_ENV).is_ok_and(|v| v == "1") {
            config.leave_middleware_default_qos = true;
        }

        for (key, value) in &self.config_overrides {
            config.apply_override(key, value.clone())?;
        }
        if let Ok(overrides) = std::env::var(CONFIG_OVERRIDE_ENV) {
            debug!("[CTX] Applying config overrides from {CONFIG_OVERRIDE_ENV}: {overrides}");
            for (key, value) in parse_overrides(&overrides)? {
                config.apply_override(&key, value)?;
            }
        }
        Ok(config)
    }
}

impl Builder for ContextBuilder {
    type Output = Context;

    #[tracing::instrument(name = "ctx_build", skip(self), fields(config_file = ?self.config_file))]
    fn build(self) -> Result<Context> {
        let config = self.load_config().map_err(RmwError::record)?;
        debug!("[CTX] Built context: {config:?}");
        Ok(Context {
            config,
            graph: self.graph.unwrap_or_else(|| Arc::new(GraphCache::new())),
        })
    }
}

/// Configuration and graph index shared by the nodes and participants of a process.
pub struct Context {
    config: RmwConfig,
    graph: Arc<dyn GraphIndex>,
}

impl Context {
    pub fn config(&self) -> &RmwConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<dyn GraphIndex> {
        &self.graph
    }

    pub fn create_node(&self, name: &str, namespace: &str) -> Result<NodeHandle> {
        if name.is_empty() {
            crate::rmw_bail!(RmwError::invalid_argument("node name is empty"));
        }
        if namespace.is_empty() {
            crate::rmw_bail!(RmwError::invalid_argument("node namespace is empty"));
        }
        Ok(NodeHandle {
            implementation_identifier: RMW_DDS_IDENTIFIER,
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            graph: self.graph.clone(),
        })
    }

    /// Wraps a transport participant with this context's configuration.
    pub fn create_participant_info(&self, participant: Arc<dyn DdsParticipant>) -> ParticipantInfo {
        ParticipantInfo::new(participant, &self.config)
    }
}
