use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::RmwConfig;
use crate::error::{Result, RmwError};
use crate::subscription::SubscriptionBuilder;
use crate::transport::{DdsParticipant, MemoryPolicy};
use crate::type_registry::TypeRegistry;
use crate::type_support::MessageTypeSupportHandle;

/// State owned by one transport participant.
///
/// The type registry lives and dies with the participant: [`shutdown`](Self::shutdown)
/// unregisters every type and drops the transport handle.
pub struct ParticipantInfo {
    participant: RwLock<Option<Arc<dyn DdsParticipant>>>,
    registry: Arc<TypeRegistry>,
    pub leave_middleware_default_qos: bool,
    pub history_memory_policy: MemoryPolicy,
    pub create_listeners: bool,
}

impl ParticipantInfo {
    pub fn new(participant: Arc<dyn DdsParticipant>, config: &RmwConfig) -> Self {
        Self {
            participant: RwLock::new(Some(participant)),
            registry: Arc::new(TypeRegistry::new()),
            leave_middleware_default_qos: config.leave_middleware_default_qos,
            history_memory_policy: config.history_memory_policy,
            create_listeners: config.create_listeners,
        }
    }

    /// The transport participant, or `None` after shutdown.
    pub fn participant(&self) -> Option<Arc<dyn DdsParticipant>> {
        self.participant.read().clone()
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn is_shutdown(&self) -> bool {
        self.participant.read().is_none()
    }

    /// Drops the transport handle after unregistering every cached type.
    ///
    /// Subscriptions still alive afterwards tear down without touching the transport
    /// registrations again.
    pub fn shutdown(&self) -> Result<()> {
        let Some(participant) = self.participant.write().take() else {
            return Ok(());
        };
        debug!("[PRT] Shutting down, unregistering {} types", self.registry.len());
        self.registry
            .unregister_all(participant.as_ref())
            .map_err(RmwError::record)
    }

    /// Starts building a subscription on `topic`.
    pub fn create_subscription<'a>(
        &'a self,
        type_supports: &'a [MessageTypeSupportHandle],
        topic: &str,
    ) -> SubscriptionBuilder<'a> {
        SubscriptionBuilder::new(self, type_supports, topic)
    }
}

impl std::fmt::Debug for ParticipantInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantInfo")
            .field("shutdown", &self.is_shutdown())
            .field("registered_types", &self.registry.len())
            .field("leave_middleware_default_qos", &self.leave_middleware_default_qos)
            .finish()
    }
}
