//! Participant-scoped cache of registered message types.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::transport::{DdsParticipant, TopicDataType};
use crate::type_support::TypeSupport;

struct Entry {
    type_support: Arc<TypeSupport>,
    holders: usize,
}

/// Outcome of [`TypeRegistry::get_or_register`].
#[derive(Debug, Clone)]
pub struct TypeRegistration {
    pub type_support: Arc<TypeSupport>,
    /// `true` when this call performed the transport registration.
    pub fresh: bool,
}

/// Registers each message type with the transport at most once.
///
/// Every successful [`get_or_register`](Self::get_or_register) takes one hold on the
/// entry; [`release`](Self::release) drops it and unregisters the type once nobody
/// holds it anymore. The lock covers lookup, factory and transport registration so
/// concurrent callers for an unseen type cannot both register it.
#[derive(Default)]
pub struct TypeRegistry {
    types: Mutex<HashMap<String, Entry>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_register<F>(
        &self,
        participant: &dyn DdsParticipant,
        type_name: &str,
        factory: F,
    ) -> Result<TypeRegistration>
    where
        F: FnOnce() -> Result<TypeSupport>,
    {
        let mut types = self.types.lock();
        if let Some(entry) = types.get_mut(type_name) {
            entry.holders += 1;
            tracing::debug!("type '{type_name}' already registered ({} holders)", entry.holders);
            return Ok(TypeRegistration {
                type_support: entry.type_support.clone(),
                fresh: false,
            });
        }

        let type_support = Arc::new(factory()?);
        participant.register_type(type_support.clone() as Arc<dyn TopicDataType>)?;
        tracing::debug!("registered type '{type_name}'");
        types.insert(
            type_name.to_owned(),
            Entry {
                type_support: type_support.clone(),
                holders: 1,
            },
        );
        Ok(TypeRegistration {
            type_support,
            fresh: true,
        })
    }

    pub fn lookup(&self, type_name: &str) -> Option<Arc<TypeSupport>> {
        self.types
            .lock()
            .get(type_name)
            .map(|e| e.type_support.clone())
    }

    /// Drops one hold on `type_name`, unregistering it from the transport on the last one.
    pub fn release(&self, participant: &dyn DdsParticipant, type_name: &str) -> Result<()> {
        let mut types = self.types.lock();
        let Some(entry) = types.get_mut(type_name) else {
            tracing::debug!("release of type '{type_name}' after it was unregistered");
            return Ok(());
        };
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders > 0 {
            return Ok(());
        }
        tracing::debug!("unregistering type '{type_name}'");
        // an entry the transport refused to drop stays cached with no holders
        participant.unregister_type(type_name)?;
        types.remove(type_name);
        Ok(())
    }

    pub fn holders(&self, type_name: &str) -> usize {
        self.types.lock().get(type_name).map_or(0, |e| e.holders)
    }

    pub fn len(&self) -> usize {
        self.types.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.lock().is_empty()
    }

    /// Unregisters every cached type from the transport, holders or not.
    ///
    /// Entries the transport refuses to drop stay cached; the first failure is returned
    /// after every entry has been tried.
    pub fn unregister_all(&self, participant: &dyn DdsParticipant) -> Result<()> {
        let mut types = self.types.lock();
        let mut first_err = None;
        types.retain(|type_name, entry| {
            match participant.unregister_type(type_name) {
                Ok(()) => {
                    tracing::debug!(
                        "unregistered type '{type_name}' ({} holders left)",
                        entry.holders
                    );
                    false
                }
                Err(e) => {
                    tracing::error!("failed to unregister type '{type_name}': {e}");
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                    true
                }
            }
        });
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Like [`get_or_register`](Self::get_or_register), but the hold is handed back
    /// as a [`TypeHold`] that releases it when dropped.
    pub fn acquire<F>(
        self: &Arc<Self>,
        participant: &Arc<dyn DdsParticipant>,
        type_name: &str,
        factory: F,
    ) -> Result<TypeHold>
    where
        F: FnOnce() -> Result<TypeSupport>,
    {
        let registration = self.get_or_register(participant.as_ref(), type_name, factory)?;
        Ok(TypeHold {
            registry: self.clone(),
            participant: participant.clone(),
            type_name: type_name.to_owned(),
            registration,
            released: false,
        })
    }
}

/// One hold on a registered type, released on drop.
pub struct TypeHold {
    registry: Arc<TypeRegistry>,
    participant: Arc<dyn DdsParticipant>,
    type_name: String,
    registration: TypeRegistration,
    released: bool,
}

impl TypeHold {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_support(&self) -> &Arc<TypeSupport> {
        &self.registration.type_support
    }

    pub fn is_fresh(&self) -> bool {
        self.registration.fresh
    }

    /// Releases the hold now, reporting a transport failure instead of logging it.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.registry
            .release(self.participant.as_ref(), &self.type_name)
    }
}

impl Drop for TypeHold {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self
            .registry
            .release(self.participant.as_ref(), &self.type_name)
        {
            tracing::error!("failed to release type '{}': {e}", self.type_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::RmwError;
    use crate::testing::{MemParticipant, StaticTypeSupport};

    fn string_type() -> TypeSupport {
        TypeSupport::new(Arc::new(StaticTypeSupport::new("std_msgs::msg", "String")))
    }

    #[test]
    fn test_factory_called_once() {
        let participant = MemParticipant::new();
        let registry = TypeRegistry::new();
        let calls = AtomicUsize::new(0);
        let factory = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(string_type())
        };

        let first = registry
            .get_or_register(&participant, "std_msgs::msg::dds_::String_", factory)
            .unwrap();
        let second = registry
            .get_or_register(&participant, "std_msgs::msg::dds_::String_", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(string_type())
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(first.fresh);
        assert!(!second.fresh);
        assert!(Arc::ptr_eq(&first.type_support, &second.type_support));
        assert_eq!(participant.registered_type_count(), 1);
        assert_eq!(registry.holders("std_msgs::msg::dds_::String_"), 2);
    }

    #[test]
    fn test_factory_failure_leaves_registry_unchanged() {
        let participant = MemParticipant::new();
        let registry = TypeRegistry::new();
        let res = registry.get_or_register(&participant, "pkg::msg::dds_::T_", || {
            Err(RmwError::resource_exhausted("failed to allocate type support"))
        });
        assert!(matches!(res, Err(RmwError::ResourceExhausted(_))));
        assert!(registry.is_empty());
        assert_eq!(participant.registered_type_count(), 0);
    }

    #[test]
    fn test_transport_rejection_leaves_registry_unchanged() {
        let participant = MemParticipant::new();
        participant.faults().fail_register_type(true);
        let registry = TypeRegistry::new();
        let res = registry.get_or_register(&participant, "std_msgs::msg::dds_::String_", || {
            Ok(string_type())
        });
        assert!(matches!(res, Err(RmwError::UpstreamFailure(_))));
        assert!(registry.lookup("std_msgs::msg::dds_::String_").is_none());
    }

    #[test]
    fn test_release_unregisters_on_last_hold() {
        let participant = MemParticipant::new();
        let registry = TypeRegistry::new();
        let name = "std_msgs::msg::dds_::String_";
        registry.get_or_register(&participant, name, || Ok(string_type())).unwrap();
        registry.get_or_register(&participant, name, || Ok(string_type())).unwrap();

        registry.release(&participant, name).unwrap();
        assert_eq!(participant.registered_type_count(), 1);
        assert!(registry.lookup(name).is_some());

        registry.release(&participant, name).unwrap();
        assert_eq!(participant.registered_type_count(), 0);
        assert!(registry.is_empty());

        // unknown names are ignored
        registry.release(&participant, name).unwrap();
    }

    #[test]
    fn test_hold_released_on_drop() {
        let participant: Arc<dyn DdsParticipant> = Arc::new(MemParticipant::new());
        let registry = Arc::new(TypeRegistry::new());
        let name = "std_msgs::msg::dds_::String_";

        let first = registry.acquire(&participant, name, || Ok(string_type())).unwrap();
        let second = registry.acquire(&participant, name, || Ok(string_type())).unwrap();
        assert!(first.is_fresh());
        assert!(!second.is_fresh());
        assert!(Arc::ptr_eq(first.type_support(), second.type_support()));

        drop(second);
        assert_eq!(registry.holders(name), 1);
        first.release().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rejected_unregister_keeps_entry() {
        let participant = MemParticipant::new();
        let registry = TypeRegistry::new();
        let name = "std_msgs::msg::dds_::String_";
        registry.get_or_register(&participant, name, || Ok(string_type())).unwrap();

        participant.faults().fail_unregister_type(true);
        assert!(matches!(
            registry.release(&participant, name),
            Err(RmwError::UpstreamFailure(_))
        ));
        assert!(registry.lookup(name).is_some());
        assert_eq!(registry.holders(name), 0);
        assert!(participant.is_type_registered(name));

        // the cached entry is picked up again instead of registering twice
        participant.faults().fail_unregister_type(false);
        let again = registry
            .get_or_register(&participant, name, || Ok(string_type()))
            .unwrap();
        assert!(!again.fresh);
        registry.release(&participant, name).unwrap();
        assert!(registry.is_empty());
        assert_eq!(participant.registered_type_count(), 0);
    }

    #[test]
    fn test_unregister_all() {
        let participant = MemParticipant::new();
        let registry = TypeRegistry::new();
        registry
            .get_or_register(&participant, "std_msgs::msg::dds_::String_", || Ok(string_type()))
            .unwrap();
        registry
            .get_or_register(&participant, "pkg::msg::dds_::T_", || {
                Ok(TypeSupport::new(Arc::new(StaticTypeSupport::new("pkg::msg", "T"))))
            })
            .unwrap();

        participant.faults().fail_unregister_type(true);
        assert!(registry.unregister_all(&participant).is_err());
        assert_eq!(registry.len(), 2);

        participant.faults().fail_unregister_type(false);
        registry.unregister_all(&participant).unwrap();
        assert!(registry.is_empty());
        assert_eq!(participant.registered_type_count(), 0);
    }
}
