//! In-memory transport used to exercise entity creation without a DDS stack.
//!
//! [`MemParticipant`] keeps live counts of registered types, readers and attached
//! listeners, and every transport call can be made to fail through [`Faults`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::transport::{
    DataReader, DdsParticipant, Guid, ReaderAttributes, ReaderListener, TopicDataType,
    TransportError,
};
use crate::type_support::MessageTypeSupportCallbacks;

static NEXT_PARTICIPANT: AtomicU32 = AtomicU32::new(1);

/// Type support with a fixed namespace and name.
#[derive(Debug, Clone)]
pub struct StaticTypeSupport {
    namespace: String,
    name: String,
    max_serialized_size: usize,
}

impl StaticTypeSupport {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            max_serialized_size: 256,
        }
    }
}

impl MessageTypeSupportCallbacks for StaticTypeSupport {
    fn message_namespace(&self) -> &str {
        &self.namespace
    }

    fn message_name(&self) -> &str {
        &self.name
    }

    fn max_serialized_size(&self) -> usize {
        self.max_serialized_size
    }
}

/// Switches that make the next transport calls fail.
#[derive(Debug, Default)]
pub struct Faults {
    register_type: AtomicBool,
    unregister_type: AtomicBool,
    create_reader: AtomicBool,
    unknown_reader_guid: AtomicBool,
}

impl Faults {
    pub fn fail_register_type(&self, on: bool) {
        self.register_type.store(on, Ordering::SeqCst);
    }

    pub fn fail_unregister_type(&self, on: bool) {
        self.unregister_type.store(on, Ordering::SeqCst);
    }

    pub fn fail_create_reader(&self, on: bool) {
        self.create_reader.store(on, Ordering::SeqCst);
    }

    /// Readers get created with [`Guid::UNKNOWN`], which cannot be turned into a GID.
    pub fn unknown_reader_guid(&self, on: bool) {
        self.unknown_reader_guid.store(on, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Shared {
    types: Mutex<HashMap<String, Arc<dyn TopicDataType>>>,
    listeners: Mutex<Vec<(Guid, String, Arc<dyn ReaderListener>)>>,
    live_readers: AtomicUsize,
    created_readers: AtomicUsize,
}

pub struct MemParticipant {
    prefix: [u8; 12],
    next_entity: AtomicU32,
    default_attributes: Mutex<ReaderAttributes>,
    faults: Faults,
    shared: Arc<Shared>,
}

impl Default for MemParticipant {
    fn default() -> Self {
        Self::new()
    }
}

impl MemParticipant {
    pub fn new() -> Self {
        let id = NEXT_PARTICIPANT.fetch_add(1, Ordering::Relaxed);
        let mut prefix = [0u8; 12];
        prefix[0] = 0x01;
        prefix[1] = 0x0f;
        prefix[8..].copy_from_slice(&id.to_be_bytes());
        Self {
            prefix,
            next_entity: AtomicU32::new(1),
            default_attributes: Mutex::new(ReaderAttributes::default()),
            faults: Faults::default(),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub fn set_default_reader_attributes(&self, attributes: ReaderAttributes) {
        *self.default_attributes.lock() = attributes;
    }

    pub fn registered_type_count(&self) -> usize {
        self.shared.types.lock().len()
    }

    pub fn is_type_registered(&self, type_name: &str) -> bool {
        self.shared.types.lock().contains_key(type_name)
    }

    pub fn live_reader_count(&self) -> usize {
        self.shared.live_readers.load(Ordering::SeqCst)
    }

    /// Readers ever created, including deleted ones.
    pub fn created_reader_count(&self) -> usize {
        self.shared.created_readers.load(Ordering::SeqCst)
    }

    pub fn attached_listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    /// Signals one new sample to every listening reader on `topic_name`.
    pub fn deliver(&self, topic_name: &str) -> usize {
        let targets = self.listeners_on(topic_name);
        for listener in &targets {
            listener.on_data_available();
        }
        targets.len()
    }

    /// Signals a change in matched publishers to every listening reader on `topic_name`.
    pub fn match_publishers(&self, topic_name: &str, change: i32) {
        for listener in self.listeners_on(topic_name) {
            listener.on_subscription_matched(change);
        }
    }

    fn listeners_on(&self, topic_name: &str) -> Vec<Arc<dyn ReaderListener>> {
        // Collect first: callbacks must run without the lock held.
        self.shared
            .listeners
            .lock()
            .iter()
            .filter(|(_, topic, _)| topic == topic_name)
            .map(|(_, _, l)| l.clone())
            .collect()
    }
}

impl DdsParticipant for MemParticipant {
    fn default_reader_attributes(&self) -> ReaderAttributes {
        self.default_attributes.lock().clone()
    }

    fn register_type(&self, data_type: Arc<dyn TopicDataType>) -> Result<(), TransportError> {
        if self.faults.register_type.load(Ordering::SeqCst) {
            return Err(TransportError::new("type registration rejected"));
        }
        let name = data_type.type_name().to_owned();
        let mut types = self.shared.types.lock();
        if types.contains_key(&name) {
            return Err(TransportError::new(format!("type '{name}' registered twice")));
        }
        types.insert(name, data_type);
        Ok(())
    }

    fn unregister_type(&self, type_name: &str) -> Result<(), TransportError> {
        if self.faults.unregister_type.load(Ordering::SeqCst) {
            return Err(TransportError::new("type unregistration rejected"));
        }
        self.shared
            .types
            .lock()
            .remove(type_name)
            .map(|_| ())
            .ok_or_else(|| TransportError::new(format!("type '{type_name}' is not registered")))
    }

    fn create_reader(
        &self,
        attributes: &ReaderAttributes,
        listener: Option<Arc<dyn ReaderListener>>,
    ) -> Result<Box<dyn DataReader>, TransportError> {
        if self.faults.create_reader.load(Ordering::SeqCst) {
            return Err(TransportError::new("reader creation rejected"));
        }
        let type_name = &attributes.topic.topic_data_type;
        if !self.shared.types.lock().contains_key(type_name) {
            return Err(TransportError::new(format!("type '{type_name}' is not registered")));
        }

        let guid = if self.faults.unknown_reader_guid.load(Ordering::SeqCst) {
            Guid::UNKNOWN
        } else {
            let n = self.next_entity.fetch_add(1, Ordering::Relaxed);
            let [_, b1, b2, b3] = n.to_be_bytes();
            // user-defined reader, no key
            Guid::new(self.prefix, [b1, b2, b3, 0x04])
        };

        if let Some(listener) = listener {
            self.shared
                .listeners
                .lock()
                .push((guid, attributes.topic.topic_name.clone(), listener));
        }
        self.shared.live_readers.fetch_add(1, Ordering::SeqCst);
        self.shared.created_readers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemReader {
            guid,
            attributes: attributes.clone(),
            shared: self.shared.clone(),
        }))
    }
}

struct MemReader {
    guid: Guid,
    attributes: ReaderAttributes,
    shared: Arc<Shared>,
}

impl DataReader for MemReader {
    fn guid(&self) -> Guid {
        self.guid
    }

    fn attributes(&self) -> &ReaderAttributes {
        &self.attributes
    }
}

impl Drop for MemReader {
    fn drop(&mut self) {
        let mut listeners = self.shared.listeners.lock();
        if let Some(pos) = listeners.iter().position(|(guid, _, _)| *guid == self.guid) {
            listeners.remove(pos);
        }
        self.shared.live_readers.fetch_sub(1, Ordering::SeqCst);
    }
}
