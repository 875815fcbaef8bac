//! The seam between this crate and the DDS transport.
//!
//! A transport plugs in by implementing [`DdsParticipant`]; readers it creates are
//! handed back as boxed [`DataReader`]s and deleted when dropped.

use std::fmt;
use std::sync::Arc;

/// Transport-level failure, surfaced as [`RmwError::UpstreamFailure`](crate::error::RmwError).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<TransportError> for crate::error::RmwError {
    fn from(err: TransportError) -> Self {
        crate::error::RmwError::UpstreamFailure(err.0)
    }
}

/// RTPS entity identity: 12 byte participant prefix plus 4 byte entity id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid {
    pub prefix: [u8; 12],
    pub entity_id: [u8; 4],
}

impl Guid {
    pub const UNKNOWN: Guid = Guid {
        prefix: [0; 12],
        entity_id: [0; 4],
    };

    pub fn new(prefix: [u8; 12], entity_id: [u8; 4]) -> Self {
        Self { prefix, entity_id }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..12].copy_from_slice(&self.prefix);
        bytes[12..].copy_from_slice(&self.entity_id);
        bytes
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.prefix {
            write!(f, "{b:02x}")?;
        }
        write!(f, "|")?;
        for b in &self.entity_id {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TopicKind {
    #[default]
    NoKey,
    WithKey,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ReliabilityKind {
    #[default]
    BestEffort,
    Reliable,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum DurabilityKind {
    #[default]
    Volatile,
    TransientLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryKind {
    KeepLast(u32),
    KeepAll,
}

impl Default for HistoryKind {
    fn default() -> Self {
        Self::KeepLast(1)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum LivelinessKind {
    #[default]
    Automatic,
    ManualByParticipant,
    ManualByTopic,
}

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum MemoryPolicy {
    #[default]
    Preallocated,
    PreallocatedWithRealloc,
    Dynamic,
}

/// Transport-side durations; `None` means infinite.
pub type TransportDuration = Option<std::time::Duration>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TopicAttributes {
    pub topic_kind: TopicKind,
    pub topic_name: String,
    pub topic_data_type: String,
}

/// Everything the transport needs to create a reader.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReaderAttributes {
    pub topic: TopicAttributes,
    pub reliability: ReliabilityKind,
    pub durability: DurabilityKind,
    pub history: HistoryKind,
    pub deadline: TransportDuration,
    pub lifespan: TransportDuration,
    pub liveliness: LivelinessKind,
    pub liveliness_lease_duration: TransportDuration,
    pub history_memory_policy: MemoryPolicy,
}

/// Type description handed to the transport at registration time.
pub trait TopicDataType: Send + Sync {
    fn type_name(&self) -> &str;
    fn max_serialized_size(&self) -> usize;
}

/// Notifications a transport delivers to a reader's listener.
pub trait ReaderListener: Send + Sync {
    fn on_data_available(&self);
    fn on_subscription_matched(&self, current_count_change: i32);
}

/// A transport reader. Dropping it deletes the reader from its participant.
pub trait DataReader: Send + Sync {
    fn guid(&self) -> Guid;
    fn attributes(&self) -> &ReaderAttributes;
}

/// The transport participant, as seen by this crate.
pub trait DdsParticipant: Send + Sync {
    fn default_reader_attributes(&self) -> ReaderAttributes;

    fn register_type(&self, data_type: Arc<dyn TopicDataType>) -> Result<(), TransportError>;

    fn unregister_type(&self, type_name: &str) -> Result<(), TransportError>;

    fn create_reader(
        &self,
        attributes: &ReaderAttributes,
        listener: Option<Arc<dyn ReaderListener>>,
    ) -> Result<Box<dyn DataReader>, TransportError>;
}
