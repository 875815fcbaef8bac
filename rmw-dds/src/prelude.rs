//! Convenience re-exports for common rmw-dds types.
//!
//! Import everything with `use rmw_dds::prelude::*;`.

/// The builder trait, required to call `.build()` on any builder type.
pub use crate::Builder;

pub use crate::context::{Context, ContextBuilder};
pub use crate::error::{Result, RmwError, RmwRet};

/// QoS configuration types.
pub use crate::qos::{
    Duration as QosDuration, QosDurability, QosHistory, QosLiveliness, QosProfile, QosReliability,
};

pub use crate::participant::ParticipantInfo;
pub use crate::subscription::{
    Subscription, SubscriptionOptions, create_subscription, destroy_subscription,
};
pub use crate::type_support::{
    MessageTypeSupportCallbacks, MessageTypeSupportHandle, TYPESUPPORT_C, TYPESUPPORT_CPP,
};

/// Graph introspection.
pub use crate::graph::{NodeHandle, QueryCategory, query_names_and_types_by_node};
pub use crate::graph_cache::GraphCache;
pub use crate::names_and_types::NamesAndTypes;
