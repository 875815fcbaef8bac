//! Message type support: selecting a usable handle and adapting it to the transport.

use std::sync::Arc;

use crate::error::{Result, RmwError};
use crate::transport::TopicDataType;

pub const TYPESUPPORT_C: &str = "rosidl_typesupport_fastrtps_c";
pub const TYPESUPPORT_CPP: &str = "rosidl_typesupport_fastrtps_cpp";

/// Introspection callbacks a generated message package provides.
pub trait MessageTypeSupportCallbacks: Send + Sync {
    /// e.g. `std_msgs::msg`
    fn message_namespace(&self) -> &str;
    /// e.g. `String`
    fn message_name(&self) -> &str;
    fn max_serialized_size(&self) -> usize;
}

/// One type-support candidate, tagged by the convention it follows.
#[derive(Clone)]
pub struct MessageTypeSupportHandle {
    pub typesupport_identifier: &'static str,
    pub data: Arc<dyn MessageTypeSupportCallbacks>,
}

impl std::fmt::Debug for MessageTypeSupportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageTypeSupportHandle")
            .field("typesupport_identifier", &self.typesupport_identifier)
            .field("type", &create_type_name(self.data.as_ref()))
            .finish()
    }
}

/// Returns the first candidate following `identifier`, if any.
pub fn get_message_typesupport_handle<'a>(
    candidates: &'a [MessageTypeSupportHandle],
    identifier: &str,
) -> Option<&'a MessageTypeSupportHandle> {
    candidates
        .iter()
        .find(|h| h.typesupport_identifier == identifier)
}

/// Picks the C convention first, then the C++ one.
pub fn select_type_support(
    candidates: &[MessageTypeSupportHandle],
) -> Result<&MessageTypeSupportHandle> {
    get_message_typesupport_handle(candidates, TYPESUPPORT_C)
        .or_else(|| get_message_typesupport_handle(candidates, TYPESUPPORT_CPP))
        .ok_or_else(|| {
            let offered: Vec<_> = candidates.iter().map(|h| h.typesupport_identifier).collect();
            RmwError::invalid_argument(format!(
                "type support not from this implementation, got {offered:?}"
            ))
        })
}

/// Wire-level type name, `<ns>::dds_::<Name>_`.
pub fn create_type_name(callbacks: &dyn MessageTypeSupportCallbacks) -> String {
    let namespace = callbacks.message_namespace();
    let ns = if namespace.is_empty() {
        String::new()
    } else {
        format!("{namespace}::")
    };
    format!("{ns}dds_::{}_", callbacks.message_name())
}

/// Adapter registered with the transport for one message type.
pub struct TypeSupport {
    type_name: String,
    callbacks: Arc<dyn MessageTypeSupportCallbacks>,
}

impl TypeSupport {
    pub fn new(callbacks: Arc<dyn MessageTypeSupportCallbacks>) -> Self {
        Self {
            type_name: create_type_name(callbacks.as_ref()),
            callbacks,
        }
    }

    pub fn callbacks(&self) -> &Arc<dyn MessageTypeSupportCallbacks> {
        &self.callbacks
    }
}

impl TopicDataType for TypeSupport {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn max_serialized_size(&self) -> usize {
        self.callbacks.max_serialized_size()
    }
}

impl std::fmt::Debug for TypeSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeSupport")
            .field("type_name", &self.type_name)
            .finish()
    }
}
