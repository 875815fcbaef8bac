//! DDS -> ROS name and type demangling.
//!
//! Every demangler maps a raw DDS topic or type name to its ROS counterpart,
//! answering `None` when the name does not belong to the demangler's category
//! (a request topic handed to the topic demangler, a message type handed to the
//! service type demangler, ...). Graph queries use `None` to filter entries out.

use crate::names::{
    ROS_SERVICE_REQUESTER_PREFIX, ROS_SERVICE_RESPONSE_PREFIX, ROS_TOPIC_PREFIX,
    SERVICE_REPLY_SUFFIX, SERVICE_REQUEST_SUFFIX, resolve_prefix, strip_ros_prefix_if_exists,
};

/// Stateless demangler: raw name in, ROS name out, `None` when not applicable.
pub type DemangleFunction = fn(&str) -> Option<String>;

const DDS_NAMESPACE_MARKER: &str = "dds_::";
const SERVICE_TYPE_SUFFIXES: [&str; 2] = ["_Response_", "_Request_"];
pub const ACTION_FEEDBACK_TOPIC_SUFFIX: &str = "/_action/feedback";
pub const ACTION_FEEDBACK_TYPE_SUFFIX: &str = "_FeedbackMessage";

/// Returns the name unchanged. Always applicable.
pub fn identity_demangle(name: &str) -> Option<String> {
    Some(name.to_owned())
}

/// `rt/<topic>` -> `<topic>`; anything else is not a ROS topic.
pub fn demangle_ros_topic_from_topic(topic_name: &str) -> Option<String> {
    resolve_prefix(topic_name, ROS_TOPIC_PREFIX).map(str::to_owned)
}

/// Strips a ROS prefix if there is one, otherwise passes the name through.
pub fn demangle_if_ros_topic(topic_name: &str) -> Option<String> {
    Some(strip_ros_prefix_if_exists(topic_name).to_owned())
}

/// `[ns::]dds_::<Name>_` -> `[ns/]<Name>`.
///
/// ```
/// use rmw_dds::demangle::demangle_if_ros_type;
///
/// assert_eq!(
///     demangle_if_ros_type("std_msgs::msg::dds_::String_").as_deref(),
///     Some("std_msgs/msg/String")
/// );
/// assert_eq!(demangle_if_ros_type("MyPlainDdsType"), None);
/// ```
pub fn demangle_if_ros_type(dds_type_name: &str) -> Option<String> {
    let without_trailer = dds_type_name.strip_suffix('_')?;
    let (type_namespace, type_name) = split_dds_type(without_trailer)?;
    if type_name.is_empty() {
        return None;
    }
    Some(format!("{type_namespace}{type_name}"))
}

/// `rq/<service>Request` -> `<service>`.
pub fn demangle_service_request_from_topic(topic_name: &str) -> Option<String> {
    demangle_service_from_prefixed_topic(ROS_SERVICE_REQUESTER_PREFIX, topic_name, SERVICE_REQUEST_SUFFIX)
}

/// `rr/<service>Reply` -> `<service>`.
pub fn demangle_service_reply_from_topic(topic_name: &str) -> Option<String> {
    demangle_service_from_prefixed_topic(ROS_SERVICE_RESPONSE_PREFIX, topic_name, SERVICE_REPLY_SUFFIX)
}

/// Either direction of a service topic, reply checked first.
pub fn demangle_service_from_topic(topic_name: &str) -> Option<String> {
    demangle_service_reply_from_topic(topic_name)
        .or_else(|| demangle_service_request_from_topic(topic_name))
}

/// `[ns::]dds_::<Srv>_Request_` or `..._Response_` -> `[ns/]<Srv>`.
///
/// Message types (no request/response suffix) are not applicable.
pub fn demangle_service_type_only(dds_type_name: &str) -> Option<String> {
    if !dds_type_name.contains(DDS_NAMESPACE_MARKER) {
        return None;
    }
    let stem = SERVICE_TYPE_SUFFIXES.iter().find_map(|suffix| {
        let stem = dds_type_name.strip_suffix(*suffix);
        if stem.is_none() && dds_type_name.contains(*suffix) {
            tracing::warn!(
                "service type contains '{DDS_NAMESPACE_MARKER}' and a suffix, but not at the end: '{dds_type_name}'"
            );
        }
        stem
    });
    let Some(stem) = stem else {
        tracing::debug!("type contains '{DDS_NAMESPACE_MARKER}' but has no service suffix: '{dds_type_name}'");
        return None;
    };
    let (type_namespace, type_name) = split_dds_type(stem)?;
    if type_name.is_empty() {
        return None;
    }
    Some(format!("{type_namespace}{type_name}"))
}

/// `rt/<action>/_action/feedback` -> `<action>`.
pub fn demangle_action_from_feedback_topic(topic_name: &str) -> Option<String> {
    let topic = resolve_prefix(topic_name, ROS_TOPIC_PREFIX)?;
    let action = topic.strip_suffix(ACTION_FEEDBACK_TOPIC_SUFFIX)?;
    (!action.is_empty()).then(|| action.to_owned())
}

/// `[ns::]dds_::<Action>_FeedbackMessage_` -> `[ns/]<Action>`.
pub fn demangle_action_type(dds_type_name: &str) -> Option<String> {
    let ros_type = demangle_if_ros_type(dds_type_name)?;
    let action = ros_type.strip_suffix(ACTION_FEEDBACK_TYPE_SUFFIX)?;
    (!action.is_empty()).then(|| action.to_owned())
}

// `[a::b::]dds_::Name` -> ("a/b/", "Name")
fn split_dds_type(dds_type_name: &str) -> Option<(String, &str)> {
    let position = dds_type_name.find(DDS_NAMESPACE_MARKER)?;
    let type_namespace = dds_type_name[..position].replace("::", "/");
    let type_name = &dds_type_name[position + DDS_NAMESPACE_MARKER.len()..];
    Some((type_namespace, type_name))
}

fn demangle_service_from_prefixed_topic(prefix: &str, topic_name: &str, suffix: &str) -> Option<String> {
    let service_name = resolve_prefix(topic_name, prefix)?;
    let Some(stem) = service_name.strip_suffix(suffix) else {
        if service_name.contains(suffix) {
            tracing::warn!(
                "service topic has service prefix and a suffix, but not at the end: '{topic_name}'"
            );
        } else {
            tracing::warn!("service topic has prefix but no suffix: '{topic_name}'");
        }
        return None;
    };
    // `rq/add_two_ints_Request` and `rq/add_two_intsRequest` name the same service
    let stem = stem.strip_suffix('_').unwrap_or(stem);
    (!stem.is_empty()).then(|| stem.to_owned())
}
