//! DDS topic name prefixes and ROS -> DDS topic name construction.

use crate::qos::QosProfile;

/// Prefix of DDS topics carrying ROS messages.
pub const ROS_TOPIC_PREFIX: &str = "rt";
/// Prefix of DDS topics carrying service requests.
pub const ROS_SERVICE_REQUESTER_PREFIX: &str = "rq";
/// Prefix of DDS topics carrying service replies.
pub const ROS_SERVICE_RESPONSE_PREFIX: &str = "rr";

pub const ROS_PREFIXES: [&str; 3] = [
    ROS_TOPIC_PREFIX,
    ROS_SERVICE_REQUESTER_PREFIX,
    ROS_SERVICE_RESPONSE_PREFIX,
];

/// Suffix of the DDS topic carrying service requests.
pub const SERVICE_REQUEST_SUFFIX: &str = "Request";
/// Suffix of the DDS topic carrying service replies.
pub const SERVICE_REPLY_SUFFIX: &str = "Reply";

/// Builds the DDS topic name for a ROS topic.
///
/// `<prefix>/<topic><suffix>`, where a leading `/` of `topic` is folded into the
/// separator. When the profile asks to avoid ROS namespace conventions the topic
/// is used verbatim (suffix still applied).
///
/// ```
/// use rmw_dds::{names::create_topic_name, qos::QosProfile};
///
/// let qos = QosProfile::default();
/// assert_eq!(create_topic_name(&qos, "rt", "/chatter", ""), "rt/chatter");
/// assert_eq!(create_topic_name(&qos, "rt", "chatter", ""), "rt/chatter");
/// ```
pub fn create_topic_name(qos: &QosProfile, prefix: &str, topic: &str, suffix: &str) -> String {
    if qos.avoid_ros_namespace_conventions {
        return format!("{topic}{suffix}");
    }
    let topic = topic.strip_prefix('/').unwrap_or(topic);
    format!("{prefix}/{topic}{suffix}")
}

/// Returns what follows `<prefix>/` in `name`, or `None` when the prefix is absent.
pub fn resolve_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?.strip_prefix('/')
}

/// Removes whichever ROS prefix `name` carries, if any.
pub fn strip_ros_prefix_if_exists(name: &str) -> &str {
    ROS_PREFIXES
        .iter()
        .find_map(|prefix| resolve_prefix(name, prefix))
        .unwrap_or(name)
}
