//! Subscription creation and teardown.
//!
//! Creation acquires, in order: a hold on the registered type, a listener, the
//! transport reader and finally the caller-visible handle. Every acquisition is an
//! owned value, so a failure at any step drops what was acquired so far in reverse
//! order: the reader goes first, then the listener, then the type hold. A type
//! registered by this very call is unregistered again; a registration found in the
//! cache only loses the hold this call took.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, RmwError};
use crate::gid::{Gid, create_rmw_gid};
use crate::listener::SubscriptionListener;
use crate::names::{ROS_TOPIC_PREFIX, create_topic_name};
use crate::participant::ParticipantInfo;
use crate::qos::{QosProfile, get_datareader_qos, is_valid_qos, profile_from_reader_attributes};
use crate::transport::{DataReader, DdsParticipant, ReaderListener, TopicKind};
use crate::type_registry::TypeHold;
use crate::type_support::{MessageTypeSupportHandle, TypeSupport, create_type_name, select_type_support};
use crate::{Builder, RMW_DDS_IDENTIFIER, rmw_bail};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub ignore_local_publications: bool,
}

/// Everything a live subscription owns.
///
/// Field order is drop order: reader, listener, type hold.
pub struct SubscriptionInfo {
    reader: Box<dyn DataReader>,
    listener: Option<Arc<SubscriptionListener>>,
    type_hold: TypeHold,
    typesupport_identifier: &'static str,
    gid: Gid,
    dds_topic_name: String,
    qos: QosProfile,
}

impl SubscriptionInfo {
    pub fn reader(&self) -> &dyn DataReader {
        self.reader.as_ref()
    }

    pub fn listener(&self) -> Option<&Arc<SubscriptionListener>> {
        self.listener.as_ref()
    }

    pub fn type_support(&self) -> &Arc<TypeSupport> {
        self.type_hold.type_support()
    }

    pub fn type_name(&self) -> &str {
        self.type_hold.type_name()
    }

    pub fn typesupport_identifier(&self) -> &'static str {
        self.typesupport_identifier
    }

    pub fn gid(&self) -> &Gid {
        &self.gid
    }

    /// Topic name as seen by the transport, e.g. `rt/chatter`.
    pub fn dds_topic_name(&self) -> &str {
        &self.dds_topic_name
    }

    /// The profile the subscription was requested with.
    pub fn qos(&self) -> &QosProfile {
        &self.qos
    }
}

/// Caller-visible subscription handle.
pub struct Subscription {
    pub implementation_identifier: &'static str,
    pub topic_name: String,
    pub options: SubscriptionOptions,
    data: SubscriptionInfo,
}

impl Subscription {
    pub fn data(&self) -> &SubscriptionInfo {
        &self.data
    }

    pub fn gid(&self) -> &Gid {
        &self.data.gid
    }

    /// The profile the transport reader actually runs with.
    pub fn actual_qos(&self) -> QosProfile {
        profile_from_reader_attributes(
            self.data.reader.attributes(),
            self.data.qos.avoid_ros_namespace_conventions,
        )
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("implementation_identifier", &self.implementation_identifier)
            .field("topic_name", &self.topic_name)
            .field("type_name", &self.data.type_name())
            .field("gid", &self.data.gid)
            .field("listener", &self.data.listener.is_some())
            .finish()
    }
}

pub fn create_subscription(
    participant_info: &ParticipantInfo,
    type_supports: &[MessageTypeSupportHandle],
    topic_name: &str,
    qos: &QosProfile,
    options: &SubscriptionOptions,
    keyed: bool,
    create_listener: bool,
) -> Result<Subscription> {
    if topic_name.is_empty() {
        rmw_bail!(RmwError::invalid_argument("subscription topic is empty"));
    }
    let Some(participant) = participant_info.participant() else {
        rmw_bail!(RmwError::invalid_argument("participant handle is null"));
    };
    let type_support = match select_type_support(type_supports) {
        Ok(ts) => ts,
        Err(e) => rmw_bail!(e),
    };
    if let Err(e) = is_valid_qos(qos) {
        rmw_bail!(e);
    }

    let request = Request {
        participant_info,
        participant: &participant,
        type_support,
        topic_name,
        qos,
        options,
        keyed,
        create_listener,
    };
    request.create().map_err(|e| {
        debug!("[SUB] Creation of '{topic_name}' failed, unwound");
        e.record()
    })
}

/// Inverse of [`create_subscription`].
pub fn destroy_subscription(subscription: Subscription) -> Result<()> {
    if subscription.implementation_identifier != RMW_DDS_IDENTIFIER {
        rmw_bail!(RmwError::invalid_argument(format!(
            "subscription implementation '{}' does not match '{RMW_DDS_IDENTIFIER}'",
            subscription.implementation_identifier
        )));
    }
    let Subscription {
        data, topic_name, ..
    } = subscription;
    let SubscriptionInfo {
        reader,
        listener,
        type_hold,
        ..
    } = data;

    drop(reader);
    drop(listener);
    debug!("[SUB] Destroyed subscription on '{topic_name}'");
    type_hold.release().map_err(RmwError::record)
}

struct Request<'a> {
    participant_info: &'a ParticipantInfo,
    participant: &'a Arc<dyn DdsParticipant>,
    type_support: &'a MessageTypeSupportHandle,
    topic_name: &'a str,
    qos: &'a QosProfile,
    options: &'a SubscriptionOptions,
    keyed: bool,
    create_listener: bool,
}

impl Request<'_> {
    fn create(self) -> Result<Subscription> {
        let mut attributes = self.participant.default_reader_attributes();
        let callbacks = self.type_support.data.clone();
        let type_name = create_type_name(callbacks.as_ref());

        let type_hold = self
            .participant_info
            .registry()
            .acquire(self.participant, &type_name, || Ok(TypeSupport::new(callbacks)))?;
        debug!(
            "[SUB] Type '{type_name}' {}",
            if type_hold.is_fresh() { "registered" } else { "found in registry" }
        );

        if !self.participant_info.leave_middleware_default_qos {
            attributes.history_memory_policy = self.participant_info.history_memory_policy;
        }
        attributes.topic.topic_kind = if self.keyed {
            TopicKind::WithKey
        } else {
            TopicKind::NoKey
        };
        attributes.topic.topic_data_type = type_name;
        attributes.topic.topic_name =
            create_topic_name(self.qos, ROS_TOPIC_PREFIX, self.topic_name, "");

        get_datareader_qos(self.qos, &mut attributes)
            .map_err(|e| RmwError::upstream(format!("failed to get datareader qos: {}", e.message())))?;

        let listener = self
            .create_listener
            .then(|| Arc::new(SubscriptionListener::new()));

        let reader = self
            .participant
            .create_reader(
                &attributes,
                listener.clone().map(|l| l as Arc<dyn ReaderListener>),
            )
            .map_err(|e| RmwError::upstream(format!("could not create subscriber: {e}")))?;

        let gid = create_rmw_gid(RMW_DDS_IDENTIFIER, reader.guid())?;
        let topic_name = copy_topic_name(self.topic_name)?;

        debug!(
            "[SUB] Created subscription on '{}' (gid {gid}, listener: {})",
            attributes.topic.topic_name,
            listener.is_some()
        );
        Ok(Subscription {
            implementation_identifier: RMW_DDS_IDENTIFIER,
            topic_name,
            options: self.options.clone(),
            data: SubscriptionInfo {
                reader,
                listener,
                type_hold,
                typesupport_identifier: self.type_support.typesupport_identifier,
                gid,
                dds_topic_name: attributes.topic.topic_name,
                qos: *self.qos,
            },
        })
    }
}

fn copy_topic_name(topic_name: &str) -> Result<String> {
    let mut copy = String::new();
    copy.try_reserve_exact(topic_name.len()).map_err(|_| {
        RmwError::resource_exhausted("failed to allocate memory for subscription topic name")
    })?;
    copy.push_str(topic_name);
    Ok(copy)
}

/// Builder over [`create_subscription`], obtained from
/// [`ParticipantInfo::create_subscription`].
pub struct SubscriptionBuilder<'a> {
    participant_info: &'a ParticipantInfo,
    type_supports: &'a [MessageTypeSupportHandle],
    topic: String,
    qos: QosProfile,
    options: SubscriptionOptions,
    keyed: bool,
    create_listener: bool,
}

impl<'a> SubscriptionBuilder<'a> {
    pub(crate) fn new(
        participant_info: &'a ParticipantInfo,
        type_supports: &'a [MessageTypeSupportHandle],
        topic: &str,
    ) -> Self {
        Self {
            participant_info,
            type_supports,
            topic: topic.to_owned(),
            qos: QosProfile::default(),
            options: SubscriptionOptions::default(),
            keyed: false,
            create_listener: participant_info.create_listeners,
        }
    }

    pub fn with_qos(mut self, qos: QosProfile) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_options(mut self, options: SubscriptionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn keyed(mut self, keyed: bool) -> Self {
        self.keyed = keyed;
        self
    }

    pub fn with_listener(mut self, create_listener: bool) -> Self {
        self.create_listener = create_listener;
        self
    }
}

impl Builder for SubscriptionBuilder<'_> {
    type Output = Subscription;

    #[tracing::instrument(name = "sub_build", skip(self), fields(topic = %self.topic))]
    fn build(self) -> Result<Subscription> {
        create_subscription(
            self.participant_info,
            self.type_supports,
            &self.topic,
            &self.qos,
            &self.options,
            self.keyed,
            self.create_listener,
        )
    }
}
