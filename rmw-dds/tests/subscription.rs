use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rmw_dds::error::{get_error_string, is_error_set, reset_error};
use rmw_dds::prelude::*;
use rmw_dds::qos::Duration as QosDuration;
use rmw_dds::testing::{MemParticipant, StaticTypeSupport};

const STRING_TYPE: &str = "std_msgs::msg::dds_::String_";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn string_type_supports() -> Vec<MessageTypeSupportHandle> {
    vec![MessageTypeSupportHandle {
        typesupport_identifier: TYPESUPPORT_C,
        data: Arc::new(StaticTypeSupport::new("std_msgs::msg", "String")),
    }]
}

fn setup() -> (Arc<MemParticipant>, ParticipantInfo) {
    init_tracing();
    let ctx = ContextBuilder::default().build().unwrap();
    let mem = Arc::new(MemParticipant::new());
    let info = ctx.create_participant_info(mem.clone());
    (mem, info)
}

/// Everything the transport and registry hold, for before/after comparisons.
fn footprint(mem: &MemParticipant, info: &ParticipantInfo) -> (usize, usize, usize, usize) {
    (
        mem.live_reader_count(),
        mem.registered_type_count(),
        mem.attached_listener_count(),
        info.registry().len(),
    )
}

#[test]
fn test_chatter_subscription_with_listener() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();

    let sub = create_subscription(
        &info,
        &ts,
        "chatter",
        &QosProfile::default(),
        &SubscriptionOptions::default(),
        false,
        true,
    )?;

    assert_eq!(sub.topic_name, "chatter");
    assert_eq!(sub.implementation_identifier, rmw_dds::RMW_DDS_IDENTIFIER);
    assert_eq!(sub.data().dds_topic_name(), "rt/chatter");
    assert_eq!(sub.data().type_name(), STRING_TYPE);
    assert!(sub.data().listener().is_some());
    assert_eq!(mem.live_reader_count(), 1);
    assert_eq!(mem.attached_listener_count(), 1);
    assert!(mem.is_type_registered(STRING_TYPE));
    assert_eq!(sub.gid().guid_bytes(), &sub.data().reader().guid().to_bytes());
    Ok(())
}

#[test]
fn test_second_subscription_reuses_registration() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();

    let first = info.create_subscription(&ts, "chatter").build()?;
    let second = info.create_subscription(&ts, "other_chatter").build()?;

    assert_eq!(mem.registered_type_count(), 1);
    assert_eq!(info.registry().holders(STRING_TYPE), 2);
    assert!(Arc::ptr_eq(first.data().type_support(), second.data().type_support()));
    assert_ne!(first.gid(), second.gid());
    Ok(())
}

#[test]
fn test_empty_topic_rejected_before_allocation() {
    let (mem, info) = setup();
    let ts = string_type_supports();
    reset_error();

    let res = info.create_subscription(&ts, "").build();
    assert!(matches!(res, Err(RmwError::InvalidArgument(_))));
    assert_eq!(RmwRet::from_result(&res), RmwRet::InvalidArgument);
    assert!(is_error_set());
    assert_eq!(mem.created_reader_count(), 0);
    assert_eq!(mem.registered_type_count(), 0);
}

#[test]
fn test_foreign_type_support_rejected() {
    let (mem, info) = setup();
    let ts = [MessageTypeSupportHandle {
        typesupport_identifier: "rosidl_typesupport_introspection_c",
        data: Arc::new(StaticTypeSupport::new("std_msgs::msg", "String")),
    }];
    let res = info.create_subscription(&ts, "chatter").build();
    assert!(matches!(res, Err(RmwError::InvalidArgument(_))));
    assert_eq!(mem.registered_type_count(), 0);
}

#[test]
fn test_invalid_qos_rejected() {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let qos = QosProfile {
        liveliness: QosLiveliness::ManualByNode,
        ..Default::default()
    };
    let res = info.create_subscription(&ts, "chatter").with_qos(qos).build();
    assert!(matches!(res, Err(RmwError::ConfigurationInvalid(_))));
    assert_eq!(mem.registered_type_count(), 0);
}

#[test]
fn test_failures_leave_no_resources() {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let before = footprint(&mem, &info);

    mem.faults().fail_register_type(true);
    let res = info.create_subscription(&ts, "chatter").build();
    assert!(matches!(res, Err(RmwError::UpstreamFailure(_))));
    assert_eq!(footprint(&mem, &info), before);
    mem.faults().fail_register_type(false);

    mem.faults().fail_create_reader(true);
    reset_error();
    let res = info.create_subscription(&ts, "chatter").build();
    assert!(matches!(res, Err(RmwError::UpstreamFailure(_))));
    assert!(get_error_string().contains("could not create subscriber"));
    assert_eq!(footprint(&mem, &info), before);
    mem.faults().fail_create_reader(false);

    // the reader exists when the GID derivation fails and has to be deleted again
    mem.faults().unknown_reader_guid(true);
    let res = info.create_subscription(&ts, "chatter").build();
    assert!(matches!(res, Err(RmwError::UpstreamFailure(_))));
    assert_eq!(mem.created_reader_count(), 1);
    assert_eq!(footprint(&mem, &info), before);
}

#[test]
fn test_failed_creation_keeps_cached_registration() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let existing = info.create_subscription(&ts, "chatter").build()?;

    mem.faults().fail_create_reader(true);
    let res = info.create_subscription(&ts, "chatter_2").build();
    assert!(res.is_err());
    mem.faults().fail_create_reader(false);

    assert!(mem.is_type_registered(STRING_TYPE));
    assert_eq!(info.registry().holders(STRING_TYPE), 1);
    assert!(Arc::ptr_eq(
        existing.data().type_support(),
        &info.registry().lookup(STRING_TYPE).unwrap()
    ));
    Ok(())
}

#[test]
fn test_destroy_mirrors_creation() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let before = footprint(&mem, &info);

    let first = info.create_subscription(&ts, "chatter").build()?;
    let second = info.create_subscription(&ts, "chatter").with_listener(false).build()?;
    assert!(second.data().listener().is_none());

    destroy_subscription(first)?;
    assert_eq!(mem.live_reader_count(), 1);
    assert!(mem.is_type_registered(STRING_TYPE));

    destroy_subscription(second)?;
    assert_eq!(footprint(&mem, &info), before);
    Ok(())
}

#[test]
fn test_destroy_foreign_handle() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let mut sub = info.create_subscription(&ts, "chatter").build()?;
    sub.implementation_identifier = "rmw_other";

    let res = destroy_subscription(sub);
    assert!(matches!(res, Err(RmwError::InvalidArgument(_))));
    // dropping the handle still frees what it owns
    assert_eq!(mem.live_reader_count(), 0);
    Ok(())
}

#[test]
fn test_destroy_reports_unregister_failure() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let sub = info.create_subscription(&ts, "chatter").build()?;

    mem.faults().fail_unregister_type(true);
    let res = destroy_subscription(sub);
    assert!(matches!(res, Err(RmwError::UpstreamFailure(_))));
    assert_eq!(mem.live_reader_count(), 0);
    // registry and transport still agree on the type
    assert!(mem.is_type_registered(STRING_TYPE));
    assert!(info.registry().lookup(STRING_TYPE).is_some());
    mem.faults().fail_unregister_type(false);

    let again = info.create_subscription(&ts, "chatter").build()?;
    assert_eq!(mem.registered_type_count(), 1);
    destroy_subscription(again)?;
    assert_eq!(footprint(&mem, &info), (0, 0, 0, 0));
    Ok(())
}

#[test]
fn test_failed_unwind_keeps_type_usable() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();

    // fresh registration, the reader fails and the unregister during unwind is refused
    mem.faults().fail_create_reader(true);
    mem.faults().fail_unregister_type(true);
    assert!(info.create_subscription(&ts, "chatter").build().is_err());
    mem.faults().fail_create_reader(false);
    mem.faults().fail_unregister_type(false);

    let sub = info.create_subscription(&ts, "chatter").build()?;
    assert_eq!(info.registry().holders(STRING_TYPE), 1);
    destroy_subscription(sub)?;
    assert!(!mem.is_type_registered(STRING_TYPE));
    Ok(())
}

#[test]
fn test_listener_receives_samples() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let sub = info.create_subscription(&ts, "chatter").build()?;
    let listener = sub.data().listener().unwrap().clone();

    let notified = Arc::new(AtomicUsize::new(0));
    let n = notified.clone();
    listener.set_on_new_message_callback(Some(Arc::new(move |count| {
        n.fetch_add(count, Ordering::SeqCst);
    })));

    assert_eq!(mem.deliver("rt/chatter"), 1);
    assert_eq!(mem.deliver("rt/unrelated"), 0);
    mem.match_publishers("rt/chatter", 1);

    assert!(listener.wait_for_data(Some(Duration::from_millis(100))));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(listener.matched_publishers(), 1);
    assert!(listener.take_one());
    assert!(!listener.has_data());

    destroy_subscription(sub)?;
    assert_eq!(mem.deliver("rt/chatter"), 0);
    Ok(())
}

#[test]
fn test_actual_qos_matches_request() -> Result<()> {
    let (_mem, info) = setup();
    let ts = string_type_supports();
    let qos = QosProfile {
        reliability: QosReliability::BestEffort,
        durability: QosDurability::TransientLocal,
        history: QosHistory::KeepLast(3),
        deadline: QosDuration { sec: 0, nsec: 250_000_000 },
        ..Default::default()
    };
    let sub = info.create_subscription(&ts, "chatter").with_qos(qos).build()?;
    assert_eq!(sub.actual_qos(), qos);
    Ok(())
}

#[test]
fn test_raw_topic_name() -> Result<()> {
    let (_mem, info) = setup();
    let ts = string_type_supports();
    let qos = QosProfile {
        avoid_ros_namespace_conventions: true,
        ..Default::default()
    };
    let sub = info.create_subscription(&ts, "raw_dds_topic").with_qos(qos).build()?;
    assert_eq!(sub.data().dds_topic_name(), "raw_dds_topic");
    Ok(())
}

#[test]
fn test_concurrent_creation_registers_once() {
    let (mem, info) = setup();
    let info = Arc::new(info);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let info = info.clone();
            std::thread::spawn(move || {
                let ts = string_type_supports();
                info.create_subscription(&ts, &format!("chatter_{i}")).build()
            })
        })
        .collect();

    let subs: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    assert_eq!(mem.live_reader_count(), 8);
    assert_eq!(mem.registered_type_count(), 1);
    assert_eq!(info.registry().holders(STRING_TYPE), 8);

    drop(subs);
    assert_eq!(mem.live_reader_count(), 0);
    assert_eq!(mem.registered_type_count(), 0);
    assert!(info.registry().is_empty());
}

#[test]
fn test_shutdown_ends_registry_lifecycle() -> Result<()> {
    let (mem, info) = setup();
    let ts = string_type_supports();
    let sub = info.create_subscription(&ts, "chatter").build()?;
    info.shutdown()?;
    assert!(info.registry().is_empty());
    assert_eq!(mem.registered_type_count(), 0);
    assert!(matches!(
        info.create_subscription(&ts, "chatter").build(),
        Err(RmwError::InvalidArgument(_))
    ));
    // the live subscription still tears down cleanly
    destroy_subscription(sub)?;
    assert_eq!(mem.live_reader_count(), 0);
    Ok(())
}
