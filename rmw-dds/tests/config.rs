use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use rmw_dds::config::{CONFIG_FILE_ENV, CONFIG_OVERRIDE_ENV, USE_QOS_FROM_XML_ENV};
use rmw_dds::prelude::*;
use rmw_dds::testing::{MemParticipant, StaticTypeSupport};
use rmw_dds::transport::MemoryPolicy;
use serial_test::serial;

fn clear_env() {
    // SAFETY: tests touching the environment run serially.
    unsafe {
        std::env::remove_var(CONFIG_FILE_ENV);
        std::env::remove_var(CONFIG_OVERRIDE_ENV);
        std::env::remove_var(USE_QOS_FROM_XML_ENV);
    }
}

fn set_env(key: &str, value: &str) {
    // SAFETY: tests touching the environment run serially.
    unsafe { std::env::set_var(key, value) };
}

fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rmw_dds_{}_{name}.json5", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_defaults_without_env() {
    clear_env();
    let ctx = ContextBuilder::default().build().unwrap();
    assert!(!ctx.config().leave_middleware_default_qos);
    assert!(ctx.config().create_listeners);
}

#[test]
#[serial]
fn test_config_file_from_env() {
    clear_env();
    let path = write_config("env", "{ create_listeners: false }");
    set_env(CONFIG_FILE_ENV, path.to_str().unwrap());

    let ctx = ContextBuilder::default().build().unwrap();
    assert!(!ctx.config().create_listeners);

    // builders created through the participant pick the default up
    let info = ctx.create_participant_info(Arc::new(MemParticipant::new()));
    let ts = [MessageTypeSupportHandle {
        typesupport_identifier: TYPESUPPORT_C,
        data: Arc::new(StaticTypeSupport::new("std_msgs::msg", "String")),
    }];
    let sub = info.create_subscription(&ts, "chatter").build().unwrap();
    assert!(sub.data().listener().is_none());

    clear_env();
    std::fs::remove_file(path).unwrap();
}

#[test]
#[serial]
fn test_explicit_file_wins_over_env() {
    clear_env();
    let env_path = write_config("env_loses", "{ create_listeners: false }");
    let explicit = write_config("explicit", "{ history_memory_policy: 'Dynamic' }");
    set_env(CONFIG_FILE_ENV, env_path.to_str().unwrap());

    let ctx = ContextBuilder::default()
        .with_config_file(&explicit)
        .build()
        .unwrap();
    assert!(ctx.config().create_listeners);
    assert_eq!(ctx.config().history_memory_policy, MemoryPolicy::Dynamic);

    clear_env();
    std::fs::remove_file(env_path).unwrap();
    std::fs::remove_file(explicit).unwrap();
}

#[test]
#[serial]
fn test_use_qos_from_xml() {
    clear_env();
    set_env(USE_QOS_FROM_XML_ENV, "1");
    let ctx = ContextBuilder::default().build().unwrap();
    assert!(ctx.config().leave_middleware_default_qos);

    set_env(USE_QOS_FROM_XML_ENV, "0");
    let ctx = ContextBuilder::default().build().unwrap();
    assert!(!ctx.config().leave_middleware_default_qos);
    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_applied_last() {
    clear_env();
    set_env(
        CONFIG_OVERRIDE_ENV,
        "create_listeners=false; history_memory_policy=\"Preallocated\"",
    );
    let ctx = ContextBuilder::default()
        .with_json("create_listeners", true)
        .build()
        .unwrap();
    assert!(!ctx.config().create_listeners);
    assert_eq!(ctx.config().history_memory_policy, MemoryPolicy::Preallocated);
    clear_env();
}

#[test]
#[serial]
fn test_invalid_sources_rejected() {
    clear_env();
    set_env(CONFIG_OVERRIDE_ENV, "create_listeners");
    assert!(matches!(
        ContextBuilder::default().build(),
        Err(RmwError::ConfigurationInvalid(_))
    ));

    clear_env();
    let path = write_config("broken", "{ create_listeners: ");
    assert!(matches!(
        ContextBuilder::default().with_config_file(&path).build(),
        Err(RmwError::ConfigurationInvalid(_))
    ));
    std::fs::remove_file(path).unwrap();

    set_env(CONFIG_FILE_ENV, "/nonexistent/rmw_dds.json5");
    assert!(ContextBuilder::default().build().is_err());
    clear_env();
}
