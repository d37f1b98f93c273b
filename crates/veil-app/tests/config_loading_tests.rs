//! Integration tests for config file discovery and the fixed drop identity.

use std::fs;
use std::time::Duration;

use veil_app::config::{CONFIG_ENV, ConfigError, LockConfig};
use veil_app::system::{DROP_GROUP, DROP_USER, SystemError, drop_identity};

#[test]
fn config_loading_tests_file_values_and_environment() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("veil.json");
    fs::write(
        &path,
        r#"{"fail_on_clear":true,"grab_attempts":3,"grab_interval_ms":50}"#,
    )
    .expect("config should be written");

    // Safety:
    // - This is the only test in this binary that touches the environment.
    // - Every variable is removed before returning.
    unsafe { std::env::set_var(CONFIG_ENV, &path) };
    let config = LockConfig::load().expect("config should load");
    assert!(config.fail_on_clear);
    assert_eq!(config.grab_policy().attempts, 3);
    assert_eq!(config.grab_policy().interval, Duration::from_millis(50));

    // Safety: see rationale above.
    unsafe {
        std::env::set_var("VEIL_USER", "root");
        std::env::set_var("VEIL_GROUP", "root");
    };
    LockConfig::load().expect("config should load");
    match drop_identity() {
        Ok(identity) => {
            assert_eq!(identity.user, DROP_USER);
            assert_eq!(identity.group, DROP_GROUP);
            assert!(!identity.uid.is_root());
        }
        Err(SystemError::NoSuchUser(name)) => assert_eq!(name, DROP_USER),
        Err(SystemError::NoSuchGroup(name)) => assert_eq!(name, DROP_GROUP),
        Err(other) => panic!("environment must not pick the drop identity: {other}"),
    }

    fs::write(&path, r#"{"drop_user":"root"}"#).expect("config should be written");
    let error = LockConfig::load().expect_err("drop identity is not configurable");
    assert!(matches!(error, ConfigError::Parse(_)));

    fs::write(&path, "{ not json").expect("config should be written");
    let error = LockConfig::load().expect_err("malformed config is fatal");
    assert!(matches!(error, ConfigError::Parse(_)));

    // Safety: see rationale above.
    unsafe {
        std::env::set_var(CONFIG_ENV, dir.path().join("missing.json"));
        std::env::remove_var("VEIL_USER");
        std::env::remove_var("VEIL_GROUP");
    };
    let config = LockConfig::load().expect("missing file yields defaults");
    assert_eq!(config, LockConfig::default());

    // Safety: see rationale above.
    unsafe { std::env::remove_var(CONFIG_ENV) };
}

#[test]
fn config_loading_tests_out_of_range_values_are_rejected() {
    let config = LockConfig::from_json(r#"{"bell_percent":-101}"#).expect("value fits in i8");
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let error = LockConfig::from_json(r#"{"bell_percent":300}"#).expect_err("value overflows i8");
    assert!(matches!(error, ConfigError::Parse(_)));
}
