use super::settings::Settings;
use super::{DATA_DIR_ENV, DEFAULT_MAX_FRAME_BYTES, LEGACY_DATA_DIR_ENV, load_config_from};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "localhost");
    assert_eq!(settings.server.port, 8888);
    assert_eq!(settings.server.addr(), "localhost:8888");
    assert_eq!(settings.server.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
    assert_eq!(settings.broker.max_backlog, 0);
    assert_eq!(settings.broker.backlog_limit(), None);
    assert_eq!(settings.broker.status_interval_secs, 0);
    assert_eq!(settings.persistence.data_dir, ".msg_data");
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn test_load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("default.toml");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        max_backlog = 10
    "#;
    fs::write(&path, toml).expect("write config file");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.broker.max_backlog, 10);
    assert_eq!(cfg.broker.backlog_limit(), Some(10));
    // untouched keys keep their defaults
    assert_eq!(cfg.broker.status_interval_secs, 0);
    assert_eq!(cfg.persistence.data_dir, ".msg_data");
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("default.toml");
    fs::write(&path, "[server]\nport = 9000\n").expect("write config file");

    temp_env::with_vars(
        [
            ("MSG_SERVER__PORT", Some("9100")),
            ("MSG_BROKER__STATUS_INTERVAL_SECS", Some("30")),
            ("MSG_SERVER__MAX_FRAME_BYTES", Some("4096")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.server.max_frame_bytes, 4096);
            assert_eq!(cfg.broker.status_interval_secs, 30);
        },
    );
}

#[test]
#[serial]
fn test_data_dir_env_var() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    temp_env::with_var(DATA_DIR_ENV, Some("/var/lib/msg"), || {
        let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
        assert_eq!(cfg.persistence.data_dir, "/var/lib/msg");
    });
}

#[test]
#[serial]
fn test_legacy_data_dir_env_var() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    temp_env::with_vars(
        [(DATA_DIR_ENV, None), (LEGACY_DATA_DIR_ENV, Some("/srv/msg"))],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.persistence.data_dir, "/srv/msg");
        },
    );

    temp_env::with_vars(
        [
            (DATA_DIR_ENV, Some("/var/lib/msg")),
            (LEGACY_DATA_DIR_ENV, Some("/srv/msg")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.persistence.data_dir, "/var/lib/msg");
        },
    );
}
