use portfolio_insight::config::AppConfig;
use serial_test::serial;
use std::env;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("PI_SERVER__PORT");
        env::remove_var("PI_STORAGE__UPLOAD_DIR");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("UPLOAD_DIR");
        env::remove_var("PORTFOLIO_DIR");
        env::remove_var("TIMEOUT_DISABLED");
    }
}

// Fixed argv so the test runner's own flags never reach clap.
const ARGV: [&str; 1] = ["portfolio-insight"];

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(ARGV).expect("defaults should load");
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.storage.upload_dir, std::path::PathBuf::from("uploads"));
    assert_eq!(config.storage.portfolio_dir, std::path::PathBuf::from("portfolios"));
    assert!(!config.resilience.timeout_disabled);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("PI_SERVER__PORT", "9090");
        env::set_var("PI_STORAGE__UPLOAD_DIR", "/tmp/uploads-env");
    }

    let config = AppConfig::load_from_args(ARGV).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(
        config.storage.upload_dir,
        std::path::PathBuf::from("/tmp/uploads-env")
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("PI_SERVER__PORT", "9090");
    }

    let config =
        AppConfig::load_from_args(["portfolio-insight", "--port", "7777"]).expect("load config");
    assert_eq!(config.server.port, 7777);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::TempDir::new().unwrap();
    let file_path = dir.path().join("test_config.yaml");
    std::fs::write(
        &file_path,
        "server:\n  port: 7070\nstorage:\n  upload_dir: /tmp/from-file\n",
    )
    .expect("Failed to write temp config");

    let config = AppConfig::load_from_args([
        "portfolio-insight",
        "--config",
        file_path.to_str().unwrap(),
    ])
    .expect("Failed to load config from file");

    assert_eq!(config.server.port, 7070);
    assert_eq!(
        config.storage.upload_dir,
        std::path::PathBuf::from("/tmp/from-file")
    );
}

#[test]
#[serial]
fn test_timeout_flag() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["portfolio-insight", "--timeout-disabled", "true"])
        .expect("load config");
    assert!(config.resilience.timeout_disabled);
}
