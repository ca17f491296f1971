use nightshift_config::NightshiftConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_values_and_placeholders_are_merged() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
portal:
  username: "${NS_TEST_GPS_USER}"
  password: "${NS_TEST_GPS_PASSWORD}"
login:
  max_attempts: 3
report:
  alert_labels: ["Drowsy", "EyesClosed"]
notify:
  to: "ops@example.com,night@example.com"
"#;
    let p = write_yaml(&tmp, "nightshift.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("NS_TEST_GPS_USER", Some("fleet01")),
            ("NS_TEST_GPS_PASSWORD", Some("s3cret")),
        ],
        || {
            let config = NightshiftConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load run config");

            let creds = config.portal.credentials();
            assert!(creds.is_complete());
            assert_eq!(creds.username, "fleet01");
            assert_eq!(config.login.max_attempts, 3);
            assert_eq!(config.login.captcha_min_len, 4);
            assert_eq!(config.report.alert_labels, vec!["Drowsy", "EyesClosed"]);
            assert_eq!(config.notify.recipients().len(), 2);
        },
    );
}

#[test]
#[serial]
fn environment_overrides_win_over_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "nightshift.yaml", "downloads:\n  timeout_secs: 40\n");

    temp_env::with_vars(
        [
            ("NIGHTSHIFT__DOWNLOADS__TIMEOUT_SECS", Some("95")),
            ("NIGHTSHIFT__BROWSER__HEADLESS", Some("false")),
        ],
        || {
            let config = NightshiftConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load run config");

            assert_eq!(config.downloads.timeout_secs, 95);
            assert!(!config.browser.headless);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    temp_env::with_vars_unset(["EMAIL_FROM", "EMAIL_PASSWORD", "GPS_USER"], || {
        let config = NightshiftConfigLoader::new()
            .with_optional_file(tmp.path().join("absent.yaml"))
            .load()
            .expect("defaults load");

        assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
        assert_eq!(config.report.generation_wait_secs, 120);
        assert!(config.notify.mail_credentials().is_none());
        assert!(config.portal.username.is_empty());
    });
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = NightshiftConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn custom_env_prefix_isolates_overrides() {
    temp_env::with_vars(
        [
            ("NIGHTSHIFT__LOGIN__MAX_ATTEMPTS", Some("7")),
            ("NSTEST__LOGIN__MAX_ATTEMPTS", Some("2")),
        ],
        || {
            let config = NightshiftConfigLoader::new()
                .with_env_prefix("NSTEST")
                .load()
                .expect("load run config");
            assert_eq!(config.login.max_attempts, 2);
        },
    );
}

#[test]
#[serial]
fn environment_alone_supplies_credentials_and_mail() {
    let tmp = TempDir::new().unwrap();
    temp_env::with_vars(
        [
            ("GPS_USER", Some("fleet01")),
            ("GPS_PASSWORD", Some("$ecretPass1")),
            ("EMAIL_FROM", Some("bot@example.com")),
            ("EMAIL_PASSWORD", Some("app pass word")),
            ("EMAIL_TO", Some("ops@example.com, night@example.com")),
        ],
        || {
            let config = NightshiftConfigLoader::new()
                .with_optional_file(tmp.path().join("nightshift.yaml"))
                .load()
                .expect("load run config");

            let creds = config.portal.credentials();
            assert!(creds.is_complete());
            assert_eq!(creds.username, "fleet01");
            assert_eq!(creds.password, "$ecretPass1");
            assert_eq!(
                config.notify.mail_credentials(),
                Some(("bot@example.com".to_string(), "app pass word".to_string()))
            );
            assert_eq!(config.notify.recipients().len(), 2);
        },
    );
}

#[test]
#[serial]
fn placeholder_values_with_dollar_signs_survive() {
    temp_env::with_vars(
        [
            ("NS_TEST_PORTAL_PW", Some("$ecretPass1")),
            ("HOME1", Some("mangled")),
            ("NIGHTSHIFT__NOTIFY__PASSWORD", Some("pa$HOME1")),
        ],
        || {
            let config = NightshiftConfigLoader::new()
                .with_yaml_str("portal:\n  username: fleet01\n  password: \"${NS_TEST_PORTAL_PW}\"\n")
                .load()
                .expect("load run config");

            assert_eq!(config.portal.credentials().password, "$ecretPass1");
            assert_eq!(config.notify.password, "pa$HOME1");
        },
    );
}

#[test]
#[serial]
fn file_values_override_environment_defaults() {
    temp_env::with_vars(
        [("GPS_USER", Some("from-env")), ("NS_TEST_UNSET_USER", None)],
        || {
            let literal = NightshiftConfigLoader::new()
                .with_yaml_str("portal:\n  username: from-file\n")
                .load()
                .expect("load run config");
            assert_eq!(literal.portal.username, "from-file");

            let unresolved = NightshiftConfigLoader::new()
                .with_yaml_str("portal:\n  username: \"${NS_TEST_UNSET_USER}\"\n")
                .load()
                .expect("load run config");
            assert!(unresolved.portal.credentials().username.is_empty());
        },
    );
}
