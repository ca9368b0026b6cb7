use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn configured() -> AppConfig {
    let env = HashMap::from([(USERNAME_VAR, "ops@example.com"), (PASSWORD_VAR, "hunter2")]);
    let mut config = AppConfig::default();
    config.apply_env(lookup_from_map(&env));
    config
}

#[test]
fn defaults_point_at_seed() {
    let config = AppConfig::default();
    assert_eq!(config.portal.base_url, "https://mycantaloupe.com");
    assert_eq!(config.portal.default_cluster, "cs4");
    assert_eq!(config.summary.header_rows, 6);
    assert_eq!(config.output_dir, "downloads/daily");
    assert!(config.headless_mode);
    assert!(config.export_excel);
}

#[test]
fn env_supplies_credentials() {
    let config = configured();
    assert_eq!(config.username, "ops@example.com");
    assert!(config.has_password());
    assert!(config.validate().is_empty());
}

#[test]
fn blank_env_values_are_ignored() {
    let env = HashMap::from([(USERNAME_VAR, "  "), (BASE_URL_VAR, "")]);
    let mut config = AppConfig::default();
    config.apply_env(lookup_from_map(&env));
    assert!(config.username.is_empty());
    assert_eq!(config.portal.base_url, "https://mycantaloupe.com");
}

#[test]
fn base_url_override_drops_trailing_slash() {
    let env = HashMap::from([(BASE_URL_VAR, "https://staging.mycantaloupe.com/")]);
    let mut config = configured();
    config.apply_env(lookup_from_map(&env));
    assert_eq!(config.portal.base_url, "https://staging.mycantaloupe.com");
}

#[test]
fn missing_credentials_fail_validation() {
    let errors = AppConfig::default().validate();
    assert!(errors.contains(&"SEED_USERNAME is required".to_string()));
    assert!(errors.contains(&"SEED_PASSWORD is required".to_string()));
}

#[test]
fn export_and_timeouts_are_validated() {
    let mut config = configured();
    config.export_excel = false;
    config.portal.timeouts.login_secs = 0;
    let errors = config.validate();
    assert_eq!(errors.len(), 2);
}

#[test]
fn password_is_never_serialized() {
    let config = configured();
    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("hunter2"));

    let restored: AppConfig = serde_json::from_str(&json).unwrap();
    assert!(!restored.has_password());
    assert_eq!(restored.username, "ops@example.com");
}

#[test]
fn partial_config_file_keeps_defaults() {
    let config: AppConfig = serde_json::from_str(
        r#"{"username": "ops", "portal": {"default_cluster": "cs9"}, "excluded_categories": ["FF"]}"#,
    )
    .unwrap();
    assert_eq!(config.portal.default_cluster, "cs9");
    assert_eq!(config.portal.chromedriver_port, 9516);
    assert_eq!(config.portal.timeouts.login_secs, 30);
    assert_eq!(config.excluded_categories.keywords(), ["FF".to_string()]);
    assert_eq!(config.detail.placeholder, "--");
}

#[test]
fn credentials_debug_redacts_password() {
    let rendered = format!("{:?}", configured().credentials());
    assert!(rendered.contains("ops@example.com"));
    assert!(!rendered.contains("hunter2"));
}
