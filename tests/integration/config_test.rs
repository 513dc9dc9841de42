//! Configuration Integration Tests
//!
//! Config file loading, environment overlays and oracle selection.

use std::collections::HashMap;
use std::io::Write;

use rule_pilot::models::rule::Platform;
use rule_pilot::services::OracleSet;
use rule_pilot::storage::config::ConfigService;
use rule_pilot::utils::error::AppError;
use rule_pilot_llm::ProviderType;
use rule_pilot_quality_gates::OracleError;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
default_provider = "deepseek"

[providers.deepseek]
model = "deepseek-chat"
max_tokens = 4096

[splunk]
host = "splunk.internal"
username = "admin"

[pipeline]
max_iterations = 5
"#;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_file_and_environment_are_merged() {
    let file = config_file(CONFIG);
    let service = ConfigService::load_with_env(
        Some(file.path()),
        env(&[("DEEPSEEK_API_KEY", "sk-test"), ("SPLUNK_PASSWORD", "changeme")]),
    )
    .unwrap();
    assert_eq!(service.config_path(), Some(file.path()));

    let config = service.into_config();
    assert_eq!(config.pipeline.max_iterations, 5);
    assert_eq!(config.pipeline.score_threshold, 0.6);

    let provider = config.default_provider_config().unwrap();
    assert_eq!(provider.provider, ProviderType::DeepSeek);
    assert_eq!(provider.model, "deepseek-chat");
    assert_eq!(provider.api_key.as_deref(), Some("sk-test"));
    assert_eq!(provider.max_tokens, Some(4096));

    let splunk = config.splunk.unwrap();
    assert_eq!(splunk.port, 8089);
    assert_eq!(splunk.password, "changeme");
}

#[test]
fn test_missing_explicit_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigService::load_with_env(Some(dir.path().join("absent.toml").as_path()), env(&[]))
        .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_invalid_pipeline_settings_rejected() {
    let file = config_file("[pipeline]\nscore_threshold = 1.5\n");
    let err = ConfigService::load_with_env(Some(file.path()), env(&[])).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_unknown_provider_is_config_error() {
    let file = config_file(CONFIG);
    let config = ConfigService::load_with_env(Some(file.path()), env(&[]))
        .unwrap()
        .into_config();
    let err = config.provider_config("gpt-neo").unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_oracle_selection() {
    let file = config_file(CONFIG);
    let with_splunk = ConfigService::load_with_env(Some(file.path()), env(&[]))
        .unwrap()
        .into_config();
    assert!(OracleSet::for_platform(Platform::Splunk, &with_splunk).is_ok());

    let sentinel = OracleSet::for_platform(Platform::Sentinel, &with_splunk).unwrap();
    let err = sentinel.execution.execute("SigninLogs").await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable(ref reason) if reason.contains("Microsoft Sentinel")));

    let bare = ConfigService::load_with_env(Some(config_file("").path()), env(&[]))
        .unwrap()
        .into_config();
    let splunk = OracleSet::for_platform(Platform::Splunk, &bare).unwrap();
    let err = splunk.syntax.check_syntax("index=main").await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable(_)));
}
