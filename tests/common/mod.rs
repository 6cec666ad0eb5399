use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use authflow::config::{CallerConfig, Config, UserConfig};
use authflow::credentials::{password_digest, ConfiguredUsers};
use authflow::server::{router, AppState};
use authflow::session::MemorySessionStore;
use authflow::upstream::FakeEngine;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Configuration with user `john`/`john` and introspection caller
/// `rs`/`rs-secret`.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.users.push(UserConfig {
        subject: "1001".to_string(),
        login_id: "john".to_string(),
        password_sha256: password_digest("john"),
        claims: [
            ("name".to_string(), serde_json::json!("John Smith")),
            ("name#ja".to_string(), serde_json::json!("ジョン・スミス")),
        ]
        .into_iter()
        .collect(),
    });
    config.introspection_callers.push(CallerConfig {
        id: "rs".to_string(),
        secret_sha256: password_digest("rs-secret"),
    });
    config
}

/// Router over a fake engine and an in-memory session store.
#[allow(dead_code)]
pub fn test_app(config: &Config) -> (Arc<FakeEngine>, axum::Router) {
    let engine = Arc::new(FakeEngine::new());
    let state = AppState::new(
        config,
        engine.clone(),
        Arc::new(MemorySessionStore::default()),
        Arc::new(ConfiguredUsers::new(config.users.clone())),
    );
    (engine, router(state))
}
