// tests/config_loading.rs
//
// Config resolution order (env path → default path → built-in defaults),
// env overrides, and AI config key resolution. Tests touching the process
// environment or CWD run serially.

use std::{env, fs};

use multisearch::ai::build_backend;
use multisearch::config::{AggregatorConfig, AiConfig, SelectionMode};

const ENV_KEYS: [&str; 5] = [
    "AGGREGATOR_CONFIG_PATH",
    "DISPATCH_DEADLINE_MS",
    "DISPATCH_MAX_IN_FLIGHT",
    "SELECTION_MODE",
    "AI_CONFIG_PATH",
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn aggregator_config_resolution_order() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing on disk → defaults.
    let cfg = AggregatorConfig::load().unwrap();
    assert_eq!(cfg, AggregatorConfig::default());

    // 2) Default path.
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("aggregator.toml"),
        "[dispatch]\nglobal_deadline_ms = 4000\n",
    )
    .unwrap();
    assert_eq!(AggregatorConfig::load().unwrap().dispatch.global_deadline_ms, 4000);

    // 3) Env path wins.
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[selection]\nmode = \"all\"\n").unwrap();
    env::set_var("AGGREGATOR_CONFIG_PATH", p_env.display().to_string());
    let cfg = AggregatorConfig::load().unwrap();
    assert_eq!(cfg.selection.mode, SelectionMode::All);
    assert_eq!(cfg.dispatch.global_deadline_ms, 15_000);

    // 4) Env path pointing nowhere is fatal.
    env::set_var("AGGREGATOR_CONFIG_PATH", tmp.path().join("missing.toml").display().to_string());
    assert!(AggregatorConfig::load().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_overrides_apply_and_are_validated() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    env::set_var("DISPATCH_DEADLINE_MS", "2500");
    env::set_var("DISPATCH_MAX_IN_FLIGHT", "not-a-number");
    env::set_var("SELECTION_MODE", "ALL");
    let cfg = AggregatorConfig::load().unwrap();
    assert_eq!(cfg.dispatch.global_deadline_ms, 2500);
    assert_eq!(cfg.dispatch.max_in_flight, 8, "invalid override is ignored");
    assert_eq!(cfg.selection.mode, SelectionMode::All);

    env::set_var("DISPATCH_DEADLINE_MS", "0");
    assert!(AggregatorConfig::load().is_err(), "zero deadline must be rejected");

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn ai_config_missing_key_leaves_backend_unconfigured() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();
    env::remove_var("OPENAI_API_KEY");
    env::remove_var("AI_TEST_MODE");

    // No file at all.
    assert!(AiConfig::load_default().unwrap().is_none());
    assert!(!build_backend(None).unwrap().is_configured());

    // Enabled, but "ENV" resolves to nothing.
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("ai.json"),
        r#"{"enabled": true, "provider": "openai", "api_key": "ENV"}"#,
    )
    .unwrap();
    let cfg = AiConfig::load_default().unwrap().expect("config present");
    assert!(cfg.api_key.is_empty());
    let backend = build_backend(Some(&cfg)).unwrap();
    assert!(!backend.is_configured());
    assert_eq!(backend.provider_name(), "disabled");

    // Key present → real client.
    env::set_var("OPENAI_API_KEY", "sk-test");
    let cfg = AiConfig::load_default().unwrap().expect("config present");
    let backend = build_backend(Some(&cfg)).unwrap();
    assert!(backend.is_configured());
    assert_eq!(backend.provider_name(), "openai");
    env::remove_var("OPENAI_API_KEY");

    // Mock mode overrides everything.
    env::set_var("AI_TEST_MODE", "mock");
    assert_eq!(build_backend(None).unwrap().provider_name(), "mock");
    env::remove_var("AI_TEST_MODE");

    env::set_current_dir(&old).unwrap();
}
