//! Integration tests for config module public API.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use waypost::config::{
    compile_flow, load_config, load_merged_config, validate, validate_config, BackendConfig,
    OutputMode, WaypostConfig,
};
use waypost::registry::{FlowRegistry, FlowSource};

fn write_config(root: &Path, name: &str, content: &str) {
    let dir = root.join(".waypost");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn public_api_is_accessible() {
    let config = WaypostConfig::default();
    assert_eq!(config.settings.default_output, OutputMode::Normal);
    assert_eq!(config.settings.backend, BackendConfig::Demo);
    assert!(validate_config(&config).is_empty());
}

#[test]
fn full_config_workflow() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        "config.yml",
        r#"
app_name: Clinic
flows:
  intake:
    description: Patient intake
    steps:
      - id: contact
        fields:
          - name: email
            type: email
        next: consent
      - id: consent
        fields:
          - name: agree
            type: boolean
        next: done
        branches:
          - when: { type: equals, field: agree, value: false }
            to: declined
      - id: done
        terminal: completed
      - id: declined
        terminal: failed
"#,
    );

    let config = load_merged_config(temp.path()).unwrap();
    validate(&config).unwrap();

    let schema = compile_flow("intake", &config.flows["intake"]).unwrap();
    assert_eq!(schema.steps().len(), 4);
    assert_eq!(schema.entry().as_str(), "contact");
    assert_eq!(schema.description(), Some("Patient intake"));
}

#[test]
fn local_overrides_merge_over_project_config() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        "config.yml",
        r#"
app_name: Base
settings:
  dispatch_timeout: 10
  demo:
    verification_code: "111111"
"#,
    );
    write_config(
        temp.path(),
        "config.local.yml",
        r#"
settings:
  demo:
    verification_code: "222222"
"#,
    );

    let config = load_merged_config(temp.path()).unwrap();
    assert_eq!(config.app_name.as_deref(), Some("Base"));
    assert_eq!(config.settings.dispatch_timeout, 10);
    assert_eq!(config.settings.demo.verification_code, "222222");
}

#[test]
fn explicit_config_skips_discovery() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path(), "config.yml", "app_name: Discovered\n");
    let explicit = temp.path().join("other.yml");
    fs::write(&explicit, "app_name: Explicit\n").unwrap();

    let config = load_config(temp.path(), Some(&explicit)).unwrap();
    assert_eq!(config.app_name.as_deref(), Some("Explicit"));
}

#[test]
fn http_backend_is_parsed() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        "config.yml",
        r#"
settings:
  backend:
    type: http
    url: https://idp.example.com/flows
    token_env: IDP_TOKEN
"#,
    );

    let config = load_merged_config(temp.path()).unwrap();
    match config.settings.backend {
        BackendConfig::Http {
            url,
            timeout,
            token_env,
        } => {
            assert_eq!(url, "https://idp.example.com/flows");
            assert_eq!(timeout, 30);
            assert_eq!(token_env.as_deref(), Some("IDP_TOKEN"));
        }
        other => panic!("expected http backend, got {:?}", other),
    }
}

#[test]
fn validation_collects_every_problem() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        "config.yml",
        r#"
settings:
  dispatch_timeout: 0
flows:
  broken:
    steps:
      - id: start
        next: nowhere
"#,
    );

    let config = load_merged_config(temp.path()).unwrap();
    let errors = validate_config(&config);
    let rules: Vec<_> = errors.iter().map(|e| e.rule.as_str()).collect();
    assert!(rules.contains(&"zero-timeout"));
    assert!(rules.contains(&"unknown-target"));
    assert!(validate(&config).is_err());
}

#[test]
fn project_flow_replaces_builtin() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        "config.yml",
        r#"
flows:
  password_reset:
    steps:
      - id: only
        next: $end
"#,
    );

    let config = load_merged_config(temp.path()).unwrap();
    let registry = FlowRegistry::load(&config).unwrap();
    let flow = registry.require("password_reset").unwrap();
    assert_eq!(flow.source, FlowSource::Project);
    assert_eq!(flow.schema.steps().len(), 1);
    assert!(registry.get("course_creation").is_some());
}
