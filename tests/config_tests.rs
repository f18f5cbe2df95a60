//! Configuration loading and registry construction.

mod common;

use std::fs;

use common::classes_of;
use par_annotate::annotation::{BoundType, Build, LogFile, Run};
use par_annotate::config_bridge::{build_default_registry, populate_registry};
use par_annotate::host::Host;
use par_annotate::providers::{
    BuildReferences, KeywordProvider, LinkProvider, PreambleProvider, StackTraceProvider,
};
use par_annotate_config::{Config, LogLevel};
use tempfile::TempDir;

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.annotators.keywords.enabled);
    assert!(config.annotators.links.enabled);
    assert!(config.annotators.stack_traces.enabled);
    assert!(config.annotators.preamble.enabled);
    assert!(config.annotators.build_refs.enabled);
    assert!(config.assets.dir.is_none());
    assert_eq!(config.assets.max_age_secs, 86_400);
}

#[test]
fn test_default_registry_listing() {
    let registry = build_default_registry(&Config::default()).unwrap();
    let rows = registry.list_providers();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            KeywordProvider::NAME,
            LinkProvider::NAME,
            StackTraceProvider::NAME,
            PreambleProvider::NAME,
            BuildReferences::NAME,
        ]
    );
    assert!(rows[0].bound.is_universal());
    assert_eq!(rows[3].bound, BoundType::of::<dyn Run>());
    assert_eq!(rows[4].bound, BoundType::of::<Build>());
}

#[test]
fn test_load_from_yaml_with_toggles_and_rules() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(
        &path,
        r#"
log_level: debug
annotators:
  links:
    enabled: false
  stack_traces:
    enabled: false
  keywords:
    rules:
      - word: BOOM
        class: explosion
        color: [255, 0, 0]
        bold: true
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.log_level, LogLevel::Debug);

    let registry = build_default_registry(&config).unwrap();
    assert_eq!(registry.len(), 3);

    let mut chain = registry.start_session(&LogFile::new("x.log"));
    assert_eq!(chain.live_count(), 1);
    let text = "BOOM went http://x/y, ERROR ignored";
    let markup = chain.annotate(text);
    assert_eq!(classes_of(&markup), vec!["explosion"]);
    assert_eq!(markup.spans[0].range, 0..4);
}

#[test]
fn test_empty_config_file_is_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(&path, "   \n").unwrap();
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");

    fs::write(&path, "assets:\n  max_age_secs: 0\n").unwrap();
    assert!(Config::load_from(&path).is_err());

    fs::write(&path, "annotators:\n  keywords:\n    rules:\n      - word: \"  \"\n").unwrap();
    assert!(Config::load_from(&path).is_err());

    fs::write(&path, "annotators: [not, a, map]\n").unwrap();
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_save_and_reload_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.yaml");

    let mut config = Config::default();
    config.annotators.build_refs.enabled = false;
    config.reload_debounce_ms = 250;
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_populate_replaces_registry_contents() {
    let registry = build_default_registry(&Config::default()).unwrap();
    let old_ids: Vec<_> = registry.list_providers().iter().map(|r| r.id).collect();

    let mut config = Config::default();
    config.annotators.keywords.enabled = false;
    config.annotators.preamble.enabled = false;
    populate_registry(&registry, &config).unwrap();

    let rows = registry.list_providers();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| !old_ids.contains(&r.id)));
}

#[test]
fn test_host_reload_bumps_generation() {
    let host = Host::new(&Config::default()).unwrap();
    assert_eq!(host.generation(), 0);
    let build = Build::new("app", 1);
    assert_eq!(host.registry().start_session(&build).live_count(), 4);

    let mut config = Config::default();
    config.annotators.preamble.enabled = false;
    host.reload(&config).unwrap();

    assert_eq!(host.generation(), 1);
    assert_eq!(host.registry().start_session(&build).live_count(), 3);
    assert_eq!(host.provider_rows().len(), 4);
}
