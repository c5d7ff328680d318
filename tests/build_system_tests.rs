//! Build system integration tests
//!
//! Full pipeline runs over temporary projects:
//!
//! - Descriptor merge and factory passthrough
//! - Overwrite, null-skip and idempotence
//! - Error policy (failed patterns, suppressed emission, fail-fast)
//! - Task-set shorthand and raw file copies
//! - Interpreter-backed command factories

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use taskconf::build::{BuildContext, BuildPipeline, BuildStatus, Pattern};
use taskconf::config::{default_config, load_config, CopyPattern, TaskConfConfig, TasksConfig};
use taskconf::materialize::MaterializeError;
use taskconf::module::serde_factory;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a project with an empty context directory.
fn create_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    temp
}

/// Write a file below the context root.
fn create_module(project: &Path, name: &str, content: &str) -> PathBuf {
    let path = project.join("src").join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn pipeline(project: &Path, config: TaskConfConfig) -> BuildPipeline {
    BuildPipeline::new(BuildContext::new(config, project.to_path_buf()))
}

fn config_with(patterns: Vec<Pattern>) -> TaskConfConfig {
    let mut config = default_config();
    config.patterns = patterns;
    config
}

fn read_output(project: &Path, name: &str) -> Value {
    let text = fs::read_to_string(project.join("dist").join(name)).unwrap();
    serde_json::from_str(&text).unwrap()
}

// ============================================================================
// Materialization
// ============================================================================

#[test]
fn test_factory_output_is_not_merged() {
    let temp = create_project();
    let mut config = config_with(vec![Pattern::new("x/task.js", "x/task.conf")]);
    config.data = json!({"version": "9.9.9", "extra": true}).as_object().cloned();

    let result = pipeline(temp.path(), config)
        .with_factory(
            "x/task.js",
            serde_factory(|_| json!({"version": "0.0.1", "stage": {"smoking": {"step": {}}}})),
        )
        .build()
        .unwrap();

    assert!(result.is_success());
    assert_eq!(
        read_output(temp.path(), "x/task.conf"),
        json!({"version": "0.0.1", "stage": {"smoking": {"step": {}}}})
    );
}

#[test]
fn test_descriptor_merged_with_data_file() {
    let temp = create_project();
    create_module(
        temp.path(),
        "redis/task.json5",
        r#"{
            // redis smoke test
            version: '0.0.1',
            case: {file: 'default.csv'},
            stage: {smoking: {step: {}}},
        }"#,
    );
    fs::write(temp.path().join("data.toml"), "[case]\nfile = \"ci.csv\"\n").unwrap();

    let mut config = config_with(vec![Pattern::new("./redis/task", "redis/task.conf")]);
    config.data_file = Some(PathBuf::from("data.toml"));

    let result = pipeline(temp.path(), config).build().unwrap();

    assert!(result.is_success());
    assert_eq!(
        read_output(temp.path(), "redis/task.conf"),
        json!({"version": "0.0.1", "case": {"file": "ci.csv"}, "stage": {"smoking": {"step": {}}}})
    );
}

#[test]
fn test_output_keeps_authored_key_order() {
    let temp = create_project();
    create_module(temp.path(), "t/task.toml", "version = \"0.0.1\"\nzeta = 1\nalpha = 2\n");

    pipeline(temp.path(), config_with(vec![Pattern::new("t/task.toml", "t/task.conf")]))
        .build()
        .unwrap();

    let text = fs::read_to_string(temp.path().join("dist/t/task.conf")).unwrap();
    assert_eq!(text, "{\n  \"version\": \"0.0.1\",\n  \"zeta\": 1,\n  \"alpha\": 2\n}");
}

#[test]
fn test_index_module_resolution() {
    let temp = create_project();
    create_module(temp.path(), "sleep/index.json", r#"{"pre": {"step": {}}}"#);

    let config = config_with(vec![Pattern::new("./sleep", "sleep/task.conf")]);
    let result = pipeline(temp.path(), config).build().unwrap();

    assert!(result.is_success());
    assert_eq!(read_output(temp.path(), "sleep/task.conf"), json!({"pre": {"step": {}}}));
}

// ============================================================================
// Overwrite, skip, idempotence
// ============================================================================

#[test]
fn test_later_pattern_wins() {
    let temp = create_project();
    create_module(temp.path(), "a.json", r#"{"v": "a"}"#);
    create_module(temp.path(), "b.json", r#"{"v": "b"}"#);

    let config = config_with(vec![
        Pattern::new("a.json", "same.conf"),
        Pattern::new("b.json", "same.conf"),
    ]);
    let result = pipeline(temp.path(), config).build().unwrap();

    assert_eq!(result.written.len(), 1);
    assert_eq!(read_output(temp.path(), "same.conf"), json!({"v": "b"}));
}

#[test]
fn test_null_export_skipped_and_build_continues() {
    let temp = create_project();
    create_module(temp.path(), "off.json", "null");
    create_module(temp.path(), "on.json", "{}");

    let config = config_with(vec![
        Pattern::new("off.json", "off.conf"),
        Pattern::new("on.json", "on.conf"),
    ]);
    let result = pipeline(temp.path(), config).build().unwrap();

    assert!(result.is_success());
    assert_eq!(result.skipped_count(), 1);
    assert!(!temp.path().join("dist/off.conf").exists());
    assert!(temp.path().join("dist/on.conf").exists());
}

#[test]
fn test_rebuild_is_byte_identical() {
    let temp = create_project();
    create_module(temp.path(), "lua/task.json5", "{version: '0.0.1', init: 10.0, ratio: 0.25}");
    let config = config_with(vec![Pattern::new("lua/task.json5", "lua/task.conf")]);

    pipeline(temp.path(), config.clone()).build().unwrap();
    let first = fs::read(temp.path().join("dist/lua/task.conf")).unwrap();
    pipeline(temp.path(), config).build().unwrap();
    let second = fs::read(temp.path().join("dist/lua/task.conf")).unwrap();

    assert_eq!(first, second);
    assert!(String::from_utf8(first).unwrap().contains("\"init\": 10,"));
}

#[test]
fn test_rebuild_sees_module_edits() {
    let temp = create_project();
    create_module(temp.path(), "t.json", r#"{"v": 1}"#);
    let pipeline = pipeline(temp.path(), config_with(vec![Pattern::new("t.json", "t.conf")]));

    pipeline.build().unwrap();
    create_module(temp.path(), "t.json", r#"{"v": 2}"#);
    pipeline.build().unwrap();

    assert_eq!(read_output(temp.path(), "t.conf"), json!({"v": 2}));
}

// ============================================================================
// Error policy
// ============================================================================

#[test]
fn test_failed_pattern_fails_build_without_writing() {
    let temp = create_project();
    create_module(temp.path(), "good.json", "{}");
    create_module(temp.path(), "bad.json5", "{oops");

    let config = config_with(vec![
        Pattern::new("good.json", "good.conf"),
        Pattern::new("bad.json5", "bad.conf"),
        Pattern::new("missing", "missing.conf"),
    ]);
    let result = pipeline(temp.path(), config).build().unwrap();

    assert!(!result.is_success());
    assert_eq!(result.failed_count(), 2);
    assert!(result.emit_suppressed);
    assert!(!temp.path().join("dist").exists());
    assert!(result.summary().contains("bad.conf"));
}

#[test]
fn test_factory_error_reported_per_pattern() {
    let temp = create_project();
    let failing = |_: Option<&serde_json::Map<String, Value>>| -> Result<Value, MaterializeError> {
        Err(MaterializeError::Invoke("no case data".to_string()))
    };

    let result = pipeline(temp.path(), config_with(vec![Pattern::new("x/task.js", "x/task.conf")]))
        .with_factory("x/task.js", Arc::new(failing))
        .build()
        .unwrap();

    match &result.targets[0].status {
        BuildStatus::Failed(message) => assert!(message.contains("no case data")),
        other => panic!("unexpected status {}", other),
    }
}

#[test]
fn test_factory_policy_from_config_file() {
    let temp = create_project();
    create_module(temp.path(), "echo/task.json", "{}");
    fs::write(
        temp.path().join("taskconf.toml"),
        r#"
[project]
name = "engine-tasks"

[modules]
exports = "factory"

[[patterns]]
from = "./echo/task.json"
to = "echo/task.conf"
"#,
    )
    .unwrap();

    let config = load_config(Some(&temp.path().join("taskconf.toml"))).unwrap();
    let result = pipeline(temp.path(), config).build().unwrap();

    assert_eq!(result.failed_count(), 1);
    match &result.targets[0].status {
        BuildStatus::Failed(message) => assert!(message.contains("descriptor")),
        other => panic!("unexpected status {}", other),
    }
}

// ============================================================================
// Tasks shorthand and copies
// ============================================================================

#[test]
fn test_tasks_discover_and_copy_case_data() {
    let temp = create_project();
    create_module(temp.path(), "lua/task.json5", "{version: '0.0.1'}");
    create_module(temp.path(), "lua/case.csv", "a,b\n1,2\n");
    create_module(temp.path(), "redis/task.json5", "{version: '0.0.2'}");

    let mut config = default_config();
    config.tasks = Some(TasksConfig {
        discover: Some("*/task.json5".to_string()),
        ..TasksConfig::default()
    });
    config.copy = vec![CopyPattern {
        from: "**/*.csv".to_string(),
        to: "[path][name].[ext]".to_string(),
    }];

    let result = pipeline(temp.path(), config).build().unwrap();

    assert!(result.is_success());
    assert_eq!(result.assets, vec!["lua/case.csv", "lua/task.conf", "redis/task.conf"]);
    assert_eq!(read_output(temp.path(), "redis/task.conf"), json!({"version": "0.0.2"}));
    assert_eq!(fs::read_to_string(temp.path().join("dist/lua/case.csv")).unwrap(), "a,b\n1,2\n");
}

#[test]
fn test_filter_and_dry_run() {
    let temp = create_project();
    create_module(temp.path(), "lua/task.json5", "{}");
    create_module(temp.path(), "redis/task.json5", "{}");

    let mut config = default_config();
    config.tasks = Some(TasksConfig {
        names: vec!["lua".to_string(), "redis".to_string()],
        ..TasksConfig::default()
    });
    let ctx = BuildContext::new(config, temp.path().to_path_buf())
        .with_filter(vec!["redis/*".to_string()]);

    let result = BuildPipeline::new(ctx).with_dry_run(true).build().unwrap();

    assert_eq!(result.assets, vec!["redis/task.conf"]);
    assert!(result.written.is_empty());
    assert!(!temp.path().join("dist").exists());
}

// ============================================================================
// Command factories
// ============================================================================

#[cfg(unix)]
#[test]
fn test_interpreted_module_receives_data_on_stdin() {
    let temp = create_project();
    create_module(
        temp.path(),
        "x/task.sh",
        "read data\nprintf '{\"version\":\"0.0.1\",\"data\":%s}' \"$data\"\n",
    );

    let mut config = config_with(vec![Pattern::new("./x/task", "x/task.conf")]);
    config.modules.interpreters.insert("sh".to_string(), vec!["sh".to_string()]);
    config.data = json!({"env": "ci"}).as_object().cloned();

    let result = pipeline(temp.path(), config).build().unwrap();

    assert!(result.is_success(), "{}", result.summary());
    assert_eq!(
        read_output(temp.path(), "x/task.conf"),
        json!({"version": "0.0.1", "data": {"env": "ci"}})
    );
}

#[cfg(unix)]
#[test]
fn test_interpreted_module_failure() {
    let temp = create_project();
    create_module(temp.path(), "x/task.sh", "echo broken >&2\nexit 3\n");

    let mut config = config_with(vec![Pattern::new("x/task.sh", "x/task.conf")]);
    config.modules.interpreters.insert("sh".to_string(), vec!["sh".to_string()]);

    let result = pipeline(temp.path(), config).build().unwrap();
    assert_eq!(result.failed_count(), 1);
    assert!(result.emit_suppressed);
}
