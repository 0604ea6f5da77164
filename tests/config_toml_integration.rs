use mudcq::{ConfigError, ManualClock, SchedulerConfig, Task, TaskManager};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_config_serialization_roundtrip() {
    let original_config = SchedulerConfig::default();

    let toml_str = original_config
        .to_toml_string()
        .expect("Should be able to serialize config to TOML");

    assert!(toml_str.contains("history_size"), "Should contain history_size field");
    assert!(toml_str.contains("[queues.Priority]"), "Should contain Priority queue table");

    let deserialized_config =
        SchedulerConfig::from_toml_str(&toml_str).expect("Should be able to deserialize TOML string");
    assert_eq!(original_config, deserialized_config);
}

#[test]
fn test_config_file_operations() {
    let mut original_config = SchedulerConfig::default();
    original_config.history_size = 128;

    let temp_file = NamedTempFile::new().expect("Should be able to create temporary file");
    let temp_path = temp_file.path();

    original_config
        .to_toml_file(temp_path)
        .expect("Should be able to save config to file");

    let loaded_config =
        SchedulerConfig::from_toml_file(temp_path).expect("Should be able to load config from file");
    assert_eq!(loaded_config.history_size, 128);
    assert_eq!(loaded_config.queues, original_config.queues);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = SchedulerConfig::from_toml_str(
        r#"
[queues.Spell]
priority = 15
"#,
    )
    .expect("Partial config should parse");

    assert_eq!(config.history_size, SchedulerConfig::default().history_size);
    assert_eq!(config.queues.len(), 1);
    assert_eq!(config.queues["Spell"].priority, 15);
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = SchedulerConfig::from_toml_str("tick_interval_ms = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = SchedulerConfig::from_toml_str("history_size = \"lots\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));

    let err = SchedulerConfig::from_toml_file("/nonexistent/mudcq.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_loaded_queues_drive_ordering() {
    let config = SchedulerConfig::from_toml_str(
        r#"
[queues.Spell]
priority = 5

[queues.Move]
priority = 40
"#,
    )
    .unwrap();

    let clock = ManualClock::new();
    let mut manager = TaskManager::new(Arc::new(clock.clone())).with_queues(config.build_queues());
    let sent = Arc::new(Mutex::new(Vec::new()));
    let sink = sent.clone();
    manager.set_command_inserter(move |cmd| sink.lock().unwrap().push(cmd.to_string()));

    manager.add(Task::new("look").queue("Move"));
    manager.add(Task::new("north").queue("Move").priority(0));
    manager.add(Task::new("cast armor").queue("Spell").priority(90));

    for _ in 0..5 {
        clock.advance(Duration::from_secs(1));
        manager.run_tasks();
    }

    // "look" left as soon as it was added; the rest follow queue priority
    assert_eq!(*sent.lock().unwrap(), vec!["look", "cast armor", "north"]);
}
