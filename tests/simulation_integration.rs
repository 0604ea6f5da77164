use mudcq::SchedulerConfig;
use mudcq::cli::SimulationScript;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const RAID_SCRIPT: &str = r#"
[[submit]]
at = 0.0
cmd = "kill rat"
queue = "Combat"
dur = 2.0

[[submit]]
at = 0.5
cmd = "rest"

[[submit]]
at = 0.5
cmd = "cast heal"
queue = "Priority"
dur = 1.0

[[chain]]
at = 0.5
steps = [{ cmd = "open door", queue = "Move" }, { cmd = "north", queue = "Move" }]
"#;

fn cmds(script: &SimulationScript) -> Vec<String> {
    let report = script.run(
        &SchedulerConfig::default(),
        Duration::from_millis(10),
        Duration::from_secs(60),
    );
    report.timeline.into_iter().map(|entry| entry.cmd).collect()
}

#[test]
fn test_script_timeline_order() {
    let script = SimulationScript::from_toml_str(RAID_SCRIPT).expect("script should parse");
    assert_eq!(script.submit.len(), 3);
    assert_eq!(script.chain.len(), 1);

    assert_eq!(
        cmds(&script),
        vec!["kill rat", "cast heal", "open door", "north", "rest"]
    );
}

#[test]
fn test_script_timing_follows_durations() {
    let script = SimulationScript::from_toml_str(RAID_SCRIPT).unwrap();
    let report = script.run(
        &SchedulerConfig::default(),
        Duration::from_millis(10),
        Duration::from_secs(60),
    );

    let at = |cmd: &str| {
        report
            .timeline
            .iter()
            .find(|entry| entry.cmd == cmd)
            .map(|entry| entry.at_secs)
            .unwrap()
    };
    assert_eq!(at("kill rat"), 0.0);
    assert!((at("cast heal") - 2.0).abs() < 0.02);
    assert!((at("open door") - 3.0).abs() < 0.02);
    assert!(report.unsent.is_empty());
    assert!(report.render().contains("5 sent"));
}

#[test]
fn test_flush_and_timeout_in_script() {
    let script = SimulationScript::from_toml_str(
        r#"
[[submit]]
at = 0.0
cmd = "kill rat"
dur = 3.0

[[submit]]
at = 0.1
cmd = "flee"
queue = "Priority"
timeout = 1.0

[[submit]]
at = 0.1
cmd = "north"
queue = "Move"

[[flush]]
at = 1.0
queue = "move"
"#,
    )
    .unwrap();

    let report = script.run(
        &SchedulerConfig::default(),
        Duration::from_millis(50),
        Duration::from_secs(10),
    );
    let sent: Vec<&str> = report.timeline.iter().map(|entry| entry.cmd.as_str()).collect();
    assert_eq!(sent, vec!["kill rat"]);
    assert_eq!(report.timed_out, vec!["flee"]);
}

#[test]
fn test_simulation_stops_at_limit() {
    let script = SimulationScript::from_toml_str(
        r#"
[[submit]]
at = 0.0
cmd = "meditate"
dur = 100.0

[[submit]]
at = 0.0
cmd = "stand"
"#,
    )
    .unwrap();

    let report = script.run(
        &SchedulerConfig::default(),
        Duration::from_millis(500),
        Duration::from_secs(5),
    );
    assert_eq!(report.timeline.len(), 1);
    assert_eq!(report.unsent.len(), 1);
    assert_eq!(report.unsent[0].cmd, "stand");
    assert!(report.elapsed_secs >= 5.0);
}

#[test]
fn test_script_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(RAID_SCRIPT.as_bytes()).unwrap();

    let script = SimulationScript::from_toml_file(file.path()).expect("script file should load");
    assert_eq!(script.submit[1].task.queue, "any");
    assert_eq!(script.submit[1].task.priority, 50);

    let json = serde_json::to_string(&script.run(
        &SchedulerConfig::default(),
        Duration::from_millis(20),
        Duration::from_secs(30),
    ))
    .unwrap();
    assert!(json.contains("\"timeline\""));
}
