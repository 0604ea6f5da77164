//! Offline replay of timed command submissions.
//!
//! A simulation script lists when commands are submitted; the simulator
//! replays them against a [`ManualClock`] and reports when each one would
//! have been sent.
//!
//! ```toml
//! [[submit]]
//! at = 0.0
//! cmd = "kill rat"
//! queue = "Combat"
//! dur = 2.0
//!
//! [[chain]]
//! at = 0.5
//! steps = [{ cmd = "open door", queue = "Move" }, { cmd = "north", queue = "Move" }]
//!
//! [[flush]]
//! at = 5.0
//! queue = "Move"
//! ```

use crate::clock::{Clock, ManualClock};
use crate::env::defaults;
use crate::error::ConfigError;
use crate::session::SessionContext;
use crate::task::{LoggingEventHandler, Task, TaskEvent, TaskEventHandler, TaskView};
use crate::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationScript {
    #[serde(default)]
    pub submit: Vec<SubmitStep>,
    #[serde(default)]
    pub chain: Vec<ChainStep>,
    #[serde(default)]
    pub flush: Vec<FlushStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStep {
    pub cmd: String,
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_duration")]
    pub dur: f64,
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub timeout: f64,
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitStep {
    pub at: f64,
    #[serde(flatten)]
    pub task: TaskStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStep {
    pub at: f64,
    pub steps: Vec<TaskStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushStep {
    pub at: f64,
    /// Empty flushes every queue
    #[serde(default)]
    pub queue: String,
}

fn default_queue() -> String {
    defaults::QUEUE_NAME.to_string()
}

fn default_priority() -> i32 {
    defaults::PRIORITY
}

fn default_duration() -> f64 {
    defaults::DURATION.as_secs_f64()
}

impl TaskStep {
    pub fn to_task(&self) -> Task {
        Task::new(self.cmd.as_str())
            .queue(self.queue.as_str())
            .priority(self.priority)
            .duration_secs(self.dur)
            .delay_secs(self.delay)
            .timeout_secs(self.timeout)
            .exclusive(self.exclusive)
    }
}

/// A command as it left the simulated queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at_secs: f64,
    pub cmd: String,
    pub queue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub timeline: Vec<TimelineEntry>,
    /// Commands still pending when the simulation stopped
    pub unsent: Vec<TaskView>,
    pub timed_out: Vec<String>,
    pub elapsed_secs: f64,
}

enum Action {
    Submit(TaskStep),
    Chain(Vec<TaskStep>),
    Flush(String),
}

/// Records dispatches and timeouts against simulated time
struct TimelineRecorder {
    clock: ManualClock,
    start: Instant,
    timeline: Arc<Mutex<Vec<TimelineEntry>>>,
    timed_out: Arc<Mutex<Vec<String>>>,
}

impl TaskEventHandler for TimelineRecorder {
    fn handle_event(&self, event: &TaskEvent) -> anyhow::Result<()> {
        match event {
            TaskEvent::Dispatched(record) => {
                let entry = TimelineEntry {
                    at_secs: (self.clock.now() - self.start).as_secs_f64(),
                    cmd: record.cmd.clone(),
                    queue: record.queue.clone(),
                };
                self.timeline
                    .lock()
                    .map_err(|_| anyhow::anyhow!("timeline lock poisoned"))?
                    .push(entry);
            }
            TaskEvent::TimedOut { cmd, .. } => {
                self.timed_out
                    .lock()
                    .map_err(|_| anyhow::anyhow!("timeout list lock poisoned"))?
                    .push(cmd.clone());
            }
            _ => {}
        }
        Ok(())
    }
}

impl SimulationScript {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn actions(&self) -> Vec<(f64, Action)> {
        let mut actions: Vec<(f64, Action)> = self
            .submit
            .iter()
            .map(|step| (step.at, Action::Submit(step.task.clone())))
            .chain(
                self.chain
                    .iter()
                    .map(|chain| (chain.at, Action::Chain(chain.steps.clone()))),
            )
            .chain(
                self.flush
                    .iter()
                    .map(|flush| (flush.at, Action::Flush(flush.queue.clone()))),
            )
            .collect();
        actions.sort_by(|a, b| a.0.total_cmp(&b.0));
        actions
    }

    /// Replay the script, advancing simulated time by `step` until every
    /// submission is made and the queue drains, or `max` has elapsed.
    pub fn run(&self, config: &SchedulerConfig, step: Duration, max: Duration) -> SimulationReport {
        let step = step.max(Duration::from_millis(1));
        let clock = ManualClock::new();
        let start = clock.now();
        let timeline = Arc::new(Mutex::new(Vec::new()));
        let timed_out = Arc::new(Mutex::new(Vec::new()));

        let mut session = SessionContext::new("simulation", config.clone(), Arc::new(clock.clone()));
        session.set_command_inserter(|_| {});
        session.tasks_mut().add_event_handler(Box::new(LoggingEventHandler));
        session.tasks_mut().add_event_handler(Box::new(TimelineRecorder {
            clock: clock.clone(),
            start,
            timeline: timeline.clone(),
            timed_out: timed_out.clone(),
        }));

        let mut actions = self.actions().into_iter().peekable();
        let mut elapsed = Duration::ZERO;
        loop {
            let now_secs = elapsed.as_secs_f64();
            while let Some((_, action)) = actions.next_if(|(at, _)| *at <= now_secs) {
                match action {
                    Action::Submit(task) => session.tasks_mut().add(task.to_task()),
                    Action::Chain(steps) => session
                        .tasks_mut()
                        .add_chain(steps.iter().map(TaskStep::to_task)),
                    Action::Flush(queue) => {
                        session.tasks_mut().flush(&queue);
                    }
                }
            }

            session.tick();

            if actions.peek().is_none() && session.tasks().is_empty() {
                break;
            }
            if elapsed >= max {
                debug!("Simulation stopped at limit with {} pending", session.tasks().len());
                break;
            }

            clock.advance(step);
            elapsed += step;
        }

        let unsent = session.tasks().snapshot().tasks;
        let timeline = timeline.lock().map(|entries| entries.clone()).unwrap_or_default();
        let timed_out = timed_out.lock().map(|entries| entries.clone()).unwrap_or_default();

        SimulationReport {
            timeline,
            unsent,
            timed_out,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

impl SimulationReport {
    /// Human-readable timeline
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.timeline {
            out.push_str(&format!("{:>8.2}s  {:<10} {}\n", entry.at_secs, entry.queue, entry.cmd));
        }
        for cmd in &self.timed_out {
            out.push_str(&format!("timed out: {}\n", cmd));
        }
        for task in &self.unsent {
            out.push_str(&format!("unsent:    {} ({})\n", task.cmd, task.queue));
        }
        out.push_str(&format!(
            "{} sent in {:.2}s\n",
            self.timeline.len(),
            self.elapsed_secs
        ));
        out
    }
}
