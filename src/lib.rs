//! # mudcq
//!
//! Command pacing for MUD client automation. Scripts (auto-travel, combat
//! helpers, healing) submit game commands as [`Task`]s; the [`TaskManager`]
//! sends them one pacing window at a time, most urgent first.
//!
//! ## Architecture Overview
//!
//! - **[`task`]**: tasks, queues and the priority/pacing engine
//! - **[`ticker`]**: phase-preserving periodic callbacks
//! - **[`plugin`]**: explicit command and ticker registration tables
//! - **[`session`]**: per-session context that owns the scheduler and drives it
//! - **[`config`]**: TOML queue and loop configuration
//!
//! ## Scheduling Rules
//!
//! - Pending tasks are ordered by `(queue priority, task priority, sequence)`,
//!   lowest first; equal priorities go out in submission order.
//! - After a task is sent nothing else leaves until its `duration` has
//!   passed. The window length comes from the task just sent.
//! - A task waits for its `delay`, its queue's admission check, its own
//!   check, and (in a chain) for the task before it to be sent.
//! - Tasks still pending after their `timeout` are discarded unsent.
//!
//! ## Quick Start
//!
//! ```rust
//! use mudcq::{ManualClock, Task, TaskManager, TaskQueue};
//! use std::collections::HashMap;
//! use std::sync::{Arc, Mutex};
//!
//! let clock = ManualClock::new();
//! let mut manager = TaskManager::new(Arc::new(clock.clone())).with_queues(HashMap::from([
//!     ("Priority".to_string(), TaskQueue::new(10)),
//!     ("any".to_string(), TaskQueue::new(50)),
//! ]));
//!
//! let sent = Arc::new(Mutex::new(Vec::new()));
//! let sink = sent.clone();
//! manager.set_command_inserter(move |cmd| sink.lock().unwrap().push(cmd.to_string()));
//!
//! manager.add(Task::new("kill rat").duration_secs(2.0));
//! manager.add(Task::new("rest"));
//! manager.add(Task::new("cast heal").queue("Priority"));
//!
//! clock.advance_secs(2.0);
//! manager.run_tasks();
//! assert_eq!(*sent.lock().unwrap(), vec!["kill rat", "cast heal"]);
//! ```

pub mod clock;
pub mod config;
pub mod env;
pub mod error;

/// Tasks, queues and the priority-ordered, time-paced dispatcher.
pub mod task;

/// Periodic callbacks used to drive the queue and plugin behaviour.
pub mod ticker;

pub mod plugin;
pub mod session;

// CLI module for command-line interface
pub mod cli;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{QueueConfig, SchedulerConfig};
pub use error::{ConfigError, RegistryError};
pub use plugin::{CommandRegistry, CommandSpec, CorePlugin, Plugin, TickerAction, TickerSpec};
pub use session::{Scheduler, SessionContext};
pub use task::{
    DispatchRecord, FifoBuffer, QueueSnapshot, Task, TaskEvent, TaskEventHandler, TaskId,
    TaskManager, TaskQueue, TaskView, TimestampedBuffer,
};
pub use ticker::{Ticker, TickerManager};
