use crate::clock::SharedClock;
use crate::task::history::{DispatchRecord, TimestampedBuffer};
use crate::task::types::*;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Callback that actually sends a command to the game
pub type CommandInserter = Box<dyn FnMut(&str) + Send>;

/// Priority-ordered, time-paced command dispatcher.
///
/// Pending tasks are kept sorted by [`Task::overall_priority`]. Each call to
/// [`TaskManager::run_tasks`] sends as many insertable tasks as the pacing
/// window allows: after a task is sent, nothing else leaves until that
/// task's `duration` has passed.
pub struct TaskManager {
    tasks: Vec<Task>,
    queues: HashMap<String, TaskQueue>,
    next_command_time: Option<Instant>,
    command_inserter: Option<CommandInserter>,
    clock: SharedClock,
    history: TimestampedBuffer<DispatchRecord>,
    event_handlers: Vec<Box<dyn TaskEventHandler + Send + Sync>>,
}

/// Events that can occur while tasks move through the manager
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Queued {
        task_id: TaskId,
        cmd: String,
        queue: String,
    },
    /// Exclusive task dropped because an equal command was already pending
    Dropped {
        task_id: TaskId,
        cmd: String,
    },
    Dispatched(DispatchRecord),
    TimedOut {
        task_id: TaskId,
        cmd: String,
        timeout: Duration,
    },
    /// Tasks removed by flush or remove; `queue` is `None` for a full flush
    Removed {
        task_ids: Vec<TaskId>,
        queue: Option<String>,
    },
}

/// Handler for task events
pub trait TaskEventHandler {
    fn handle_event(&self, event: &TaskEvent) -> Result<()>;
}

/// What a queue panel needs to render the current state
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueueSnapshot {
    pub tasks: Vec<TaskView>,
    pub next_command_delay_secs: f64,
}

impl TaskManager {
    /// Create a manager with no queues defined; every task uses the default queue
    pub fn new(clock: SharedClock) -> Self {
        Self {
            tasks: Vec::new(),
            queues: HashMap::new(),
            next_command_time: None,
            command_inserter: None,
            clock,
            history: TimestampedBuffer::default(),
            event_handlers: Vec::new(),
        }
    }

    pub fn with_queues(mut self, queues: HashMap<String, TaskQueue>) -> Self {
        self.queues = queues;
        self
    }

    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history = TimestampedBuffer::new(size);
        self
    }

    pub fn set_command_inserter<F>(&mut self, inserter: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.command_inserter = Some(Box::new(inserter));
    }

    pub fn has_command_inserter(&self) -> bool {
        self.command_inserter.is_some()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Time until the next command may be sent
    pub fn next_command_delay(&self) -> Duration {
        let now = self.clock.now();
        self.next_command_time
            .map(|next| next.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Replace the queue definitions and re-sort, since priorities may have changed
    pub fn set_queues(&mut self, queues: HashMap<String, TaskQueue>) {
        self.queues = queues;

        for i in 0..self.tasks.len() {
            let queue = self.resolve_queue(&self.tasks[i].queue);
            self.tasks[i].set_queue(queue);
        }

        self.tasks.sort();
        debug!("Queues redefined, {} pending tasks re-sorted", self.tasks.len());
    }

    pub fn queues(&self) -> &HashMap<String, TaskQueue> {
        &self.queues
    }

    /// Pending tasks in dispatch order
    pub fn pending(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_pending(&self, task_id: TaskId) -> bool {
        self.tasks.iter().any(|task| task.id() == task_id)
    }

    /// Commands sent so far, oldest first
    pub fn history(&self) -> &TimestampedBuffer<DispatchRecord> {
        &self.history
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let now = self.clock.now();
        QueueSnapshot {
            tasks: self.tasks.iter().map(|task| task.view(now)).collect(),
            next_command_delay_secs: self.next_command_delay().as_secs_f64(),
        }
    }

    /// Submit a task and try to dispatch immediately.
    ///
    /// An exclusive task whose command already waits in the queue
    /// (case-insensitive) is silently discarded.
    pub fn add(&mut self, mut task: Task) {
        task.set_queue(self.resolve_queue(&task.queue));

        if task.exclusive && self.tasks.iter().any(|pending| pending.same_command(&task.cmd)) {
            debug!("Dropped exclusive duplicate: {}", task.cmd);
            self.emit_event(TaskEvent::Dropped {
                task_id: task.id(),
                cmd: task.cmd,
            });
            return;
        }

        task.mark_queued(self.clock.now());
        self.emit_event(TaskEvent::Queued {
            task_id: task.id(),
            cmd: task.cmd.clone(),
            queue: task.queue.clone(),
        });
        self.insert_sorted(task);
        self.run_tasks();
    }

    /// Shorthand for building and adding a task in one call
    pub fn add_command(
        &mut self,
        cmd: &str,
        queue: &str,
        priority: i32,
        duration: Duration,
        delay: Duration,
        timeout: Duration,
    ) {
        self.add(
            Task::new(cmd)
                .queue(queue)
                .priority(priority)
                .duration(duration)
                .delay(delay)
                .timeout(timeout),
        );
    }

    /// Submit tasks that must go out in order: each waits until the one
    /// before it has been sent, whatever their priorities.
    pub fn add_chain(&mut self, tasks: impl IntoIterator<Item = Task>) {
        let now = self.clock.now();
        let mut prior = None;

        for mut task in tasks {
            task.set_wait_prior(prior);
            task.set_queue(self.resolve_queue(&task.queue));
            task.mark_queued(now);
            prior = Some(task.id());

            self.emit_event(TaskEvent::Queued {
                task_id: task.id(),
                cmd: task.cmd.clone(),
                queue: task.queue.clone(),
            });
            self.insert_sorted(task);
        }

        self.run_tasks();
    }

    /// Send every task the pacing window allows. Returns how many were sent.
    pub fn run_tasks(&mut self) -> usize {
        if self.command_inserter.is_none() {
            error!("No command inserter configured, skipping dispatch");
            return 0;
        }

        self.remove_timeouts();

        let mut sent = 0;
        loop {
            let now = self.clock.now();
            if self.next_command_time.is_some_and(|next| now < next) {
                break;
            }

            let Some(mut task) = self.take_next_insertable(now) else {
                break;
            };

            if let Some(inserter) = self.command_inserter.as_mut() {
                inserter(&task.cmd);
            }
            task.set_inserted(true);
            self.next_command_time = Some(now + task.duration);
            sent += 1;

            debug!("Sent {} from queue {}", task.cmd, task.queue);
            let record = DispatchRecord {
                task_id: task.id(),
                cmd: task.cmd.clone(),
                queue: task.queue.clone(),
                waited_secs: now.saturating_duration_since(task.queued_time()).as_secs_f64(),
            };
            self.history.append(record.clone());
            self.emit_event(TaskEvent::Dispatched(record));
        }

        sent
    }

    /// Drop pending tasks. An empty name clears everything, otherwise only
    /// tasks whose queue matches case-insensitively are removed.
    pub fn flush(&mut self, queue: &str) -> usize {
        if queue.is_empty() {
            let task_ids: Vec<TaskId> = self.tasks.drain(..).map(|task| task.id()).collect();
            let count = task_ids.len();
            if count > 0 {
                info!("Flushed all {} pending tasks", count);
                self.emit_event(TaskEvent::Removed {
                    task_ids,
                    queue: None,
                });
            }
            return count;
        }

        self.remove(queue)
    }

    /// Remove every pending task in the named queue (case-insensitive)
    pub fn remove(&mut self, queue: &str) -> usize {
        let removed = self.remove_tasks(|task| task.in_queue(queue));
        let count = removed.len();
        if count > 0 {
            info!("Removed {} pending tasks from queue {}", count, queue);
            self.emit_event(TaskEvent::Removed {
                task_ids: removed.iter().map(Task::id).collect(),
                queue: Some(queue.to_string()),
            });
        }
        count
    }

    /// Add event handler
    pub fn add_event_handler(&mut self, handler: Box<dyn TaskEventHandler + Send + Sync>) {
        self.event_handlers.push(handler);
    }

    fn resolve_queue(&self, name: &str) -> TaskQueue {
        self.queues.get(name).cloned().unwrap_or_default()
    }

    fn insert_sorted(&mut self, task: Task) {
        let index = self.tasks.partition_point(|pending| *pending < task);
        self.tasks.insert(index, task);
    }

    fn take_next_insertable(&mut self, now: Instant) -> Option<Task> {
        let tasks = &self.tasks;
        let index = tasks.iter().position(|task| {
            task.insertable(now, |prior| tasks.iter().any(|other| other.id() == prior))
        })?;
        Some(self.tasks.remove(index))
    }

    /// Remove matching tasks and clear wait-prior links that pointed at them
    fn remove_tasks(&mut self, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
        let (removed, kept): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|task| predicate(task));
        self.tasks = kept;

        if !removed.is_empty() {
            let removed_ids: HashSet<TaskId> = removed.iter().map(Task::id).collect();
            for task in &mut self.tasks {
                if task.wait_prior().is_some_and(|prior| removed_ids.contains(&prior)) {
                    task.set_wait_prior(None);
                }
            }
        }

        removed
    }

    fn remove_timeouts(&mut self) {
        let now = self.clock.now();
        for task in self.remove_tasks(|task| task.timed_out(now)) {
            info!("Task timed out: {}@{:?}", task.cmd, task.timeout);
            self.emit_event(TaskEvent::TimedOut {
                task_id: task.id(),
                cmd: task.cmd,
                timeout: task.timeout,
            });
        }
    }

    fn emit_event(&self, event: TaskEvent) {
        for handler in &self.event_handlers {
            if let Err(e) = handler.handle_event(&event) {
                error!("Event handler error: {}", e);
            }
        }
    }
}

/// Simple event handler that logs events
pub struct LoggingEventHandler;

impl TaskEventHandler for LoggingEventHandler {
    fn handle_event(&self, event: &TaskEvent) -> Result<()> {
        match event {
            TaskEvent::Queued {
                task_id,
                cmd,
                queue,
            } => {
                debug!("Task queued: {} '{}' in {}", task_id, cmd, queue);
            }
            TaskEvent::Dropped { task_id, cmd } => {
                debug!("Task dropped as duplicate: {} '{}'", task_id, cmd);
            }
            TaskEvent::Dispatched(record) => {
                info!(
                    "Task sent: {} '{}' after {:.2}s",
                    record.task_id, record.cmd, record.waited_secs
                );
            }
            TaskEvent::TimedOut {
                task_id,
                cmd,
                timeout,
            } => {
                warn!("Task timed out: {} '{}' ({:?})", task_id, cmd, timeout);
            }
            TaskEvent::Removed { task_ids, queue } => {
                info!(
                    "Tasks removed from {}: {:?}",
                    queue.as_deref().unwrap_or("all queues"),
                    task_ids
                );
            }
        }
        Ok(())
    }
}
