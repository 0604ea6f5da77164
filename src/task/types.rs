use crate::env::defaults;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

/// Unique identifier for tasks. Assigned in creation order and never reused.
pub type TaskId = u64;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// Zero-argument admission predicate supplied by the host
pub type InsertCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Convert a seconds value into a [`Duration`], clamping negative or
/// non-finite input to zero
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// A named scheduling lane: a priority level plus an admission predicate
#[derive(Clone)]
pub struct TaskQueue {
    pub priority: i32,
    insert_check: Option<InsertCheck>,
}

impl TaskQueue {
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            insert_check: None,
        }
    }

    /// Only admit tasks from this queue while `check` returns true
    pub fn with_insert_check<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.insert_check = Some(Arc::new(check));
        self
    }

    /// Whether the queue currently admits insertion
    pub fn insertable(&self) -> bool {
        self.insert_check.as_ref().is_none_or(|check| check())
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(defaults::PRIORITY)
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("priority", &self.priority)
            .field("has_insert_check", &self.insert_check.is_some())
            .finish()
    }
}

/// A single game command waiting to be sent, with its scheduling metadata.
///
/// Tasks compare and hash by id only; ordering follows
/// [`Task::overall_priority`].
pub struct Task {
    id: TaskId,
    pub cmd: String,
    pub queue: String,
    pub priority: i32,
    /// Pacing window applied after this task is sent
    pub duration: Duration,
    /// Minimum wait after being queued before the task becomes eligible
    pub delay: Duration,
    /// Discard the task if still pending this long after being queued; zero disables
    pub timeout: Duration,
    /// Drop on submission when an equal command is already pending
    pub exclusive: bool,
    queued_time: Instant,
    inserted: bool,
    wait_prior: Option<TaskId>,
    insert_check: Option<InsertCheck>,
    resolved_queue: TaskQueue,
}

impl Task {
    /// Create a task with default scheduling fields
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, AtomicOrdering::Relaxed),
            cmd: cmd.into(),
            queue: defaults::QUEUE_NAME.to_string(),
            priority: defaults::PRIORITY,
            duration: defaults::DURATION,
            delay: Duration::ZERO,
            timeout: Duration::ZERO,
            exclusive: false,
            queued_time: Instant::now(),
            inserted: false,
            wait_prior: None,
            insert_check: None,
            resolved_queue: TaskQueue::default(),
        }
    }

    pub fn queue(mut self, name: impl Into<String>) -> Self {
        self.queue = name.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn duration_secs(self, value: f64) -> Self {
        self.duration(secs(value))
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay_secs(self, value: f64) -> Self {
        self.delay(secs(value))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_secs(self, value: f64) -> Self {
        self.timeout(secs(value))
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Attach a task-specific admission predicate, e.g. "only while standing"
    pub fn insert_check<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.insert_check = Some(Arc::new(check));
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn queued_time(&self) -> Instant {
        self.queued_time
    }

    pub fn inserted(&self) -> bool {
        self.inserted
    }

    pub fn set_inserted(&mut self, inserted: bool) {
        self.inserted = inserted;
    }

    /// Task this one waits on, if any
    pub fn wait_prior(&self) -> Option<TaskId> {
        self.wait_prior
    }

    /// Links are only made by `TaskManager::add_chain`, between tasks that
    /// are pending at the time.
    pub(crate) fn set_wait_prior(&mut self, prior: Option<TaskId>) {
        self.wait_prior = prior;
    }

    pub fn set_queue(&mut self, queue: TaskQueue) {
        self.resolved_queue = queue;
    }

    /// Priority of the queue this task was resolved against
    pub fn queue_priority(&self) -> i32 {
        self.resolved_queue.priority
    }

    /// Stamp the task as freshly queued at `now`
    pub(crate) fn mark_queued(&mut self, now: Instant) {
        self.queued_time = now;
        self.inserted = false;
    }

    /// Time left before the delay has elapsed
    pub fn remaining_delay(&self, now: Instant) -> Duration {
        (self.queued_time + self.delay).saturating_duration_since(now)
    }

    pub fn timed_out(&self, now: Instant) -> bool {
        !self.timeout.is_zero() && now.saturating_duration_since(self.queued_time) > self.timeout
    }

    /// Whether the task may be sent right now.
    ///
    /// `is_pending` reports whether a task id is still waiting in the
    /// manager. Removed priors are cleared from `wait_prior`, so a prior that
    /// is no longer pending has been inserted.
    pub fn insertable(&self, now: Instant, is_pending: impl Fn(TaskId) -> bool) -> bool {
        self.remaining_delay(now).is_zero()
            && self.resolved_queue.insertable()
            && self.insert_check.as_ref().is_none_or(|check| check())
            && self.wait_prior.is_none_or(|prior| !is_pending(prior))
    }

    /// Sort key: (queue priority, task priority, sequence), lowest first
    pub fn overall_priority(&self) -> (i32, i32, TaskId) {
        (self.resolved_queue.priority, self.priority, self.id)
    }

    /// Case-insensitive command comparison used for exclusivity
    pub fn same_command(&self, cmd: &str) -> bool {
        self.cmd.to_lowercase() == cmd.to_lowercase()
    }

    /// Case-insensitive queue membership
    pub fn in_queue(&self, name: &str) -> bool {
        self.queue.to_lowercase() == name.to_lowercase()
    }

    /// Serializable view of the task as seen at `now`
    pub fn view(&self, now: Instant) -> TaskView {
        TaskView {
            id: self.id,
            cmd: self.cmd.clone(),
            queue: self.queue.clone(),
            queue_priority: self.queue_priority(),
            priority: self.priority,
            remaining_delay_secs: self.remaining_delay(now).as_secs_f64(),
            timeout_secs: self.timeout.as_secs_f64(),
            exclusive: self.exclusive,
            wait_prior: self.wait_prior,
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("cmd", &self.cmd)
            .field("queue", &self.queue)
            .field("priority", &self.priority)
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .field("timeout", &self.timeout)
            .field("exclusive", &self.exclusive)
            .field("inserted", &self.inserted)
            .field("wait_prior", &self.wait_prior)
            .finish()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        self.overall_priority().cmp(&other.overall_priority())
    }
}

/// Point-in-time description of a pending task, for display panels
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskView {
    pub id: TaskId,
    pub cmd: String,
    pub queue: String,
    pub queue_priority: i32,
    pub priority: i32,
    pub remaining_delay_secs: f64,
    pub timeout_secs: f64,
    pub exclusive: bool,
    pub wait_prior: Option<TaskId>,
}
