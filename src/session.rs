//! Per-session wiring of the scheduler and its collaborators.
//!
//! A [`SessionContext`] is built once per game connection and owns
//! everything plugins need: the command queue, the tickers, the command
//! table and the configuration they were built from. Plugins receive it (or
//! its [`Scheduler`]) explicitly; there is no process-wide registry.

use crate::clock::{SharedClock, SystemClock};
use crate::config::SchedulerConfig;
use crate::error::RegistryError;
use crate::plugin::{CommandRegistry, CorePlugin, Plugin, TickerSpec};
use crate::task::TaskManager;
use crate::ticker::TickerManager;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use uuid::Uuid;

/// The parts of a session that commands and tickers act on
pub struct Scheduler {
    clock: SharedClock,
    pub tasks: TaskManager,
    pub tickers: TickerManager<TaskManager>,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig, clock: SharedClock) -> Self {
        let tasks = TaskManager::new(clock.clone())
            .with_queues(config.build_queues())
            .with_history_size(config.history_size);

        Self {
            clock,
            tasks,
            tickers: TickerManager::new(),
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Fire due tickers, then send whatever the pacing window allows.
    /// Returns how many commands were sent.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        self.tickers.process_tick(now, &mut self.tasks);
        self.tasks.run_tasks()
    }

    pub fn add_ticker(&mut self, owner: &str, spec: TickerSpec) -> Result<(), RegistryError> {
        let ticker = spec.into_ticker(owner, self.clock.now())?;
        self.tickers.add(ticker);
        Ok(())
    }
}

pub struct SessionContext {
    id: Uuid,
    name: String,
    config: SchedulerConfig,
    scheduler: Scheduler,
    commands: CommandRegistry,
    plugins: Vec<String>,
}

impl SessionContext {
    /// Build a session with the core commands registered
    pub fn new(name: impl Into<String>, config: SchedulerConfig, clock: SharedClock) -> Self {
        let scheduler = Scheduler::new(&config, clock);
        let mut session = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            config,
            scheduler,
            commands: CommandRegistry::new(),
            plugins: Vec::new(),
        };

        if let Err(e) = session.register_plugin(&CorePlugin) {
            error!("Failed to register core commands: {}", e);
        }

        info!(session = %session.id, "Created session {}", session.name);
        session
    }

    pub fn with_system_clock(name: impl Into<String>, config: SchedulerConfig) -> Self {
        Self::new(name, config, Arc::new(SystemClock))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.scheduler.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskManager {
        &mut self.scheduler.tasks
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Names of registered plugins, in registration order
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Wire the queue to the connection that sends commands
    pub fn set_command_inserter<F>(&mut self, inserter: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.scheduler.tasks.set_command_inserter(inserter);
    }

    /// Install a plugin's commands and tickers.
    ///
    /// Either everything the plugin provides is registered or nothing is.
    pub fn register_plugin(&mut self, plugin: &dyn Plugin) -> Result<(), RegistryError> {
        let name = plugin.name().to_string();
        if self.plugins.contains(&name) {
            return Err(RegistryError::DuplicatePlugin(name));
        }

        let result = plugin
            .commands()
            .into_iter()
            .try_for_each(|spec| self.commands.register(&name, spec))
            .and_then(|()| {
                plugin
                    .tickers()
                    .into_iter()
                    .try_for_each(|spec| self.scheduler.add_ticker(&name, spec))
            });

        if let Err(e) = result {
            self.commands.unregister_owner(&name);
            self.scheduler.tickers.unregister_owner(&name);
            return Err(e);
        }

        debug!("Registered plugin {}", name);
        self.plugins.push(name);
        Ok(())
    }

    /// Remove a plugin's commands and tickers. Returns false if it was not registered.
    pub fn unregister_plugin(&mut self, name: &str) -> bool {
        let Some(index) = self.plugins.iter().position(|plugin| plugin == name) else {
            return false;
        };

        self.plugins.remove(index);
        let commands = self.commands.unregister_owner(name);
        let tickers = self.scheduler.tickers.unregister_owner(name);
        debug!(
            "Unregistered plugin {} ({} commands, {} tickers)",
            name, commands, tickers
        );
        true
    }

    /// Run a registered command
    pub fn execute(&mut self, name: &str, args: &[String]) -> Result<(), RegistryError> {
        let handler = self.commands.handler(name)?;
        handler(&mut self.scheduler, args)
    }

    pub fn tick(&mut self) -> usize {
        self.scheduler.tick()
    }

    /// Drive the session on the configured cadence until `shutdown` resolves
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(session = %self.id, "Session loop started ({:?} cadence)", self.config.tick_interval());
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
        info!(session = %self.id, "Session loop stopped, {} commands pending", self.tasks().len());
    }
}
