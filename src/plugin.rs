//! Explicit registration tables for plugin commands and tickers.
//!
//! A plugin describes what it provides through the [`Plugin`] trait; the
//! session installs those descriptions with
//! [`SessionContext::register_plugin`](crate::session::SessionContext::register_plugin)
//! and removes them again by plugin name.

use crate::error::RegistryError;
use crate::session::Scheduler;
use crate::task::{Task, TaskManager};
use crate::ticker::{Ticker, REPEAT_FOREVER};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Handler invoked for a registered command
pub type CommandHandler =
    Arc<dyn Fn(&mut Scheduler, &[String]) -> Result<(), RegistryError> + Send + Sync>;

/// What a plugin provides to a session
pub trait Plugin {
    fn name(&self) -> &str;

    fn help(&self) -> &str {
        ""
    }

    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    fn tickers(&self) -> Vec<TickerSpec> {
        Vec::new()
    }
}

/// A command a plugin wants registered
#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub help: String,
    /// Leave out of help listings
    pub hide: bool,
    /// Replace a command of the same name registered by someone else
    pub override_existing: bool,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Scheduler, &[String]) -> Result<(), RegistryError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: String::new(),
            hide: false,
            override_existing: false,
            handler: Arc::new(handler),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide = true;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.override_existing = true;
        self
    }
}

/// What a ticker does when it fires
pub enum TickerAction {
    /// Queue each `;`-separated command
    Commands(String),
    Callback(Box<dyn FnMut(&mut TaskManager) + Send>),
}

/// A ticker a plugin wants registered
pub struct TickerSpec {
    pub name: String,
    pub seconds: f64,
    /// Number of fires; negative repeats forever
    pub repeats: i64,
    pub action: TickerAction,
}

impl TickerSpec {
    pub fn commands(name: impl Into<String>, seconds: f64, commands: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seconds,
            repeats: REPEAT_FOREVER,
            action: TickerAction::Commands(commands.into()),
        }
    }

    pub fn callback<F>(name: impl Into<String>, seconds: f64, callback: F) -> Self
    where
        F: FnMut(&mut TaskManager) + Send + 'static,
    {
        Self {
            name: name.into(),
            seconds,
            repeats: REPEAT_FOREVER,
            action: TickerAction::Callback(Box::new(callback)),
        }
    }

    pub fn repeats(mut self, repeats: i64) -> Self {
        self.repeats = repeats;
        self
    }

    /// Build the ticker, scheduled relative to `now`
    pub fn into_ticker(self, owner: &str, now: Instant) -> Result<Ticker<TaskManager>, RegistryError> {
        let interval = Duration::try_from_secs_f64(self.seconds)
            .ok()
            .filter(|interval| !interval.is_zero())
            .ok_or_else(|| RegistryError::InvalidTicker {
                name: self.name.clone(),
                reason: format!("interval must be a positive number of seconds, got {}", self.seconds),
            })?;

        let ticker = match self.action {
            TickerAction::Commands(commands) => {
                let to_send = split_commands(&commands);
                Ticker::new(self.name, interval, self.repeats, now, move |tasks: &mut TaskManager| {
                    for cmd in &to_send {
                        tasks.add(Task::new(cmd.as_str()));
                    }
                })
                .with_commands(commands)
            }
            TickerAction::Callback(callback) => {
                Ticker::new(self.name, interval, self.repeats, now, callback)
            }
        };

        Ok(ticker.with_owner(owner))
    }
}

fn split_commands(commands: &str) -> Vec<String> {
    commands
        .split(';')
        .map(str::trim)
        .filter(|cmd| !cmd.is_empty())
        .map(str::to_string)
        .collect()
}

struct RegisteredCommand {
    owner: String,
    help: String,
    hide: bool,
    handler: CommandHandler,
}

/// Name -> handler table. Names are case-insensitive.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, owner: &str, spec: CommandSpec) -> Result<(), RegistryError> {
        let key = spec.name.to_lowercase();
        if let Some(existing) = self.commands.get(&key) {
            if !spec.override_existing {
                return Err(RegistryError::DuplicateCommand {
                    name: spec.name,
                    owner: existing.owner.clone(),
                });
            }
        }

        self.commands.insert(
            key,
            RegisteredCommand {
                owner: owner.to_string(),
                help: spec.help,
                hide: spec.hide,
                handler: spec.handler,
            },
        );
        Ok(())
    }

    /// Remove every command registered by `owner`
    pub fn unregister_owner(&mut self, owner: &str) -> usize {
        let before = self.commands.len();
        self.commands.retain(|_, command| command.owner != owner);
        before - self.commands.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    pub fn handler(&self, name: &str) -> Result<CommandHandler, RegistryError> {
        self.commands
            .get(&name.to_lowercase())
            .map(|command| command.handler.clone())
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))
    }

    /// Visible commands with their help text, sorted by name
    pub fn help_entries(&self) -> Vec<(&str, &str)> {
        self.commands
            .iter()
            .filter(|(_, command)| !command.hide)
            .map(|(name, command)| (name.as_str(), command.help.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Commands every session has: `ticker` and `flush`
pub struct CorePlugin;

impl CorePlugin {
    pub const NAME: &'static str = "core";
}

impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn help(&self) -> &str {
        "Built-in queue and ticker commands"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("ticker", ticker_command)
                .with_help("ticker <name> <commands> <seconds> [repeats] | ticker <name> --delete"),
            CommandSpec::new("flush", flush_command)
                .with_help("flush [queue]: drop pending commands, from one queue or all"),
        ]
    }
}

fn ticker_command(scheduler: &mut Scheduler, args: &[String]) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidArguments {
        command: "ticker".to_string(),
        reason: reason.to_string(),
    };

    let name = args.first().ok_or_else(|| invalid("missing ticker name"))?;
    if args.get(1).is_some_and(|arg| arg == "--delete") {
        scheduler.tickers.remove(name);
        return Ok(());
    }

    let commands = args
        .get(1)
        .filter(|commands| !commands.trim().is_empty())
        .ok_or_else(|| invalid("must specify commands to send"))?;
    let seconds: f64 = args
        .get(2)
        .ok_or_else(|| invalid("missing interval seconds"))?
        .parse()
        .map_err(|_| invalid("seconds must be a number"))?;
    if seconds <= 0.0 {
        return Err(invalid("seconds must be more than 0"));
    }
    let repeats: i64 = match args.get(3) {
        Some(repeats) => repeats.parse().map_err(|_| invalid("repeats must be an integer"))?,
        None => REPEAT_FOREVER,
    };

    // A redefined ticker stays with the plugin that owns it
    let owner = scheduler
        .tickers
        .get(name)
        .and_then(|ticker| ticker.owner.clone())
        .unwrap_or_else(|| CorePlugin::NAME.to_string());

    // Replaces a same-named ticker only once the new one is valid
    let spec = TickerSpec::commands(name.as_str(), seconds, commands.as_str()).repeats(repeats);
    scheduler.add_ticker(&owner, spec)
}

fn flush_command(scheduler: &mut Scheduler, args: &[String]) -> Result<(), RegistryError> {
    let queue = args.first().map(String::as_str).unwrap_or("");
    scheduler.tasks.flush(queue);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Scheduler, _: &[String]) -> Result<(), RegistryError> {
        Ok(())
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = CommandRegistry::new();
        registry.register("travel", CommandSpec::new("go", noop)).unwrap();

        let err = registry.register("combat", CommandSpec::new("GO", noop)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateCommand {
                name: "GO".to_string(),
                owner: "travel".to_string(),
            }
        );

        registry.register("combat", CommandSpec::new("go", noop).overriding()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unregister_owner("travel"), 0);
        assert_eq!(registry.unregister_owner("combat"), 1);
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::new();
        assert!(matches!(
            registry.handler("nope"),
            Err(RegistryError::UnknownCommand(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_help_skips_hidden() {
        let mut registry = CommandRegistry::new();
        registry.register("p", CommandSpec::new("visible", noop).with_help("shown")).unwrap();
        registry.register("p", CommandSpec::new("secret", noop).hidden()).unwrap();

        assert_eq!(registry.help_entries(), vec![("visible", "shown")]);
        assert!(registry.contains("SECRET"));
    }

    #[test]
    fn test_split_commands() {
        assert_eq!(split_commands("rest; ;stand ;look"), vec!["rest", "stand", "look"]);
        assert!(split_commands(" ; ").is_empty());
    }

    #[test]
    fn test_ticker_spec_rejects_bad_interval() {
        let now = Instant::now();
        for seconds in [0.0, -1.0, f64::NAN] {
            let err = TickerSpec::commands("bad", seconds, "look")
                .into_ticker("p", now)
                .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidTicker { .. }));
        }
    }
}
