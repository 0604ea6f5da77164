//! Periodic callbacks.
//!
//! A [`Ticker`] fires its callback every `interval`, keeping to its original
//! phase: the next fire time is derived from the previous target rather than
//! from when the tick actually ran. A late tick fires once and resumes from
//! the current time instead of bursting to catch up.
//!
//! Tickers are generic over the context handed to their callback, so a
//! session can let periodic plugin code enqueue commands on its
//! [`TaskManager`](crate::task::TaskManager).

use std::time::{Duration, Instant};
use tracing::debug;

/// Callback invoked on every fire
pub type TickerCallback<C> = Box<dyn FnMut(&mut C) + Send>;

/// Repeat count meaning "fire forever"
pub const REPEAT_FOREVER: i64 = -1;

pub struct Ticker<C> {
    pub name: String,
    /// Plugin that registered this ticker, if any
    pub owner: Option<String>,
    /// Command text this ticker sends, for display
    pub commands: Option<String>,
    interval: Duration,
    repeats: i64,
    last_tick: Instant,
    next_tick: Instant,
    callback: TickerCallback<C>,
}

impl<C> Ticker<C> {
    /// Create a ticker whose first fire is one interval after `now`.
    ///
    /// A negative `repeats` fires forever.
    pub fn new<F>(name: impl Into<String>, interval: Duration, repeats: i64, now: Instant, callback: F) -> Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        Self {
            name: name.into(),
            owner: None,
            commands: None,
            interval,
            repeats,
            last_tick: now,
            next_tick: now + interval,
            callback: Box::new(callback),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_commands(mut self, commands: impl Into<String>) -> Self {
        self.commands = Some(commands.into());
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Remaining fires; negative means unlimited
    pub fn repeats(&self) -> i64 {
        self.repeats
    }

    pub fn last_tick(&self) -> Instant {
        self.last_tick
    }

    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    pub fn exhausted(&self) -> bool {
        self.repeats == 0
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_tick <= now && self.repeats != 0
    }

    /// Fire if due. Returns the (possibly updated) next fire time.
    pub fn tick(&mut self, now: Instant, ctx: &mut C) -> Instant {
        if self.is_due(now) {
            self.next_tick = now.max(self.next_tick + self.interval);
            self.last_tick = now;
            (self.callback)(ctx);
            if self.repeats > 0 {
                self.repeats -= 1;
            }
        }

        self.next_tick
    }
}

impl<C> std::fmt::Debug for Ticker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("commands", &self.commands)
            .field("interval", &self.interval)
            .field("repeats", &self.repeats)
            .finish()
    }
}

/// Named collection of tickers
pub struct TickerManager<C> {
    tickers: Vec<Ticker<C>>,
}

impl<C> TickerManager<C> {
    pub fn new() -> Self {
        Self {
            tickers: Vec::new(),
        }
    }

    /// Register a ticker, replacing any existing one with the same name
    pub fn add(&mut self, ticker: Ticker<C>) {
        self.tickers.retain(|existing| existing.name != ticker.name);
        debug!("Registered ticker '{}' every {:?}", ticker.name, ticker.interval);
        self.tickers.push(ticker);
    }

    /// Remove the named ticker. An empty name removes nothing.
    pub fn remove(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let before = self.tickers.len();
        self.tickers.retain(|ticker| ticker.name != name);
        before != self.tickers.len()
    }

    /// Remove every ticker registered by `owner`
    pub fn unregister_owner(&mut self, owner: &str) -> usize {
        let before = self.tickers.len();
        self.tickers
            .retain(|ticker| ticker.owner.as_deref() != Some(owner));
        before - self.tickers.len()
    }

    pub fn get(&self, name: &str) -> Option<&Ticker<C>> {
        self.tickers.iter().find(|ticker| ticker.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticker<C>> + '_ {
        self.tickers.iter()
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Earliest upcoming fire time across all tickers
    pub fn next_tick(&self) -> Option<Instant> {
        self.tickers.iter().map(Ticker::next_tick).min()
    }

    /// Fire every due ticker and drop the ones that ran out of repeats.
    /// Returns how many fired.
    pub fn process_tick(&mut self, now: Instant, ctx: &mut C) -> usize {
        let mut fired = 0;
        for ticker in &mut self.tickers {
            if ticker.is_due(now) {
                ticker.tick(now, ctx);
                fired += 1;
            }
        }

        self.tickers.retain(|ticker| {
            if ticker.exhausted() {
                debug!("Ticker '{}' finished", ticker.name);
                false
            } else {
                true
            }
        });

        fired
    }
}

impl<C> Default for TickerManager<C> {
    fn default() -> Self {
        Self::new()
    }
}
