//! Assembles an [`AutoSorter`] from its stores.

use super::sorter::AutoSorter;
use crate::core::config::{ConfigStore, MemoryConfigStore};
use crate::core::history::{HistoryLedger, HistoryStore, MemoryHistoryStore};
use crate::core::mover::{ConflictResolver, MoveExecutor, DEFAULT_ASK_TIMEOUT};
use crate::core::scheduler::PendingScheduler;
use crate::error::AutoSortError;
use crate::events::{null_sender, EventSender};
use std::sync::Arc;
use std::time::Duration;

/// Builder for an [`AutoSorter`]
///
/// Anything not set falls back to an in-memory store.
pub struct AutoSorterBuilder {
    config_store: Option<Box<dyn ConfigStore>>,
    history_store: Option<Box<dyn HistoryStore>>,
    events: Option<EventSender>,
    resolver: Option<Arc<dyn ConflictResolver>>,
    ask_timeout: Duration,
}

impl AutoSorterBuilder {
    pub fn new() -> Self {
        Self {
            config_store: None,
            history_store: None,
            events: None,
            resolver: None,
            ask_timeout: DEFAULT_ASK_TIMEOUT,
        }
    }

    /// Set where the config document is kept
    pub fn config_store(mut self, store: Box<dyn ConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    /// Set where move history is kept
    pub fn history_store(mut self, store: Box<dyn HistoryStore>) -> Self {
        self.history_store = Some(store);
        self
    }

    /// Publish events on this sender
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Answer `Ask` conflicts through `resolver`
    pub fn resolver(mut self, resolver: Arc<dyn ConflictResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// How long an `Ask` conflict waits for an answer
    pub fn ask_timeout(mut self, timeout: Duration) -> Self {
        self.ask_timeout = timeout;
        self
    }

    /// Load config and history and wire up the engine
    pub fn build(self) -> Result<AutoSorter, AutoSortError> {
        let store = self
            .config_store
            .unwrap_or_else(|| Box::new(MemoryConfigStore::new()));
        let mut config = store.load_or_default();
        if let Err(e) = config.validate() {
            tracing::warn!("Stored config is invalid, using defaults: {}", e);
            config = crate::core::config::Config::default();
        }

        let history_store = self
            .history_store
            .unwrap_or_else(|| Box::new(MemoryHistoryStore::new()));
        let ledger = Arc::new(HistoryLedger::open(history_store, config.history_limit)?);

        let events = self.events.unwrap_or_else(null_sender);
        let mut executor =
            MoveExecutor::new(config.destination_root.clone()).with_events(events.clone());
        if let Some(resolver) = self.resolver {
            executor = executor.with_resolver(resolver, self.ask_timeout);
        }
        let executor = Arc::new(executor);

        let scheduler = PendingScheduler::new(executor.clone(), ledger.clone(), events.clone());
        scheduler.set_rules(&config.rules);
        scheduler.set_grace_period(config.grace_period());
        scheduler.set_conflict_policy(config.conflict_resolution);

        Ok(AutoSorter::assemble(
            store, config, executor, ledger, scheduler, events,
        ))
    }
}

impl Default for AutoSorterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
