//! In-memory adapters for tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    core::{
        output::{Channel, OutputRecord},
        sink::OutputSink,
        source::{ReadingSource, Subscription},
        state::EngineState,
        store::StateStore,
    },
    prelude::*,
    quantity::cost::Cost,
};

#[derive(Default)]
pub struct MemorySource {
    states: Mutex<HashMap<String, String>>,
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<String>>>>,
    is_failing: bool,
}

impl MemorySource {
    pub fn with(self, entity_id: &str, raw: &str) -> Self {
        self.set(entity_id, raw);
        self
    }

    pub const fn failing(mut self) -> Self {
        self.is_failing = true;
        self
    }

    pub fn set(&self, entity_id: &str, raw: &str) {
        self.states.lock().unwrap().insert(entity_id.to_owned(), raw.to_owned());
    }

    pub fn remove(&self, entity_id: &str) {
        self.states.lock().unwrap().remove(entity_id);
    }

    /// Deliver the raw state to all subscribers of the entity.
    pub async fn emit(&self, entity_id: &str, raw: &str) {
        let senders = self.subscribers.lock().unwrap().get(entity_id).cloned().unwrap_or_default();
        for sender in senders {
            let _ = sender.send(raw.to_owned()).await;
        }
    }

    pub fn n_subscribers(&self, entity_id: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .get(entity_id)
            .map_or(0, |senders| senders.iter().filter(|sender| !sender.is_closed()).count())
    }
}

#[async_trait]
impl ReadingSource for MemorySource {
    async fn get_current(&self, entity_id: &str) -> Result<Option<String>> {
        ensure!(!self.is_failing, "the source is down");
        Ok(self.states.lock().unwrap().get(entity_id).cloned())
    }

    fn subscribe(&self, entity_id: &str) -> Subscription {
        let (sender, receiver) = mpsc::channel(16);
        self.subscribers.lock().unwrap().entry(entity_id.to_owned()).or_default().push(sender);
        Subscription::new(receiver, None)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<EngineState>>,
    history: Mutex<Vec<EngineState>>,
    remaining_save_failures: AtomicUsize,
    n_save_attempts: AtomicUsize,
    save_delay: Option<Duration>,
    is_failing_loads: bool,
    is_deleted: Mutex<bool>,
}

impl MemoryStore {
    pub fn with_state(state: EngineState) -> Self {
        Self { state: Mutex::new(Some(state)), ..Default::default() }
    }

    pub const fn failing_loads(mut self) -> Self {
        self.is_failing_loads = true;
        self
    }

    pub fn failing_saves(self) -> Self {
        self.failing_first_saves(usize::MAX)
    }

    pub fn failing_first_saves(self, n_failures: usize) -> Self {
        self.remaining_save_failures.store(n_failures, Ordering::SeqCst);
        self
    }

    pub const fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// Replace the stored state behind the engine's back.
    pub fn put(&self, state: EngineState) {
        *self.state.lock().unwrap() = Some(state);
    }

    pub fn saved(&self) -> Option<EngineState> {
        self.state.lock().unwrap().clone()
    }

    /// Successfully written states in the write order.
    pub fn history(&self) -> Vec<EngineState> {
        self.history.lock().unwrap().clone()
    }

    pub fn n_save_attempts(&self) -> usize {
        self.n_save_attempts.load(Ordering::SeqCst)
    }

    pub fn is_deleted(&self) -> bool {
        *self.is_deleted.lock().unwrap()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<EngineState>> {
        ensure!(!self.is_failing_loads, "the store is corrupted");
        Ok(self.saved())
    }

    async fn save(&self, state: &EngineState) -> Result {
        self.n_save_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        let should_fail = self
            .remaining_save_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        ensure!(!should_fail, "the disk is full");
        self.put(state.clone());
        self.history.lock().unwrap().push(state.clone());
        Ok(())
    }

    async fn delete(&self) -> Result {
        *self.state.lock().unwrap() = None;
        *self.is_deleted.lock().unwrap() = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(Channel, OutputRecord)>>,
    last_displayed: HashMap<Channel, Cost>,
}

impl RecordingSink {
    pub fn with_last_displayed(mut self, channel: Channel, value: Cost) -> Self {
        self.last_displayed.insert(channel, value);
        self
    }

    pub fn published(&self) -> Vec<(Channel, OutputRecord)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn publish(&self, channel: Channel, record: &OutputRecord) -> Result {
        self.published.lock().unwrap().push((channel, record.clone()));
        Ok(())
    }

    async fn restore_last_displayed(&self, channel: Channel) -> Result<Option<Cost>> {
        Ok(self.last_displayed.get(&channel).copied())
    }
}
