//! In-memory broker for exercising the service loops without Kafka.
//!
//! One partition per topic, offsets start at 0. Each consumer group resumes
//! from its last committed offset, so dropping a source without committing
//! replays the uncommitted tail to the next source of the same group.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::broker::{BrokerError, EventSink, EventSource, ReceivedMessage, Release};

#[derive(Default)]
struct State {
    topics: HashMap<String, Vec<ReceivedMessage>>,
    ensured: HashSet<String>,
    // (group, topic) -> next offset to read
    committed: HashMap<(String, String), i64>,
    ensure_errors: VecDeque<BrokerError>,
    send_errors: VecDeque<BrokerError>,
    poll_errors: VecDeque<BrokerError>,
    commit_errors: VecDeque<BrokerError>,
    send_attempts: usize,
    polls: usize,
    releases: usize,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory broker lock poisoned")
    }

    pub fn sink(&self, topic: &str) -> MemorySink {
        MemorySink {
            broker: self.clone(),
            topic: topic.to_owned(),
        }
    }

    pub fn source(&self, topic: &str, group: &str) -> MemorySource {
        let position = self.committed_offset(group, topic).unwrap_or(0);
        MemorySource {
            broker: self.clone(),
            topic: topic.to_owned(),
            group: group.to_owned(),
            position,
        }
    }

    /// Appends a raw body, bypassing the codec. `None` is a message without
    /// a payload.
    pub fn publish_raw(&self, topic: &str, payload: Option<&[u8]>) {
        let mut state = self.state();
        append(&mut state, topic, payload.map(|p| p.to_vec()));
    }

    pub fn messages(&self, topic: &str) -> Vec<ReceivedMessage> {
        self.state().topics.get(topic).cloned().unwrap_or_default()
    }

    pub fn committed_offset(&self, group: &str, topic: &str) -> Option<i64> {
        self.state()
            .committed
            .get(&(group.to_owned(), topic.to_owned()))
            .copied()
    }

    pub fn topic_ensured(&self, topic: &str) -> bool {
        self.state().ensured.contains(topic)
    }

    pub fn inject_ensure_error(&self, error: BrokerError) {
        self.state().ensure_errors.push_back(error);
    }

    /// The next send fails with `error`. Calls queue up.
    pub fn inject_send_error(&self, error: BrokerError) {
        self.state().send_errors.push_back(error);
    }

    pub fn inject_poll_error(&self, error: BrokerError) {
        self.state().poll_errors.push_back(error);
    }

    /// The next commit fails with `error` and leaves the group offset as is.
    pub fn inject_commit_error(&self, error: BrokerError) {
        self.state().commit_errors.push_back(error);
    }

    pub fn send_attempts(&self) -> usize {
        self.state().send_attempts
    }

    pub fn polls(&self) -> usize {
        self.state().polls
    }

    /// Sinks and sources released so far.
    pub fn releases(&self) -> usize {
        self.state().releases
    }
}

fn append(state: &mut State, topic: &str, payload: Option<Vec<u8>>) {
    let log = state.topics.entry(topic.to_owned()).or_default();
    let offset = log.len() as i64;
    log.push(ReceivedMessage {
        topic: topic.to_owned(),
        partition: 0,
        offset,
        timestamp: None,
        payload,
    });
}

pub struct MemorySink {
    broker: MemoryBroker,
    topic: String,
}

#[async_trait]
impl EventSink for MemorySink {
    async fn ensure_topic(&self) -> Result<(), BrokerError> {
        let mut state = self.broker.state();
        if let Some(error) = state.ensure_errors.pop_front() {
            return Err(error);
        }
        state.ensured.insert(self.topic.clone());
        state.topics.entry(self.topic.clone()).or_default();
        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> Result<(), BrokerError> {
        let mut state = self.broker.state();
        state.send_attempts += 1;
        if let Some(error) = state.send_errors.pop_front() {
            return Err(error);
        }
        append(&mut state, &self.topic, Some(payload.to_vec()));
        Ok(())
    }
}

impl Release for MemorySink {
    fn release(self) {
        self.broker.state().releases += 1;
    }
}

pub struct MemorySource {
    broker: MemoryBroker,
    topic: String,
    group: String,
    position: i64,
}

impl MemorySource {
    fn take_batch(&mut self, max_records: usize) -> Vec<ReceivedMessage> {
        let state = self.broker.state();
        let batch: Vec<ReceivedMessage> = state
            .topics
            .get(&self.topic)
            .map(|log| {
                log.iter()
                    .skip(self.position as usize)
                    .take(max_records)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(state);

        self.position += batch.len() as i64;
        batch
    }
}

#[async_trait]
impl EventSource for MemorySource {
    async fn poll(
        &mut self,
        max_wait: Duration,
        max_records: usize,
    ) -> Result<Vec<ReceivedMessage>, BrokerError> {
        {
            let mut state = self.broker.state();
            state.polls += 1;
            if let Some(error) = state.poll_errors.pop_front() {
                return Err(error);
            }
        }

        let batch = self.take_batch(max_records);
        if !batch.is_empty() {
            return Ok(batch);
        }

        tokio::time::sleep(max_wait).await;
        Ok(self.take_batch(max_records))
    }

    async fn commit(&mut self, messages: &[ReceivedMessage]) -> Result<(), BrokerError> {
        let mut state = self.broker.state();
        if let Some(error) = state.commit_errors.pop_front() {
            return Err(error);
        }
        let Some(last) = messages.iter().map(|m| m.offset).max() else {
            return Ok(());
        };

        let next = state
            .committed
            .entry((self.group.clone(), self.topic.clone()))
            .or_insert(0);
        *next = (*next).max(last + 1);
        Ok(())
    }
}

impl Release for MemorySource {
    fn release(self) {
        self.broker.state().releases += 1;
    }
}
