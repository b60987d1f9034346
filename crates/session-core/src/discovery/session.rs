//! Per-application discovery bookkeeping

use std::collections::BTreeSet;
use std::time::Instant;

use super::platform::DiscoveryHandle;
use crate::sink::{ApplicationId, RequesterId, Sink, SinkId, SinkSelector};

/// Requesters interested in one application's sinks, plus the last sinks seen
///
/// Owned by the aggregator. Exists while at least one requester observes.
#[derive(Debug, Clone)]
pub struct DiscoverySession {
    application_id: ApplicationId,
    selector: SinkSelector,
    requester_ids: BTreeSet<RequesterId>,
    last_known_sinks: Vec<Sink>,
    handle: Option<DiscoveryHandle>,
    created_at: Instant,
}

impl DiscoverySession {
    /// Create a session seeded with the platform's currently known sinks
    pub fn new(application_id: ApplicationId, selector: SinkSelector, known_sinks: Vec<Sink>) -> Self {
        Self {
            application_id,
            selector,
            requester_ids: BTreeSet::new(),
            last_known_sinks: known_sinks,
            handle: None,
            created_at: Instant::now(),
        }
    }

    /// Add a requester; returns false if it was already present
    pub fn add_requester(&mut self, requester_id: RequesterId) -> bool {
        self.requester_ids.insert(requester_id)
    }

    /// Remove a requester; returns false if it was not present
    pub fn remove_requester(&mut self, requester_id: &RequesterId) -> bool {
        self.requester_ids.remove(requester_id)
    }

    /// No requester is left
    pub fn is_empty(&self) -> bool {
        self.requester_ids.is_empty()
    }

    pub fn requester_ids(&self) -> impl Iterator<Item = &RequesterId> {
        self.requester_ids.iter()
    }

    pub fn last_known_sinks(&self) -> &[Sink] {
        &self.last_known_sinks
    }

    /// Replace the whole sink list
    pub fn replace_sinks(&mut self, sinks: Vec<Sink>) {
        self.last_known_sinks = sinks;
    }

    /// Insert a sink, or replace the entry with the same id
    pub fn upsert_sink(&mut self, sink: Sink) {
        match self.last_known_sinks.iter_mut().find(|s| s.id == sink.id) {
            Some(existing) => *existing = sink,
            None => self.last_known_sinks.push(sink),
        }
    }

    /// Remove a sink by id; returns false if it was unknown
    pub fn remove_sink(&mut self, sink_id: &SinkId) -> bool {
        let before = self.last_known_sinks.len();
        self.last_known_sinks.retain(|s| &s.id != sink_id);
        self.last_known_sinks.len() != before
    }

    pub fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    pub fn selector(&self) -> &SinkSelector {
        &self.selector
    }

    pub fn handle(&self) -> Option<DiscoveryHandle> {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: DiscoveryHandle) {
        self.handle = Some(handle);
    }

    /// How long the registration has existed
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}
