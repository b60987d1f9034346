//! Platform discovery contract
//!
//! The platform owns the actual device scanning. The aggregator only asks it
//! for currently known sinks and registers or unregisters interest.

use std::fmt;
use std::sync::{Arc, Weak};

use super::aggregator::SinkDiscoveryAggregator;
use crate::config::DiscoveryMode;
use crate::sink::{ApplicationId, RequesterId, Sink, SinkId, SinkSelector};

/// Opaque token for one platform discovery registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveryHandle(pub u64);

/// Platform-provided sink enumeration API
pub trait SinkDiscoveryPlatform: Send + Sync {
    /// Sinks the platform already knows about that match `selector`
    fn known_sinks_matching(&self, selector: &SinkSelector) -> Vec<Sink>;

    /// Start reporting sink changes for `selector` to `callback`
    fn register_discovery(
        &self,
        selector: &SinkSelector,
        mode: DiscoveryMode,
        callback: SinkUpdateCallback,
    ) -> DiscoveryHandle;

    /// Stop a registration created by [`register_discovery`](Self::register_discovery)
    fn unregister_discovery(&self, handle: DiscoveryHandle);
}

/// Receives sink lists for requesters
///
/// Called on the serialization domain, never from inside a platform callback.
pub trait SinkListener: Send + Sync {
    fn on_sinks_received(&self, requester_id: &RequesterId, sinks: &[Sink]);
}

/// Callback the platform uses to report changes for one application
#[derive(Clone)]
pub struct SinkUpdateCallback {
    application_id: ApplicationId,
    aggregator: Weak<SinkDiscoveryAggregator>,
}

impl fmt::Debug for SinkUpdateCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkUpdateCallback")
            .field("application_id", &self.application_id)
            .finish()
    }
}

impl SinkUpdateCallback {
    pub(crate) fn new(application_id: ApplicationId, aggregator: Weak<SinkDiscoveryAggregator>) -> Self {
        Self {
            application_id,
            aggregator,
        }
    }

    /// Application this registration belongs to
    pub fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    /// Replace the full sink list
    pub fn sinks_updated(&self, sinks: Vec<Sink>) {
        if let Some(aggregator) = self.upgrade() {
            aggregator.on_sinks_updated(&self.application_id, sinks);
        }
    }

    /// A matching sink appeared
    pub fn sink_added(&self, sink: Sink) {
        if let Some(aggregator) = self.upgrade() {
            aggregator.on_sink_added(&self.application_id, sink);
        }
    }

    /// A known sink changed, e.g. its friendly name
    pub fn sink_changed(&self, sink: Sink) {
        if let Some(aggregator) = self.upgrade() {
            aggregator.on_sink_changed(&self.application_id, sink);
        }
    }

    /// A sink is no longer reported
    pub fn sink_removed(&self, sink_id: &SinkId) {
        if let Some(aggregator) = self.upgrade() {
            aggregator.on_sink_removed(&self.application_id, sink_id);
        }
    }

    fn upgrade(&self) -> Option<Arc<SinkDiscoveryAggregator>> {
        let aggregator = self.aggregator.upgrade();
        if aggregator.is_none() {
            tracing::debug!("Sink update for {} after aggregator was dropped", self.application_id);
        }
        aggregator
    }
}
