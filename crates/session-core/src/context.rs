//! Process-level cast context
//!
//! [`CastContext`] owns the one orchestrator and the one discovery
//! aggregator of a process, together with the dispatcher both of them post
//! onto. Build it with [`CastContextBuilder`]; the returned [`TaskQueue`]
//! must be drained by the caller, either with `run_until_idle()` or by
//! spawning it on a tokio runtime.

use std::path::Path;
use std::sync::Arc;

use rcast_infra_common::{Dispatcher, DispatcherHandle, TaskQueue};
use tracing::info;

use crate::config::CastConfig;
use crate::discovery::{SinkDiscoveryAggregator, SinkDiscoveryPlatform, SinkListener};
use crate::errors::{CastError, Result};
use crate::events::{CastEventProcessor, CastEventSubscriber};
use crate::orchestrator::SessionOrchestrator;

/// Name of the serialization domain owned by a context
pub const DISPATCHER_NAME: &str = "cast";

/// Builder for [`CastContext`]
pub struct CastContextBuilder {
    config: CastConfig,
    platform: Option<Arc<dyn SinkDiscoveryPlatform>>,
    listener: Option<Arc<dyn SinkListener>>,
}

impl CastContextBuilder {
    /// Create a builder with default configuration and no platform
    pub fn new() -> Self {
        Self {
            config: CastConfig::default(),
            platform: None,
            listener: None,
        }
    }

    /// Use a pre-built configuration
    pub fn with_config(mut self, config: CastConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = CastConfig::from_file(path)?;
        Ok(self)
    }

    /// Set the platform discovery API; without one every requester gets no sinks
    pub fn with_platform(mut self, platform: Arc<dyn SinkDiscoveryPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the listener that receives sink lists (required)
    pub fn with_sink_listener(mut self, listener: Arc<dyn SinkListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Build the context and the queue of its serialization domain
    pub fn build(self) -> Result<(CastContext, TaskQueue)> {
        self.config.validate()?;
        let listener = self
            .listener
            .ok_or_else(|| CastError::config("A sink listener is required"))?;

        let (dispatcher, queue) = Dispatcher::new(DISPATCHER_NAME);
        let events = CastEventProcessor::new(self.config.orchestrator.event_channel_capacity);
        let orchestrator = SessionOrchestrator::new(dispatcher.clone(), events.clone());
        let aggregator = SinkDiscoveryAggregator::new(
            self.platform,
            listener,
            dispatcher.clone(),
            events.clone(),
            self.config.discovery.clone(),
        );

        info!(
            "Cast context ready ({:?} discovery, event capacity {})",
            self.config.discovery.mode, self.config.orchestrator.event_channel_capacity
        );

        let context = CastContext {
            config: self.config,
            dispatcher,
            events,
            orchestrator,
            aggregator,
        };
        Ok((context, queue))
    }
}

impl Default for CastContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the orchestrator, the aggregator and their dispatcher
#[derive(Debug)]
pub struct CastContext {
    config: CastConfig,
    dispatcher: DispatcherHandle,
    events: CastEventProcessor,
    orchestrator: Arc<SessionOrchestrator>,
    aggregator: Arc<SinkDiscoveryAggregator>,
}

impl CastContext {
    /// Start building a context
    pub fn builder() -> CastContextBuilder {
        CastContextBuilder::new()
    }

    pub fn orchestrator(&self) -> &Arc<SessionOrchestrator> {
        &self.orchestrator
    }

    pub fn aggregator(&self) -> &Arc<SinkDiscoveryAggregator> {
        &self.aggregator
    }

    pub fn events(&self) -> &CastEventProcessor {
        &self.events
    }

    /// Subscribe to lifecycle and discovery events
    pub fn subscribe(&self) -> CastEventSubscriber {
        self.events.subscribe()
    }

    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    pub fn config(&self) -> &CastConfig {
        &self.config
    }

    /// Return the orchestrator to IDLE and unregister all discovery
    ///
    /// No observer or listener is called. Tasks already posted to the
    /// dispatcher still run.
    pub fn reset_for_testing(&self) {
        self.orchestrator.reset_for_testing();
        self.aggregator.reset_for_testing();
    }

    /// Stop the dispatcher; tasks posted afterwards are rejected
    pub fn shutdown(&self) -> Result<()> {
        info!("Shutting down cast context");
        self.dispatcher.shutdown()?;
        Ok(())
    }
}
