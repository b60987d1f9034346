//! Cast Event System
//!
//! Lifecycle events published through `tokio::sync::broadcast` for
//! monitoring. Events never replace observer callbacks: a dropped launch
//! request still gets no observer call, it only shows up here.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::errors::{CastError, Result};
use crate::sink::ApplicationId;

/// Identifier assigned to every `request_launch` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchId(pub u64);

impl fmt::Display for LaunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "launch-{}", self.0)
    }
}

/// Why a launch request was discarded without ever starting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Another launch was still outstanding
    LaunchInFlight,
    /// A later request replaced it while the active session was stopping
    Superseded,
}

/// Events published by the orchestrator and the discovery aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CastEvent {
    /// `start()` was issued for a request
    LaunchStarted { launch_id: LaunchId },

    /// The transport reported a running session
    SessionCreated { launch_id: LaunchId },

    /// The transport reported a failed launch
    LaunchFailed { launch_id: LaunchId },

    /// `stop_application()` was issued on the active session
    StopRequested { launch_id: LaunchId },

    /// The active session closed
    SessionClosed { launch_id: LaunchId },

    /// A request is waiting for the active session to stop
    RequestQueued {
        launch_id: LaunchId,
        superseded: Option<LaunchId>,
    },

    /// A request was discarded and will never start
    RequestDropped { launch_id: LaunchId, reason: DropReason },

    /// A platform discovery registration was created
    DiscoveryStarted { application_id: ApplicationId },

    /// A platform discovery registration was removed
    DiscoveryStopped { application_id: ApplicationId },

    /// New sinks were stored for an application
    SinksUpdated {
        application_id: ApplicationId,
        sink_count: usize,
    },
}

/// Event with the time it was published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedCastEvent {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event: CastEvent,
}

/// Subscriber wrapper for cast events
pub struct CastEventSubscriber {
    receiver: broadcast::Receiver<TimedCastEvent>,
}

impl CastEventSubscriber {
    /// Receive the next event
    pub async fn receive(&mut self) -> Result<TimedCastEvent> {
        self.receiver
            .recv()
            .await
            .map_err(|e| CastError::internal(format!("Failed to receive event: {}", e)))
    }

    /// Try to receive an event without blocking
    pub fn try_receive(&mut self) -> Result<Option<TimedCastEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(e) => Err(CastError::internal(format!("Failed to try receive event: {}", e))),
        }
    }

    /// Drain every event currently buffered, dropping timestamps
    ///
    /// Events lost to lagging are skipped; the rest are still returned.
    pub fn drain(&mut self) -> Vec<CastEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(timed) => events.push(timed.event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    tracing::warn!("Cast event subscriber lagged, {} events missed", missed);
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        events
    }
}

/// Broadcast publisher for cast events
#[derive(Clone)]
pub struct CastEventProcessor {
    sender: broadcast::Sender<TimedCastEvent>,
}

impl fmt::Debug for CastEventProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastEventProcessor")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl CastEventProcessor {
    /// Create a processor buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: CastEvent) {
        tracing::trace!("Publishing cast event: {:?}", event);
        let _ = self.sender.send(TimedCastEvent {
            timestamp: chrono::Utc::now(),
            event,
        });
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> CastEventSubscriber {
        CastEventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
