//! # rcast-session-core
//!
//! Core of the remote session (cast) layer:
//!
//! - [`orchestrator`]: keeps at most one remote session launching or active,
//!   stopping the active one before relaunching and dropping requests that
//!   arrive while a launch is outstanding
//! - [`discovery`]: lets many requesters observe sinks of one receiver
//!   application through a single platform registration
//! - [`context`]: owns both, plus the dispatcher they post onto
//!
//! All state changes happen on one serialization domain, a
//! [`Dispatcher`](rcast_infra_common::Dispatcher). Transport and platform
//! callbacks post onto it; nothing blocks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rcast_session_core::prelude::*;
//!
//! struct PrintSinks;
//!
//! impl SinkListener for PrintSinks {
//!     fn on_sinks_received(&self, requester_id: &RequesterId, sinks: &[Sink]) {
//!         println!("{}: {} sinks", requester_id, sinks.len());
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let (context, mut queue) = CastContext::builder()
//!     .with_sink_listener(Arc::new(PrintSinks))
//!     .build()?;
//!
//! context
//!     .aggregator()
//!     .start_observing_source("cast:CC1AD845?clientId=1");
//! queue.run_until_idle();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod sink;
pub mod source;

pub use config::{CastConfig, DiscoveryConfig, DiscoveryMode, LogSettings, OrchestratorConfig};
pub use context::{CastContext, CastContextBuilder};
pub use discovery::{
    DiscoveryHandle, DiscoverySession, SinkDiscoveryAggregator, SinkDiscoveryPlatform, SinkListener,
    SinkUpdateCallback,
};
pub use errors::{CastError, Result};
pub use events::{CastEvent, CastEventProcessor, CastEventSubscriber, DropReason, LaunchId, TimedCastEvent};
pub use orchestrator::{
    LaunchRequest, LaunchResultCallback, OrchestratorState, OrchestratorStats, RemoteSession,
    SessionClosedNotifier, SessionObserver, SessionOrchestrator,
};
pub use sink::{ApplicationId, RequesterId, Sink, SinkId, SinkSelector};
pub use source::{AutoJoinPolicy, MediaSource};

/// Common imports for users of the cast core
pub mod prelude {
    pub use crate::config::{CastConfig, DiscoveryMode};
    pub use crate::context::{CastContext, CastContextBuilder};
    pub use crate::discovery::{SinkDiscoveryPlatform, SinkListener, SinkUpdateCallback};
    pub use crate::errors::{CastError, Result};
    pub use crate::events::{CastEvent, LaunchId};
    pub use crate::orchestrator::{
        LaunchRequest, LaunchResultCallback, OrchestratorState, RemoteSession, SessionObserver,
        SessionOrchestrator,
    };
    pub use crate::sink::{ApplicationId, RequesterId, Sink, SinkId, SinkSelector};
    pub use crate::source::MediaSource;
}
