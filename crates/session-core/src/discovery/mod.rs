//! Sink discovery
//!
//! - `platform`: contracts with the platform enumeration API and listeners
//! - `session`: per-application requester bookkeeping
//! - `aggregator`: coalesces registrations and fans out updates

mod aggregator;
mod platform;
mod session;

pub use aggregator::SinkDiscoveryAggregator;
pub use platform::{DiscoveryHandle, SinkDiscoveryPlatform, SinkListener, SinkUpdateCallback};
pub use session::DiscoverySession;
