//! Collaborator contracts consumed by the orchestrator
//!
//! All three traits are implemented outside this crate: UI code implements
//! [`SessionObserver`], the remote session transport implements
//! [`LaunchRequest`] and [`RemoteSession`].

use std::sync::Arc;

use super::callbacks::LaunchResultCallback;

/// Receives lifecycle callbacks for the request that launched a session
///
/// Callbacks run on the serialization domain and may call back into the
/// orchestrator.
pub trait SessionObserver: Send + Sync {
    /// The orchestrator is about to call `start()` on `request`
    fn on_session_launching(&self, request: &Arc<dyn LaunchRequest>);

    /// The transport reported a running session
    fn on_session_created(&self, session: &Arc<dyn RemoteSession>);

    /// The transport failed to start the session
    fn on_session_launch_error(&self);

    /// The session this observer launched has fully stopped
    fn on_session_closed(&self);
}

/// One caller-supplied attempt to start a remote session
///
/// The orchestrator calls [`LaunchRequest::observer`] once and
/// [`LaunchRequest::start`] at most once. A request that is discarded is
/// simply dropped without either call.
pub trait LaunchRequest: Send + Sync {
    /// Start the session; report the outcome through `callback`
    fn start(&self, callback: LaunchResultCallback);

    /// Observer that should receive this request's lifecycle callbacks
    fn observer(&self) -> Arc<dyn SessionObserver>;
}

/// Handle to a running remote session
pub trait RemoteSession: Send + Sync {
    /// Stop the receiver application
    ///
    /// The transport must eventually report the close through
    /// [`SessionOrchestrator::notify_session_closed`](super::SessionOrchestrator::notify_session_closed),
    /// either synchronously from inside this call or later through a
    /// [`SessionClosedNotifier`](super::SessionClosedNotifier).
    fn stop_application(&self);
}
