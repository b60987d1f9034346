//! Transport-facing callback handles
//!
//! Both handles post onto the serialization domain, so the transport may use
//! them from any thread.

use std::fmt;
use std::sync::{Arc, Weak};

use rcast_infra_common::DispatcherHandle;

use super::orchestrator::SessionOrchestrator;
use super::types::RemoteSession;
use crate::events::LaunchId;

/// One-shot result channel handed to [`LaunchRequest::start`](super::LaunchRequest::start)
///
/// Consuming methods make it impossible to report both outcomes.
pub struct LaunchResultCallback {
    launch_id: LaunchId,
    orchestrator: Weak<SessionOrchestrator>,
    dispatcher: DispatcherHandle,
}

impl fmt::Debug for LaunchResultCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchResultCallback")
            .field("launch_id", &self.launch_id)
            .finish()
    }
}

impl LaunchResultCallback {
    pub(crate) fn new(
        launch_id: LaunchId,
        orchestrator: Weak<SessionOrchestrator>,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self {
            launch_id,
            orchestrator,
            dispatcher,
        }
    }

    /// Launch this callback belongs to
    pub fn launch_id(&self) -> LaunchId {
        self.launch_id
    }

    /// Report that the session is running
    pub fn session_created(self, session: Arc<dyn RemoteSession>) {
        let orchestrator = self.orchestrator;
        let posted = self.dispatcher.post(move || {
            if let Some(orchestrator) = orchestrator.upgrade() {
                orchestrator.notify_session_created(session);
            }
        });
        if let Err(e) = posted {
            tracing::warn!("Dropping session-created for {}: {}", self.launch_id, e);
        }
    }

    /// Report that the session could not be started
    pub fn launch_failed(self) {
        let orchestrator = self.orchestrator;
        let posted = self.dispatcher.post(move || {
            if let Some(orchestrator) = orchestrator.upgrade() {
                orchestrator.notify_session_launch_error();
            }
        });
        if let Err(e) = posted {
            tracing::warn!("Dropping launch error for {}: {}", self.launch_id, e);
        }
    }
}

/// Posts `notify_session_closed` for transports that close asynchronously
#[derive(Clone)]
pub struct SessionClosedNotifier {
    orchestrator: Weak<SessionOrchestrator>,
    dispatcher: DispatcherHandle,
}

impl fmt::Debug for SessionClosedNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClosedNotifier")
            .field("dispatcher", &self.dispatcher.name())
            .finish()
    }
}

impl SessionClosedNotifier {
    pub(crate) fn new(orchestrator: Weak<SessionOrchestrator>, dispatcher: DispatcherHandle) -> Self {
        Self {
            orchestrator,
            dispatcher,
        }
    }

    /// Report that the active session has fully stopped
    pub fn notify(&self) {
        let orchestrator = self.orchestrator.clone();
        let posted = self.dispatcher.post(move || {
            if let Some(orchestrator) = orchestrator.upgrade() {
                orchestrator.notify_session_closed();
            }
        });
        if let Err(e) = posted {
            tracing::warn!("Dropping session-closed notification: {}", e);
        }
    }
}
