//! Exclusive session orchestration
//!
//! At most one remote session is launching or active at any time. Requests
//! that arrive while a launch is outstanding are dropped; requests that arrive
//! while a session is active stop that session and wait for it to close, with
//! the most recent waiting request replacing any earlier one.
//!
//! The internal lock is never held while observers, `start()` or
//! `stop_application()` run, so all of them may re-enter the orchestrator.
//! In particular `stop_application()` may call
//! [`SessionOrchestrator::notify_session_closed`] before it returns.
//!
//! There are no timeouts here. A transport that never reports back leaves the
//! orchestrator in LAUNCHING or ACTIVE_STOPPING for good.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rcast_infra_common::DispatcherHandle;
use tracing::{debug, info, warn};

use super::callbacks::{LaunchResultCallback, SessionClosedNotifier};
use super::state::{OrchestratorState, OrchestratorStats};
use super::types::{LaunchRequest, RemoteSession, SessionObserver};
use crate::events::{CastEvent, CastEventProcessor, DropReason, LaunchId};

struct PendingLaunch {
    launch_id: LaunchId,
    request: Arc<dyn LaunchRequest>,
}

#[derive(Default)]
struct OrchestratorInner {
    current_session: Option<Arc<dyn RemoteSession>>,
    current_observer: Option<Arc<dyn SessionObserver>>,
    launch_in_flight: bool,
    pending_request: Option<PendingLaunch>,
    /// Launch that owns `current_observer`
    current_launch: Option<LaunchId>,
    stats: OrchestratorStats,
}

impl OrchestratorInner {
    fn state(&self) -> OrchestratorState {
        match (&self.current_session, self.launch_in_flight) {
            (Some(_), _) if self.pending_request.is_some() => OrchestratorState::ActiveStopping,
            (Some(_), _) => OrchestratorState::Active,
            (None, true) => OrchestratorState::Launching,
            (None, false) => OrchestratorState::Idle,
        }
    }
}

enum LaunchDecision {
    Launch(Arc<dyn LaunchRequest>),
    StopActive {
        session: Arc<dyn RemoteSession>,
        active_launch: Option<LaunchId>,
    },
    Supersede(PendingLaunch),
    Drop(Arc<dyn LaunchRequest>),
}

/// Serializes launch attempts against a single remote session slot
pub struct SessionOrchestrator {
    inner: Mutex<OrchestratorInner>,
    next_launch_id: AtomicU64,
    dispatcher: DispatcherHandle,
    events: CastEventProcessor,
    self_ref: Weak<SessionOrchestrator>,
}

impl fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SessionOrchestrator")
            .field("state", &inner.state())
            .field("current_launch", &inner.current_launch)
            .field("stats", &inner.stats)
            .finish()
    }
}

impl SessionOrchestrator {
    /// Create an idle orchestrator bound to a serialization domain
    pub fn new(dispatcher: DispatcherHandle, events: CastEventProcessor) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            inner: Mutex::new(OrchestratorInner::default()),
            next_launch_id: AtomicU64::new(0),
            dispatcher,
            events,
            self_ref: self_ref.clone(),
        })
    }

    /// Ask for a session to be launched for `request`
    ///
    /// Always returns immediately. The outcome is reported only through the
    /// request's observer, and only if the request actually starts: requests
    /// dropped while a launch is in flight, or replaced while the active
    /// session is stopping, get no callback at all. Callers must not assume
    /// every request resolves.
    pub fn request_launch(&self, request: Arc<dyn LaunchRequest>) -> LaunchId {
        let launch_id = LaunchId(self.next_launch_id.fetch_add(1, Ordering::Relaxed) + 1);

        let decision = {
            let mut inner = self.inner.lock();
            if let Some(session) = inner.current_session.clone() {
                // Queue before stopping: a synchronous close must find the request.
                let previous = inner.pending_request.replace(PendingLaunch { launch_id, request });
                match previous {
                    None => LaunchDecision::StopActive {
                        session,
                        active_launch: inner.current_launch,
                    },
                    Some(previous) => {
                        inner.stats.requests_superseded += 1;
                        LaunchDecision::Supersede(previous)
                    }
                }
            } else if inner.launch_in_flight {
                inner.stats.requests_dropped += 1;
                LaunchDecision::Drop(request)
            } else {
                inner.launch_in_flight = true;
                LaunchDecision::Launch(request)
            }
        };

        match decision {
            LaunchDecision::Launch(request) => {
                self.start_launch(launch_id, request);
            }
            LaunchDecision::StopActive {
                session,
                active_launch,
            } => {
                info!(
                    "Stopping active session ({}) to make room for {}",
                    active_launch.map(|id| id.to_string()).unwrap_or_else(|| "unknown".into()),
                    launch_id
                );
                self.events.publish(CastEvent::RequestQueued {
                    launch_id,
                    superseded: None,
                });
                if let Some(active_launch) = active_launch {
                    self.events.publish(CastEvent::StopRequested {
                        launch_id: active_launch,
                    });
                }
                session.stop_application();
            }
            LaunchDecision::Supersede(previous) => {
                // The replaced request never starts and its observer hears nothing.
                warn!(
                    "{} replaces queued {}; the replaced request is discarded",
                    launch_id, previous.launch_id
                );
                self.events.publish(CastEvent::RequestQueued {
                    launch_id,
                    superseded: Some(previous.launch_id),
                });
                self.events.publish(CastEvent::RequestDropped {
                    launch_id: previous.launch_id,
                    reason: DropReason::Superseded,
                });
                drop(previous);
            }
            LaunchDecision::Drop(request) => {
                // Silent by contract: the observer is never told.
                warn!("Dropping {}: another launch is still in flight", launch_id);
                self.events.publish(CastEvent::RequestDropped {
                    launch_id,
                    reason: DropReason::LaunchInFlight,
                });
                drop(request);
            }
        }

        launch_id
    }

    /// The transport started the session for the outstanding launch
    pub fn notify_session_created(&self, session: Arc<dyn RemoteSession>) {
        let (observer, launch_id) = {
            let mut inner = self.inner.lock();
            if !inner.launch_in_flight {
                warn!("Session created while no launch was in flight (state {})", inner.state());
            }
            inner.launch_in_flight = false;
            inner.current_session = Some(session.clone());
            inner.stats.sessions_created += 1;
            (inner.current_observer.clone(), inner.current_launch)
        };

        if let Some(launch_id) = launch_id {
            info!("Session created for {}", launch_id);
            self.events.publish(CastEvent::SessionCreated { launch_id });
        }

        match observer {
            Some(observer) => observer.on_session_created(&session),
            None => warn!("Session created with no observer to notify"),
        }
    }

    /// The transport failed to start the outstanding launch
    pub fn notify_session_launch_error(&self) {
        let (observer, launch_id) = {
            let mut inner = self.inner.lock();
            if !inner.launch_in_flight {
                warn!("Launch error reported while no launch was in flight (state {})", inner.state());
            }
            inner.launch_in_flight = false;
            inner.stats.launch_errors += 1;
            (inner.current_observer.take(), inner.current_launch.take())
        };

        if let Some(launch_id) = launch_id {
            info!("Launch failed for {}", launch_id);
            self.events.publish(CastEvent::LaunchFailed { launch_id });
        }

        match observer {
            Some(observer) => observer.on_session_launch_error(),
            None => warn!("Launch error with no observer to notify"),
        }
    }

    /// The active session has fully stopped
    ///
    /// Safe to call from inside `stop_application()`. If a request is queued
    /// it is launched right after the old observer's `on_session_closed`.
    pub fn notify_session_closed(&self) {
        let (closed_session, old_observer, closed_launch, next) = {
            let mut inner = self.inner.lock();
            let Some(closed_session) = inner.current_session.take() else {
                warn!("Session closed reported with no active session (state {})", inner.state());
                return;
            };
            inner.stats.sessions_closed += 1;
            let next = inner.pending_request.take();
            // Commit to the queued launch now so re-entrant requests see LAUNCHING.
            if next.is_some() {
                inner.launch_in_flight = true;
            }
            (
                closed_session,
                inner.current_observer.take(),
                inner.current_launch.take(),
                next,
            )
        };
        drop(closed_session);

        if let Some(launch_id) = closed_launch {
            info!("Session closed for {}", launch_id);
            self.events.publish(CastEvent::SessionClosed { launch_id });
        }

        if let Some(observer) = old_observer {
            observer.on_session_closed();
        }

        match next {
            Some(pending) => {
                debug!("Relaunching queued {}", pending.launch_id);
                self.start_launch(pending.launch_id, pending.request);
            }
            None => debug!("Orchestrator is idle"),
        }
    }

    /// Current orchestration state
    pub fn state(&self) -> OrchestratorState {
        self.inner.lock().state()
    }

    /// The live session, if any
    pub fn current_session(&self) -> Option<Arc<dyn RemoteSession>> {
        self.inner.lock().current_session.clone()
    }

    /// Whether a relaunch is waiting for the active session to close
    pub fn has_pending_request(&self) -> bool {
        self.inner.lock().pending_request.is_some()
    }

    /// Snapshot of the orchestrator counters
    pub fn stats(&self) -> OrchestratorStats {
        self.inner.lock().stats
    }

    /// Event processor this orchestrator publishes to
    pub fn events(&self) -> &CastEventProcessor {
        &self.events
    }

    /// Handle for transports that report closes from another thread
    pub fn closed_notifier(&self) -> SessionClosedNotifier {
        SessionClosedNotifier::new(self.self_ref.clone(), self.dispatcher.clone())
    }

    /// Return to IDLE without calling anyone
    ///
    /// Forgets the session, observer and queued request. Meant for test
    /// isolation; a live transport session is not stopped.
    pub fn reset_for_testing(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            std::mem::take(&mut *inner)
        };
        debug!("Orchestrator reset from {}", previous.state());
        drop(previous);
    }

    /// Run the IDLE launch sequence; `launch_in_flight` is already set
    fn start_launch(&self, launch_id: LaunchId, request: Arc<dyn LaunchRequest>) {
        let observer = request.observer();
        {
            let mut inner = self.inner.lock();
            inner.current_observer = Some(observer.clone());
            inner.current_launch = Some(launch_id);
            inner.stats.launches_started += 1;
        }

        info!("Launching session for {}", launch_id);
        self.events.publish(CastEvent::LaunchStarted { launch_id });

        observer.on_session_launching(&request);
        request.start(LaunchResultCallback::new(
            launch_id,
            self.self_ref.clone(),
            self.dispatcher.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use rcast_infra_common::Dispatcher;

    #[derive(Default)]
    struct Log(PlMutex<Vec<String>>);

    impl Log {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().push(entry.into());
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock())
        }
    }

    struct Observer {
        name: &'static str,
        log: Arc<Log>,
    }

    impl SessionObserver for Observer {
        fn on_session_launching(&self, _request: &Arc<dyn LaunchRequest>) {
            self.log.push(format!("{}:launching", self.name));
        }
        fn on_session_created(&self, _session: &Arc<dyn RemoteSession>) {
            self.log.push(format!("{}:created", self.name));
        }
        fn on_session_launch_error(&self) {
            self.log.push(format!("{}:error", self.name));
        }
        fn on_session_closed(&self) {
            self.log.push(format!("{}:closed", self.name));
        }
    }

    struct Request {
        observer: Arc<Observer>,
        callback: PlMutex<Option<LaunchResultCallback>>,
    }

    impl Request {
        fn new(name: &'static str, log: &Arc<Log>) -> Arc<Self> {
            Arc::new(Self {
                observer: Arc::new(Observer {
                    name,
                    log: log.clone(),
                }),
                callback: PlMutex::new(None),
            })
        }
    }

    impl LaunchRequest for Request {
        fn start(&self, callback: LaunchResultCallback) {
            self.observer.log.push(format!("{}:start", self.observer.name));
            *self.callback.lock() = Some(callback);
        }
        fn observer(&self) -> Arc<dyn SessionObserver> {
            self.observer.clone()
        }
    }

    struct Session;

    impl RemoteSession for Session {
        fn stop_application(&self) {}
    }

    #[test]
    fn test_idle_orchestrator() {
        let (dispatcher, _queue) = Dispatcher::new("test");
        let orchestrator = SessionOrchestrator::new(dispatcher, CastEventProcessor::new(8));

        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert!(orchestrator.current_session().is_none());
        assert!(!orchestrator.has_pending_request());
        assert_eq!(orchestrator.stats(), OrchestratorStats::default());
    }

    #[test]
    fn test_launch_ids_increase() {
        let (dispatcher, _queue) = Dispatcher::new("test");
        let orchestrator = SessionOrchestrator::new(dispatcher, CastEventProcessor::new(8));
        let log = Arc::new(Log::default());

        let first = orchestrator.request_launch(Request::new("a", &log));
        let second = orchestrator.request_launch(Request::new("b", &log));

        assert_eq!(first, LaunchId(1));
        assert_eq!(second, LaunchId(2));
        assert_eq!(log.take(), vec!["a:launching", "a:start"]);
        assert_eq!(orchestrator.stats().requests_dropped, 1);
    }

    #[test]
    fn test_result_callback_posts_onto_dispatcher() {
        let (dispatcher, mut queue) = Dispatcher::new("test");
        let orchestrator = SessionOrchestrator::new(dispatcher, CastEventProcessor::new(8));
        let log = Arc::new(Log::default());
        let request = Request::new("a", &log);

        orchestrator.request_launch(request.clone());
        let callback = request.callback.lock().take().unwrap();
        callback.session_created(Arc::new(Session));

        assert_eq!(orchestrator.state(), OrchestratorState::Launching);
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(orchestrator.state(), OrchestratorState::Active);
        assert_eq!(log.take(), vec!["a:launching", "a:start", "a:created"]);
    }

    #[test]
    fn test_close_without_session_is_ignored() {
        let (dispatcher, _queue) = Dispatcher::new("test");
        let orchestrator = SessionOrchestrator::new(dispatcher, CastEventProcessor::new(8));
        let log = Arc::new(Log::default());

        orchestrator.request_launch(Request::new("a", &log));
        log.take();
        orchestrator.notify_session_closed();

        assert_eq!(orchestrator.state(), OrchestratorState::Launching);
        assert!(log.take().is_empty());
        assert_eq!(orchestrator.stats().sessions_closed, 0);
    }

    #[test]
    fn test_reset_for_testing_returns_to_idle() {
        let (dispatcher, _queue) = Dispatcher::new("test");
        let orchestrator = SessionOrchestrator::new(dispatcher, CastEventProcessor::new(8));
        let log = Arc::new(Log::default());

        orchestrator.request_launch(Request::new("a", &log));
        orchestrator.notify_session_created(Arc::new(Session));
        orchestrator.request_launch(Request::new("b", &log));
        assert_eq!(orchestrator.state(), OrchestratorState::ActiveStopping);
        log.take();

        orchestrator.reset_for_testing();

        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert_eq!(orchestrator.stats(), OrchestratorStats::default());
        assert!(log.take().is_empty());

        orchestrator.request_launch(Request::new("c", &log));
        assert_eq!(log.take(), vec!["c:launching", "c:start"]);
    }
}
