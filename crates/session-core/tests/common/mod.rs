//! Shared recording fakes for session-core integration tests
//!
//! Every fake writes into a shared [`CallLog`] so tests can assert the exact
//! order of observer, transport and platform calls.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rcast_infra_common::{Dispatcher, TaskQueue};
use rcast_session_core::{
    CastEventProcessor, DiscoveryHandle, DiscoveryMode, LaunchRequest, LaunchResultCallback,
    RemoteSession, RequesterId, SessionClosedNotifier, SessionObserver, SessionOrchestrator, Sink,
    SinkDiscoveryPlatform, SinkListener, SinkSelector, SinkUpdateCallback,
};

/// Ordered record of calls made into the fakes
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Take everything logged so far
pub fn take_log(log: &CallLog) -> Vec<String> {
    std::mem::take(&mut *log.lock())
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Orchestrator on a fresh dispatcher
pub fn new_orchestrator() -> (Arc<SessionOrchestrator>, TaskQueue) {
    init_test_logging();
    let (dispatcher, queue) = Dispatcher::new("test");
    (SessionOrchestrator::new(dispatcher, CastEventProcessor::new(64)), queue)
}

type Hook = Box<dyn FnOnce() + Send>;

/// Observer that logs `<name>:<callback>`
pub struct FakeObserver {
    name: String,
    log: CallLog,
    on_closed_hook: Mutex<Option<Hook>>,
}

impl FakeObserver {
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            on_closed_hook: Mutex::new(None),
        })
    }

    /// Run `hook` once from inside `on_session_closed`, after logging
    pub fn on_closed(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_closed_hook.lock() = Some(Box::new(hook));
    }

    fn record(&self, what: &str) {
        self.log.lock().push(format!("{}:{}", self.name, what));
    }
}

impl SessionObserver for FakeObserver {
    fn on_session_launching(&self, _request: &Arc<dyn LaunchRequest>) {
        self.record("launching");
    }

    fn on_session_created(&self, _session: &Arc<dyn RemoteSession>) {
        self.record("created");
    }

    fn on_session_launch_error(&self) {
        self.record("error");
    }

    fn on_session_closed(&self) {
        self.record("closed");
        let hook = self.on_closed_hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

/// Launch request that keeps its result callback for the test to resolve
pub struct FakeRequest {
    name: String,
    observer: Arc<FakeObserver>,
    callback: Mutex<Option<LaunchResultCallback>>,
    starts: AtomicUsize,
}

impl FakeRequest {
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            observer: FakeObserver::new(name, log),
            callback: Mutex::new(None),
            starts: AtomicUsize::new(0),
        })
    }

    pub fn fake_observer(&self) -> &Arc<FakeObserver> {
        &self.observer
    }

    /// Number of times `start()` was called
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Callback passed to `start()`; panics if the request never started
    pub fn take_callback(&self) -> LaunchResultCallback {
        self.callback
            .lock()
            .take()
            .unwrap_or_else(|| panic!("{} was never started", self.name))
    }
}

impl LaunchRequest for FakeRequest {
    fn start(&self, callback: LaunchResultCallback) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.observer.record("start");
        *self.callback.lock() = Some(callback);
    }

    fn observer(&self) -> Arc<dyn SessionObserver> {
        self.observer.clone()
    }
}

/// How a [`FakeSession`] reports that it closed
pub enum CloseMode {
    /// Calls `notify_session_closed` from inside `stop_application`
    Sync(Weak<SessionOrchestrator>),
    /// Posts the close through the dispatcher
    Async(SessionClosedNotifier),
    /// The test reports the close itself
    Manual,
}

/// Remote session that logs `<name>:stop`
pub struct FakeSession {
    name: String,
    log: CallLog,
    close: CloseMode,
    stops: AtomicUsize,
}

impl FakeSession {
    pub fn new(name: &str, log: &CallLog, close: CloseMode) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            close,
            stops: AtomicUsize::new(0),
        })
    }

    pub fn closing_sync(name: &str, log: &CallLog, orchestrator: &Arc<SessionOrchestrator>) -> Arc<Self> {
        Self::new(name, log, CloseMode::Sync(Arc::downgrade(orchestrator)))
    }

    pub fn closing_async(name: &str, log: &CallLog, orchestrator: &Arc<SessionOrchestrator>) -> Arc<Self> {
        Self::new(name, log, CloseMode::Async(orchestrator.closed_notifier()))
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl RemoteSession for FakeSession {
    fn stop_application(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("{}:stop", self.name));
        match &self.close {
            CloseMode::Sync(orchestrator) => {
                if let Some(orchestrator) = orchestrator.upgrade() {
                    orchestrator.notify_session_closed();
                }
            }
            CloseMode::Async(notifier) => notifier.notify(),
            CloseMode::Manual => {}
        }
    }
}

/// One registration made against [`FakePlatform`]
#[derive(Debug, Clone)]
pub struct Registration {
    pub handle: DiscoveryHandle,
    pub selector: SinkSelector,
    pub mode: DiscoveryMode,
    pub callback: SinkUpdateCallback,
}

/// Platform discovery API that records registrations
#[derive(Default)]
pub struct FakePlatform {
    known_sinks: Mutex<Vec<Sink>>,
    registrations: Mutex<Vec<Registration>>,
    unregistered: Mutex<Vec<DiscoveryHandle>>,
    next_handle: AtomicU64,
    /// Sinks reported synchronously from inside `register_discovery`
    report_on_register: Mutex<Option<Vec<Sink>>>,
    known_sinks_hook: Mutex<Option<Hook>>,
    register_hook: Mutex<Option<Hook>>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_known_sinks(sinks: Vec<Sink>) -> Arc<Self> {
        let platform = Self::default();
        *platform.known_sinks.lock() = sinks;
        Arc::new(platform)
    }

    /// Run `hook` once from inside the next `known_sinks_matching`
    pub fn on_known_sinks(&self, hook: impl FnOnce() + Send + 'static) {
        *self.known_sinks_hook.lock() = Some(Box::new(hook));
    }

    /// Run `hook` once from inside the next `register_discovery`, after recording it
    pub fn on_register(&self, hook: impl FnOnce() + Send + 'static) {
        *self.register_hook.lock() = Some(Box::new(hook));
    }

    pub fn report_on_register(&self, sinks: Vec<Sink>) {
        *self.report_on_register.lock() = Some(sinks);
    }

    /// Total registrations ever made
    pub fn registration_count(&self) -> usize {
        self.registrations.lock().len()
    }

    pub fn registration(&self, index: usize) -> Registration {
        self.registrations.lock()[index].clone()
    }

    pub fn unregistered(&self) -> Vec<DiscoveryHandle> {
        self.unregistered.lock().clone()
    }
}

impl SinkDiscoveryPlatform for FakePlatform {
    fn known_sinks_matching(&self, _selector: &SinkSelector) -> Vec<Sink> {
        let hook = self.known_sinks_hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        self.known_sinks.lock().clone()
    }

    fn register_discovery(
        &self,
        selector: &SinkSelector,
        mode: DiscoveryMode,
        callback: SinkUpdateCallback,
    ) -> DiscoveryHandle {
        let handle = DiscoveryHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.registrations.lock().push(Registration {
            handle,
            selector: selector.clone(),
            mode,
            callback: callback.clone(),
        });
        let immediate = self.report_on_register.lock().take();
        if let Some(sinks) = immediate {
            callback.sinks_updated(sinks);
        }
        let hook = self.register_hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        handle
    }

    fn unregister_discovery(&self, handle: DiscoveryHandle) {
        self.unregistered.lock().push(handle);
    }
}

/// Listener that records every delivery
#[derive(Default)]
pub struct RecordingListener {
    received: Mutex<Vec<(RequesterId, Vec<Sink>)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<(RequesterId, Vec<Sink>)> {
        std::mem::take(&mut *self.received.lock())
    }

    /// Deliveries as `(requester, sink ids)` pairs
    pub fn take_ids(&self) -> Vec<(String, Vec<String>)> {
        self.take()
            .into_iter()
            .map(|(requester, sinks)| {
                (
                    requester.to_string(),
                    sinks.into_iter().map(|sink| sink.id.to_string()).collect(),
                )
            })
            .collect()
    }
}

impl SinkListener for RecordingListener {
    fn on_sinks_received(&self, requester_id: &RequesterId, sinks: &[Sink]) {
        self.received.lock().push((requester_id.clone(), sinks.to_vec()));
    }
}

pub fn tv() -> Sink {
    Sink::new("tv", "Living Room TV", "cast")
}

pub fn speaker() -> Sink {
    Sink::new("speaker", "Kitchen Speaker", "cast")
}
