//! Coalescing sink discovery
//!
//! Many requesters may observe sinks for the same application. The
//! aggregator keeps one [`DiscoverySession`] and one platform registration
//! per application, fans sink updates out to every interested requester and
//! always delivers them by posting onto the dispatcher.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rcast_infra_common::DispatcherHandle;
use tracing::{debug, info, warn};

use super::platform::{SinkDiscoveryPlatform, SinkListener, SinkUpdateCallback};
use super::session::DiscoverySession;
use crate::config::DiscoveryConfig;
use crate::events::{CastEvent, CastEventProcessor};
use crate::sink::{ApplicationId, RequesterId, Sink, SinkId, SinkSelector};
use crate::source::MediaSource;

/// Shares platform discovery registrations between requesters
pub struct SinkDiscoveryAggregator {
    platform: Option<Arc<dyn SinkDiscoveryPlatform>>,
    listener: Arc<dyn SinkListener>,
    dispatcher: DispatcherHandle,
    events: CastEventProcessor,
    config: DiscoveryConfig,
    sessions: Mutex<HashMap<ApplicationId, DiscoverySession>>,
    self_ref: Weak<SinkDiscoveryAggregator>,
}

impl fmt::Debug for SinkDiscoveryAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkDiscoveryAggregator")
            .field("platform_available", &self.platform.is_some())
            .field("sessions", &self.sessions.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

impl SinkDiscoveryAggregator {
    /// Create an aggregator
    ///
    /// `platform` is `None` when the platform discovery API is unavailable;
    /// every requester then gets an immediate empty sink list.
    pub fn new(
        platform: Option<Arc<dyn SinkDiscoveryPlatform>>,
        listener: Arc<dyn SinkListener>,
        dispatcher: DispatcherHandle,
        events: CastEventProcessor,
        config: DiscoveryConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            platform,
            listener,
            dispatcher,
            events,
            config,
            sessions: Mutex::new(HashMap::new()),
            self_ref: self_ref.clone(),
        })
    }

    /// Start observing sinks of `application_id` on behalf of `requester_id`
    ///
    /// The first requester for an application creates the platform
    /// registration. Adding a requester that already observes is a no-op.
    pub fn start_observing(
        &self,
        requester_id: RequesterId,
        application_id: ApplicationId,
        selector: Option<SinkSelector>,
    ) {
        let Some(platform) = self.platform.clone() else {
            debug!("Sink discovery unavailable, answering {} with no sinks", requester_id);
            self.deliver_now(&requester_id, &[]);
            return;
        };
        let Some(selector) = selector else {
            debug!(
                "No selector for application '{}', answering {} with no sinks",
                application_id, requester_id
            );
            self.deliver_now(&requester_id, &[]);
            return;
        };

        let joined = {
            let mut sessions = self.sessions.lock();
            sessions
                .get_mut(&application_id)
                .map(|session| Self::join(session, &requester_id))
        };
        if let Some(snapshot) = joined {
            self.joined(requester_id, &application_id, snapshot);
            return;
        }

        let known_sinks = platform.known_sinks_matching(&selector);

        // The platform call may have re-entered and created the session already.
        let joined = {
            let mut sessions = self.sessions.lock();
            match sessions.entry(application_id.clone()) {
                Entry::Occupied(mut entry) => Some(Self::join(entry.get_mut(), &requester_id)),
                Entry::Vacant(entry) => {
                    let mut session =
                        DiscoverySession::new(application_id.clone(), selector.clone(), known_sinks);
                    session.add_requester(requester_id.clone());
                    // Inserted before registering so a synchronous platform update finds it.
                    entry.insert(session);
                    None
                }
            }
        };
        if let Some(snapshot) = joined {
            self.joined(requester_id, &application_id, snapshot);
            return;
        }

        let callback = SinkUpdateCallback::new(application_id.clone(), self.self_ref.clone());
        let handle = platform.register_discovery(&selector, self.config.mode, callback);

        // The platform may already have reported sinks during registration.
        let snapshot = {
            let mut sessions = self.sessions.lock();
            match sessions.get_mut(&application_id) {
                // A handle already set belongs to a session recreated during registration.
                Some(session) if session.handle().is_none() => {
                    session.set_handle(handle);
                    Some(session.last_known_sinks().to_vec())
                }
                _ => None,
            }
        };
        let Some(snapshot) = snapshot else {
            warn!(
                "Discovery for {} stopped while registering; dropping registration {:?}",
                application_id, handle
            );
            platform.unregister_discovery(handle);
            return;
        };

        info!(
            "Started {:?} discovery for {} ({} known sinks)",
            self.config.mode,
            application_id,
            snapshot.len()
        );
        self.events.publish(CastEvent::DiscoveryStarted {
            application_id: application_id.clone(),
        });
        self.post_initial_snapshot(requester_id, snapshot);
    }

    /// Add a requester to an existing session; the snapshot is `None` if it was already there
    fn join(session: &mut DiscoverySession, requester_id: &RequesterId) -> Option<Vec<Sink>> {
        session
            .add_requester(requester_id.clone())
            .then(|| session.last_known_sinks().to_vec())
    }

    fn joined(&self, requester_id: RequesterId, application_id: &ApplicationId, snapshot: Option<Vec<Sink>>) {
        match snapshot {
            Some(sinks) => {
                debug!("{} joined discovery for {}", requester_id, application_id);
                self.post_initial_snapshot(requester_id, sinks);
            }
            None => debug!("{} already observes {}", requester_id, application_id),
        }
    }

    /// Stop observing `application_id` for `requester_id`
    ///
    /// The platform registration is removed once the last requester leaves.
    pub fn stop_observing(&self, requester_id: &RequesterId, application_id: &ApplicationId) {
        let Some(platform) = self.platform.clone() else {
            return;
        };

        let removed = {
            let mut sessions = self.sessions.lock();
            let Some(session) = sessions.get_mut(application_id) else {
                debug!("{} stopped observing unknown application {}", requester_id, application_id);
                return;
            };
            if !session.remove_requester(requester_id) {
                debug!("{} was not observing {}", requester_id, application_id);
                return;
            }
            if session.is_empty() {
                sessions.remove(application_id)
            } else {
                None
            }
        };

        let Some(session) = removed else {
            debug!("{} left discovery for {}", requester_id, application_id);
            return;
        };

        if let Some(handle) = session.handle() {
            platform.unregister_discovery(handle);
        }
        info!(
            "Stopped discovery for {} after {:?}",
            application_id,
            session.age()
        );
        self.events.publish(CastEvent::DiscoveryStopped {
            application_id: application_id.clone(),
        });
    }

    /// Platform reported the full sink list for `application_id`
    pub fn on_sinks_updated(&self, application_id: &ApplicationId, sinks: Vec<Sink>) {
        self.update_session(application_id, move |session| session.replace_sinks(sinks));
    }

    /// Platform found a new sink for `application_id`
    pub fn on_sink_added(&self, application_id: &ApplicationId, sink: Sink) {
        self.update_session(application_id, move |session| session.upsert_sink(sink));
    }

    /// Platform reported a change to a known sink
    pub fn on_sink_changed(&self, application_id: &ApplicationId, sink: Sink) {
        self.update_session(application_id, move |session| session.upsert_sink(sink));
    }

    /// Platform no longer reports a sink
    pub fn on_sink_removed(&self, application_id: &ApplicationId, sink_id: &SinkId) {
        self.update_session(application_id, |session| {
            if !session.remove_sink(sink_id) {
                debug!("Removing unknown sink {}", sink_id);
            }
        });
    }

    /// Whether `source_id` is a source URN this aggregator understands
    pub fn supports_source(&self, source_id: &str) -> bool {
        MediaSource::parse(source_id).is_ok()
    }

    /// Start observing on behalf of a source URN
    ///
    /// The requester id is the URN itself. An unparsable URN is answered
    /// with an empty sink list right away.
    pub fn start_observing_source(&self, source_id: &str) {
        match MediaSource::parse(source_id) {
            Ok(source) => {
                let selector = source.selector();
                self.start_observing(source.requester_id(), source.application_id, selector);
            }
            Err(e) => {
                warn!("Cannot observe sinks for source: {}", e);
                self.deliver_now(&RequesterId::from(source_id), &[]);
            }
        }
    }

    /// Stop observing on behalf of a source URN; unparsable URNs are ignored
    pub fn stop_observing_source(&self, source_id: &str) {
        match MediaSource::parse(source_id) {
            Ok(source) => self.stop_observing(&source.requester_id(), &source.application_id),
            Err(e) => debug!("Ignoring stop for unparsable source: {}", e),
        }
    }

    /// Look a sink up among every session's last known sinks
    pub fn find_sink(&self, sink_id: &SinkId) -> Option<Sink> {
        let sessions = self.sessions.lock();
        sessions
            .values()
            .flat_map(|session| session.last_known_sinks())
            .find(|sink| &sink.id == sink_id)
            .cloned()
    }

    /// Last known sinks of an observed application
    pub fn known_sinks(&self, application_id: &ApplicationId) -> Option<Vec<Sink>> {
        self.sessions
            .lock()
            .get(application_id)
            .map(|session| session.last_known_sinks().to_vec())
    }

    /// Applications that currently have a discovery session, sorted
    pub fn observed_applications(&self) -> Vec<ApplicationId> {
        let mut applications: Vec<_> = self.sessions.lock().keys().cloned().collect();
        applications.sort();
        applications
    }

    /// Requesters observing an application, sorted
    pub fn requesters(&self, application_id: &ApplicationId) -> Vec<RequesterId> {
        self.sessions
            .lock()
            .get(application_id)
            .map(|session| session.requester_ids().cloned().collect())
            .unwrap_or_default()
    }

    /// Unregister and forget every discovery session
    pub fn reset_for_testing(&self) {
        let sessions = std::mem::take(&mut *self.sessions.lock());
        for (application_id, session) in sessions {
            if let (Some(platform), Some(handle)) = (self.platform.as_ref(), session.handle()) {
                platform.unregister_discovery(handle);
            }
            self.events.publish(CastEvent::DiscoveryStopped { application_id });
        }
        debug!("Discovery aggregator reset");
    }

    /// Apply `update` to a session and post its sinks to every requester
    fn update_session<F>(&self, application_id: &ApplicationId, update: F)
    where
        F: FnOnce(&mut DiscoverySession),
    {
        let (requesters, sinks) = {
            let mut sessions = self.sessions.lock();
            let Some(session) = sessions.get_mut(application_id) else {
                debug!("Ignoring sink update for unobserved application {}", application_id);
                return;
            };
            update(session);
            let requesters: Vec<RequesterId> = session.requester_ids().cloned().collect();
            (requesters, session.last_known_sinks().to_vec())
        };

        debug!(
            "{} sinks for {}, notifying {} requesters",
            sinks.len(),
            application_id,
            requesters.len()
        );
        self.events.publish(CastEvent::SinksUpdated {
            application_id: application_id.clone(),
            sink_count: sinks.len(),
        });

        let sinks = Arc::new(sinks);
        for requester_id in requesters {
            self.post_sinks(requester_id, sinks.clone());
        }
    }

    fn post_initial_snapshot(&self, requester_id: RequesterId, sinks: Vec<Sink>) {
        if self.config.deliver_initial_snapshot {
            self.post_sinks(requester_id, Arc::new(sinks));
        }
    }

    /// Deliver on the dispatcher, never on the caller's stack
    fn post_sinks(&self, requester_id: RequesterId, sinks: Arc<Vec<Sink>>) {
        let listener = self.listener.clone();
        let posted = self.dispatcher.post(move || {
            listener.on_sinks_received(&requester_id, &sinks);
        });
        if let Err(e) = posted {
            warn!("Sink notification lost: {}", e);
        }
    }

    /// Synchronous delivery, only used when nothing was registered
    fn deliver_now(&self, requester_id: &RequesterId, sinks: &[Sink]) {
        self.listener.on_sinks_received(requester_id, sinks);
    }
}
