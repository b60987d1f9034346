//! Integration tests for CastContext wiring and configuration

mod common;

use std::io::Write;

use common::*;
use pretty_assertions::assert_eq;
use rcast_session_core::{
    ApplicationId, CastConfig, CastContext, CastError, DiscoveryMode, OrchestratorState,
};

#[test]
fn test_build_requires_listener() {
    let result = CastContext::builder().build();
    assert!(matches!(result, Err(CastError::Config { .. })));
}

#[test]
fn test_build_rejects_invalid_config() {
    let mut config = CastConfig::default();
    config.orchestrator.event_channel_capacity = 0;

    let result = CastContext::builder()
        .with_config(config)
        .with_sink_listener(RecordingListener::new())
        .build();

    assert!(matches!(result, Err(CastError::Config { .. })));
}

#[test]
fn test_context_shares_one_dispatcher() {
    init_test_logging();
    let platform = FakePlatform::with_known_sinks(vec![tv()]);
    let listener = RecordingListener::new();
    let (context, mut queue) = CastContext::builder()
        .with_platform(platform.clone())
        .with_sink_listener(listener.clone())
        .build()
        .unwrap();
    let log = new_log();
    let request = FakeRequest::new("a", &log);

    context.orchestrator().request_launch(request.clone());
    request
        .take_callback()
        .session_created(FakeSession::new("s1", &log, CloseMode::Manual));
    context.aggregator().start_observing_source("cast:CC1AD845");

    assert_eq!(context.dispatcher().posted_count(), 2);
    assert_eq!(queue.run_until_idle(), 2);

    assert_eq!(context.orchestrator().state(), OrchestratorState::Active);
    assert_eq!(
        listener.take_ids(),
        vec![("cast:CC1AD845".to_string(), vec!["tv".to_string()])]
    );
}

#[test]
fn test_reset_for_testing_clears_everything() {
    init_test_logging();
    let platform = FakePlatform::new();
    let (context, mut queue) = CastContext::builder()
        .with_platform(platform.clone())
        .with_sink_listener(RecordingListener::new())
        .build()
        .unwrap();
    let log = new_log();

    context.orchestrator().request_launch(FakeRequest::new("a", &log));
    context
        .orchestrator()
        .notify_session_created(FakeSession::new("s1", &log, CloseMode::Manual));
    context.orchestrator().request_launch(FakeRequest::new("b", &log));
    context.aggregator().start_observing_source("cast:CC1AD845");
    queue.run_until_idle();
    take_log(&log);

    context.reset_for_testing();

    assert_eq!(context.orchestrator().state(), OrchestratorState::Idle);
    assert!(!context.orchestrator().has_pending_request());
    assert!(context.aggregator().observed_applications().is_empty());
    assert_eq!(platform.unregistered().len(), 1);
    assert!(take_log(&log).is_empty());

    // The next request launches from a clean slate.
    context.orchestrator().request_launch(FakeRequest::new("c", &log));
    assert_eq!(take_log(&log), vec!["c:launching", "c:start"]);
}

#[test]
fn test_builder_loads_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[orchestrator]
event_channel_capacity = 16

[discovery]
mode = "passive"
deliver_initial_snapshot = false
"#
    )
    .unwrap();

    let platform = FakePlatform::new();
    let listener = RecordingListener::new();
    let (context, mut queue) = CastContext::builder()
        .with_config_file(file.path())
        .unwrap()
        .with_platform(platform.clone())
        .with_sink_listener(listener.clone())
        .build()
        .unwrap();

    assert_eq!(context.config().orchestrator.event_channel_capacity, 16);
    assert_eq!(context.config().discovery.mode, DiscoveryMode::Passive);

    let app = ApplicationId::from("CC1AD845");
    context
        .aggregator()
        .start_observing("r1".into(), app.clone(), app.selector());
    queue.run_until_idle();

    assert_eq!(platform.registration(0).mode, DiscoveryMode::Passive);
    assert!(listener.take().is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_spawned_dispatcher() {
    let (context, queue) = CastContext::builder()
        .with_sink_listener(RecordingListener::new())
        .build()
        .unwrap();
    let handle = queue.spawn();

    context.shutdown().unwrap();
    handle.await.unwrap();

    assert!(context.dispatcher().is_closed());
    let log = new_log();
    let request = FakeRequest::new("a", &log);
    context.orchestrator().request_launch(request.clone());
    // Results can no longer be delivered; the launch stays outstanding.
    request.take_callback().launch_failed();
    assert_eq!(context.orchestrator().state(), OrchestratorState::Launching);
}
