//! Integration tests for the orchestration engine.
//!
//! Exercises the full run lifecycle end to end: loading signal discipline,
//! multicast delivery to early and late subscribers, failure normalization
//! on both catch layers, backpressure, and cancellation silence.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::StreamExt;
use opcast_core::{Envelope, Failure, LoadingPolicy, RequestDescriptor, code};
use opcast_runtime::{Orchestrator, ResultsReceiver, Scope};
use opcast_testing::{RecordingSink, producers, test_messages};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;

// ============================================================================
// Test Fixtures
// ============================================================================

/// One engine wired to a recording sink, plus the scope runs live on.
fn harness() -> (Arc<RecordingSink>, Orchestrator, Scope) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let sink = RecordingSink::arc();
    let orchestrator = Orchestrator::new(Arc::<RecordingSink>::clone(&sink));
    (sink, orchestrator, Scope::new())
}

/// Receives one envelope with a guard against a hung run.
async fn recv_within<T: Clone>(rx: &mut ResultsReceiver<T>) -> Option<Envelope<T>> {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for an envelope")
}

/// Unwraps the next envelope as a success value.
async fn expect_success<T: Clone + std::fmt::Debug>(rx: &mut ResultsReceiver<T>) -> T {
    match recv_within(rx).await {
        Some(Envelope::Success(value)) => value,
        other => panic!("expected a success envelope, got {other:?}"),
    }
}

/// Unwraps the next envelope as an error status code.
async fn expect_error_code<T: Clone + std::fmt::Debug>(rx: &mut ResultsReceiver<T>) -> u16 {
    match recv_within(rx).await {
        Some(Envelope::Error(status)) => status.code(),
        other => panic!("expected an error envelope, got {other:?}"),
    }
}

// ============================================================================
// Loading signal discipline
// ============================================================================

/// A dialog run that emits once: Loading(true), Success, Loading(false),
/// channel end, no error.
#[tokio::test]
async fn dialog_run_emits_once_and_toggles_loading() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .once(|_token| async { Ok("A".to_owned()) })
        .loading_policy(LoadingPolicy::Dialog)
        .replay(1)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    assert_eq!(expect_success(&mut rx).await, "A");
    assert!(recv_within(&mut rx).await.is_none(), "channel ends with no error");

    scope.join().await;
    assert_eq!(sink.visibility_sequence(), vec![true, false]);
    assert!(sink.page_events().is_empty());
}

/// The shown signal carries the run's cancel handle and the descriptor's
/// message; the hidden signal carries neither.
#[tokio::test]
async fn shown_signal_carries_scope_and_message() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .once(|_token| async { Ok(1_u32) })
        .loading_policy(LoadingPolicy::Dialog)
        .loading_message("Signing in…")
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();
    let _ = expect_success(&mut rx).await;
    scope.join().await;

    let events = sink.loading_events();
    assert_eq!(events.len(), 2);
    assert!(events[0].visible);
    assert!(events[0].scope.is_some());
    assert_eq!(events[0].message, "Signing in…");
    assert!(!events[1].visible);
    assert!(events[1].scope.is_none());
}

/// Exactly two loading events per run no matter how many results the
/// producer emits — a polling producer must not flicker the indicator.
#[tokio::test]
async fn multi_emission_run_still_toggles_loading_twice() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_complete(vec![1_u32, 2, 3]))
        .loading_policy(LoadingPolicy::Inline)
        .replay(3)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    assert_eq!(expect_success(&mut rx).await, 1);
    assert_eq!(expect_success(&mut rx).await, 2);
    assert_eq!(expect_success(&mut rx).await, 3);
    assert!(recv_within(&mut rx).await.is_none());

    scope.join().await;
    assert_eq!(sink.visibility_sequence(), vec![true, false]);
}

/// Policy `None` keeps the run invisible: no loading events at all.
#[tokio::test]
async fn policy_none_emits_no_loading_signals() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_complete(vec![7_u32]))
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();
    assert_eq!(expect_success(&mut rx).await, 7);
    assert!(recv_within(&mut rx).await.is_none());

    scope.join().await;
    assert!(sink.loading_events().is_empty());
    assert!(sink.page_events().is_empty());
}

// ============================================================================
// Failure normalization
// ============================================================================

/// A producer failing after k emissions delivers k successes, then exactly
/// one error envelope, then nothing.
#[tokio::test]
async fn mid_stream_failure_reports_exactly_once() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_fail(
            vec![1_u32, 2],
            Failure::new(500, "backend exploded"),
        ))
        .loading_policy(LoadingPolicy::Dialog)
        .replay(4)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    assert_eq!(expect_success(&mut rx).await, 1);
    assert_eq!(expect_success(&mut rx).await, 2);
    assert_eq!(expect_error_code(&mut rx).await, 500);
    assert!(recv_within(&mut rx).await.is_none(), "nothing follows the terminal error");

    scope.join().await;
    assert_eq!(sink.visibility_sequence(), vec![true, false]);
}

/// A timeout-style failure before the stream begins: Loading(true),
/// Loading(false), Error(408).
#[tokio::test]
async fn outer_failure_maps_to_timeout_status() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::fail_before_stream::<u32>(Failure::timeout(
            "request timed out",
        )))
        .loading_policy(LoadingPolicy::Dialog)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    match recv_within(&mut rx).await {
        Some(Envelope::Error(status)) => {
            assert_eq!(status.code(), code::TIMEOUT);
            assert_eq!(status.policy(), LoadingPolicy::Dialog);
            assert!(status.cause().is_some());
        }
        other => panic!("expected an error envelope, got {other:?}"),
    }
    assert!(recv_within(&mut rx).await.is_none());

    scope.join().await;
    assert_eq!(sink.visibility_sequence(), vec![true, false]);
}

/// Full-page runs route their failure to the page-state signal as well as
/// the result channel.
#[tokio::test]
async fn full_page_failure_routes_page_state() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::fail_before_stream::<u32>(Failure::new(
            503,
            "service unavailable",
        )))
        .loading_policy(LoadingPolicy::FullPage)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();
    assert_eq!(expect_error_code(&mut rx).await, 503);
    scope.join().await;

    let pages = sink.page_events();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status().map(|s| s.code()), Some(503));
}

/// Full-page runs that complete cleanly publish the content transition.
#[tokio::test]
async fn full_page_success_publishes_content() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_complete(vec!["ok".to_owned()]))
        .loading_policy(LoadingPolicy::FullPage)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();
    assert_eq!(expect_success(&mut rx).await, "ok");
    assert!(recv_within(&mut rx).await.is_none());
    scope.join().await;

    let pages = sink.page_events();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].is_content());
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cancelling mid-run terminates silently: no error envelope, no
/// error-path loading hide — the indicator is the scope teardown's business.
#[tokio::test]
async fn cancellation_produces_no_error_envelope() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_hang(vec![1_u32]))
        .loading_policy(LoadingPolicy::Dialog)
        .replay(1)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    // The run is alive and has delivered its first value.
    assert_eq!(expect_success(&mut rx).await, 1);

    scope.cancel();
    scope.join().await;

    // Channel closes with no further envelopes, error included.
    assert!(recv_within(&mut rx).await.is_none());
    assert_eq!(sink.visibility_sequence(), vec![true]);
    assert!(sink.page_events().is_empty());
}

/// A run spawned on an already-cancelled scope does nothing at all.
#[tokio::test]
async fn run_on_cancelled_scope_is_silent() {
    let (sink, orchestrator, scope) = harness();
    scope.cancel();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_complete(vec![1_u32]))
        .loading_policy(LoadingPolicy::Dialog)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    assert!(recv_within(&mut rx).await.is_none());
    scope.join().await;
    assert!(sink.loading_events().is_empty());
}

/// Cancelling through the token carried by the shown loading signal tears
/// down exactly that run — the dialog-cancel-button path.
#[tokio::test]
async fn loading_signal_scope_cancels_the_run() {
    let (sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_hang(Vec::<u32>::new()))
        .loading_policy(LoadingPolicy::Dialog)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    // Let the run publish its shown signal, then cancel through it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let events = sink.loading_events();
    assert_eq!(events.len(), 1);
    events[0].scope.as_ref().unwrap().cancel();

    scope.join().await;
    assert!(recv_within(&mut rx).await.is_none());
    assert!(!scope.is_cancelled(), "cancelling one run leaves the scope alive");
}

// ============================================================================
// Multicast delivery
// ============================================================================

/// Two subscribers attached before the first emission both receive every
/// envelope in order.
#[tokio::test]
async fn every_early_subscriber_sees_all_envelopes() {
    let (_sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_complete(vec![1_u32, 2]))
        .replay(0)
        .extra_buffer(4)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx1 = results.subscribe();
    let mut rx2 = results.subscribe();

    for rx in [&mut rx1, &mut rx2] {
        assert_eq!(expect_success(rx).await, 1);
        assert_eq!(expect_success(rx).await, 2);
        assert!(recv_within(rx).await.is_none());
    }
    scope.join().await;
}

/// A subscriber attaching after the run finished receives the replay
/// suffix: with `replay = 1` and three prior pushes, exactly the third.
#[tokio::test]
async fn late_subscriber_gets_the_most_recent_envelope() {
    let (_sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_complete(vec![10_u32, 20, 30]))
        .replay(1)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    scope.join().await;

    let mut rx = results.subscribe();
    assert_eq!(expect_success(&mut rx).await, 30);
    assert!(recv_within(&mut rx).await.is_none());
}

/// With `replay = 0` and `extra_buffer = 1`, a second push suspends the
/// producer until the attached subscriber drains; nothing is dropped.
#[tokio::test]
async fn full_buffer_backpressures_the_producer() {
    let (_sink, orchestrator, scope) = harness();

    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(move |_token| async move {
            let stream = async_stream::stream! {
                for value in 1..=3_u32 {
                    counter.fetch_add(1, Ordering::SeqCst);
                    yield Ok(value);
                }
            };
            Ok(stream.boxed())
        })
        .replay(0)
        .extra_buffer(1)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut rx = results.subscribe();

    // First value is buffered; the producer parks trying to emit the second.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(produced.load(Ordering::SeqCst), 2);

    // Draining one frees the slot and the producer advances by one.
    assert_eq!(expect_success(&mut rx).await, 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(produced.load(Ordering::SeqCst), 3);

    assert_eq!(expect_success(&mut rx).await, 2);
    assert_eq!(expect_success(&mut rx).await, 3);
    assert!(recv_within(&mut rx).await.is_none());
    scope.join().await;
}

/// Detaching a subscriber never disturbs the producer or its siblings.
#[tokio::test]
async fn detaching_one_subscriber_leaves_the_rest_running() {
    let (_sink, orchestrator, scope) = harness();

    let descriptor = RequestDescriptor::builder(&test_messages())
        .producer(producers::emit_then_complete(vec![1_u32, 2, 3]))
        .replay(0)
        .extra_buffer(1)
        .build()
        .unwrap();

    let results = orchestrator.run(&scope, descriptor);
    let mut keeper = results.subscribe();
    let quitter = results.subscribe();

    assert_eq!(expect_success(&mut keeper).await, 1);
    drop(quitter);

    assert_eq!(expect_success(&mut keeper).await, 2);
    assert_eq!(expect_success(&mut keeper).await, 3);
    assert!(recv_within(&mut keeper).await.is_none());
    scope.join().await;
}
