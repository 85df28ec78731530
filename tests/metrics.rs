#![cfg(feature = "metrics")]
//! Tests for `numwire` metrics helpers.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use numwire::{dtype::Dtype, error::ErrorKind, metrics as m};
use rstest::rstest;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter_with_label(snapshotter: &Snapshotter, name: &str, label: (&str, &str)) -> Option<u64> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(k, _, _, v)| {
            let key = k.key();
            let matches = key.name() == name
                && key.labels().any(|l| l.key() == label.0 && l.value() == label.1);
            match v {
                DebugValue::Counter(c) if matches => Some(c),
                _ => None,
            }
        })
}

#[test]
fn frame_counter_increments() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        m::inc_frames();
        m::inc_frames();
    });

    let found = snapshotter.snapshot().into_vec().iter().any(|(k, _, _, v)| {
        k.key().name() == m::FRAMES_RECEIVED && matches!(v, DebugValue::Counter(2))
    });
    assert!(found, "frame counter not recorded");
}

#[rstest]
#[case(Dtype::Int8, "int8")]
#[case(Dtype::Float64, "float64")]
fn sequence_counter_is_labelled_by_dtype(#[case] dtype: Dtype, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || m::inc_sequences(dtype));

    assert_eq!(
        counter_with_label(&snapshotter, m::SEQUENCES_DECODED, ("dtype", label)),
        Some(1)
    );
}

#[rstest]
#[case(ErrorKind::Protocol, "protocol")]
#[case(ErrorKind::IdleTimeout, "idle_timeout")]
fn session_error_counter_is_labelled_by_kind(#[case] kind: ErrorKind, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || m::inc_session_errors(kind));

    assert_eq!(
        counter_with_label(&snapshotter, m::SESSION_ERRORS, ("kind", label)),
        Some(1)
    );
}

#[test]
fn session_gauge_tracks_live_sessions() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        m::inc_sessions();
        m::inc_sessions();
        m::dec_sessions();
    });

    let found = snapshotter.snapshot().into_vec().iter().any(|(k, _, _, v)| {
        k.key().name() == m::SESSIONS_ACTIVE
            && matches!(v, DebugValue::Gauge(g) if (g.into_inner() - 1.0).abs() < f64::EPSILON)
    });
    assert!(found, "session gauge not recorded");
}
