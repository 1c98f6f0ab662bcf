// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

//! Detection quality on a synthetic workload.
//!
//! Feeds the analyzer a seeded stream of baseline traffic with periodic
//! injected spikes and checks recall and false-positive rate. The stream is
//! deterministic, so the assertions are stable across runs.

use driftwatch_core::StreamingAnalyzer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOTAL_POINTS: usize = 2000;
const WARMUP_POINTS: usize = 200;
const BASELINE_MEAN: f64 = 200.0;
const BASELINE_JITTER: f64 = 5.0;
const SPIKE_MEAN: f64 = 345.0;
const SPIKE_JITTER: f64 = 15.0;
const SPIKE_PERIOD: usize = 10;

#[test]
fn synthetic_spikes_detected_with_low_false_positive_rate() {
    let mut rng = StdRng::seed_from_u64(42);
    let analyzer = StreamingAnalyzer::new(50);

    let mut true_positives = 0usize;
    let mut false_negatives = 0usize;
    let mut false_positives = 0usize;
    let mut normals_after_warmup = 0usize;

    for i in 0..TOTAL_POINTS {
        let is_spike =
            i >= WARMUP_POINTS && (i - WARMUP_POINTS) % SPIKE_PERIOD == SPIKE_PERIOD - 1;
        let value = if is_spike {
            SPIKE_MEAN + rng.gen_range(-SPIKE_JITTER..SPIKE_JITTER)
        } else {
            BASELINE_MEAN + rng.gen_range(-BASELINE_JITTER..BASELINE_JITTER)
        };

        let snapshot = analyzer.add_sample(value);

        if i < WARMUP_POINTS {
            continue;
        }
        if is_spike {
            if snapshot.is_anomaly {
                true_positives += 1;
            } else {
                false_negatives += 1;
            }
        } else {
            normals_after_warmup += 1;
            if snapshot.is_anomaly {
                false_positives += 1;
            }
        }
    }

    let spikes = true_positives + false_negatives;
    assert!(spikes > 0, "workload generated no spikes");

    let recall = true_positives as f64 / spikes as f64;
    let fp_rate = false_positives as f64 / normals_after_warmup as f64;

    assert!(
        recall >= 0.7,
        "recall too low: {recall:.3} ({true_positives}/{spikes} spikes flagged)"
    );
    assert!(
        fp_rate <= 0.1,
        "false-positive rate too high: {fp_rate:.3} ({false_positives}/{normals_after_warmup} normals flagged)"
    );
}

#[test]
fn steady_stream_produces_no_anomalies() {
    let mut rng = StdRng::seed_from_u64(7);
    let analyzer = StreamingAnalyzer::new(50);

    for _ in 0..500 {
        analyzer.add_sample(100.0 + rng.gen_range(-1.0..1.0));
    }

    // Tight jitter around a flat baseline; nothing should cross 2 sigma
    // often enough to matter. Allow a tiny residue from unlucky draws.
    let snapshot = analyzer.snapshot();
    assert!(
        snapshot.anomaly_count <= 25,
        "too many anomalies on a steady stream: {}",
        snapshot.anomaly_count
    );
}
