//! Performance benchmarks for the triage pipeline.
//!
//! Run with: cargo bench
//!
//! Benchmarks cover:
//! - Motion extraction from frame pairs
//! - Breathing estimation at various buffer lengths
//! - The decision cascade
//! - The full per-detection pipeline step

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::f64::consts::PI;

use chrono::Utc;
use ndarray::Array2;

use rescuelens::domain::{
    BoundingBox, BreathingStatus, ConfidenceScore, Observation, PatientId, Point2,
    RespiratoryRate,
};
use rescuelens::engine::TriageEngine;
use rescuelens::pose::Landmark;
use rescuelens::signal::{motion_magnitude, BreathingEstimator, Frame};
use rescuelens::tracking::PatientHistory;
use rescuelens::TriagePipeline;

/// Sinusoidal chest-motion signal at the given rate
fn breathing_signal(rate_bpm: f64, frame_rate: f64, duration_secs: f64) -> Vec<f64> {
    let num_samples = (frame_rate * duration_secs) as usize;
    let freq = rate_bpm / 60.0;
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / frame_rate;
            6.0 + 4.0 * (2.0 * PI * freq * t).sin()
        })
        .collect()
}

fn gradient_frame(width: usize, height: usize, offset: f32) -> Frame {
    Frame::from_luminance(Array2::from_shape_fn((height, width), |(y, x)| {
        ((x + y) as f32 + offset) % 256.0
    }))
}

fn observation() -> Observation {
    Observation {
        patient_id: PatientId::new(),
        timestamp: Utc::now(),
        respiratory_rate: RespiratoryRate::Measured(16.0),
        breathing: BreathingStatus::Breathing,
        is_responsive: true,
        movement_score: 0.05,
        visual_confidence: ConfidenceScore::new(0.8),
        signal_quality: ConfidenceScore::new(0.6),
        bounding_box: BoundingBox::new(100.0, 50.0, 300.0, 400.0),
        center: Point2::new(200.0, 225.0),
    }
}

fn bench_motion_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion_extraction");

    for size in [64usize, 256, 640] {
        let previous = gradient_frame(size, size, 0.0);
        let current = gradient_frame(size, size, 3.0);
        let region = BoundingBox::new(0.0, 0.0, size as f64, size as f64 / 3.0);

        group.throughput(Throughput::Elements((size * size / 3) as u64));
        group.bench_with_input(
            BenchmarkId::new("frame_diff", format!("{size}x{size}")),
            &size,
            |b, _| {
                b.iter(|| motion_magnitude(black_box(&previous), black_box(&current), &region))
            },
        );
    }

    group.finish();
}

fn bench_breathing_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("breathing_estimation");
    let estimator = BreathingEstimator::with_defaults();

    for duration in [1.0, 3.0, 5.0] {
        let signal = breathing_signal(15.0, 30.0, duration);
        group.throughput(Throughput::Elements(signal.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("analyze", format!("{}s", duration as u32)),
            &signal,
            |b, signal| b.iter(|| estimator.analyze(black_box(signal), 30.0)),
        );
    }

    group.finish();
}

fn bench_decision_cascade(c: &mut Criterion) {
    c.bench_function("decision_cascade", |b| {
        let mut engine = TriageEngine::with_defaults();
        let mut history = PatientHistory::new();
        let obs = observation();
        b.iter(|| engine.analyze(black_box(obs.clone()), None, &mut history))
    });
}

fn bench_pipeline_step(c: &mut Criterion) {
    let pipeline = TriagePipeline::with_defaults().unwrap();
    let previous = gradient_frame(640, 480, 0.0);
    let current = gradient_frame(640, 480, 3.0);
    let region = BoundingBox::new(100.0, 50.0, 300.0, 400.0);
    let landmarks: Vec<Landmark> = (0..33).map(|_| Landmark::new(0.5, 0.5, 0.9)).collect();

    c.bench_function("pipeline_step", |b| {
        b.iter(|| {
            pipeline.process_observation(
                black_box(&previous),
                black_box(&current),
                region,
                &landmarks,
                None,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_motion_extraction,
    bench_breathing_estimation,
    bench_decision_cascade,
    bench_pipeline_step
);
criterion_main!(benches);
