//! Patient tracking: frame-to-frame identity association, per-patient
//! signal buffers, and observation history.
//!
//! Association is spatial only. Each detection is matched to the nearest
//! known patient by bounding-box center, within a pixel radius; anything
//! farther becomes a new patient. Records not seen for a timeout are
//! evicted on [`PatientTracker::sweep`].

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{Observation, PatientId, Point2};
use crate::pose::Landmark;

/// Ring buffer of per-frame motion magnitudes for breathing analysis.
///
/// Capacity covers a fixed analysis window (5 seconds at the configured
/// frame rate); older samples are dropped as new ones arrive.
#[derive(Debug, Clone)]
pub struct MotionBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl MotionBuffer {
    /// Create a buffer sized for a 5 second window at the given frame rate
    pub fn for_frame_rate(frame_rate: f64) -> Self {
        let capacity = (frame_rate * 5.0).ceil().max(1.0) as usize;
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Buffered samples, oldest first
    pub fn as_slice(&mut self) -> &[f64] {
        self.samples.make_contiguous()
    }
}

const HISTORY_CAPACITY: usize = 10;

/// Bounded FIFO of the most recent observations for one patient
#[derive(Debug, Clone, Default)]
pub struct PatientHistory {
    observations: VecDeque<Observation>,
}

impl PatientHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation, dropping the oldest beyond capacity
    pub fn push(&mut self, observation: Observation) {
        if self.observations.len() == HISTORY_CAPACITY {
            self.observations.pop_front();
        }
        self.observations.push_back(observation);
    }

    /// Number of retained observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether no observations have been recorded
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The most recent observation, if any
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.back()
    }

    /// Up to `n` most recent observations, oldest first
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &Observation> {
        let skip = self.observations.len().saturating_sub(n);
        self.observations.iter().skip(skip)
    }

    /// Time series over the retained window, for trend display
    pub fn trend(&self) -> PatientTrend {
        let mut trend = PatientTrend::default();
        for obs in &self.observations {
            trend.timestamps.push(obs.timestamp);
            trend.breathing_rates.push(obs.respiratory_rate.bpm());
            trend.confidences.push(obs.visual_confidence.value());
            trend.movement_scores.push(obs.movement_score);
        }
        trend
    }
}

/// Parallel time series extracted from a patient's history
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PatientTrend {
    pub timestamps: Vec<DateTime<Utc>>,
    /// Measured rates in bpm; `None` where the rate was unknown
    pub breathing_rates: Vec<Option<f64>>,
    pub confidences: Vec<f64>,
    pub movement_scores: Vec<f64>,
}

/// Per-patient tracking state
#[derive(Debug, Clone)]
pub struct PatientRecord {
    pub id: PatientId,
    pub history: PatientHistory,
    pub motion: MotionBuffer,
    pub last_landmarks: Option<Vec<Landmark>>,
    pub last_seen: DateTime<Utc>,
    pub last_center: Point2,
}

impl PatientRecord {
    fn new(id: PatientId, center: Point2, now: DateTime<Utc>, frame_rate: f64) -> Self {
        Self {
            id,
            history: PatientHistory::new(),
            motion: MotionBuffer::for_frame_rate(frame_rate),
            last_landmarks: None,
            last_seen: now,
            last_center: center,
        }
    }
}

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Seconds without a detection before a record is evicted
    pub stale_timeout_secs: f64,
    /// Maximum center distance in pixels for identity association
    pub match_radius: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stale_timeout_secs: 5.0,
            match_radius: 150.0,
        }
    }
}

/// Frame-to-frame patient identity tracker
pub struct PatientTracker {
    config: TrackerConfig,
    frame_rate: f64,
    records: HashMap<PatientId, PatientRecord>,
}

impl PatientTracker {
    /// Create a tracker. `frame_rate` sizes the per-patient motion buffers.
    pub fn new(config: TrackerConfig, frame_rate: f64) -> Self {
        Self {
            config,
            frame_rate,
            records: HashMap::new(),
        }
    }

    /// Number of currently tracked patients
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no patients are tracked
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Match a detection center to a tracked patient, creating a new record
    /// when no record lies within the match radius. Updates the matched
    /// record's center and last-seen time.
    pub fn associate(&mut self, center: Point2, now: DateTime<Utc>) -> &mut PatientRecord {
        let nearest = self
            .records
            .values()
            .map(|rec| (rec.id, rec.last_center.distance_to(&center)))
            .filter(|&(_, dist)| dist <= self.config.match_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let id = match nearest {
            Some((id, _)) => id,
            None => {
                let id = PatientId::new();
                debug!(patient_id = %id, x = center.x, y = center.y, "new patient track");
                id
            }
        };

        let frame_rate = self.frame_rate;
        let record = self
            .records
            .entry(id)
            .or_insert_with(|| PatientRecord::new(id, center, now, frame_rate));
        record.last_center = center;
        record.last_seen = now;
        record
    }

    /// Mutable access to a tracked record
    pub fn record_mut(&mut self, id: &PatientId) -> Option<&mut PatientRecord> {
        self.records.get_mut(id)
    }

    /// Shared access to a tracked record
    pub fn record(&self, id: &PatientId) -> Option<&PatientRecord> {
        self.records.get(id)
    }

    /// Drop a patient's record outright
    pub fn remove(&mut self, id: &PatientId) -> Option<PatientRecord> {
        self.records.remove(id)
    }

    /// Evict records not seen within the stale timeout. Returns the ids of
    /// evicted patients so downstream state can be cleaned up.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<PatientId> {
        let timeout_ms = (self.config.stale_timeout_secs * 1000.0) as i64;
        let mut evicted = Vec::new();
        self.records.retain(|id, rec| {
            let age_ms = now.signed_duration_since(rec.last_seen).num_milliseconds();
            if age_ms > timeout_ms {
                debug!(patient_id = %id, age_ms, "evicting stale patient track");
                evicted.push(*id);
                false
            } else {
                true
            }
        });
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoundingBox, BreathingStatus, ConfidenceScore, RespiratoryRate};
    use chrono::Duration;

    fn observation(id: PatientId, at: DateTime<Utc>, rate: RespiratoryRate) -> Observation {
        Observation {
            patient_id: id,
            timestamp: at,
            respiratory_rate: rate,
            breathing: BreathingStatus::Breathing,
            is_responsive: true,
            movement_score: 0.05,
            visual_confidence: ConfidenceScore::new(0.8),
            signal_quality: ConfidenceScore::new(0.6),
            bounding_box: BoundingBox::new(0.0, 0.0, 100.0, 200.0),
            center: Point2::new(50.0, 100.0),
        }
    }

    #[test]
    fn test_motion_buffer_evicts_oldest() {
        let mut buffer = MotionBuffer::for_frame_rate(1.0);
        assert_eq!(buffer.capacity, 5);
        for i in 0..8 {
            buffer.push(i as f64);
        }
        assert_eq!(buffer.as_slice(), &[3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_history_capacity_is_bounded() {
        let id = PatientId::new();
        let start = Utc::now();
        let mut history = PatientHistory::new();
        for i in 0..15 {
            history.push(observation(
                id,
                start + Duration::seconds(i),
                RespiratoryRate::Measured(i as f64),
            ));
        }
        assert_eq!(history.len(), 10);
        // Oldest retained entry is the sixth pushed
        let first = history.last_n(10).next().unwrap();
        assert_eq!(first.respiratory_rate.bpm(), Some(5.0));
        assert_eq!(history.latest().unwrap().respiratory_rate.bpm(), Some(14.0));
    }

    #[test]
    fn test_last_n_returns_tail_in_order() {
        let id = PatientId::new();
        let start = Utc::now();
        let mut history = PatientHistory::new();
        for i in 0..5 {
            history.push(observation(
                id,
                start + Duration::seconds(i),
                RespiratoryRate::Measured(i as f64),
            ));
        }
        let rates: Vec<_> = history
            .last_n(3)
            .map(|o| o.respiratory_rate.bpm().unwrap())
            .collect();
        assert_eq!(rates, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_trend_preserves_unknown_rates() {
        let id = PatientId::new();
        let start = Utc::now();
        let mut history = PatientHistory::new();
        history.push(observation(id, start, RespiratoryRate::Unknown));
        history.push(observation(
            id,
            start + Duration::seconds(1),
            RespiratoryRate::Measured(16.0),
        ));

        let trend = history.trend();
        assert_eq!(trend.breathing_rates, vec![None, Some(16.0)]);
        assert_eq!(trend.timestamps.len(), 2);
    }

    #[test]
    fn test_association_reuses_nearby_track() {
        let mut tracker = PatientTracker::new(TrackerConfig::default(), 30.0);
        let now = Utc::now();

        let first = tracker.associate(Point2::new(100.0, 100.0), now).id;
        let second = tracker
            .associate(Point2::new(130.0, 120.0), now + Duration::milliseconds(33))
            .id;
        assert_eq!(first, second);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_association_creates_distant_track() {
        let mut tracker = PatientTracker::new(TrackerConfig::default(), 30.0);
        let now = Utc::now();

        let first = tracker.associate(Point2::new(100.0, 100.0), now).id;
        let second = tracker.associate(Point2::new(600.0, 100.0), now).id;
        assert_ne!(first, second);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_association_picks_nearest_of_two() {
        let mut tracker = PatientTracker::new(TrackerConfig::default(), 30.0);
        let now = Utc::now();

        let left = tracker.associate(Point2::new(100.0, 100.0), now).id;
        let right = tracker.associate(Point2::new(400.0, 100.0), now).id;

        let matched = tracker.associate(Point2::new(380.0, 110.0), now).id;
        assert_eq!(matched, right);
        assert_ne!(matched, left);
    }

    #[test]
    fn test_sweep_evicts_stale_tracks() {
        let mut tracker = PatientTracker::new(TrackerConfig::default(), 30.0);
        let now = Utc::now();

        let stale = tracker.associate(Point2::new(100.0, 100.0), now).id;
        let fresh = tracker
            .associate(Point2::new(600.0, 100.0), now + Duration::seconds(4))
            .id;

        let evicted = tracker.sweep(now + Duration::seconds(6));
        assert_eq!(evicted, vec![stale]);
        assert!(tracker.record(&fresh).is_some());
        assert!(tracker.record(&stale).is_none());
    }
}
