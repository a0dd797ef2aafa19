//! RescueLens: camera-based mass casualty triage.
//!
//! Turns a video feed of a disaster scene into per-patient START triage
//! decisions. Each detected person is tracked frame to frame; chest-region
//! motion drives a breathing estimate, pose landmarks drive a
//! responsiveness score, and optional speech transcripts contribute verbal
//! distress cues. A rule cascade combines these into a color-coded category
//! with a confidence score and a human-readable justification, and an
//! operator can override any patient's category at any time.
//!
//! [`TriagePipeline`] is the entry point; the submodules expose the
//! individual stages for hosts that need finer control:
//!
//! - [`signal`]: frame differencing and breathing estimation
//! - [`pose`]: movement and responsiveness scoring from landmarks
//! - [`audio`]: transcript keyword analysis
//! - [`engine`]: the START decision cascade and override state
//! - [`tracking`]: patient identity association and history

pub mod audio;
pub mod domain;
pub mod engine;
pub mod pose;
pub mod signal;
pub mod tracking;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;

use crate::audio::TranscriptAnalyzer;
use crate::domain::{BoundingBox, Observation, PatientId, TriageCategory, TriageDecision};
use crate::engine::{EngineConfig, TriageEngine, TriageStatistics};
use crate::pose::{detection_confidence, Landmark, MovementConfig, ResponsivenessScorer};
use crate::signal::{motion_magnitude, BreathingConfig, BreathingEstimator, Frame};
use crate::tracking::{PatientTracker, PatientTrend, TrackerConfig};

/// Errors produced by the triage pipeline
#[derive(Debug, Error)]
pub enum TriageError {
    /// A category string from an operator did not name a known category
    #[error("invalid triage category: {0}")]
    InvalidCategory(String),

    /// Frame pixel data did not match the declared dimensions
    #[error("frame shape mismatch: {0}")]
    FrameShape(String),

    /// A keyword pattern failed to compile
    #[error("keyword pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, TriageError>;

/// Configuration for the full pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Camera frame rate in frames per second
    pub frame_rate: f64,
    pub breathing: BreathingConfig,
    pub movement: MovementConfig,
    pub engine: EngineConfig,
    pub tracker: TrackerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            breathing: BreathingConfig::default(),
            movement: MovementConfig::default(),
            engine: EngineConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the camera frame rate, clamped to a sane range
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate.clamp(1.0, 120.0);
        self
    }

    /// Set the engine thresholds
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set the tracker parameters
    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }
}

struct PipelineState {
    engine: TriageEngine,
    tracker: PatientTracker,
}

/// End-to-end triage pipeline: detection in, decision out.
///
/// Internally a single lock guards the mutable engine and tracker state, so
/// a pipeline shared behind an `Arc` is safe to drive from a capture thread
/// while other threads read decisions.
pub struct TriagePipeline {
    frame_rate: f64,
    breathing: BreathingEstimator,
    movement: ResponsivenessScorer,
    audio: TranscriptAnalyzer,
    state: RwLock<PipelineState>,
}

impl TriagePipeline {
    /// Build a pipeline from configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            frame_rate: config.frame_rate,
            breathing: BreathingEstimator::new(config.breathing),
            movement: ResponsivenessScorer::new(config.movement),
            audio: TranscriptAnalyzer::new()?,
            state: RwLock::new(PipelineState {
                engine: TriageEngine::new(config.engine),
                tracker: PatientTracker::new(config.tracker, config.frame_rate),
            }),
        })
    }

    /// Build with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(PipelineConfig::default())
    }

    /// Process one detection from one frame pair.
    ///
    /// `region` is the detected person's bounding box in `current`'s pixel
    /// coordinates; `landmarks` is the pose set for that detection, empty
    /// when the pose detector found none. The detection is associated to a
    /// tracked patient by box center, its chest-region motion is appended
    /// to that patient's breathing buffer, and the triage cascade runs on
    /// the resulting observation. Stale patient tracks are swept as a side
    /// effect.
    pub fn process_observation(
        &self,
        previous: &Frame,
        current: &Frame,
        region: BoundingBox,
        landmarks: &[Landmark],
        transcript: Option<&str>,
    ) -> TriageDecision {
        let now = Utc::now();
        let audio = transcript.map(|text| self.audio.analyze(text));
        let motion = motion_magnitude(previous, current, &region.chest_region());

        let mut guard = self.state.write();
        let state = &mut *guard;

        let record = state.tracker.associate(region.center(), now);
        record.motion.push(motion);

        let breathing = self.breathing.analyze(record.motion.as_slice(), self.frame_rate);
        let movement = self
            .movement
            .score(landmarks, record.last_landmarks.as_deref());
        record.last_landmarks = Some(landmarks.to_vec());

        let observation = Observation {
            patient_id: record.id,
            timestamp: now,
            respiratory_rate: breathing.rate,
            breathing: breathing.status,
            is_responsive: movement.is_responsive,
            movement_score: movement.movement_score,
            visual_confidence: detection_confidence(landmarks),
            signal_quality: breathing.quality,
            bounding_box: region,
            center: region.center(),
        };

        let decision = state
            .engine
            .analyze(observation, audio.as_ref(), &mut record.history);

        state.tracker.sweep(now);
        decision
    }

    /// Force a patient's final category until cleared
    pub fn set_override(&self, patient_id: PatientId, category: TriageCategory) {
        self.state.write().engine.set_override(patient_id, category);
    }

    /// Force a patient's final category from an operator-supplied label.
    ///
    /// Fails on an unrecognized label without touching override state.
    pub fn set_override_label(&self, patient_id: PatientId, label: &str) -> Result<()> {
        let category: TriageCategory = label.parse()?;
        self.set_override(patient_id, category);
        Ok(())
    }

    /// Remove a patient's override; no-op when none is set
    pub fn clear_override(&self, patient_id: &PatientId) {
        self.state.write().engine.clear_override(patient_id);
    }

    /// Latest decision for a patient
    pub fn get_decision(&self, patient_id: &PatientId) -> Option<TriageDecision> {
        self.state.read().engine.decision(patient_id).cloned()
    }

    /// Latest decision for every patient
    pub fn get_all_decisions(&self) -> std::collections::HashMap<PatientId, TriageDecision> {
        self.state.read().engine.all_decisions().clone()
    }

    /// Category counts over all current decisions
    pub fn get_statistics(&self) -> TriageStatistics {
        self.state.read().engine.statistics()
    }

    /// Time-series trend for a tracked patient, `None` once the patient's
    /// track has been swept
    pub fn get_patient_trend(&self, patient_id: &PatientId) -> Option<PatientTrend> {
        self.state
            .read()
            .tracker
            .record(patient_id)
            .map(|rec| rec.history.trend())
    }

    /// Drop all pipeline state for a patient, including their decision
    pub fn remove_patient(&self, patient_id: &PatientId) {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.tracker.remove(patient_id);
        state.engine.remove_patient(patient_id);
    }
}

/// Convenient re-exports for pipeline hosts
pub mod prelude {
    pub use crate::audio::{AudioAnalysis, TranscriptAnalyzer};
    pub use crate::domain::{
        BoundingBox, BreathingStatus, ConfidenceScore, Observation, PatientId, Point2,
        RespiratoryRate, TriageCategory, TriageDecision,
    };
    pub use crate::engine::{EngineConfig, TriageEngine, TriageStatistics};
    pub use crate::pose::{Landmark, MovementConfig, ResponsivenessScorer};
    pub use crate::signal::{BreathingConfig, BreathingEstimator, Frame};
    pub use crate::tracking::{PatientTracker, PatientTrend, TrackerConfig};
    pub use crate::{PipelineConfig, Result, TriageError, TriagePipeline};
}
