//! Movement and responsiveness scoring from pose landmarks.
//!
//! Landmarks follow the 33-point full-body indexing scheme supplied by the
//! pose detector: indices 0-10 are head/face points, 11-16 are shoulders,
//! elbows, and wrists.

use crate::domain::ConfidenceScore;

/// Head and face landmark indices
pub const HEAD_LANDMARKS: [usize; 11] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

/// Shoulder, elbow, and wrist landmark indices
pub const ARM_LANDMARKS: [usize; 6] = [11, 12, 13, 14, 15, 16];

/// Key landmarks used for detection confidence (nose, shoulders, hips)
pub const KEY_LANDMARKS: [usize; 5] = [0, 11, 12, 23, 24];

/// A single pose landmark with normalized position and visibility weight
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Landmark {
    /// Horizontal position normalized to [0,1]
    pub x: f64,
    /// Vertical position normalized to [0,1]
    pub y: f64,
    /// Detector visibility weight [0,1]
    pub visibility: f64,
}

impl Landmark {
    /// Create a new landmark
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    /// Euclidean displacement from another landmark's position
    pub fn displacement(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Configuration for movement and responsiveness scoring
#[derive(Debug, Clone)]
pub struct MovementConfig {
    /// Minimum visibility for a landmark to contribute
    pub visibility_threshold: f64,
    /// Movement score above which the patient may be responsive
    pub movement_threshold: f64,
    /// Visible arm landmarks required (strictly more than this)
    pub min_visible_arm: usize,
    /// Visible head landmarks required (strictly more than this)
    pub min_visible_head: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
            movement_threshold: 0.1,
            min_visible_arm: 2,
            min_visible_head: 5,
        }
    }
}

/// Result of movement and responsiveness analysis
#[derive(Debug, Clone, Copy)]
pub struct MovementAnalysis {
    /// Mean landmark displacement since the previous frame
    pub movement_score: f64,
    /// Whether the patient shows responsive movement
    pub is_responsive: bool,
}

/// Scorer for patient movement and responsiveness
pub struct ResponsivenessScorer {
    config: MovementConfig,
}

impl ResponsivenessScorer {
    /// Create a new scorer
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MovementConfig::default())
    }

    /// Score movement and responsiveness for the current frame.
    ///
    /// Movement is the mean displacement over landmark pairs where both the
    /// current and previous visibility exceed the threshold; 0.0 when the
    /// previous set is absent, the sets differ in length, or no pair is
    /// mutually visible. Responsiveness additionally requires structural
    /// visibility of limbs or head; movement alone is not enough.
    pub fn score(&self, current: &[Landmark], previous: Option<&[Landmark]>) -> MovementAnalysis {
        let movement_score = self.movement_score(current, previous);

        let visible_arms = self.count_visible(current, &ARM_LANDMARKS);
        let visible_head = self.count_visible(current, &HEAD_LANDMARKS);

        let is_responsive = movement_score > self.config.movement_threshold
            && (visible_arms > self.config.min_visible_arm
                || visible_head > self.config.min_visible_head);

        MovementAnalysis {
            movement_score,
            is_responsive,
        }
    }

    fn movement_score(&self, current: &[Landmark], previous: Option<&[Landmark]>) -> f64 {
        let previous = match previous {
            Some(prev) if prev.len() == current.len() && !current.is_empty() => prev,
            _ => return 0.0,
        };

        let mut sum = 0.0;
        let mut count = 0usize;
        for (curr, prev) in current.iter().zip(previous) {
            if curr.visibility > self.config.visibility_threshold
                && prev.visibility > self.config.visibility_threshold
            {
                sum += curr.displacement(prev);
                count += 1;
            }
        }

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    fn count_visible(&self, landmarks: &[Landmark], indices: &[usize]) -> usize {
        indices
            .iter()
            .filter(|&&i| {
                landmarks
                    .get(i)
                    .is_some_and(|lm| lm.visibility > self.config.visibility_threshold)
            })
            .count()
    }
}

/// Detection confidence from the visibility of key structural landmarks
/// (nose, shoulders, hips). 0.0 when none are present.
pub fn detection_confidence(landmarks: &[Landmark]) -> ConfidenceScore {
    let visibilities: Vec<f64> = KEY_LANDMARKS
        .iter()
        .filter_map(|&i| landmarks.get(i).map(|lm| lm.visibility))
        .collect();

    if visibilities.is_empty() {
        return ConfidenceScore::new(0.0);
    }

    ConfidenceScore::new(visibilities.iter().sum::<f64>() / visibilities.len() as f64)
}
