//! Observation value objects produced once per frame per patient.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Unique identifier for a tracked patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PatientId(Uuid);

impl PatientId {
    /// Create a new random patient ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PatientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confidence score clamped to [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    /// Create a new confidence score, clamped to [0.0, 1.0].
    ///
    /// Non-finite inputs collapse to 0.0 so a NaN from upstream arithmetic
    /// can never escape into a decision.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    /// Get the raw value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for ConfidenceScore {
    fn default() -> Self {
        Self(0.0)
    }
}

/// A 2D point in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point2 {
    /// Horizontal pixel coordinate
    pub x: f64,
    /// Vertical pixel coordinate
    pub y: f64,
}

impl Point2 {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned bounding box in pixel coordinates (x1,y1 top-left inclusive,
/// x2,y2 bottom-right exclusive)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f64,
    /// Top edge
    pub y1: f64,
    /// Right edge
    pub x2: f64,
    /// Bottom edge
    pub y2: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width in pixels (0 if degenerate)
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Box height in pixels (0 if degenerate)
    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Center of the box
    pub fn center(&self) -> Point2 {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// The chest proxy region: the upper third of the box, where breathing
    /// motion is most visible.
    pub fn chest_region(&self) -> BoundingBox {
        BoundingBox {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y1 + self.height() / 3.0,
        }
    }
}

/// Breathing status determined from chest motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BreathingStatus {
    /// Chest motion consistent with breathing
    Breathing,
    /// No motion consistent with breathing
    NotBreathing,
    /// Not enough samples to decide either way
    Unknown,
}

/// Respiratory rate measurement.
///
/// `Unknown` is an explicit variant rather than a 0.0 sentinel so that
/// "no reliable measurement" can never be confused with a measured zero.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RespiratoryRate {
    /// A measured rate in breaths per minute
    Measured(f64),
    /// No reliable measurement available
    Unknown,
}

impl RespiratoryRate {
    /// Get the measured rate, if any
    pub fn bpm(&self) -> Option<f64> {
        match self {
            RespiratoryRate::Measured(bpm) => Some(*bpm),
            RespiratoryRate::Unknown => None,
        }
    }

    /// Whether a reliable measurement is present
    pub fn is_measured(&self) -> bool {
        matches!(self, RespiratoryRate::Measured(_))
    }

    /// Whether the measured rate is outside the 10-30 bpm normal band.
    ///
    /// Always false when the rate is unknown.
    pub fn is_abnormal(&self) -> bool {
        match self {
            RespiratoryRate::Measured(bpm) => *bpm > 30.0 || *bpm < 10.0,
            RespiratoryRate::Unknown => false,
        }
    }
}

/// One timestamped per-patient measurement bundle produced from a single frame
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Observation {
    /// Patient this observation belongs to
    pub patient_id: PatientId,
    /// When the frame was processed
    pub timestamp: DateTime<Utc>,
    /// Respiratory rate estimate
    pub respiratory_rate: RespiratoryRate,
    /// Breathing status from chest motion
    pub breathing: BreathingStatus,
    /// Whether the patient shows responsive movement
    pub is_responsive: bool,
    /// Mean landmark displacement since the previous frame [0,1]
    pub movement_score: f64,
    /// Detector confidence in the patient's visibility
    pub visual_confidence: ConfidenceScore,
    /// Confidence in the breathing-motion signal itself
    pub signal_quality: ConfidenceScore,
    /// Patient bounding box in pixel space
    pub bounding_box: BoundingBox,
    /// Center of the bounding box
    pub center: Point2,
}
