//! Domain value objects for the triage pipeline.

pub mod category;
pub mod decision;
pub mod observation;

pub use category::TriageCategory;
pub use decision::TriageDecision;
pub use observation::{
    BoundingBox, BreathingStatus, ConfidenceScore, Observation, PatientId, Point2,
    RespiratoryRate,
};
