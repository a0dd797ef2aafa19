//! Triage categories following the START field protocol.
//!
//! START (Simple Triage and Rapid Treatment) assigns one of four tags to
//! each patient in a mass casualty incident; we add UNKNOWN for the cases
//! where the visual signal is too poor to classify at all.

use std::str::FromStr;

use crate::TriageError;

/// Triage category assigned to a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TriageCategory {
    /// Immediate (Red) - life-threatening, requires immediate intervention
    Red,
    /// Delayed (Yellow) - serious but stable, can wait for treatment
    Yellow,
    /// Minor (Green) - breathing and responsive, minimal treatment needed
    Green,
    /// Deceased (Black) - no breathing for an extended period
    Black,
    /// Unknown - insufficient signal for classification
    Unknown,
}

impl TriageCategory {
    /// All valid categories, in priority order.
    pub const ALL: [TriageCategory; 5] = [
        TriageCategory::Red,
        TriageCategory::Yellow,
        TriageCategory::Green,
        TriageCategory::Black,
        TriageCategory::Unknown,
    ];

    /// Get the treatment priority level (1 = highest)
    pub fn priority(&self) -> u8 {
        match self {
            TriageCategory::Red => 1,
            TriageCategory::Yellow => 2,
            TriageCategory::Green => 3,
            TriageCategory::Black => 4,
            TriageCategory::Unknown => 5,
        }
    }

    /// Get display color as a hex code for overlay rendering
    pub fn color(&self) -> &'static str {
        match self {
            TriageCategory::Red => "#FF0000",
            TriageCategory::Yellow => "#FFFF00",
            TriageCategory::Green => "#00FF00",
            TriageCategory::Black => "#000000",
            TriageCategory::Unknown => "#808080",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            TriageCategory::Red => "Requires immediate life-saving intervention",
            TriageCategory::Yellow => "Serious but can wait for treatment",
            TriageCategory::Green => "Breathing and responsive, walking wounded",
            TriageCategory::Black => "No breathing detected for extended period",
            TriageCategory::Unknown => "Unable to determine status",
        }
    }

    /// Check if this category requires urgent attention
    pub fn is_urgent(&self) -> bool {
        matches!(self, TriageCategory::Red | TriageCategory::Yellow)
    }
}

impl std::fmt::Display for TriageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriageCategory::Red => write!(f, "RED"),
            TriageCategory::Yellow => write!(f, "YELLOW"),
            TriageCategory::Green => write!(f, "GREEN"),
            TriageCategory::Black => write!(f, "BLACK"),
            TriageCategory::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for TriageCategory {
    type Err = TriageError;

    /// Parse an operator-supplied category label.
    ///
    /// This is the validation boundary for human overrides: anything outside
    /// the fixed five-value set is rejected, never coerced to a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(TriageCategory::Red),
            "YELLOW" => Ok(TriageCategory::Yellow),
            "GREEN" => Ok(TriageCategory::Green),
            "BLACK" => Ok(TriageCategory::Black),
            "UNKNOWN" => Ok(TriageCategory::Unknown),
            other => Err(TriageError::InvalidCategory(other.to_string())),
        }
    }
}
