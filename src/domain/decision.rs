//! Triage decisions with confidence, reasoning, and override provenance.

use chrono::{DateTime, Utc};

use super::{ConfidenceScore, PatientId, TriageCategory};

/// A triage decision for one patient at one point in time.
///
/// Immutable once created. The automatic suggestion and its reasoning are
/// always retained even when a human override is in effect, so the
/// provenance of the final category is never lost.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TriageDecision {
    /// Patient this decision applies to
    pub patient_id: PatientId,
    /// When the decision was made
    pub timestamp: DateTime<Utc>,
    /// The automatic category suggestion from the rule cascade
    pub suggestion: TriageCategory,
    /// Blended confidence in the suggestion [0,1]
    pub confidence: ConfidenceScore,
    /// Human-readable justification for the suggestion
    pub reasoning: String,
    /// Operator-supplied override, if one was active
    pub human_override: Option<TriageCategory>,
    /// Resolved category: the override when present, else the suggestion
    pub final_category: TriageCategory,
}

impl TriageDecision {
    /// Create a decision, resolving the final category from the override.
    pub fn new(
        patient_id: PatientId,
        timestamp: DateTime<Utc>,
        suggestion: TriageCategory,
        confidence: ConfidenceScore,
        reasoning: String,
        human_override: Option<TriageCategory>,
    ) -> Self {
        let final_category = human_override.unwrap_or(suggestion);
        Self {
            patient_id,
            timestamp,
            suggestion,
            confidence,
            reasoning,
            human_override,
            final_category,
        }
    }

    /// Whether an operator override determined the final category
    pub fn is_overridden(&self) -> bool {
        self.human_override.is_some()
    }
}
