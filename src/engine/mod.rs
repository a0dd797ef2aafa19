//! START-protocol triage decision engine.
//!
//! Applies a fixed rule cascade to each patient observation, earliest
//! matching rule wins: reliability gate, verbal distress override, breathing
//! rules, respiratory rate, responsiveness. A human override always replaces
//! the suggested category in the final decision but never stops the cascade
//! from producing its suggestion.

use std::collections::HashMap;

use tracing::info;

use crate::audio::AudioAnalysis;
use crate::domain::{
    BreathingStatus, ConfidenceScore, Observation, PatientId, TriageCategory, TriageDecision,
};
use crate::tracking::PatientHistory;

/// Thresholds for the decision cascade and confidence blend
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Below this breathing signal quality the observation is unreliable
    pub min_signal_quality: f64,
    /// Below this visual detection confidence the observation is unreliable
    pub min_visual_confidence: f64,
    /// Audio is ignored entirely at or below this transcript confidence
    pub audio_confidence_floor: f64,
    /// Distress score above which audio forces an immediate RED
    pub distress_override: f64,
    /// Distress score above which audio is noted in the reasoning
    pub moderate_distress: f64,
    /// Comfort score above which audio is noted in the reasoning
    pub comfort_note: f64,
    /// Observations examined for sustained absence of breathing
    pub sustained_window: usize,
    /// Non-breathing observations within the window that imply BLACK
    pub sustained_required: usize,
    /// Observations examined for temporal consistency
    pub consistency_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_signal_quality: 0.05,
            min_visual_confidence: 0.1,
            audio_confidence_floor: 0.3,
            distress_override: 0.7,
            moderate_distress: 0.4,
            comfort_note: 0.5,
            sustained_window: 5,
            sustained_required: 4,
            consistency_window: 3,
        }
    }
}

/// Category counts across all current decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TriageStatistics {
    pub red: usize,
    pub yellow: usize,
    pub green: usize,
    pub black: usize,
    pub unknown: usize,
}

impl TriageStatistics {
    /// Total number of patients with a decision
    pub fn total(&self) -> usize {
        self.red + self.yellow + self.green + self.black + self.unknown
    }
}

/// Triage decision engine with per-patient override state
pub struct TriageEngine {
    config: EngineConfig,
    decisions: HashMap<PatientId, TriageDecision>,
    overrides: HashMap<PatientId, TriageCategory>,
}

impl TriageEngine {
    /// Create an engine with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            decisions: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Create with default thresholds
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Record an observation and produce the triage decision for it.
    ///
    /// The observation joins the patient's history before the cascade runs,
    /// so windowed rules (sustained no-breathing, consistency) see it.
    pub fn analyze(
        &mut self,
        observation: Observation,
        audio: Option<&AudioAnalysis>,
        history: &mut PatientHistory,
    ) -> TriageDecision {
        history.push(observation.clone());

        let confidence = self.blend_confidence(&observation, history, audio);
        let (suggestion, reasoning) = self.run_cascade(&observation, history, audio);

        let human_override = self.overrides.get(&observation.patient_id).copied();
        let decision = TriageDecision::new(
            observation.patient_id,
            observation.timestamp,
            suggestion,
            confidence,
            reasoning,
            human_override,
        );

        let previous = self.decisions.get(&observation.patient_id);
        if previous.map(|d| d.final_category) != Some(decision.final_category) {
            info!(
                patient_id = %decision.patient_id,
                category = %decision.final_category,
                confidence = decision.confidence.value(),
                reasoning = %decision.reasoning,
                "triage category changed"
            );
        }

        self.decisions
            .insert(observation.patient_id, decision.clone());
        decision
    }

    fn run_cascade(
        &self,
        obs: &Observation,
        history: &PatientHistory,
        audio: Option<&AudioAnalysis>,
    ) -> (TriageCategory, String) {
        // Reliability gate: an unreliable observation yields no clinical
        // judgement at all, and no audio annotation either.
        if obs.signal_quality.value() < self.config.min_signal_quality
            || obs.visual_confidence.value() < self.config.min_visual_confidence
        {
            return (
                TriageCategory::Unknown,
                format!(
                    "Poor signal quality (SQ: {:.2}, Vis: {:.2})",
                    obs.signal_quality.value(),
                    obs.visual_confidence.value()
                ),
            );
        }

        let audio = audio.filter(|a| a.confidence > self.config.audio_confidence_floor);
        let mut audio_note = String::new();
        if let Some(audio) = audio {
            if audio.distress_score > self.config.distress_override {
                return (
                    TriageCategory::Red,
                    format!(
                        "High distress audio detected: {}",
                        audio.keywords.join(", ")
                    ),
                );
            } else if audio.distress_score > self.config.moderate_distress {
                audio_note = format!("Distress audio: {}", audio.keywords.join(", "));
            } else if audio.comfort_score > self.config.comfort_note {
                audio_note = format!("Comfort audio: {}", audio.keywords.join(", "));
            }
        }

        let annotate = |reason: &str| {
            if audio_note.is_empty() {
                reason.to_string()
            } else {
                format!("{reason} | {audio_note}")
            }
        };

        if obs.breathing == BreathingStatus::NotBreathing {
            return if self.sustained_no_breathing(history) {
                (
                    TriageCategory::Black,
                    annotate("No breathing detected for extended period"),
                )
            } else {
                (TriageCategory::Red, annotate("No breathing detected"))
            };
        }

        if let Some(rr) = obs.respiratory_rate.bpm() {
            if obs.respiratory_rate.is_abnormal() {
                return (
                    TriageCategory::Red,
                    annotate(&format!("Abnormal respiratory rate: {rr:.1} bpm")),
                );
            }
        } else {
            return match obs.breathing {
                BreathingStatus::Breathing if !obs.is_responsive => (
                    TriageCategory::Yellow,
                    annotate("Breathing but unresponsive (RR unknown)"),
                ),
                BreathingStatus::Breathing => (
                    TriageCategory::Green,
                    annotate("Breathing and responsive (RR unknown)"),
                ),
                _ => (
                    TriageCategory::Unknown,
                    annotate("Unable to determine breathing status"),
                ),
            };
        }

        if !obs.is_responsive {
            (
                TriageCategory::Yellow,
                annotate("Breathing but unresponsive"),
            )
        } else {
            (TriageCategory::Green, annotate("Breathing and responsive"))
        }
    }

    /// Blend of visual confidence, signal quality, temporal consistency,
    /// movement strength, and audio confidence.
    fn blend_confidence(
        &self,
        obs: &Observation,
        history: &PatientHistory,
        audio: Option<&AudioAnalysis>,
    ) -> ConfidenceScore {
        let consistency = self.temporal_consistency(history);
        let movement_strength = (obs.movement_score * 10.0).min(1.0);
        let audio_confidence = audio
            .filter(|a| a.confidence > self.config.audio_confidence_floor)
            .map_or(0.0, |a| a.confidence);

        ConfidenceScore::new(
            obs.visual_confidence.value() * 0.25
                + obs.signal_quality.value() * 0.35
                + consistency * 0.2
                + movement_strength * 0.1
                + audio_confidence * 0.1,
        )
    }

    /// Fraction of the recent window agreeing with its own modal value,
    /// averaged over breathing status and responsiveness. 1.0 until the
    /// window is full.
    fn temporal_consistency(&self, history: &PatientHistory) -> f64 {
        let window = self.config.consistency_window;
        if history.len() < window {
            return 1.0;
        }

        let recent: Vec<&Observation> = history.last_n(window).collect();

        let breathing = modal_fraction(recent.iter().map(|o| o.breathing));
        let responsive = modal_fraction(recent.iter().map(|o| o.is_responsive));
        (breathing + responsive) / 2.0
    }

    fn sustained_no_breathing(&self, history: &PatientHistory) -> bool {
        if history.len() < self.config.sustained_window {
            return false;
        }
        let absent = history
            .last_n(self.config.sustained_window)
            .filter(|o| o.breathing == BreathingStatus::NotBreathing)
            .count();
        absent >= self.config.sustained_required
    }

    /// Force a patient's final category. Applies from the next decision on.
    pub fn set_override(&mut self, patient_id: PatientId, category: TriageCategory) {
        info!(patient_id = %patient_id, category = %category, "human override set");
        self.overrides.insert(patient_id, category);
    }

    /// Remove a patient's override; no-op when none is set
    pub fn clear_override(&mut self, patient_id: &PatientId) {
        if self.overrides.remove(patient_id).is_some() {
            info!(patient_id = %patient_id, "human override cleared");
        }
    }

    /// Latest decision for a patient
    pub fn decision(&self, patient_id: &PatientId) -> Option<&TriageDecision> {
        self.decisions.get(patient_id)
    }

    /// Latest decision per patient
    pub fn all_decisions(&self) -> &HashMap<PatientId, TriageDecision> {
        &self.decisions
    }

    /// Category counts over final decisions
    pub fn statistics(&self) -> TriageStatistics {
        let mut stats = TriageStatistics::default();
        for decision in self.decisions.values() {
            match decision.final_category {
                TriageCategory::Red => stats.red += 1,
                TriageCategory::Yellow => stats.yellow += 1,
                TriageCategory::Green => stats.green += 1,
                TriageCategory::Black => stats.black += 1,
                TriageCategory::Unknown => stats.unknown += 1,
            }
        }
        stats
    }

    /// Drop all engine state for a patient
    pub fn remove_patient(&mut self, patient_id: &PatientId) {
        self.decisions.remove(patient_id);
        self.overrides.remove(patient_id);
    }
}

/// Fraction of values equal to the most frequent value
fn modal_fraction<T: PartialEq>(values: impl Iterator<Item = T>) -> f64 {
    let values: Vec<T> = values.collect();
    if values.is_empty() {
        return 1.0;
    }
    let max_count = values
        .iter()
        .map(|v| values.iter().filter(|w| *w == v).count())
        .max()
        .unwrap_or(0);
    max_count as f64 / values.len() as f64
}
