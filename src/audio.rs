//! Keyword-based transcript analysis for verbal distress and comfort cues.
//!
//! Works on text transcripts from an upstream speech-to-text stage; this
//! module never touches raw audio. Scores feed the triage cascade as an
//! optional override signal, gated on [`AudioAnalysis::confidence`].

use regex::RegexSet;
use serde::{Deserialize, Serialize};

const DISTRESS_KEYWORDS: [&str; 18] = [
    "help",
    "pain",
    "hurt",
    "dying",
    "can't breathe",
    "emergency",
    "ambulance",
    "doctor",
    "medic",
    "bleeding",
    "injured",
    "wounded",
    "unconscious",
    "passing out",
    "chest pain",
    "heart attack",
    "stroke",
    "seizure",
];

const COMFORT_KEYWORDS: [&str; 12] = [
    "i'm ok",
    "i'm fine",
    "doing well",
    "feeling better",
    "no problem",
    "good",
    "fine",
    "okay",
    "no pain",
    "comfortable",
    "stable",
    "normal",
];

/// Outcome of scoring a single transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAnalysis {
    /// Distress keyword score [0,1]
    pub distress_score: f64,
    /// Comfort keyword score [0,1]
    pub comfort_score: f64,
    /// Transcript confidence [0,1], from transcript length
    pub confidence: f64,
    /// Distress keywords that matched, in list order
    pub keywords: Vec<String>,
    /// Whether the patient produced any speech at all
    pub is_speaking: bool,
}

impl AudioAnalysis {
    /// Neutral analysis for a patient with no transcript
    pub fn silent() -> Self {
        Self {
            distress_score: 0.0,
            comfort_score: 0.0,
            confidence: 0.0,
            keywords: Vec::new(),
            is_speaking: false,
        }
    }
}

/// Scores transcripts against distress and comfort keyword sets
pub struct TranscriptAnalyzer {
    distress: RegexSet,
    comfort: RegexSet,
}

impl TranscriptAnalyzer {
    /// Compile the keyword patterns
    pub fn new() -> crate::Result<Self> {
        Ok(Self {
            distress: Self::compile(&DISTRESS_KEYWORDS)?,
            comfort: Self::compile(&COMFORT_KEYWORDS)?,
        })
    }

    fn compile(keywords: &[&str]) -> Result<RegexSet, regex::Error> {
        let patterns: Vec<String> = keywords
            .iter()
            .map(|kw| format!(r"\b{}\b", regex::escape(kw)))
            .collect();
        RegexSet::new(&patterns)
    }

    /// Score a transcript. Matching is case-insensitive on whole words;
    /// each keyword counts once regardless of repetition. Scores saturate
    /// after three distinct matches.
    pub fn analyze(&self, transcript: &str) -> AudioAnalysis {
        let text = transcript.to_lowercase();
        if text.trim().is_empty() {
            return AudioAnalysis::silent();
        }

        let distress_matches: Vec<usize> = self.distress.matches(&text).into_iter().collect();
        let comfort_matches = self.comfort.matches(&text).into_iter().count();

        let keywords: Vec<String> = distress_matches
            .iter()
            .map(|&i| DISTRESS_KEYWORDS[i].to_string())
            .collect();

        AudioAnalysis {
            distress_score: (distress_matches.len() as f64 * 0.3).min(1.0),
            comfort_score: (comfort_matches as f64 * 0.3).min(1.0),
            confidence: (text.len() as f64 / 50.0).min(1.0),
            keywords,
            is_speaking: true,
        }
    }
}
