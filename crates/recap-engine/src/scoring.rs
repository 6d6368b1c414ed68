//! Weighted candidate scoring.
//!
//! Each axis is normalized to [0, 1] before weighting, so scores stay
//! stable under reweighting. The computation is total: missing inputs
//! contribute 0, never an error.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Tolerance for the weights-sum-to-one check.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// Per-axis weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Externally supplied content quality
    pub quality: f64,
    /// Development-context confidence
    pub context_confidence: f64,
    /// View count
    pub views: f64,
    /// Transcript richness (word count)
    pub transcript: f64,
    /// Clip duration
    pub duration: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quality: 0.30,
            context_confidence: 0.25,
            views: 0.15,
            transcript: 0.15,
            duration: 0.15,
        }
    }
}

impl ScoringWeights {
    /// Sum of all five weights.
    pub fn sum(&self) -> f64 {
        self.quality + self.context_confidence + self.views + self.transcript + self.duration
    }
}

/// Rescale arbitrary positive weights so they sum to 1.0.
pub fn normalize_weights(weights: &ScoringWeights) -> EngineResult<ScoringWeights> {
    let sum = weights.sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Err(EngineError::config_error(format!(
            "Scoring weights must be positive, got sum {}",
            sum
        )));
    }

    Ok(ScoringWeights {
        quality: weights.quality / sum,
        context_confidence: weights.context_confidence / sum,
        views: weights.views / sum,
        transcript: weights.transcript / sum,
        duration: weights.duration / sum,
    })
}

/// Scoring configuration: weights plus the per-axis scaling maxima.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Per-axis weights
    pub weights: ScoringWeights,
    /// View count mapped to axis value 1.0
    pub max_views: u64,
    /// Transcript word count mapped to axis value 1.0
    pub max_transcript_words: usize,
    /// Duration (seconds) mapped to axis value 1.0
    pub max_duration_seconds: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            max_views: 50_000,
            max_transcript_words: 800,
            max_duration_seconds: 90.0,
        }
    }
}

impl ScoringConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weights: defaults.weights,
            max_views: std::env::var("SCORE_MAX_VIEWS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_views),
            max_transcript_words: std::env::var("SCORE_MAX_TRANSCRIPT_WORDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_transcript_words),
            max_duration_seconds: std::env::var("SCORE_MAX_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_duration_seconds),
        }
    }

    /// Validate that weights sum to 1.0 within tolerance.
    pub fn validate(&self) -> EngineResult<()> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::config_error(format!(
                "Scoring weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }

    /// Score a candidate's signals: weighted sum of the five normalized
    /// axes, scaled to 0-100 and rounded.
    pub fn score(&self, signals: &CandidateSignals) -> u32 {
        let quality = clamp01(signals.quality.unwrap_or(0.0));
        let context = clamp01(signals.context_confidence.unwrap_or(0.0));
        let views = clamp01(signals.view_count.unwrap_or(0) as f64 / self.max_views as f64);
        let transcript = clamp01(
            signals.transcript_words.unwrap_or(0) as f64 / self.max_transcript_words as f64,
        );
        let duration =
            clamp01(signals.duration_seconds.unwrap_or(0.0) / self.max_duration_seconds);

        let weighted = self.weights.quality * quality
            + self.weights.context_confidence * context
            + self.weights.views * views
            + self.weights.transcript * transcript
            + self.weights.duration * duration;

        (weighted * 100.0).round() as u32
    }
}

/// Inputs for scoring one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CandidateSignals {
    /// Externally supplied quality score in [0, 1]
    pub quality: Option<f64>,
    /// Development-context confidence in [0, 1]
    pub context_confidence: Option<f64>,
    /// View count
    pub view_count: Option<u64>,
    /// Transcript word count
    pub transcript_words: Option<usize>,
    /// Clip duration in seconds
    pub duration_seconds: Option<f64>,
}

fn clamp01(v: f64) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}
