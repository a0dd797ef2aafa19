//! Breathing estimation from chest-region motion magnitudes.
//!
//! Operates on a rolling per-patient buffer of motion samples (owned by the
//! lifecycle tracker) and derives a respiratory rate, a breathing flag, and
//! a signal-quality score. All insufficient-signal conditions degrade to
//! `Unknown`/0.0 rather than failing.

use crate::domain::{BreathingStatus, ConfidenceScore, RespiratoryRate};

/// Configuration for breathing estimation
#[derive(Debug, Clone)]
pub struct BreathingConfig {
    /// Minimum buffered samples before signal quality is computed
    pub min_quality_samples: usize,
    /// Minimum buffered samples before cycle detection contributes to quality
    pub min_cycle_samples: usize,
    /// Minimum buffered samples before a rate is estimated
    pub min_rate_samples: usize,
    /// Signal quality required before a rate is trusted
    pub rate_quality_threshold: f64,
    /// Expected breathing cycles within the rolling window
    pub expected_cycles: f64,
    /// Motion magnitude treated as full signal strength
    pub reference_strength: f64,
    /// Base motion threshold for the is-breathing flag
    pub base_breathing_threshold: f64,
    /// Additional threshold applied in full when signal quality is zero
    pub quality_threshold_span: f64,
    /// Minimum standard deviation of recent samples for the breathing flag;
    /// a constant offset without variation is not breathing
    pub min_variation_std: f64,
    /// Number of most recent samples used for the breathing flag
    pub recent_window: usize,
    /// Moving-average window applied before peak detection
    pub smoothing_window: usize,
    /// Upper clamp for the estimated rate (breaths per minute)
    pub max_rate_bpm: f64,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            min_quality_samples: 10,
            min_cycle_samples: 20,
            min_rate_samples: 15,
            rate_quality_threshold: 0.3,
            expected_cycles: 5.0,
            reference_strength: 10.0,
            base_breathing_threshold: 3.0,
            quality_threshold_span: 5.0,
            min_variation_std: 1.0,
            recent_window: 10,
            smoothing_window: 5,
            max_rate_bpm: 60.0,
        }
    }
}

/// Combined result of one breathing analysis pass
#[derive(Debug, Clone)]
pub struct BreathingAnalysis {
    /// Estimated respiratory rate
    pub rate: RespiratoryRate,
    /// Breathing flag from recent motion
    pub status: BreathingStatus,
    /// Confidence in the breathing-motion signal
    pub quality: ConfidenceScore,
}

/// Estimator for breathing rate and signal quality from motion samples
pub struct BreathingEstimator {
    config: BreathingConfig,
}

impl BreathingEstimator {
    /// Create a new estimator
    pub fn new(config: BreathingConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(BreathingConfig::default())
    }

    /// Run the full analysis over a motion-sample buffer.
    ///
    /// `frame_rate` is the capture rate in frames per second; it determines
    /// the time span the buffer covers.
    pub fn analyze(&self, samples: &[f64], frame_rate: f64) -> BreathingAnalysis {
        let quality = self.signal_quality(samples);
        let rate = self.estimate_rate(samples, frame_rate, quality);
        let status = self.breathing_status(samples, quality);

        BreathingAnalysis {
            rate,
            status,
            quality: ConfidenceScore::new(quality),
        }
    }

    /// Signal quality in [0,1]: 0.4·cycle + 0.3·consistency + 0.3·strength.
    ///
    /// Returns 0.0 with fewer than `min_quality_samples` buffered.
    pub fn signal_quality(&self, samples: &[f64]) -> f64 {
        if samples.len() < self.config.min_quality_samples {
            return 0.0;
        }

        let mean = mean(samples);
        let std = std_dev(samples, mean);

        // Cycle quality: detected breathing cycles vs. the expected count
        // for the window. Needs a longer buffer than the other sub-scores.
        let cycle_quality = if samples.len() >= self.config.min_cycle_samples {
            let peaks = find_peaks(samples, mean);
            (peaks as f64 / self.config.expected_cycles).min(1.0)
        } else {
            0.0
        };

        let consistency = (1.0 - std / (mean + 1e-6)).clamp(0.0, 1.0);
        let strength = (mean / self.config.reference_strength).clamp(0.0, 1.0);

        (cycle_quality * 0.4 + consistency * 0.3 + strength * 0.3).clamp(0.0, 1.0)
    }

    /// Estimate the respiratory rate from the buffer.
    ///
    /// Returns `Unknown` unless the buffer holds at least `min_rate_samples`
    /// and signal quality exceeds `rate_quality_threshold`. The rate comes
    /// from peak counting over the smoothed buffer:
    /// `(peaks - 1) / time_span * 60`, clamped to [0, max_rate_bpm].
    pub fn estimate_rate(
        &self,
        samples: &[f64],
        frame_rate: f64,
        signal_quality: f64,
    ) -> RespiratoryRate {
        if samples.len() < self.config.min_rate_samples
            || signal_quality <= self.config.rate_quality_threshold
            || frame_rate <= 0.0
        {
            return RespiratoryRate::Unknown;
        }

        let smoothed = moving_average(samples, self.config.smoothing_window);
        let smoothed_mean = mean(&smoothed);
        let peaks = find_peaks(&smoothed, smoothed_mean);

        if peaks < 2 {
            return RespiratoryRate::Unknown;
        }

        let time_span = samples.len() as f64 / frame_rate;
        let rate = ((peaks - 1) as f64 / time_span) * 60.0;
        RespiratoryRate::Measured(rate.clamp(0.0, self.config.max_rate_bpm))
    }

    /// Determine the breathing flag from the most recent samples.
    ///
    /// The motion threshold adapts to signal quality: poor signals demand
    /// stronger motion before we call it breathing. Requires visible
    /// variation (std above `min_variation_std`), not just a constant offset.
    pub fn breathing_status(&self, samples: &[f64], signal_quality: f64) -> BreathingStatus {
        if samples.is_empty() {
            return BreathingStatus::Unknown;
        }

        let start = samples.len().saturating_sub(self.config.recent_window);
        let recent = &samples[start..];

        let recent_mean = mean(recent);
        let recent_std = std_dev(recent, recent_mean);

        let threshold = self.config.base_breathing_threshold
            + (1.0 - signal_quality) * self.config.quality_threshold_span;

        if recent_mean > threshold && recent_std > self.config.min_variation_std {
            BreathingStatus::Breathing
        } else {
            BreathingStatus::NotBreathing
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &BreathingConfig {
        &self.config
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

/// Centered moving average with edge clamping.
fn moving_average(samples: &[f64], window: usize) -> Vec<f64> {
    if samples.len() <= 2 || window <= 1 {
        return samples.to_vec();
    }

    let half = window / 2;
    (0..samples.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(samples.len());
            mean(&samples[start..end])
        })
        .collect()
}

/// Count interior local maxima strictly above `height`.
fn find_peaks(samples: &[f64], height: f64) -> usize {
    samples
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2] && w[1] > height)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Offset sinusoid: `offset + amplitude * sin(2π·freq_hz·t)` at `fps`.
    fn breathing_signal(freq_hz: f64, offset: f64, amplitude: f64, fps: f64, secs: f64) -> Vec<f64> {
        let n = (fps * secs) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / fps;
                offset + amplitude * (2.0 * PI * freq_hz * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_quality_zero_below_minimum_samples() {
        let estimator = BreathingEstimator::with_defaults();
        let samples = vec![5.0; 9];
        assert_eq!(estimator.signal_quality(&samples), 0.0);
    }

    #[test]
    fn test_quality_bounded_for_extreme_inputs() {
        let estimator = BreathingEstimator::with_defaults();

        let spiky: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 0.0 } else { 1e9 }).collect();
        let q = estimator.signal_quality(&spiky);
        assert!((0.0..=1.0).contains(&q));

        let tiny = vec![1e-12; 40];
        let q = estimator.signal_quality(&tiny);
        assert!((0.0..=1.0).contains(&q));
    }

    #[test]
    fn test_periodic_signal_has_high_quality() {
        let estimator = BreathingEstimator::with_defaults();
        // 1 Hz signal, 5 seconds at 30 fps: 5 clear cycles
        let samples = breathing_signal(1.0, 6.0, 3.0, 30.0, 5.0);
        let quality = estimator.signal_quality(&samples);
        assert!(quality > 0.7, "quality was {quality}");
    }

    #[test]
    fn test_rate_unknown_below_minimum_samples() {
        let estimator = BreathingEstimator::with_defaults();
        let samples = breathing_signal(1.0, 6.0, 3.0, 30.0, 0.4); // 12 samples
        assert_eq!(
            estimator.estimate_rate(&samples, 30.0, 0.9),
            RespiratoryRate::Unknown
        );
    }

    #[test]
    fn test_rate_unknown_at_quality_threshold() {
        let estimator = BreathingEstimator::with_defaults();
        // Flat zeros: quality is exactly 0.3 (consistency only), which does
        // not exceed the strict threshold
        let samples = vec![0.0; 30];
        let quality = estimator.signal_quality(&samples);
        assert!((quality - 0.3).abs() < 1e-9);
        assert_eq!(
            estimator.estimate_rate(&samples, 30.0, quality),
            RespiratoryRate::Unknown
        );
    }

    #[test]
    fn test_rate_unknown_for_constant_signal() {
        let estimator = BreathingEstimator::with_defaults();
        let samples = vec![5.0; 60];
        // Constant signal has no peaks regardless of quality
        assert_eq!(
            estimator.estimate_rate(&samples, 30.0, 0.9),
            RespiratoryRate::Unknown
        );
    }

    #[test]
    fn test_rate_from_periodic_signal() {
        let estimator = BreathingEstimator::with_defaults();
        // 1 Hz over 5 s: 5 peaks -> (5-1)/5s * 60 = 48 bpm
        let samples = breathing_signal(1.0, 6.0, 3.0, 30.0, 5.0);
        let quality = estimator.signal_quality(&samples);
        assert!(quality > estimator.config().rate_quality_threshold);

        match estimator.estimate_rate(&samples, 30.0, quality) {
            RespiratoryRate::Measured(bpm) => {
                assert!((bpm - 48.0).abs() < 1.0, "rate was {bpm}");
            }
            RespiratoryRate::Unknown => panic!("expected a measured rate"),
        }
    }

    #[test]
    fn test_rate_clamped_to_maximum() {
        let estimator = BreathingEstimator::with_defaults();
        // 3 Hz is far above any plausible breathing rate
        let samples = breathing_signal(3.0, 6.0, 3.0, 30.0, 5.0);
        if let RespiratoryRate::Measured(bpm) = estimator.estimate_rate(&samples, 30.0, 0.9) {
            assert!(bpm <= 60.0);
        }
    }

    #[test]
    fn test_breathing_flag_requires_variation() {
        let estimator = BreathingEstimator::with_defaults();

        // Strong constant offset, no variation: not breathing
        let constant = vec![9.0; 20];
        assert_eq!(
            estimator.breathing_status(&constant, 0.9),
            BreathingStatus::NotBreathing
        );

        // Varying signal above threshold: breathing
        let varying: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 4.0 } else { 10.0 }).collect();
        assert_eq!(
            estimator.breathing_status(&varying, 0.9),
            BreathingStatus::Breathing
        );
    }

    #[test]
    fn test_breathing_threshold_adapts_to_quality() {
        let estimator = BreathingEstimator::with_defaults();
        // Mean 5, std 2: above the high-quality threshold (3.5), below the
        // zero-quality threshold (8.0)
        let samples: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 3.0 } else { 7.0 }).collect();

        assert_eq!(
            estimator.breathing_status(&samples, 0.9),
            BreathingStatus::Breathing
        );
        assert_eq!(
            estimator.breathing_status(&samples, 0.0),
            BreathingStatus::NotBreathing
        );
    }

    #[test]
    fn test_breathing_flag_unknown_when_empty() {
        let estimator = BreathingEstimator::with_defaults();
        assert_eq!(estimator.breathing_status(&[], 0.5), BreathingStatus::Unknown);
    }

    #[test]
    fn test_analyze_combines_all_outputs() {
        let estimator = BreathingEstimator::with_defaults();
        // 3 Hz so the 10-sample recent window covers one full cycle and the
        // breathing flag sees both crest and trough
        let samples = breathing_signal(3.0, 6.0, 3.0, 30.0, 5.0);

        let analysis = estimator.analyze(&samples, 30.0);
        assert!(analysis.rate.is_measured());
        assert_eq!(analysis.status, BreathingStatus::Breathing);
        assert!(analysis.quality.value() > 0.5);
    }

    #[test]
    fn test_moving_average_preserves_length() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let smoothed = moving_average(&samples, 5);
        assert_eq!(smoothed.len(), samples.len());
        // Interior points average their neighborhood
        assert!((smoothed[3] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_find_peaks_interior_only() {
        // Endpoint values are never peaks
        let samples = vec![10.0, 1.0, 5.0, 1.0, 10.0];
        assert_eq!(find_peaks(&samples, 0.0), 1);
        assert_eq!(find_peaks(&samples, 5.0), 0);
    }
}
