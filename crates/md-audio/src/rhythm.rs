use md_core::config::AnalysisConfig;
use md_core::features::RhythmFeatures;

use crate::spectral::{autocorrelate, mean, sample_stdev};

/// Onset and periodicity statistics over one window of rectified flux.
///
/// Onsets are local maxima of the flux above `mean + stdev` of the window.
/// Periodicity comes from the circular autocorrelation of the window: lag 0
/// and the slope that falls from it are skipped, local maxima above
/// `mean + stdev` of lags `1..` are the peaks, and the minimum between each
/// pair of consecutive peaks is a valley.
///
/// Fallbacks: no onset gives a mean amplitude of 0, no peak gives a mean
/// peak of 0, and with at most one peak the valley output is the peak *sum*
/// (the models were fitted with that definition).
///
/// # Example
/// ```
/// use md_core::config::AnalysisConfig;
/// use md_audio::rhythm::RhythmExtractor;
///
/// let config = AnalysisConfig::default();
/// let mut extractor = RhythmExtractor::new(&config);
/// let r = extractor.extract(&vec![0.0f32; config.frames_per_window()]);
/// assert_eq!(r.onsets_per_sec, 0.0);
/// ```
pub struct RhythmExtractor {
    window_seconds: f32,
    /// Autocorrelation curve, `frames / 2` lags.
    ac: Vec<f32>,
}

impl RhythmExtractor {
    /// Allocate the autocorrelation scratch for `config`'s window.
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            window_seconds: config.window_seconds(),
            ac: vec![0.0; config.frames_per_window() / 2],
        }
    }

    /// Rhythm features of `flux`, oldest value first.
    ///
    /// `flux` should hold one window; a different length is accepted and
    /// resizes the scratch (allocating once).
    pub fn extract(&mut self, flux: &[f32]) -> RhythmFeatures {
        let (onsets, onset_amplitude) = detect_onsets(flux);

        self.ac.resize(flux.len() / 2, 0.0);
        autocorrelate(flux, &mut self.ac);
        let (peak_count, peak_sum, valley_sum) = periodicity_peaks(&self.ac);

        let mean_ac_peak = if peak_count > 0 {
            peak_sum / peak_count as f32
        } else {
            0.0
        };
        let mean_ac_valley = if peak_count > 1 {
            valley_sum / (peak_count - 1) as f32
        } else {
            peak_sum
        };

        RhythmFeatures {
            onsets_per_sec: onsets as f32 / self.window_seconds,
            mean_onset_amplitude: onset_amplitude,
            mean_ac_peak,
            mean_ac_valley,
        }
    }
}

/// Count local maxima above `mean + stdev`; returns `(count, mean height)`.
fn detect_onsets(flux: &[f32]) -> (usize, f32) {
    if flux.len() < 3 {
        return (0, 0.0);
    }
    let threshold = mean(flux) + sample_stdev(flux);
    let mut count = 0usize;
    let mut sum = 0.0f32;
    for w in flux.windows(3) {
        let v = w[1];
        if v > w[0] && v > w[2] && v > threshold {
            sum += v;
            count += 1;
        }
    }
    let amplitude = if count > 0 { sum / count as f32 } else { 0.0 };
    (count, amplitude)
}

/// Peaks of an autocorrelation curve: `(count, sum of heights, sum of valleys)`.
fn periodicity_peaks(ac: &[f32]) -> (usize, f32, f32) {
    if ac.len() < 4 {
        return (0, 0.0, 0.0);
    }
    let threshold = mean(&ac[1..]) + sample_stdev(&ac[1..]);

    // Walk down the zero-lag peak; never search before lag 2.
    let mut start = 1;
    while start + 1 < ac.len() && ac[start + 1] < ac[start] {
        start += 1;
    }
    let start = start.max(2);

    let mut count = 0usize;
    let mut peak_sum = 0.0f32;
    let mut valley_sum = 0.0f32;
    let mut left: Option<usize> = None;
    for i in start..ac.len() - 1 {
        let v = ac[i];
        if v > ac[i - 1] && v > ac[i + 1] && v > threshold {
            peak_sum += v;
            count += 1;
            if let Some(l) = left {
                valley_sum += ac[l..i].iter().copied().fold(f32::INFINITY, f32::min);
            }
            left = Some(i);
        }
    }
    (count, peak_sum, valley_sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_uses_fallbacks() {
        let config = AnalysisConfig::default();
        let mut extractor = RhythmExtractor::new(&config);
        let r = extractor.extract(&vec![0.0f32; config.frames_per_window()]);
        assert_eq!(r, RhythmFeatures::default());
        assert!(r.to_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn periodic_pulses_are_counted() {
        // One pulse every 8 frames over 64 frames: 8 onsets in 3 s.
        let config = AnalysisConfig::default();
        let mut extractor = RhythmExtractor::new(&config);
        let flux: Vec<f32> = (0..64).map(|i| if i % 8 == 4 { 10.0 } else { 0.0 }).collect();
        let r = extractor.extract(&flux);
        assert!((r.onsets_per_sec - 8.0 / 3.0).abs() < 1e-5);
        assert_eq!(r.mean_onset_amplitude, 10.0);
        // Autocorrelation peaks at lags 8, 16, 24: 8 pulses × 100 each.
        assert!((r.mean_ac_peak - 800.0).abs() < 1e-3);
        // Between two peaks the curve drops to 0.
        assert_eq!(r.mean_ac_valley, 0.0);
    }

    #[test]
    fn rotation_only_moves_onset_edges() {
        let config = AnalysisConfig::default();
        let mut extractor = RhythmExtractor::new(&config);
        // Pulse at frame 0: an edge sample, never an onset in this order.
        let flux: Vec<f32> = (0..64).map(|i| if i % 8 == 0 { 10.0 } else { 0.0 }).collect();
        let mut rotated = flux.clone();
        rotated.rotate_left(4);

        let a = extractor.extract(&flux);
        let b = extractor.extract(&rotated);
        assert_eq!(a.mean_ac_peak, b.mean_ac_peak);
        assert_eq!(a.mean_ac_valley, b.mean_ac_valley);
        assert!((a.onsets_per_sec - 7.0 / 3.0).abs() < 1e-5);
        assert!((b.onsets_per_sec - 8.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn single_peak_valley_is_peak_sum() {
        let mut ac = vec![0.0f32; 16];
        ac[0] = 100.0;
        ac[1] = 50.0;
        ac[6] = 40.0;
        let (count, peak_sum, _) = periodicity_peaks(&ac);
        assert_eq!(count, 1);
        assert_eq!(peak_sum, 40.0);
    }

    #[test]
    fn single_onset_window() {
        let mut flux = vec![0.0f32; 64];
        flux[10] = 3.0;
        let config = AnalysisConfig::default();
        let r = RhythmExtractor::new(&config).extract(&flux);
        assert!((r.onsets_per_sec - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(r.mean_onset_amplitude, 3.0);
        // A lone impulse autocorrelates to 0 past lag 0: no periodicity.
        assert_eq!(r.mean_ac_peak, 0.0);
        assert_eq!(r.mean_ac_valley, 0.0);
    }

    #[test]
    fn short_input_is_total() {
        let config = AnalysisConfig::default();
        let mut extractor = RhythmExtractor::new(&config);
        let r = extractor.extract(&[1.0, 2.0]);
        assert!(r.to_array().iter().all(|v| v.is_finite()));
    }
}
