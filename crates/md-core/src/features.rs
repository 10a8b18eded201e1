use serde::Serialize;

use crate::config::AnalysisConfig;

/// Onset and periodicity statistics of one analysis window.
///
/// # Example
/// ```
/// use md_core::features::RhythmFeatures;
/// let r = RhythmFeatures::default();
/// assert_eq!(r.to_array(), [0.0; 4]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RhythmFeatures {
    /// Detected onsets per second.
    pub onsets_per_sec: f32,
    /// Mean rectified flux of the detected onsets.
    pub mean_onset_amplitude: f32,
    /// Mean height of the autocorrelation peaks.
    pub mean_ac_peak: f32,
    /// Mean autocorrelation minimum between consecutive peaks.
    pub mean_ac_valley: f32,
}

impl RhythmFeatures {
    /// Values in feature-vector order.
    #[must_use]
    pub fn to_array(self) -> [f32; 4] {
        [
            self.onsets_per_sec,
            self.mean_onset_amplitude,
            self.mean_ac_peak,
            self.mean_ac_valley,
        ]
    }
}

/// Input of the regression models, recomputed every prediction cycle.
///
/// Layout: `[mean, stdev]` for each timbre row in row order, then the four
/// rhythm scalars. The order must match the one the models were trained on.
///
/// # Example
/// ```
/// use md_core::config::AnalysisConfig;
/// use md_core::features::FeatureVector;
/// let v = FeatureVector::new(&AnalysisConfig::default());
/// assert_eq!(v.as_slice().len(), 52);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
    num_timbre_features: usize,
}

impl FeatureVector {
    /// Zeroed vector sized for `config`.
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            values: vec![0.0; config.feature_len()],
            num_timbre_features: config.num_timbre_features(),
        }
    }

    /// All values in model order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Timbre statistics block (`2 × num_timbre_features`).
    #[inline]
    pub fn timbre_stats_mut(&mut self) -> &mut [f32] {
        let end = 2 * self.num_timbre_features;
        &mut self.values[..end]
    }

    /// `(mean, stdev)` of timbre row `row`.
    #[must_use]
    pub fn timbre_stat(&self, row: usize) -> (f32, f32) {
        (self.values[2 * row], self.values[2 * row + 1])
    }

    /// Store the rhythm scalars after the timbre block.
    pub fn set_rhythm(&mut self, rhythm: RhythmFeatures) {
        let start = 2 * self.num_timbre_features;
        for (slot, value) in self.values[start..].iter_mut().zip(rhythm.to_array()) {
            *slot = value;
        }
    }

    /// Rhythm scalars currently stored.
    #[must_use]
    pub fn rhythm(&self) -> RhythmFeatures {
        let start = 2 * self.num_timbre_features;
        let r = &self.values[start..];
        RhythmFeatures {
            onsets_per_sec: r[0],
            mean_onset_amplitude: r[1],
            mean_ac_peak: r[2],
            mean_ac_valley: r[3],
        }
    }

    /// Overwrite with `other`'s values. No allocation when both share a layout.
    pub fn copy_from(&mut self, other: &Self) {
        if self.values.len() == other.values.len() {
            self.values.copy_from_slice(&other.values);
            self.num_timbre_features = other.num_timbre_features;
        } else {
            self.clone_from(other);
        }
    }

    /// Replace NaN and infinities with 0 so they never reach a model.
    ///
    /// Returns how many values were replaced.
    pub fn sanitize(&mut self) -> usize {
        let mut replaced = 0;
        for v in &mut self.values {
            if !v.is_finite() {
                *v = 0.0;
                replaced += 1;
            }
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rhythm_block_follows_timbre_stats() {
        let config = AnalysisConfig::default();
        let mut v = FeatureVector::new(&config);
        v.timbre_stats_mut()[2] = 5.0;
        v.timbre_stats_mut()[3] = 0.5;
        let rhythm = RhythmFeatures {
            onsets_per_sec: 1.0,
            mean_onset_amplitude: 2.0,
            mean_ac_peak: 3.0,
            mean_ac_valley: 4.0,
        };
        v.set_rhythm(rhythm);
        assert_eq!(v.timbre_stat(1), (5.0, 0.5));
        assert_eq!(&v.as_slice()[48..], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v.rhythm(), rhythm);
    }

    #[test]
    fn copy_from_reuses_the_buffer() {
        let config = AnalysisConfig::default();
        let mut src = FeatureVector::new(&config);
        src.timbre_stats_mut()[0] = 440.0;
        src.set_rhythm(RhythmFeatures {
            mean_ac_valley: 9.0,
            ..RhythmFeatures::default()
        });
        let mut dst = FeatureVector::new(&config);
        let before = dst.as_slice().as_ptr();
        dst.copy_from(&src);
        assert_eq!(dst, src);
        assert_eq!(dst.as_slice().as_ptr(), before);
    }

    #[test]
    fn sanitize_replaces_non_finite() {
        let mut v = FeatureVector::new(&AnalysisConfig::default());
        v.timbre_stats_mut()[0] = f32::NAN;
        v.timbre_stats_mut()[1] = f32::NEG_INFINITY;
        v.timbre_stats_mut()[2] = 1.5;
        assert_eq!(v.sanitize(), 2);
        assert_eq!(&v.as_slice()[..3], &[0.0, 0.0, 1.5]);
    }
}
