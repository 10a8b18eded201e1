use std::time::Duration;

use crate::error::CoreError;

/// Sampling frequency of the analysed stream, in Hz.
pub const SAMPLE_RATE: u32 = 44_100;
/// Samples per frame (one audio block).
pub const FRAME_LENGTH: usize = 2048;
/// Length of the mood prediction window, in seconds.
pub const WINDOW_SECONDS: f32 = 3.0;
/// Octave bands used by spectral contrast.
pub const CONTRAST_BANDS: usize = 7;
/// Energy ratio used by spectral rolloff.
pub const ROLLOFF_RATIO: f32 = 0.85;
/// Onset and periodicity scalars appended to the feature vector.
pub const NUM_RHYTHM_FEATURES: usize = 4;

/// Timbre row holding the spectral centroid.
pub const ROW_CENTROID: usize = 0;
/// Timbre row holding the unrectified spectral flux.
pub const ROW_FLUX: usize = 1;
/// Timbre row holding the spectral rolloff.
pub const ROW_ROLLOFF: usize = 2;
/// First timbre row of the contrast block (peaks, then valleys, then contrasts).
pub const ROW_CONTRAST: usize = 3;

/// Immutable analysis parameters, built once at startup.
///
/// Every derived quantity (DFT length, frames per window, feature layout) is
/// computed here so the producer and the consumer agree on the same shapes.
///
/// # Example
/// ```
/// use md_core::config::AnalysisConfig;
/// let config = AnalysisConfig::default();
/// assert_eq!(config.frames_per_window(), 64);
/// assert_eq!(config.num_timbre_features(), 24);
/// assert_eq!(config.feature_len(), 52);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    sample_rate: u32,
    frame_length: usize,
    dft_length: usize,
    window_seconds: f32,
    frames_per_window: usize,
    bands: usize,
    rolloff: f32,
    num_timbre_features: usize,
    num_rhythm_features: usize,
}

impl AnalysisConfig {
    /// Build and validate a configuration.
    ///
    /// # Errors
    /// Returns an error if the sample rate or window length is not positive,
    /// if `frame_length` is not a power of two large enough for the contrast
    /// bands, or if fewer than 3 frames fit in the window.
    ///
    /// # Example
    /// ```
    /// use md_core::config::AnalysisConfig;
    /// assert!(AnalysisConfig::new(44_100, 2048, 3.0).is_ok());
    /// assert!(AnalysisConfig::new(44_100, 2048, 0.1).is_err());
    /// ```
    pub fn new(sample_rate: u32, frame_length: usize, window_seconds: f32) -> Result<Self, CoreError> {
        if sample_rate == 0 {
            return Err(CoreError::Config("sample rate nul".into()));
        }
        if !window_seconds.is_finite() || window_seconds <= 0.0 {
            return Err(CoreError::Config(format!(
                "longueur de fenêtre invalide : {window_seconds}"
            )));
        }

        // The first contrast band spans frame_length / 2^bands - 1 bins; keep it non-empty.
        let minimum = 1usize << (CONTRAST_BANDS + 1);
        if !frame_length.is_power_of_two() || frame_length < minimum {
            return Err(CoreError::InvalidFrameLength {
                frame_length,
                minimum,
            });
        }

        let config = Self::derive(sample_rate, frame_length, window_seconds);
        if config.frames_per_window <= 2 {
            return Err(CoreError::InvalidWindow {
                frames: config.frames_per_window,
            });
        }
        Ok(config)
    }

    fn derive(sample_rate: u32, frame_length: usize, window_seconds: f32) -> Self {
        let window_samples = (f64::from(window_seconds) * f64::from(sample_rate)) as usize;
        Self {
            sample_rate,
            frame_length,
            dft_length: frame_length / 2 + 1,
            window_seconds,
            frames_per_window: window_samples / frame_length,
            bands: CONTRAST_BANDS,
            rolloff: ROLLOFF_RATIO,
            num_timbre_features: 3 + 3 * CONTRAST_BANDS,
            num_rhythm_features: NUM_RHYTHM_FEATURES,
        }
    }

    /// Sampling frequency in Hz.
    #[inline]
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per frame.
    #[inline]
    #[must_use]
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Positive-frequency bins of the real transform (`frame_length / 2 + 1`).
    #[inline]
    #[must_use]
    pub fn dft_length(&self) -> usize {
        self.dft_length
    }

    /// Analysis window length in seconds.
    #[inline]
    #[must_use]
    pub fn window_seconds(&self) -> f32 {
        self.window_seconds
    }

    /// Whole frames that fit in the analysis window.
    #[inline]
    #[must_use]
    pub fn frames_per_window(&self) -> usize {
        self.frames_per_window
    }

    /// Spectral contrast band count.
    #[inline]
    #[must_use]
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Spectral rolloff energy ratio.
    #[inline]
    #[must_use]
    pub fn rolloff(&self) -> f32 {
        self.rolloff
    }

    /// Rows of the timbre matrix.
    #[inline]
    #[must_use]
    pub fn num_timbre_features(&self) -> usize {
        self.num_timbre_features
    }

    /// Rhythm scalars appended after the timbre statistics.
    #[inline]
    #[must_use]
    pub fn num_rhythm_features(&self) -> usize {
        self.num_rhythm_features
    }

    /// Length of the feature vector fed to the regression models.
    #[inline]
    #[must_use]
    pub fn feature_len(&self) -> usize {
        2 * self.num_timbre_features + self.num_rhythm_features
    }

    /// Width of one transform bin in Hz.
    #[inline]
    #[must_use]
    pub fn bin_hz(&self) -> f32 {
        self.sample_rate as f32 / self.frame_length as f32
    }

    /// Real-time budget of one block.
    ///
    /// # Example
    /// ```
    /// use md_core::config::AnalysisConfig;
    /// let ms = AnalysisConfig::default().block_duration().as_millis();
    /// assert_eq!(ms, 46);
    /// ```
    #[must_use]
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_length as f64 / f64::from(self.sample_rate))
    }

    /// Timbre row of the contrast peak for `band`.
    #[inline]
    #[must_use]
    pub fn peak_row(&self, band: usize) -> usize {
        ROW_CONTRAST + band
    }

    /// Timbre row of the contrast valley for `band`.
    #[inline]
    #[must_use]
    pub fn valley_row(&self, band: usize) -> usize {
        ROW_CONTRAST + self.bands + band
    }

    /// Timbre row of the peak/valley contrast for `band`.
    #[inline]
    #[must_use]
    pub fn contrast_row(&self, band: usize) -> usize {
        ROW_CONTRAST + 2 * self.bands + band
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::derive(SAMPLE_RATE, FRAME_LENGTH, WINDOW_SECONDS)
    }
}
