use md_core::config::{AnalysisConfig, ROW_CENTROID, ROW_FLUX, ROW_ROLLOFF};
use md_core::traits::BlockAnalyzer;
use md_core::window::{SharedWindows, WindowWriter, shared_windows};

use crate::fft::FftPipeline;
use crate::spectral::{
    FluxKind, spectral_centroid, spectral_contrast, spectral_flux, spectral_rolloff,
};

/// Current and previous magnitude spectra.
///
/// Swapped after every frame so the current spectrum becomes the previous
/// one without copying. Both start zero-filled: the first frame's flux is
/// measured against silence.
struct SpectralSnapshot {
    current: Vec<f32>,
    previous: Vec<f32>,
}

impl SpectralSnapshot {
    fn new(bins: usize) -> Self {
        Self {
            current: vec![0.0; bins],
            previous: vec![0.0; bins],
        }
    }

    #[inline]
    fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }
}

/// Per-frame feature producer, owned by the real-time audio thread.
///
/// Each call to [`analyze`](Self::analyze) turns one block into one column
/// of the timbre matrix (centroid, unrectified flux, rolloff, contrast
/// peaks, valleys and contrasts) and one value of the rectified flux buffer,
/// then advances both cursors. All buffers are allocated in
/// [`new`](Self::new); the hot path allocates nothing and takes no lock.
///
/// # Example
/// ```
/// use md_core::config::AnalysisConfig;
/// use md_audio::analyzer::FrameAnalyzer;
///
/// let config = AnalysisConfig::default();
/// let (mut analyzer, windows) = FrameAnalyzer::new(&config);
/// analyzer.analyze(&vec![0.0f32; 2 * 2048], 2);
/// assert_eq!(windows.timbre.frames_written(), 1);
/// ```
pub struct FrameAnalyzer {
    config: AnalysisConfig,
    fft: FftPipeline,
    spectra: SpectralSnapshot,
    /// Sorting scratch for spectral contrast (one spectrum).
    sort_scratch: Vec<f32>,
    /// Contrast output: peaks, valleys, contrasts (`3 × bands`).
    contrast: Vec<f32>,
    timbre: WindowWriter,
    flux: WindowWriter,
}

impl FrameAnalyzer {
    /// Allocate the analyzer and the rolling windows it fills.
    ///
    /// Returns the analyzer (to move into the audio callback) and the read
    /// side of its windows (for the prediction loop).
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> (Self, SharedWindows) {
        let (timbre, flux, windows) = shared_windows(config);
        let fft = FftPipeline::new(config.frame_length());
        let bins = fft.bins();
        let analyzer = Self {
            config: config.clone(),
            fft,
            spectra: SpectralSnapshot::new(bins),
            sort_scratch: vec![0.0; bins],
            contrast: vec![0.0; 3 * config.bands()],
            timbre,
            flux,
        };
        (analyzer, windows)
    }

    /// Analyse one block of interleaved samples.
    ///
    /// The block should hold `frame_length` frames; shorter blocks are
    /// zero-padded. Channels are averaged to mono before the transform.
    pub fn analyze(&mut self, interleaved: &[f32], channels: usize) {
        let fs = self.config.sample_rate();
        let n = self.config.frame_length();

        self.fft
            .process_interleaved(interleaved, channels, &mut self.spectra.current);
        let current = &self.spectra.current;
        let previous = &self.spectra.previous;

        self.timbre
            .set(ROW_CENTROID, spectral_centroid(current, fs, n));
        self.timbre.set(
            ROW_FLUX,
            spectral_flux(current, previous, FluxKind::Unrectified),
        );
        self.timbre.set(
            ROW_ROLLOFF,
            spectral_rolloff(current, self.config.rolloff(), fs, n),
        );

        let bands = self.config.bands();
        spectral_contrast(current, n, bands, &mut self.sort_scratch, &mut self.contrast);
        for band in 0..bands {
            self.timbre
                .set(self.config.peak_row(band), self.contrast[band]);
            self.timbre
                .set(self.config.valley_row(band), self.contrast[bands + band]);
            self.timbre
                .set(self.config.contrast_row(band), self.contrast[2 * bands + band]);
        }

        self.flux
            .set(0, spectral_flux(current, previous, FluxKind::Rectified));

        self.timbre.advance();
        self.flux.advance();
        self.spectra.swap();
    }

    /// Analysis parameters in use.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}

impl BlockAnalyzer for FrameAnalyzer {
    #[inline]
    fn process_block(&mut self, interleaved: &[f32], channels: usize) {
        self.analyze(interleaved, channels);
    }

    fn block_frames(&self) -> usize {
        self.config.frame_length()
    }
}
