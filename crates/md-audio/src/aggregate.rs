use md_core::config::AnalysisConfig;
use md_core::features::FeatureVector;
use md_core::window::SharedWindows;

use crate::batch_analyzer::WindowSnapshot;
use crate::rhythm::RhythmExtractor;
use crate::spectral::{mean, sample_stdev};

/// Mean and sample stdev of every row of a row-major matrix.
///
/// Writes `[mean, stdev]` per row into `out` (`2 × rows` values).
///
/// # Example
/// ```
/// use md_audio::aggregate::timbre_stats;
/// let matrix = [1.0f32, 3.0, 5.0, 5.0];
/// let mut out = [0.0f32; 4];
/// timbre_stats(&matrix, 2, 2, &mut out);
/// assert_eq!(out[0], 2.0);
/// assert_eq!(&out[2..], &[5.0, 0.0]);
/// ```
pub fn timbre_stats(matrix: &[f32], rows: usize, columns: usize, out: &mut [f32]) {
    for (row, pair) in matrix
        .chunks_exact(columns)
        .take(rows)
        .zip(out.chunks_exact_mut(2))
    {
        pair[0] = mean(row);
        pair[1] = sample_stdev(row);
    }
}

/// Reduces one window of frame features to the model input vector.
///
/// Each call recomputes the whole window (no incremental statistics): timbre
/// rows become `[mean, stdev]` pairs, the flux buffer becomes the four rhythm
/// scalars, and non-finite values are zeroed before the vector is returned.
///
/// Working copies of the windows are allocated once, in [`new`](Self::new).
///
/// # Example
/// ```
/// use md_core::config::AnalysisConfig;
/// use md_core::features::FeatureVector;
/// use md_audio::aggregate::FeatureAggregator;
/// use md_audio::analyzer::FrameAnalyzer;
///
/// let config = AnalysisConfig::default();
/// let (_analyzer, windows) = FrameAnalyzer::new(&config);
/// let mut aggregator = FeatureAggregator::new(&config);
/// let mut features = FeatureVector::new(&config);
/// aggregator.collect(&windows, &mut features);
/// assert_eq!(features.as_slice().len(), 52);
/// ```
pub struct FeatureAggregator {
    rows: usize,
    columns: usize,
    matrix: Vec<f32>,
    flux: Vec<f32>,
    rhythm: RhythmExtractor,
}

impl FeatureAggregator {
    /// Allocate working buffers for `config`'s window shape.
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        let rows = config.num_timbre_features();
        let columns = config.frames_per_window();
        Self {
            rows,
            columns,
            matrix: vec![0.0; rows * columns],
            flux: vec![0.0; columns],
            rhythm: RhythmExtractor::new(config),
        }
    }

    /// Read the live windows and fill `out`.
    ///
    /// The windows may be written concurrently; a column being updated during
    /// the read is accepted as is. Returns how many non-finite values were
    /// replaced by 0.
    pub fn collect(&mut self, windows: &SharedWindows, out: &mut FeatureVector) -> usize {
        windows.timbre.read_all(&mut self.matrix);
        windows.flux.read_row_chronological(0, &mut self.flux);
        Self::reduce(&mut self.rhythm, self.rows, self.columns, &self.matrix, &self.flux, out)
    }

    /// Fill `out` from a frozen window (offline analysis).
    pub fn collect_snapshot(&mut self, snapshot: &WindowSnapshot, out: &mut FeatureVector) -> usize {
        Self::reduce(
            &mut self.rhythm,
            self.rows,
            self.columns,
            &snapshot.timbre,
            &snapshot.flux,
            out,
        )
    }

    fn reduce(
        rhythm: &mut RhythmExtractor,
        rows: usize,
        columns: usize,
        matrix: &[f32],
        flux: &[f32],
        out: &mut FeatureVector,
    ) -> usize {
        timbre_stats(matrix, rows, columns, out.timbre_stats_mut());
        out.set_rhythm(rhythm.extract(flux));
        out.sanitize()
    }
}
