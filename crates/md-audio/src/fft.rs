use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::spectral::{hamming_window, magnitude};

/// FFT pipeline: Hamming-windowed real FFT using realfft.
///
/// Pre-allocates the FFT plan and scratch buffers for zero-allocation hot path.
/// Magnitudes are not normalised by the transform length: the regression
/// models are fitted on raw magnitudes.
///
/// # Example
/// ```
/// use md_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(2048);
/// assert_eq!(fft.bins(), 1025);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    plan: Arc<dyn RealToComplex<f32>>,
    /// Hamming window coefficients.
    window: Vec<f32>,
}

impl FftPipeline {
    /// Create a new FFT pipeline with the given window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        let mut window = vec![0.0f32; size];
        hamming_window(&mut window);

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
        }
    }

    /// Magnitude spectrum of a mono frame, written into `out` (`bins()` values).
    ///
    /// Short input is zero-padded; extra samples are ignored.
    ///
    /// # Example
    /// ```
    /// use md_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256);
    /// let mut spectrum = vec![1.0f32; fft.bins()];
    /// fft.process(&[0.0f32; 256], &mut spectrum);
    /// assert!(spectrum.iter().all(|&m| m == 0.0));
    /// ```
    pub fn process(&mut self, samples: &[f32], out: &mut [f32]) {
        let n = self.fft_size.min(samples.len());
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { samples[i] * self.window[i] } else { 0.0 };
        }
        self.transform(out);
    }

    /// Same as [`process`](Self::process) on interleaved audio, downmixed to
    /// mono by averaging the channels of each frame.
    pub fn process_interleaved(&mut self, interleaved: &[f32], channels: usize, out: &mut [f32]) {
        let channels = channels.max(1);
        let frames = (interleaved.len() / channels).min(self.fft_size);
        let scale = 1.0 / channels as f32;

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < frames {
                let frame = &interleaved[i * channels..(i + 1) * channels];
                frame.iter().sum::<f32>() * scale * self.window[i]
            } else {
                0.0
            };
        }
        self.transform(out);
    }

    fn transform(&mut self, out: &mut [f32]) {
        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            out.fill(0.0);
            return;
        }
        magnitude(&self.spectrum_buf, out);
    }

    /// Positive-frequency bins produced per frame (`fft_size / 2 + 1`).
    #[must_use]
    pub fn bins(&self) -> usize {
        self.spectrum_buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_centred_tone_peaks_at_its_bin() {
        let n = 2048;
        let mut fft = FftPipeline::new(n);
        let bin = 46.0f32;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * bin * i as f32 / n as f32).sin())
            .collect();
        let mut mag = vec![0.0f32; fft.bins()];
        fft.process(&samples, &mut mag);

        let peak = mag
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(46));
        // Unnormalised: 0.54 · N / 2.
        assert!((mag[46] - 552.96).abs() < 1.0);
        assert!((mag[45] - 235.52).abs() < 1.0);
        assert!(mag[100] < 1.0);
    }

    #[test]
    fn stereo_downmix_matches_mono() {
        let n = 256;
        let mono: Vec<f32> = (0..n).map(|i| ((i * 13) % 7) as f32 / 7.0 - 0.5).collect();
        let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s + 0.25, s - 0.25]).collect();

        let mut fft = FftPipeline::new(n);
        let mut a = vec![0.0f32; fft.bins()];
        let mut b = vec![0.0f32; fft.bins()];
        fft.process(&mono, &mut a);
        fft.process_interleaved(&stereo, 2, &mut b);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-3);
        }
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut fft = FftPipeline::new(64);
        let mut mag = vec![1.0f32; fft.bins()];
        fft.process_interleaved(&[], 2, &mut mag);
        assert!(mag.iter().all(|&m| m == 0.0));
    }
}
