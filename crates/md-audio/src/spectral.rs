//! Spectral and statistical primitives used by the frame analyzer and the
//! window feature extractors.
//!
//! Every function here is pure and allocation-free: buffers are supplied by
//! the caller, so they are safe to call from the audio callback.

use realfft::num_complex::Complex;

/// Fraction of a contrast band averaged for its peak and its valley.
pub const CONTRAST_NEIGHBORHOOD: f32 = 0.2;

/// Which spectral flux to compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FluxKind {
    /// Mean squared bin-wise difference.
    Unrectified,
    /// Same, with negative differences zeroed first (energy increases only).
    Rectified,
}

/// Fill `win` with a Hamming window: `0.54 - 0.46·cos(2π(i+1)/N)`.
///
/// # Example
/// ```
/// use md_audio::spectral::hamming_window;
/// let mut win = [0.0f32; 4];
/// hamming_window(&mut win);
/// assert!((win[1] - 1.0).abs() < 1e-6); // 0.54 - 0.46·cos(π)
/// ```
pub fn hamming_window(win: &mut [f32]) {
    let n = win.len() as f64;
    for (i, w) in win.iter_mut().enumerate() {
        *w = (0.54 - 0.46 * (2.0 * std::f64::consts::PI * (i + 1) as f64 / n).cos()) as f32;
    }
}

/// Euclidean norm of each complex bin, written into `magnitude`.
pub fn magnitude(spectrum: &[Complex<f32>], magnitude: &mut [f32]) {
    for (m, c) in magnitude.iter_mut().zip(spectrum) {
        *m = (c.re * c.re + c.im * c.im).sqrt();
    }
}

/// Magnitude-weighted mean frequency, in Hz.
///
/// Bin `i` maps to `i · sample_rate / frame_length`. Returns 0 for a
/// spectrum with no energy.
///
/// # Example
/// ```
/// use md_audio::spectral::spectral_centroid;
/// let mut mag = [0.0f32; 5];
/// mag[2] = 1.0;
/// assert_eq!(spectral_centroid(&mag, 8000, 8), 2000.0);
/// assert_eq!(spectral_centroid(&[0.0; 5], 8000, 8), 0.0);
/// ```
#[must_use]
pub fn spectral_centroid(mag: &[f32], sample_rate: u32, frame_length: usize) -> f32 {
    let bin_hz = sample_rate as f32 / frame_length as f32;
    let mut sum = 0.0f32;
    let mut weighted = 0.0f32;
    for (i, &m) in mag.iter().enumerate() {
        sum += m;
        weighted += i as f32 * bin_hz * m;
    }
    if sum > 0.0 { weighted / sum } else { 0.0 }
}

/// Frequency below which `rolloff` of the total magnitude lies, in Hz.
///
/// Accumulates bins from 0 until the running sum reaches `rolloff · total`
/// and returns `count · sample_rate / frame_length`, where `count` is the
/// number of bins accumulated. A spectrum with no energy stops after one
/// bin. Returns the sentinel `-1.0` if `rolloff` is outside (0, 1).
///
/// # Example
/// ```
/// use md_audio::spectral::spectral_rolloff;
/// let mag = [1.0f32, 1.0, 1.0, 1.0, 0.0];
/// assert_eq!(spectral_rolloff(&mag, 0.5, 8000, 8), 2000.0);
/// assert_eq!(spectral_rolloff(&mag, 1.5, 8000, 8), -1.0);
/// ```
#[must_use]
pub fn spectral_rolloff(mag: &[f32], rolloff: f32, sample_rate: u32, frame_length: usize) -> f32 {
    if !(rolloff > 0.0 && rolloff < 1.0) {
        return -1.0;
    }
    let bin_hz = sample_rate as f32 / frame_length as f32;
    let total: f32 = mag.iter().sum();
    if total <= 0.0 {
        return bin_hz;
    }

    let target = rolloff * total;
    let mut running = 0.0f32;
    let mut count = 0usize;
    for &m in mag {
        running += m;
        count += 1;
        if running >= target {
            break;
        }
    }
    count as f32 * bin_hz
}

/// Spectral flux between two magnitude spectra of equal length.
///
/// Mean of the squared bin-wise differences, optionally half-wave rectified.
/// Always non-negative; the rectified variant never exceeds the unrectified
/// one for the same pair.
///
/// # Example
/// ```
/// use md_audio::spectral::{spectral_flux, FluxKind};
/// let prev = [1.0f32, 1.0];
/// let cur = [3.0f32, 0.0];
/// assert_eq!(spectral_flux(&cur, &prev, FluxKind::Unrectified), 2.5);
/// assert_eq!(spectral_flux(&cur, &prev, FluxKind::Rectified), 2.0);
/// ```
#[must_use]
pub fn spectral_flux(current: &[f32], previous: &[f32], kind: FluxKind) -> f32 {
    if current.is_empty() {
        return 0.0;
    }
    let sum: f32 = current
        .iter()
        .zip(previous)
        .map(|(&c, &p)| {
            let diff = match kind {
                FluxKind::Unrectified => c - p,
                FluxKind::Rectified => (c - p).max(0.0),
            };
            diff * diff
        })
        .sum();
    sum / current.len() as f32
}

/// Upper bin boundary of contrast band `band` (exclusive), for `bands` octave
/// bands over a transform of `frame_length` points.
///
/// Band 0 starts at bin 0; band `k` ends at `frame_length / 2^(bands-k) - 1`.
///
/// # Example
/// ```
/// use md_audio::spectral::band_end;
/// assert_eq!(band_end(2048, 7, 0), 15);
/// assert_eq!(band_end(2048, 7, 6), 1023);
/// ```
#[inline]
#[must_use]
pub fn band_end(frame_length: usize, bands: usize, band: usize) -> usize {
    (frame_length >> (bands - band)) - 1
}

/// Natural log with a floor at `f32::MIN_POSITIVE`.
///
/// Silent bands give ≈ -87.3 instead of -∞, so window statistics stay finite.
#[inline(always)]
#[must_use]
pub fn floored_ln(x: f32) -> f32 {
    x.max(f32::MIN_POSITIVE).ln()
}

/// Octave-band spectral contrast.
///
/// For each band, the band's magnitudes are sorted (in `scratch`, which must
/// hold `mag.len()` values) and the mean of the lowest and highest
/// `max(1, ⌊0.2·width⌋)` values gives the valley and the peak. Writes
/// `ln(peak)` to `out[band]`, `ln(valley)` to `out[bands + band]` and
/// `ln(peak - valley)` to `out[2·bands + band]`, through [`floored_ln`].
///
/// # Panics
/// Panics if `scratch` is shorter than `mag` or `out` shorter than `3·bands`.
pub fn spectral_contrast(
    mag: &[f32],
    frame_length: usize,
    bands: usize,
    scratch: &mut [f32],
    out: &mut [f32],
) {
    let scratch = &mut scratch[..mag.len()];
    scratch.copy_from_slice(mag);

    let mut start = 0usize;
    for band in 0..bands {
        let end = band_end(frame_length, bands, band).min(scratch.len());
        let values = &mut scratch[start..end];
        values.sort_unstable_by(f32::total_cmp);

        let (peak, valley) = if values.is_empty() {
            (0.0, 0.0)
        } else {
            let width = values.len();
            let neighborhood = ((CONTRAST_NEIGHBORHOOD * width as f32) as usize).max(1);
            let valley: f32 = values[..neighborhood].iter().sum::<f32>() / neighborhood as f32;
            let peak: f32 = values[width - neighborhood..].iter().sum::<f32>() / neighborhood as f32;
            (peak, valley)
        };

        out[band] = floored_ln(peak);
        out[bands + band] = floored_ln(valley);
        out[2 * bands + band] = floored_ln(peak - valley);
        start = end;
    }
}

/// Circular autocorrelation of `x` for lags `0..out.len()`.
///
/// Callers pass `out` of length `x.len() / 2`. Lag 0 is the energy of `x`.
///
/// # Example
/// ```
/// use md_audio::spectral::autocorrelate;
/// let x = [1.0f32, 2.0, 3.0, 4.0];
/// let mut ac = [0.0f32; 2];
/// autocorrelate(&x, &mut ac);
/// assert_eq!(ac, [30.0, 24.0]); // 1·2 + 2·3 + 3·4 + 4·1 = 24
/// ```
pub fn autocorrelate(x: &[f32], out: &mut [f32]) {
    let n = x.len();
    for (lag, slot) in out.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for j in 0..n {
            let k = if j + lag < n { j + lag } else { j + lag - n };
            sum += x[j] * x[k];
        }
        *slot = sum;
    }
}

/// Arithmetic mean. 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Sample standard deviation (N-1 denominator). 0 when fewer than 2 values.
///
/// # Example
/// ```
/// use md_audio::spectral::sample_stdev;
/// let s = sample_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
/// assert!((s - 2.138_09).abs() < 1e-4);
/// assert_eq!(sample_stdev(&[3.0]), 0.0);
/// ```
#[must_use]
pub fn sample_stdev(values: &[f32]) -> f32 {
    if values.len() <= 1 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f32 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (values.len() - 1) as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: u32 = 44_100;
    const N: usize = 2048;

    #[test]
    fn hamming_endpoints() {
        let mut win = vec![0.0f32; N];
        hamming_window(&mut win);
        // Last sample: cos(2π) = 1.
        assert!((win[N - 1] - 0.08).abs() < 1e-6);
        // Peak at i + 1 = N/2.
        assert!((win[N / 2 - 1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn magnitude_is_complex_norm() {
        let spec = [Complex::new(3.0f32, 4.0), Complex::new(0.0, -2.0)];
        let mut mag = [0.0f32; 2];
        magnitude(&spec, &mut mag);
        assert_eq!(mag, [5.0, 2.0]);
    }

    #[test]
    fn silent_frame_is_finite_everywhere() {
        let mag = vec![0.0f32; N / 2 + 1];
        assert_eq!(spectral_centroid(&mag, FS, N), 0.0);
        assert_eq!(spectral_flux(&mag, &mag, FluxKind::Unrectified), 0.0);
        assert_eq!(spectral_flux(&mag, &mag, FluxKind::Rectified), 0.0);
        assert!(spectral_rolloff(&mag, 0.85, FS, N).is_finite());

        let mut scratch = vec![0.0f32; mag.len()];
        let mut out = [0.0f32; 21];
        spectral_contrast(&mag, N, 7, &mut scratch, &mut out);
        let floor = f32::MIN_POSITIVE.ln();
        assert!(out.iter().all(|v| v.is_finite() && (*v - floor).abs() < 1e-3));
    }

    #[test]
    fn rolloff_sentinel_outside_open_interval() {
        let mag = [1.0f32; 8];
        assert_eq!(spectral_rolloff(&mag, 0.0, FS, N), -1.0);
        assert_eq!(spectral_rolloff(&mag, 1.0, FS, N), -1.0);
        assert_eq!(spectral_rolloff(&mag, -0.2, FS, N), -1.0);
        assert_eq!(spectral_rolloff(&mag, f32::NAN, FS, N), -1.0);
        assert!(spectral_rolloff(&mag, 0.85, FS, N) > 0.0);
    }

    #[test]
    fn rolloff_counts_accumulated_bins() {
        // 85% of 10 is reached after the 9th unit bin.
        let mag = [1.0f32; 10];
        let bin_hz = FS as f32 / N as f32;
        assert_eq!(spectral_rolloff(&mag, 0.85, FS, N), 9.0 * bin_hz);
    }

    #[test]
    fn flux_is_non_negative_and_rectified_is_smaller() {
        let a: Vec<f32> = (0..64).map(|i| ((i * 7) % 11) as f32).collect();
        let b: Vec<f32> = (0..64).map(|i| ((i * 5) % 13) as f32).collect();
        let unrect = spectral_flux(&a, &b, FluxKind::Unrectified);
        let rect = spectral_flux(&a, &b, FluxKind::Rectified);
        assert!(unrect >= 0.0);
        assert!(rect >= 0.0);
        assert!(rect <= unrect);
        // Swapping the pair keeps the unrectified flux.
        assert_eq!(unrect, spectral_flux(&b, &a, FluxKind::Unrectified));
    }

    #[test]
    fn band_boundaries_double() {
        let ends: Vec<usize> = (0..7).map(|b| band_end(N, 7, b)).collect();
        assert_eq!(ends, vec![15, 31, 63, 127, 255, 511, 1023]);
    }

    #[test]
    fn contrast_of_known_band() {
        // Single band over bins 0..15: values 1..=15.
        let mut mag = vec![0.0f32; 16];
        for (i, m) in mag.iter_mut().enumerate().take(15) {
            *m = (15 - i) as f32;
        }
        let mut scratch = vec![0.0f32; 16];
        let mut out = [0.0f32; 3];
        // frame_length 32 with one band: end = 32/2 - 1 = 15.
        spectral_contrast(&mag, 32, 1, &mut scratch, &mut out);
        // Neighborhood ⌊0.2·15⌋ = 3: valley = mean(1,2,3), peak = mean(13,14,15).
        assert!((out[0] - 14.0f32.ln()).abs() < 1e-6);
        assert!((out[1] - 2.0f32.ln()).abs() < 1e-6);
        assert!((out[2] - 12.0f32.ln()).abs() < 1e-6);
        // Input untouched.
        assert_eq!(mag[0], 15.0);
    }

    #[test]
    fn narrow_band_uses_single_sample() {
        // Width 3 < 1/0.2: neighborhood falls back to 1.
        let mag = [2.0f32, 8.0, 4.0, 0.0];
        let mut scratch = [0.0f32; 4];
        let mut out = [0.0f32; 3];
        // frame_length 8, one band: end = 8/2 - 1 = 3.
        spectral_contrast(&mag, 8, 1, &mut scratch, &mut out);
        assert!((out[0] - 8.0f32.ln()).abs() < 1e-6);
        assert!((out[1] - 2.0f32.ln()).abs() < 1e-6);
        assert!((out[2] - 6.0f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn flat_band_contrast_is_floored() {
        let mag = [3.0f32; 8];
        let mut scratch = [0.0f32; 8];
        let mut out = [0.0f32; 3];
        spectral_contrast(&mag, 16, 1, &mut scratch, &mut out);
        assert!(out[2].is_finite());
        assert!(out[2] < -80.0);
    }

    #[test]
    fn autocorrelation_lag_zero_is_energy_and_maximum() {
        let x: Vec<f32> = (0..64).map(|i| ((i as f32) * 0.7).sin() + 0.3).collect();
        let mut ac = vec![0.0f32; 32];
        autocorrelate(&x, &mut ac);
        let energy: f32 = x.iter().map(|v| v * v).sum();
        assert!((ac[0] - energy).abs() < 1e-3);
        assert!(ac.iter().all(|&v| v <= ac[0] + 1e-3));
    }

    #[test]
    fn autocorrelation_is_circular() {
        let x = [1.0f32, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut ac = [0.0f32; 3];
        autocorrelate(&x, &mut ac);
        assert_eq!(ac, [1.0, 0.0, 0.0]);
        let pulse = [1.0f32, 0.0, 1.0, 0.0];
        let mut ac = [0.0f32; 2];
        autocorrelate(&pulse, &mut ac);
        assert_eq!(ac, [2.0, 0.0]);
    }

    #[test]
    fn stats_guard_small_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sample_stdev(&[]), 0.0);
        assert_eq!(mean(&[1.0, 3.0]), 2.0);
        assert!((sample_stdev(&[1.0, 3.0]) - std::f32::consts::SQRT_2).abs() < 1e-6);
    }
}
