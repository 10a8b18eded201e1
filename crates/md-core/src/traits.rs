/// Consumes fixed-size audio blocks on the real-time thread.
///
/// Implémenté par : `FrameAnalyzer`.
///
/// # Example
/// ```
/// use md_core::traits::BlockAnalyzer;
///
/// struct CountingAnalyzer(usize);
/// impl BlockAnalyzer for CountingAnalyzer {
///     fn process_block(&mut self, _interleaved: &[f32], _channels: usize) { self.0 += 1; }
///     fn block_frames(&self) -> usize { 2048 }
/// }
/// ```
pub trait BlockAnalyzer: Send + 'static {
    /// Analyse one block of interleaved `f32` samples.
    ///
    /// CONTRAT : ne doit PAS allouer, bloquer, ni prendre de verrou. Doit
    /// rendre la main avant le bloc suivant.
    fn process_block(&mut self, interleaved: &[f32], channels: usize);

    /// Frames (samples per channel) expected in each block.
    fn block_frames(&self) -> usize;
}

/// Maps a feature vector to one scalar estimate.
///
/// Implémenté par : `MoodModel`.
///
/// # Example
/// ```
/// use md_core::traits::Regressor;
///
/// struct Constant(f32);
/// impl Regressor for Constant {
///     fn predict(&self, _features: &[f32], _scratch: &mut Vec<f32>) -> f32 { self.0 }
/// }
/// assert_eq!(Constant(0.5).predict(&[], &mut Vec::new()), 0.5);
/// ```
pub trait Regressor: Send + Sync {
    /// Predict from `features`. `scratch` is reusable working memory.
    ///
    /// Must be total: never panic, never return NaN for finite input.
    fn predict(&self, features: &[f32], scratch: &mut Vec<f32>) -> f32;
}
