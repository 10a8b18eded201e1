use std::path::Path;

use md_core::config::AnalysisConfig;

use crate::analyzer::FrameAnalyzer;
use crate::error::AudioError;

/// Frozen copy of the rolling windows at one point of a file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowSnapshot {
    /// Stream time at the end of the window, in seconds.
    pub end_secs: f32,
    /// Timbre matrix, row-major (`num_timbre_features × frames_per_window`).
    pub timbre: Vec<f32>,
    /// Rectified flux, oldest frame first.
    pub flux: Vec<f32>,
}

/// Analyseur offline : rejoue un fichier décodé dans le `FrameAnalyzer`.
///
/// Le flux est découpé en blocs de `frame_length` frames, exactement comme
/// le chemin temps réel, et une copie des fenêtres est prise toutes les
/// `hop_frames` frames une fois la première fenêtre pleine.
pub struct BatchAnalyzer {
    config: AnalysisConfig,
    hop_frames: usize,
}

impl BatchAnalyzer {
    /// Crée un analyseur batch. `hop_frames` est ramené à 1 au minimum.
    ///
    /// # Example
    /// ```
    /// use md_core::config::AnalysisConfig;
    /// use md_audio::batch_analyzer::BatchAnalyzer;
    /// let config = AnalysisConfig::default();
    /// let analyzer = BatchAnalyzer::new(&config, config.frames_per_window());
    /// ```
    #[must_use]
    pub fn new(config: &AnalysisConfig, hop_frames: usize) -> Self {
        Self {
            config: config.clone(),
            hop_frames: hop_frames.max(1),
        }
    }

    /// Analyse a whole interleaved buffer and return one snapshot per hop.
    ///
    /// A trailing partial block is zero-padded. Audio shorter than one window
    /// yields no snapshot.
    ///
    /// # Example
    /// ```
    /// use md_core::config::AnalysisConfig;
    /// use md_audio::batch_analyzer::BatchAnalyzer;
    /// let config = AnalysisConfig::default();
    /// let analyzer = BatchAnalyzer::new(&config, 64);
    /// let silence = vec![0.0f32; 2 * 2048 * 128]; // 128 blocs stéréo
    /// assert_eq!(analyzer.analyze_all(&silence, 2).len(), 2);
    /// ```
    #[must_use]
    pub fn analyze_all(&self, interleaved: &[f32], channels: usize) -> Vec<WindowSnapshot> {
        let channels = channels.max(1);
        let block_len = self.config.frame_length() * channels;
        let columns = self.config.frames_per_window();
        let rows = self.config.num_timbre_features();
        let block_secs = self.config.block_duration().as_secs_f32();

        let (mut analyzer, windows) = FrameAnalyzer::new(&self.config);
        let mut snapshots = Vec::new();

        for block in interleaved.chunks(block_len) {
            analyzer.analyze(block, channels);

            let written = windows.timbre.frames_written();
            let past_first = written.saturating_sub(columns as u64);
            if !windows.timbre.is_filled() || past_first % self.hop_frames as u64 != 0 {
                continue;
            }

            let mut snapshot = WindowSnapshot {
                end_secs: written as f32 * block_secs,
                timbre: vec![0.0; rows * columns],
                flux: vec![0.0; columns],
            };
            windows.timbre.read_all(&mut snapshot.timbre);
            windows.flux.read_row_chronological(0, &mut snapshot.flux);
            snapshots.push(snapshot);
        }

        log::debug!(
            "Batch: {} blocs, {} fenêtres",
            windows.timbre.frames_written(),
            snapshots.len()
        );
        snapshots
    }

    /// Décode un fichier audio et analyse l'intégralité de ses échantillons.
    ///
    /// # Errors
    /// Returns an error if the file cannot be decoded, or if its sample rate
    /// differs from the analysis sample rate (the models are rate-specific).
    pub fn analyze_file(&self, path: &Path) -> anyhow::Result<Vec<WindowSnapshot>> {
        let audio = crate::decode::decode_file(path)?;
        if audio.sample_rate != self.config.sample_rate() {
            return Err(AudioError::UnsupportedFormat(format!(
                "{} Hz (attendu {} Hz) : {}",
                audio.sample_rate,
                self.config.sample_rate(),
                path.display()
            ))
            .into());
        }
        Ok(self.analyze_all(&audio.samples, audio.channels))
    }
}
