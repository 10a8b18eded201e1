use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Frame length unusable for the contrast band layout.
    #[error("Longueur de frame invalide : {frame_length} (puissance de 2 >= {minimum} requise)")]
    InvalidFrameLength {
        /// Requested frame length.
        frame_length: usize,
        /// Smallest accepted frame length.
        minimum: usize,
    },

    /// Analysis window too short for the rhythm statistics.
    #[error("Fenêtre d'analyse trop courte : {frames} frames (minimum 3)")]
    InvalidWindow {
        /// Frames that fit in the requested window.
        frames: usize,
    },
}
