/// Configuration, shared buffers, and published signals for moodetect.
///
/// This crate holds the types shared by the real-time producer (frame
/// analysis), the best-effort consumer (mood prediction), and the
/// application wiring.

pub mod config;
pub mod error;
pub mod features;
pub mod mood;
pub mod settings;
pub mod shutdown;
pub mod traits;
pub mod window;

pub use config::AnalysisConfig;
pub use error::CoreError;
pub use features::{FeatureVector, RhythmFeatures};
pub use mood::{MoodReading, MoodSignal};
pub use settings::Settings;
pub use shutdown::{Interrupter, ShutdownController, ShutdownToken};
pub use window::{SharedWindows, WindowReader, WindowWriter};
