// Audio capture, frame analysis, and window feature extraction for moodetect.

pub mod aggregate;
pub mod analyzer;
pub mod batch_analyzer;
pub mod capture;
pub mod decode;
pub mod error;
pub mod fft;
pub mod rhythm;
pub mod spectral;

pub use aggregate::FeatureAggregator;
pub use analyzer::FrameAnalyzer;
pub use error::AudioError;
pub use rhythm::RhythmExtractor;
