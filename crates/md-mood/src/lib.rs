// Mood regression models, parameter loading, and the prediction loop for moodetect.

pub mod error;
pub mod loader;
pub mod model;
pub mod prediction;
pub mod smoothing;

pub use error::ModelError;
pub use model::{MoodModel, RegressionModel};
pub use prediction::{LoopState, PredictionLoop};
pub use smoothing::MoodSmoother;
