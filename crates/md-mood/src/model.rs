use std::path::Path;

use md_core::traits::Regressor;

use crate::error::ModelError;

/// Gaussian-kernel support vector regression model.
///
/// `predict(x) = bias + Σ alpha[i] · exp(-‖sv[i] - x̂‖² / scale²)` where
/// `x̂[j] = (x[j] - mu[j]) / sigma[j]`. Support vectors are stored already
/// normalised, row-major (`num_sv × num_features`).
///
/// Immutable once built; `Send + Sync`, so the two models can be shared by
/// reference with any number of threads.
///
/// # Example
/// ```
/// use md_mood::model::RegressionModel;
/// // One feature, one support vector at the origin.
/// let model = RegressionModel::new(vec![0.0], vec![1.0], vec![0.0], vec![1.0], 1.0, 0.0).unwrap();
/// assert_eq!(model.predict(&[0.0]), 1.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RegressionModel {
    num_features: usize,
    mu: Vec<f32>,
    sigma: Vec<f32>,
    support_vectors: Vec<f32>,
    alpha: Vec<f32>,
    scale: f32,
    bias: f32,
    /// `scale²`, computed once.
    variance: f32,
}

impl RegressionModel {
    /// Build a model, checking that every array agrees on the shapes.
    ///
    /// `mu` and `sigma` give the feature count N; `alpha` gives the support
    /// vector count M; `support_vectors` must hold M·N values.
    ///
    /// # Errors
    /// [`ModelError::ShapeMismatch`] on inconsistent lengths,
    /// [`ModelError::InvalidScale`] if `scale` is zero or not finite.
    pub fn new(
        mu: Vec<f32>,
        sigma: Vec<f32>,
        support_vectors: Vec<f32>,
        alpha: Vec<f32>,
        scale: f32,
        bias: f32,
    ) -> Result<Self, ModelError> {
        let num_features = mu.len();
        if sigma.len() != num_features {
            return Err(ModelError::ShapeMismatch {
                what: "sigma",
                rows: 1,
                cols: sigma.len(),
                expected_rows: 1,
                expected_cols: num_features,
            });
        }
        let num_sv = alpha.len();
        if support_vectors.len() != num_sv * num_features {
            return Err(ModelError::ShapeMismatch {
                what: "support_vectors",
                rows: support_vectors.len().checked_div(num_features).unwrap_or(0),
                cols: num_features,
                expected_rows: num_sv,
                expected_cols: num_features,
            });
        }
        let variance = scale * scale;
        if !scale.is_finite() || variance == 0.0 || !variance.is_finite() {
            return Err(ModelError::InvalidScale(scale));
        }

        Ok(Self {
            num_features,
            mu,
            sigma,
            support_vectors,
            alpha,
            scale,
            bias,
            variance,
        })
    }

    /// Predict with caller-provided scratch for the normalised input.
    ///
    /// Missing trailing features read as 0, extra ones are ignored. A `sigma`
    /// of 0 normalises its feature to 0. Does not allocate once `normed` has
    /// grown to `num_features`.
    pub fn predict_with(&self, x: &[f32], normed: &mut Vec<f32>) -> f32 {
        normed.clear();
        normed.extend(
            self.mu
                .iter()
                .zip(&self.sigma)
                .enumerate()
                .map(|(j, (&mu, &sigma))| {
                    let v = x.get(j).copied().unwrap_or(0.0);
                    if sigma == 0.0 { 0.0 } else { (v - mu) / sigma }
                }),
        );

        let mut sum = 0.0f32;
        if self.num_features == 0 {
            // Every support vector coincides with the (empty) input.
            sum = self.alpha.iter().sum();
        } else {
            for (sv, &alpha) in self
                .support_vectors
                .chunks_exact(self.num_features)
                .zip(&self.alpha)
            {
                let dist: f32 = sv
                    .iter()
                    .zip(normed.iter())
                    .map(|(s, v)| (s - v) * (s - v))
                    .sum();
                sum += alpha * (-dist / self.variance).exp();
            }
        }
        sum + self.bias
    }

    /// Predict, allocating a temporary normalisation buffer.
    #[must_use]
    pub fn predict(&self, x: &[f32]) -> f32 {
        let mut normed = Vec::with_capacity(self.num_features);
        self.predict_with(x, &mut normed)
    }

    /// Feature count N.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Support vector count M.
    #[must_use]
    pub fn num_support_vectors(&self) -> usize {
        self.alpha.len()
    }

    /// Kernel bandwidth.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Constant term.
    #[must_use]
    pub fn bias(&self) -> f32 {
        self.bias
    }
}

/// A model slot that may have failed to load.
///
/// An invalid model predicts 0: the application keeps running with a flat
/// mood on that axis instead of aborting.
#[derive(Clone, Debug)]
pub enum MoodModel {
    /// Loaded and validated.
    Valid(RegressionModel),
    /// Loading failed; predictions are 0.
    Invalid,
}

impl MoodModel {
    /// Load the model stored in `dir`, logging and degrading on failure.
    ///
    /// A model whose feature count differs from `feature_len` is invalid.
    /// `name` only labels log messages (`arousal`, `valence`).
    #[must_use]
    pub fn load(dir: &Path, name: &str, feature_len: usize) -> Self {
        let loaded = crate::loader::load_model(dir).and_then(|model| {
            if model.num_features() == feature_len {
                Ok(model)
            } else {
                Err(ModelError::FeatureCount {
                    path: dir.to_path_buf(),
                    found: model.num_features(),
                    expected: feature_len,
                })
            }
        });
        match loaded {
            Ok(model) => {
                log::info!(
                    "Modèle {name} chargé depuis {} ({} features, {} vecteurs supports)",
                    dir.display(),
                    model.num_features(),
                    model.num_support_vectors()
                );
                Self::Valid(model)
            }
            Err(e) => {
                log::error!("Échec du chargement du modèle {name} ({}) : {e}", dir.display());
                Self::Invalid
            }
        }
    }

    /// `true` if the model loaded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

impl From<Result<RegressionModel, ModelError>> for MoodModel {
    fn from(result: Result<RegressionModel, ModelError>) -> Self {
        result.map_or(Self::Invalid, Self::Valid)
    }
}

impl Regressor for MoodModel {
    fn predict(&self, features: &[f32], scratch: &mut Vec<f32>) -> f32 {
        match self {
            Self::Valid(model) => model.predict_with(features, scratch),
            Self::Invalid => 0.0,
        }
    }
}
