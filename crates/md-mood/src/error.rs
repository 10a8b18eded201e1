use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or building a regression model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A parameter file could not be read.
    #[error("Impossible de lire {path} : {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An array file lacks one of its `COLS` / `ROWS` / `DATA` headers.
    #[error("En-tête {expected} manquant dans {path}")]
    MissingHeader {
        /// File being parsed.
        path: PathBuf,
        /// Header keyword expected at this position.
        expected: &'static str,
    },

    /// A `COLS` or `ROWS` value is missing or not a non-negative integer.
    #[error("Dimension {name} invalide dans {path}")]
    BadDimension {
        /// File being parsed.
        path: PathBuf,
        /// `COLS` or `ROWS`.
        name: &'static str,
    },

    /// Fewer values than the declared dimensions require.
    #[error("{path} : {expected} valeurs attendues, {found} lues")]
    MissingValues {
        /// File being parsed.
        path: PathBuf,
        /// Values required by the header.
        expected: usize,
        /// Values actually present.
        found: usize,
    },

    /// A value is not a float.
    #[error("Valeur illisible '{token}' dans {path}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Offending token.
        token: String,
    },

    /// Values remain after the declared data.
    #[error("Données en trop après les {expected} valeurs de {path}")]
    TrailingData {
        /// File being parsed.
        path: PathBuf,
        /// Values declared by the header.
        expected: usize,
    },

    /// Parameter arrays disagree on the feature or support-vector count.
    #[error("{what} : forme {rows}x{cols}, attendu {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        /// Parameter name (`mu`, `sigma`, `alpha`, `support_vectors`).
        what: &'static str,
        /// Rows found.
        rows: usize,
        /// Columns found.
        cols: usize,
        /// Rows required.
        expected_rows: usize,
        /// Columns required.
        expected_cols: usize,
    },

    /// The model was trained on another feature layout.
    #[error("{path} : modèle à {found} features, {expected} attendues")]
    FeatureCount {
        /// Model directory.
        path: PathBuf,
        /// Features declared by `mu`.
        found: usize,
        /// Length of the feature vector produced by the analysis.
        expected: usize,
    },

    /// Kernel scale is zero or not finite.
    #[error("Échelle de noyau invalide : {0}")]
    InvalidScale(f32),
}
