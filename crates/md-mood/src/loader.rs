//! Text parameter store for [`RegressionModel`].
//!
//! A model directory holds six files:
//!
//! | File | Content |
//! |------|---------|
//! | `bias.txt` | one float |
//! | `scale.txt` | one float |
//! | `mu.txt` | array 1 × N |
//! | `sigma.txt` | array 1 × N |
//! | `alpha.txt` | array 1 × M |
//! | `support_vectors.txt` | array M × N |
//!
//! Arrays are whitespace-separated: `COLS <n> ROWS <m> DATA` followed by
//! exactly `n · m` floats, row-major.

use std::path::{Path, PathBuf};

use crate::error::ModelError;
use crate::model::RegressionModel;

/// A parsed parameter array.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamArray {
    /// Columns (`COLS`).
    pub cols: usize,
    /// Rows (`ROWS`).
    pub rows: usize,
    /// `rows × cols` values, row-major.
    pub data: Vec<f32>,
}

/// Parse an array from text. `path` only labels errors.
///
/// # Errors
/// Missing header keyword, bad dimension, unparsable value, too few values
/// or trailing values.
///
/// # Example
/// ```
/// use std::path::Path;
/// use md_mood::loader::parse_array;
/// let a = parse_array("COLS 2 ROWS 1 DATA 0.5 -1.0", Path::new("mu.txt")).unwrap();
/// assert_eq!((a.cols, a.rows), (2, 1));
/// assert_eq!(a.data, vec![0.5, -1.0]);
/// ```
pub fn parse_array(text: &str, path: &Path) -> Result<ParamArray, ModelError> {
    let mut tokens = text.split_whitespace();

    expect_header(&mut tokens, "COLS", path)?;
    let cols = read_dimension(&mut tokens, "COLS", path)?;
    expect_header(&mut tokens, "ROWS", path)?;
    let rows = read_dimension(&mut tokens, "ROWS", path)?;
    expect_header(&mut tokens, "DATA", path)?;

    let expected = cols
        .checked_mul(rows)
        .ok_or_else(|| ModelError::BadDimension {
            path: path.to_path_buf(),
            name: "ROWS",
        })?;
    let mut data = Vec::with_capacity(expected);
    for token in tokens.by_ref().take(expected) {
        data.push(parse_float(token, path)?);
    }
    if data.len() < expected {
        return Err(ModelError::MissingValues {
            path: path.to_path_buf(),
            expected,
            found: data.len(),
        });
    }
    if tokens.next().is_some() {
        return Err(ModelError::TrailingData {
            path: path.to_path_buf(),
            expected,
        });
    }

    Ok(ParamArray { cols, rows, data })
}

/// Read and parse an array file.
///
/// # Errors
/// I/O failure or any [`parse_array`] error.
pub fn read_array(path: &Path) -> Result<ParamArray, ModelError> {
    parse_array(&read_text(path)?, path)
}

/// Read the first float of a scalar file. Anything after it is ignored.
///
/// # Errors
/// I/O failure, empty file or unparsable value.
pub fn read_scalar(path: &Path) -> Result<f32, ModelError> {
    let text = read_text(path)?;
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| ModelError::MissingValues {
            path: path.to_path_buf(),
            expected: 1,
            found: 0,
        })?;
    parse_float(token, path)
}

/// Load and validate the model stored in `dir`.
///
/// # Errors
/// Any file error, or arrays whose shapes disagree: `mu` must be 1 × N,
/// `sigma` 1 × N, `alpha` 1 × M and `support_vectors` M × N.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use md_mood::loader::load_model;
/// let model = load_model(Path::new("assets/arousal.info")).unwrap();
/// assert_eq!(model.num_features(), 52);
/// ```
pub fn load_model(dir: &Path) -> Result<RegressionModel, ModelError> {
    let bias = read_scalar(&dir.join("bias.txt"))?;
    let scale = read_scalar(&dir.join("scale.txt"))?;

    let mu = read_array(&dir.join("mu.txt"))?;
    check_shape("mu", &mu, 1, mu.cols)?;
    let n = mu.cols;

    let sigma = read_array(&dir.join("sigma.txt"))?;
    check_shape("sigma", &sigma, 1, n)?;

    let alpha = read_array(&dir.join("alpha.txt"))?;
    check_shape("alpha", &alpha, 1, alpha.cols)?;
    let m = alpha.cols;

    let support_vectors = read_array(&dir.join("support_vectors.txt"))?;
    check_shape("support_vectors", &support_vectors, m, n)?;

    RegressionModel::new(
        mu.data,
        sigma.data,
        support_vectors.data,
        alpha.data,
        scale,
        bias,
    )
}

fn read_text(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn expect_header<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    keyword: &'static str,
    path: &Path,
) -> Result<(), ModelError> {
    match tokens.next() {
        Some(t) if t == keyword => Ok(()),
        _ => Err(ModelError::MissingHeader {
            path: path.to_path_buf(),
            expected: keyword,
        }),
    }
}

fn read_dimension<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
    path: &Path,
) -> Result<usize, ModelError> {
    tokens
        .next()
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| ModelError::BadDimension {
            path: path.to_path_buf(),
            name,
        })
}

fn parse_float(token: &str, path: &Path) -> Result<f32, ModelError> {
    token.parse::<f32>().map_err(|_| ModelError::Parse {
        path: PathBuf::from(path),
        token: token.to_string(),
    })
}

fn check_shape(
    what: &'static str,
    array: &ParamArray,
    rows: usize,
    cols: usize,
) -> Result<(), ModelError> {
    if array.rows == rows && array.cols == cols {
        Ok(())
    } else {
        Err(ModelError::ShapeMismatch {
            what,
            rows: array.rows,
            cols: array.cols,
            expected_rows: rows,
            expected_cols: cols,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_model(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
    }

    fn valid_files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("bias.txt", "0.25\n"),
            ("scale.txt", "1.0\n"),
            ("mu.txt", "COLS 2\nROWS 1\nDATA\n0.0 0.0\n"),
            ("sigma.txt", "COLS 2\nROWS 1\nDATA\n1.0 1.0\n"),
            ("alpha.txt", "COLS 3\nROWS 1\nDATA\n1.0 0.5 -0.5\n"),
            (
                "support_vectors.txt",
                "COLS 2\nROWS 3\nDATA\n0.0 0.0\n1.0 0.0\n0.0 1.0\n",
            ),
        ]
    }

    #[test]
    fn loads_a_complete_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), &valid_files());
        let model = load_model(dir.path()).unwrap();
        assert_eq!(model.num_features(), 2);
        assert_eq!(model.num_support_vectors(), 3);
        assert_eq!(model.bias(), 0.25);
        // At the origin: 1 + 0.5·e⁻¹ - 0.5·e⁻¹ + bias.
        assert!((model.predict(&[0.0, 0.0]) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = valid_files();
        files.retain(|(name, _)| *name != "alpha.txt");
        write_model(dir.path(), &files);
        assert!(matches!(load_model(dir.path()), Err(ModelError::Io { .. })));
    }

    #[test]
    fn support_vector_shape_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = valid_files();
        files.push(("support_vectors.txt", "COLS 2\nROWS 2\nDATA\n0 0 1 1\n"));
        write_model(dir.path(), &files);
        assert!(matches!(
            load_model(dir.path()),
            Err(ModelError::ShapeMismatch {
                what: "support_vectors",
                expected_rows: 3,
                ..
            })
        ));
    }

    #[test]
    fn sigma_must_match_mu() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = valid_files();
        files.push(("sigma.txt", "COLS 3 ROWS 1 DATA 1 1 1"));
        write_model(dir.path(), &files);
        assert!(matches!(
            load_model(dir.path()),
            Err(ModelError::ShapeMismatch { what: "sigma", .. })
        ));
    }

    #[test]
    fn multi_row_mu_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = valid_files();
        files.push(("mu.txt", "COLS 1 ROWS 2 DATA 0 0"));
        write_model(dir.path(), &files);
        assert!(matches!(
            load_model(dir.path()),
            Err(ModelError::ShapeMismatch { what: "mu", .. })
        ));
    }

    #[test]
    fn array_format_errors() {
        let p = Path::new("x.txt");
        assert!(matches!(
            parse_array("ROWS 1 COLS 1 DATA 0", p),
            Err(ModelError::MissingHeader { expected: "COLS", .. })
        ));
        assert!(matches!(
            parse_array("COLS -1 ROWS 1 DATA", p),
            Err(ModelError::BadDimension { name: "COLS", .. })
        ));
        assert!(matches!(
            parse_array("COLS 2 ROWS 1 DATA 1.0", p),
            Err(ModelError::MissingValues {
                expected: 2,
                found: 1,
                ..
            })
        ));
        assert!(matches!(
            parse_array("COLS 2 ROWS 1 DATA 1.0 abc", p),
            Err(ModelError::Parse { .. })
        ));
        assert!(matches!(
            parse_array("COLS 1 ROWS 1 DATA 1.0 2.0", p),
            Err(ModelError::TrailingData { expected: 1, .. })
        ));
    }

    #[test]
    fn empty_array_is_valid() {
        let a = parse_array("COLS 0 ROWS 1 DATA", Path::new("alpha.txt")).unwrap();
        assert!(a.data.is_empty());
    }

    #[test]
    fn scalar_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bias.txt");
        std::fs::write(&path, "  -1.5e-1 \n").unwrap();
        assert!((read_scalar(&path).unwrap() + 0.15).abs() < 1e-7);
        std::fs::write(&path, "\n").unwrap();
        assert!(matches!(read_scalar(&path), Err(ModelError::MissingValues { .. })));
    }
}
