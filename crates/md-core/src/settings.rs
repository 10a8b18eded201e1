use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime settings, loaded once at startup.
///
/// These are the knobs around the analysis core (model locations, thread
/// timing, monitoring). The DSP constants themselves live in
/// [`AnalysisConfig`](crate::config::AnalysisConfig) and are not configurable.
///
/// # Example
/// ```
/// use md_core::settings::Settings;
/// let settings = Settings::default();
/// assert_eq!(settings.smoothing_lambda, 0.5);
/// assert!(!settings.passthrough);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    // === Modèles ===
    /// Directory holding the arousal model parameter files.
    pub arousal_dir: PathBuf,
    /// Directory holding the valence model parameter files.
    pub valence_dir: PathBuf,

    // === Runtime ===
    /// Upper bound of the prediction loop warmup, in seconds.
    pub warmup_secs: f32,
    /// Bounded wait for worker threads at shutdown, in seconds.
    pub shutdown_timeout_secs: f32,
    /// Console monitor refresh period, in milliseconds.
    pub monitor_interval_ms: u64,
    /// Mirror the captured input to the default output device.
    pub passthrough: bool,
    /// Input device name (substring match). None = default device.
    pub input_device: Option<String>,

    // === Lissage ===
    /// Weight of the newest prediction in the exponential smoother (0, 1].
    pub smoothing_lambda: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arousal_dir: PathBuf::from("assets/arousal.info"),
            valence_dir: PathBuf::from("assets/valence.info"),
            warmup_secs: 3.5,
            shutdown_timeout_secs: 10.0,
            monitor_interval_ms: 100,
            passthrough: false,
            input_device: None,
            smoothing_lambda: 0.5,
        }
    }
}

impl Settings {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.warmup_secs = clamp_finite(self.warmup_secs, 0.0, 60.0, 3.5);
        self.shutdown_timeout_secs = clamp_finite(self.shutdown_timeout_secs, 0.1, 60.0, 10.0);
        self.monitor_interval_ms = self.monitor_interval_ms.clamp(10, 5000);
        self.smoothing_lambda = clamp_finite(self.smoothing_lambda, 0.01, 1.0, 0.5);
    }

    /// Warmup bound as a `Duration`.
    #[must_use]
    pub fn warmup(&self) -> Duration {
        Duration::from_secs_f32(self.warmup_secs)
    }

    /// Shutdown wait as a `Duration`.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.shutdown_timeout_secs)
    }

    /// Monitor refresh period as a `Duration`.
    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct SettingsFile {
    models: Option<ModelsSection>,
    runtime: Option<RuntimeSection>,
    smoothing: Option<SmoothingSection>,
}

/// `[models]` section, all fields optional for partial override.
#[derive(Deserialize)]
struct ModelsSection {
    arousal_dir: Option<PathBuf>,
    valence_dir: Option<PathBuf>,
}

/// `[runtime]` section.
#[derive(Deserialize)]
struct RuntimeSection {
    warmup_secs: Option<f32>,
    shutdown_timeout_secs: Option<f32>,
    monitor_interval_ms: Option<u64>,
    passthrough: Option<bool>,
    input_device: Option<String>,
}

/// `[smoothing]` section.
#[derive(Deserialize)]
struct SmoothingSection {
    lambda: Option<f32>,
}

/// Parse settings from TOML text, merged over the defaults.
///
/// Relative model directories are kept as written.
///
/// # Errors
/// Returns an error if the text is not valid TOML for the settings layout.
///
/// # Example
/// ```
/// use md_core::settings::parse_settings;
/// let s = parse_settings("[smoothing]\nlambda = 0.25\n").unwrap();
/// assert_eq!(s.smoothing_lambda, 0.25);
/// assert_eq!(s.monitor_interval_ms, 100);
/// ```
pub fn parse_settings(content: &str) -> Result<Settings> {
    let file: SettingsFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut settings = Settings::default();

    if let Some(m) = file.models {
        if let Some(v) = m.arousal_dir {
            settings.arousal_dir = v;
        }
        if let Some(v) = m.valence_dir {
            settings.valence_dir = v;
        }
    }
    if let Some(r) = file.runtime {
        if let Some(v) = r.warmup_secs {
            settings.warmup_secs = v;
        }
        if let Some(v) = r.shutdown_timeout_secs {
            settings.shutdown_timeout_secs = v;
        }
        if let Some(v) = r.monitor_interval_ms {
            settings.monitor_interval_ms = v;
        }
        if let Some(v) = r.passthrough {
            settings.passthrough = v;
        }
        if r.input_device.is_some() {
            settings.input_device = r.input_device;
        }
    }
    if let Some(s) = file.smoothing
        && let Some(v) = s.lambda
    {
        settings.smoothing_lambda = v;
    }

    settings.clamp_all();
    Ok(settings)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use md_core::settings::load_settings;
/// use std::path::Path;
/// let settings = load_settings(Path::new("config/moodetect.toml")).unwrap();
/// ```
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_settings(&content).with_context(|| format!("Configuration invalide dans {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let s = parse_settings("").unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_sections_override_fields() {
        let s = parse_settings(
            r#"
[models]
arousal_dir = "models/a"

[runtime]
passthrough = true
input_device = "USB"
"#,
        )
        .unwrap();
        assert_eq!(s.arousal_dir, PathBuf::from("models/a"));
        assert_eq!(s.valence_dir, Settings::default().valence_dir);
        assert!(s.passthrough);
        assert_eq!(s.input_device.as_deref(), Some("USB"));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let s = parse_settings(
            r"
[runtime]
shutdown_timeout_secs = 500.0
monitor_interval_ms = 1

[smoothing]
lambda = 7.0
",
        )
        .unwrap();
        assert_eq!(s.shutdown_timeout_secs, 60.0);
        assert_eq!(s.monitor_interval_ms, 10);
        assert_eq!(s.smoothing_lambda, 1.0);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_settings("[runtime\npassthrough = yes").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moodetect.toml");
        std::fs::write(&path, "[runtime]\nwarmup_secs = 1.0\n").unwrap();
        let s = load_settings(&path).unwrap();
        assert_eq!(s.warmup(), Duration::from_secs(1));
        assert!(load_settings(&dir.path().join("missing.toml")).is_err());
    }
}
