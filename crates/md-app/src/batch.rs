use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use md_audio::aggregate::FeatureAggregator;
use md_audio::batch_analyzer::{BatchAnalyzer, WindowSnapshot};
use md_core::config::AnalysisConfig;
use md_core::features::FeatureVector;
use md_core::settings::Settings;
use md_core::traits::Regressor;
use rayon::prelude::*;
use serde::Serialize;

use crate::pipeline::load_models;

/// Mood of one analysis window of a file.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WindowPrediction {
    /// Stream time at the end of the window, in seconds.
    pub time_secs: f32,
    /// Emotional intensity.
    pub arousal: f32,
    /// Positivity / negativity.
    pub valence: f32,
}

/// Point d'entrée du mode fichier : décode, analyse fenêtre par fenêtre,
/// prédit en parallèle puis écrit une ligne par fenêtre sur stdout.
///
/// # Errors
/// Retourne une erreur si le décodage échoue ou si la sortie n'est pas
/// inscriptible.
pub fn run_batch(path: &Path, settings: &Settings, json: bool) -> Result<()> {
    let config = AnalysisConfig::default();
    let (arousal, valence) = load_models(settings, &config);

    log::info!("Analyse offline de {}", path.display());
    let snapshots = BatchAnalyzer::new(&config, config.frames_per_window())
        .analyze_file(path)
        .with_context(|| format!("Analyse impossible : {}", path.display()))?;
    if snapshots.is_empty() {
        log::warn!(
            "{} est plus court qu'une fenêtre ({} s) : aucune prédiction",
            path.display(),
            config.window_seconds()
        );
    }

    let predictions = predict_windows(&config, &snapshots, &arousal, &valence);
    log::info!("{} fenêtres prédites", predictions.len());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_predictions(&mut out, &predictions, json)?;
    out.flush()?;
    Ok(())
}

/// Predict every snapshot in parallel. Output keeps the snapshot order.
///
/// Each rayon worker owns one aggregator and one feature vector. Non-finite
/// predictions are reported as 0.
pub fn predict_windows<R: Regressor>(
    config: &AnalysisConfig,
    snapshots: &[WindowSnapshot],
    arousal: &R,
    valence: &R,
) -> Vec<WindowPrediction> {
    snapshots
        .par_iter()
        .map_init(
            || {
                (
                    FeatureAggregator::new(config),
                    FeatureVector::new(config),
                    Vec::with_capacity(config.feature_len()),
                )
            },
            |(aggregator, features, scratch), snapshot| {
                let replaced = aggregator.collect_snapshot(snapshot, features);
                if replaced > 0 {
                    log::debug!(
                        "t={:.2}s : {replaced} valeurs non finies remplacées par 0",
                        snapshot.end_secs
                    );
                }
                let x = features.as_slice();
                WindowPrediction {
                    time_secs: snapshot.end_secs,
                    arousal: finite_or_zero(arousal.predict(x, scratch)),
                    valence: finite_or_zero(valence.predict(x, scratch)),
                }
            },
        )
        .collect()
}

/// Write one line per window: `t=…s arousal=… valence=…`, or JSON lines.
///
/// # Errors
/// I/O or serialisation failure.
pub fn write_predictions<W: Write>(
    out: &mut W,
    predictions: &[WindowPrediction],
    json: bool,
) -> Result<()> {
    for p in predictions {
        if json {
            serde_json::to_writer(&mut *out, p)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "t={:.2}s arousal={:.6} valence={:.6}",
                p.time_secs, p.arousal, p.valence
            )?;
        }
    }
    Ok(())
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}
