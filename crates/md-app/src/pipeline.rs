use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use md_audio::analyzer::FrameAnalyzer;
use md_audio::capture::AudioCapture;
use md_core::config::AnalysisConfig;
use md_core::features::FeatureVector;
use md_core::mood::MoodSignal;
use md_core::settings::Settings;
use md_core::shutdown::ShutdownController;
use md_mood::model::MoodModel;
use md_mood::prediction::{self, PredictionLoop};
use triple_buffer::TripleBuffer;

use crate::monitor::{self, Monitor};

/// Load both models. Never fails: an unloadable model, or one trained on
/// another feature layout than `config`'s, predicts 0.
#[must_use]
pub fn load_models(settings: &Settings, config: &AnalysisConfig) -> (MoodModel, MoodModel) {
    let n = config.feature_len();
    let arousal = MoodModel::load(&settings.arousal_dir, "arousal", n);
    let valence = MoodModel::load(&settings.valence_dir, "valence", n);
    if !arousal.is_valid() {
        log::warn!("Modèle arousal invalide : arousal affiché à 0");
    }
    if !valence.is_valid() {
        log::warn!("Modèle valence invalide : valence affichée à 0");
    }
    (arousal, valence)
}

/// Live mode: capture → analysis → prediction → console monitor, until Ctrl-C.
///
/// Models are loaded before any thread or stream starts. On Ctrl-C the
/// worker threads get `shutdown_timeout` to report their exit; the audio
/// streams are dropped afterwards in every case.
///
/// # Errors
/// Returns an error if the Ctrl-C handler, the capture stream or a worker
/// thread cannot be set up.
pub fn run_live(settings: &Settings, show_features: bool) -> Result<()> {
    let config = AnalysisConfig::default();

    // 1. Modèles (avant tout thread)
    let (arousal, valence) = load_models(settings, &config);

    // 2. État partagé
    let (analyzer, windows) = FrameAnalyzer::new(&config);
    let signal = Arc::new(MoodSignal::new());
    let mut controller = ShutdownController::new();

    let interrupter = controller.interrupter();
    ctrlc::set_handler(move || interrupter.interrupt())
        .context("Impossible d'installer le gestionnaire Ctrl-C")?;

    // 3. Capture audio (le FrameAnalyzer tourne dans le callback)
    let capture = AudioCapture::start(
        analyzer,
        config.sample_rate(),
        settings.input_device.as_deref(),
        settings.passthrough,
    )?;
    log::info!(
        "Capture démarrée : {} ({} Hz, {} canaux)",
        capture.device_name(),
        capture.sample_rate(),
        capture.channels()
    );

    // 4. Prédiction + moniteur
    let mut prediction = PredictionLoop::new(
        &config,
        windows,
        Box::new(arousal),
        Box::new(valence),
        Arc::clone(&signal),
    )
    .with_warmup(settings.warmup());

    let feature_output = if show_features {
        let (input, output) = TripleBuffer::new(&FeatureVector::new(&config)).split();
        prediction = prediction.with_feature_output(input);
        Some(output)
    } else {
        None
    };

    let mut handles: Vec<(&'static str, JoinHandle<()>)> = Vec::with_capacity(2);
    handles.push((
        prediction::THREAD_NAME,
        prediction::spawn_prediction_thread(prediction, controller.token())?,
    ));
    let monitor = Monitor::new(
        Arc::clone(&signal),
        settings.smoothing_lambda,
        feature_output,
        settings.monitor_interval(),
    );
    handles.push((
        monitor::THREAD_NAME,
        monitor::spawn_monitor_thread(monitor, controller.token())?,
    ));

    // 5. Attente de Ctrl-C puis arrêt coopératif
    controller.wait_for_interrupt();
    log::info!("Arrêt demandé");
    let missing = controller.wait_for_exits(
        &[prediction::THREAD_NAME, monitor::THREAD_NAME],
        settings.shutdown_timeout(),
    );

    drop(capture);
    for (name, handle) in handles {
        if missing.contains(&name) {
            // Détaché : le processus se termine sans l'attendre.
            continue;
        }
        if handle.join().is_err() {
            log::error!("Thread '{name}' a paniqué");
        }
    }

    log::info!("Arrêt terminé après {} cycles de prédiction", signal.cycles());
    Ok(())
}
