use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use md_audio::aggregate::FeatureAggregator;
use md_core::config::AnalysisConfig;
use md_core::features::FeatureVector;
use md_core::mood::{MoodReading, MoodSignal};
use md_core::shutdown::ShutdownToken;
use md_core::traits::Regressor;
use md_core::window::SharedWindows;

/// Exit name reported by the prediction thread.
pub const THREAD_NAME: &str = "md-prediction";

/// Lifecycle of the prediction loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the first full window.
    Warmup,
    /// Predicting continuously.
    Running,
    /// Left the loop after a shutdown request.
    Terminated,
}

/// Best-effort consumer: windows → feature vector → two models → [`MoodSignal`].
///
/// Runs unthrottled once warmed up. Reads the shared windows without any
/// synchronisation with the audio thread (see [`SharedWindows`]). Each cycle
/// also publishes the feature vector through a triple buffer when one is
/// attached.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use md_core::config::AnalysisConfig;
/// use md_core::mood::MoodSignal;
/// use md_audio::analyzer::FrameAnalyzer;
/// use md_mood::model::MoodModel;
/// use md_mood::prediction::PredictionLoop;
///
/// let config = AnalysisConfig::default();
/// let (_analyzer, windows) = FrameAnalyzer::new(&config);
/// let signal = Arc::new(MoodSignal::new());
/// let mut prediction = PredictionLoop::new(
///     &config,
///     windows,
///     Box::new(MoodModel::Invalid),
///     Box::new(MoodModel::Invalid),
///     Arc::clone(&signal),
/// );
/// prediction.run_cycle();
/// assert_eq!(signal.cycles(), 1);
/// ```
pub struct PredictionLoop {
    windows: SharedWindows,
    aggregator: FeatureAggregator,
    features: FeatureVector,
    arousal: Box<dyn Regressor>,
    valence: Box<dyn Regressor>,
    scratch: Vec<f32>,
    signal: Arc<MoodSignal>,
    feature_output: Option<triple_buffer::Input<FeatureVector>>,
    warmup: Duration,
    poll: Duration,
    state: LoopState,
}

impl PredictionLoop {
    /// Build the loop. Warmup defaults to one window plus half a second.
    #[must_use]
    pub fn new(
        config: &AnalysisConfig,
        windows: SharedWindows,
        arousal: Box<dyn Regressor>,
        valence: Box<dyn Regressor>,
        signal: Arc<MoodSignal>,
    ) -> Self {
        Self {
            windows,
            aggregator: FeatureAggregator::new(config),
            features: FeatureVector::new(config),
            arousal,
            valence,
            scratch: Vec::with_capacity(config.feature_len()),
            signal,
            feature_output: None,
            warmup: Duration::from_secs_f32(config.window_seconds() + 0.5),
            poll: config.block_duration(),
            state: LoopState::Warmup,
        }
    }

    /// Upper bound of the warmup wait.
    #[must_use]
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Publish each cycle's feature vector into `input`.
    #[must_use]
    pub fn with_feature_output(mut self, input: triple_buffer::Input<FeatureVector>) -> Self {
        self.feature_output = Some(input);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Latest feature vector computed by [`run_cycle`](Self::run_cycle).
    #[must_use]
    pub fn features(&self) -> &FeatureVector {
        &self.features
    }

    /// One prediction: aggregate, predict both axes, publish.
    ///
    /// A non-finite prediction is published as 0.
    pub fn run_cycle(&mut self) -> MoodReading {
        let replaced = self.aggregator.collect(&self.windows, &mut self.features);
        if replaced > 0 {
            log::debug!("{replaced} valeurs non finies remplacées par 0");
        }

        let x = self.features.as_slice();
        let reading = MoodReading {
            arousal: finite_or_zero(self.arousal.predict(x, &mut self.scratch)),
            valence: finite_or_zero(self.valence.predict(x, &mut self.scratch)),
        };
        self.signal.publish(reading.arousal, reading.valence);

        if let Some(out) = self.feature_output.as_mut() {
            out.input_buffer_mut().copy_from(&self.features);
            out.publish();
        }
        reading
    }

    /// WARMUP: wait until the windows hold one full window, bounded by the
    /// warmup duration.
    ///
    /// Returns `false` if shutdown was requested meanwhile.
    pub fn warm_up(&mut self, token: &ShutdownToken) -> bool {
        self.state = LoopState::Warmup;
        let deadline = Instant::now() + self.warmup;
        while !self.windows.timbre.is_filled() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                log::warn!(
                    "Fenêtre incomplète après {:?} ({} frames), prédiction démarrée",
                    self.warmup,
                    self.windows.timbre.frames_written()
                );
                break;
            }
            if token.wait(left.min(self.poll)) {
                return false;
            }
        }
        true
    }

    /// Full lifecycle: WARMUP → RUNNING → TERMINATED, then report the exit.
    pub fn run(mut self, token: &ShutdownToken) {
        if self.warm_up(token) {
            self.state = LoopState::Running;
            log::info!("Prédiction démarrée");
            while !token.is_requested() {
                self.run_cycle();
            }
        }
        self.state = LoopState::Terminated;
        log::info!("Prédiction arrêtée après {} cycles", self.signal.cycles());
        token.report_exit(THREAD_NAME);
    }
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

/// Spawn the prediction loop on its own named thread.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_prediction_thread(
    prediction: PredictionLoop,
    token: ShutdownToken,
) -> anyhow::Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || prediction.run(&token))?;
    Ok(handle)
}
