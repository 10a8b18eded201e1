use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use md_core::config::ROW_CENTROID;
use md_core::features::FeatureVector;
use md_core::mood::{MoodReading, MoodSignal};
use md_core::shutdown::ShutdownToken;
use md_mood::smoothing::MoodSmoother;

/// Exit name reported by the monitor thread.
pub const THREAD_NAME: &str = "md-monitor";

/// Console stand-in for a visualisation: polls the mood signal, smooths it
/// and rewrites a single status line.
pub struct Monitor {
    signal: Arc<MoodSignal>,
    smoother: MoodSmoother,
    features: Option<triple_buffer::Output<FeatureVector>>,
    interval: Duration,
}

impl Monitor {
    /// `features` is only read when present (`--show-features`).
    #[must_use]
    pub fn new(
        signal: Arc<MoodSignal>,
        lambda: f32,
        features: Option<triple_buffer::Output<FeatureVector>>,
        interval: Duration,
    ) -> Self {
        Self {
            signal,
            smoother: MoodSmoother::new(lambda),
            features,
            interval,
        }
    }

    /// Read, smooth and format one status line.
    pub fn tick(&mut self) -> String {
        let mood = self.smoother.smooth(self.signal.reading());
        let features = self.features.as_mut().map(|out| out.read());
        format_line(mood, features)
    }

    fn run(mut self, token: &ShutdownToken) {
        let mut stdout = std::io::stdout();
        while !token.wait(self.interval) {
            let line = self.tick();
            // Console fermée : on continue sans affichage.
            let _ = write!(stdout, "{line}\r");
            let _ = stdout.flush();
        }
        let _ = writeln!(stdout);
        log::info!("Moniteur arrêté");
        token.report_exit(THREAD_NAME);
    }
}

/// Status line: smoothed mood, then optionally the rhythm scalars and the
/// centroid mean of the last feature vector.
#[must_use]
pub fn format_line(mood: MoodReading, features: Option<&FeatureVector>) -> String {
    let mut line = format!("\tValence: {:.6}\t Arousal: {:.6}", mood.valence, mood.arousal);
    if let Some(f) = features {
        let r = f.rhythm();
        let (centroid, _) = f.timbre_stat(ROW_CENTROID);
        line.push_str(&format!(
            "\t onsets/s: {:.2} onset: {:.3} ac-peak: {:.3} ac-valley: {:.3} centroid: {:.1} Hz",
            r.onsets_per_sec, r.mean_onset_amplitude, r.mean_ac_peak, r.mean_ac_valley, centroid
        ));
    }
    line
}

/// Spawn the monitor on its own named thread.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_monitor_thread(
    monitor: Monitor,
    token: ShutdownToken,
) -> anyhow::Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || monitor.run(&token))?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use md_core::config::AnalysisConfig;
    use md_core::features::RhythmFeatures;
    use md_core::shutdown::ShutdownController;
    use triple_buffer::TripleBuffer;

    use super::*;

    #[test]
    fn mood_only_line() {
        let line = format_line(
            MoodReading {
                arousal: 0.5,
                valence: -0.25,
            },
            None,
        );
        assert_eq!(line, "\tValence: -0.250000\t Arousal: 0.500000");
    }

    #[test]
    fn line_with_features() {
        let mut features = FeatureVector::new(&AnalysisConfig::default());
        features.timbre_stats_mut()[0] = 1234.5;
        features.set_rhythm(RhythmFeatures {
            onsets_per_sec: 2.0,
            mean_onset_amplitude: 0.5,
            mean_ac_peak: 1.0,
            mean_ac_valley: 0.25,
        });
        let line = format_line(MoodReading::default(), Some(&features));
        assert!(line.contains("onsets/s: 2.00"));
        assert!(line.contains("ac-valley: 0.250"));
        assert!(line.ends_with("centroid: 1234.5 Hz"));
    }

    #[test]
    fn tick_smooths_the_signal() {
        let signal = Arc::new(MoodSignal::new());
        signal.publish(0.8, -0.8);
        let mut monitor = Monitor::new(Arc::clone(&signal), 0.5, None, Duration::from_millis(10));
        assert_eq!(monitor.tick(), "\tValence: -0.400000\t Arousal: 0.400000");
        assert_eq!(monitor.tick(), "\tValence: -0.600000\t Arousal: 0.600000");
    }

    #[test]
    fn tick_reads_published_features() {
        let config = AnalysisConfig::default();
        let (mut input, output) = TripleBuffer::new(&FeatureVector::new(&config)).split();
        let mut features = FeatureVector::new(&config);
        features.set_rhythm(RhythmFeatures {
            onsets_per_sec: 3.0,
            ..RhythmFeatures::default()
        });
        input.write(features);

        let mut monitor = Monitor::new(
            Arc::new(MoodSignal::new()),
            0.5,
            Some(output),
            Duration::from_millis(10),
        );
        assert!(monitor.tick().contains("onsets/s: 3.00"));
    }

    #[test]
    fn thread_reports_exit_on_shutdown() {
        let monitor = Monitor::new(Arc::new(MoodSignal::new()), 0.5, None, Duration::from_secs(60));
        let mut controller = ShutdownController::new();
        let handle = spawn_monitor_thread(monitor, controller.token()).unwrap();
        controller.request();
        assert!(controller.wait_for_exits(&[THREAD_NAME], Duration::from_secs(5)).is_empty());
        handle.join().unwrap();
    }
}
