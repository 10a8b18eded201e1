use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::Serialize;

/// Published mood estimates, shared between the prediction loop and display.
///
/// Single writer (the prediction loop), any number of readers. Each scalar
/// is an independent atomic holding `f32` bits, last write wins. There is no
/// atomicity across the pair: a reader may see arousal and valence from two
/// different prediction cycles. Values are conventionally in about [-1, 1]
/// but are not clamped here.
///
/// Tous les champs sont atomiques : zero-alloc, zero-lock, `Send + Sync`.
///
/// # Example
/// ```
/// use md_core::mood::MoodSignal;
/// let signal = MoodSignal::new();
/// signal.publish(0.25, -0.5);
/// assert_eq!(signal.arousal(), 0.25);
/// assert_eq!(signal.valence(), -0.5);
/// assert_eq!(signal.cycles(), 1);
/// ```
pub struct MoodSignal {
    arousal: AtomicU32,
    valence: AtomicU32,
    /// Completed prediction cycles.
    cycles: AtomicU64,
}

impl MoodSignal {
    /// Both scalars start at 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arousal: AtomicU32::new(0.0f32.to_bits()),
            valence: AtomicU32::new(0.0f32.to_bits()),
            cycles: AtomicU64::new(0),
        }
    }

    /// Latest arousal estimate.
    #[inline]
    #[must_use]
    pub fn arousal(&self) -> f32 {
        f32::from_bits(self.arousal.load(Ordering::Relaxed))
    }

    /// Latest valence estimate.
    #[inline]
    #[must_use]
    pub fn valence(&self) -> f32 {
        f32::from_bits(self.valence.load(Ordering::Relaxed))
    }

    /// Store a new arousal estimate.
    #[inline]
    pub fn set_arousal(&self, value: f32) {
        self.arousal.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Store a new valence estimate.
    #[inline]
    pub fn set_valence(&self, value: f32) {
        self.valence.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Store both estimates (one after the other) and count the cycle.
    #[inline]
    pub fn publish(&self, arousal: f32, valence: f32) {
        self.set_arousal(arousal);
        self.set_valence(valence);
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Prediction cycles published so far.
    #[inline]
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Read both scalars. Not a consistent snapshot, see type docs.
    #[must_use]
    pub fn reading(&self) -> MoodReading {
        MoodReading {
            arousal: self.arousal(),
            valence: self.valence(),
        }
    }
}

impl Default for MoodSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A pair of mood values, as read or as smoothed by a consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MoodReading {
    /// Emotional intensity.
    pub arousal: f32,
    /// Positivity / negativity.
    pub valence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_independent() {
        let signal = MoodSignal::new();
        assert_eq!(signal.reading(), MoodReading::default());

        signal.set_arousal(0.75);
        assert_eq!(signal.arousal(), 0.75);
        assert_eq!(signal.valence(), 0.0);
        assert_eq!(signal.cycles(), 0);
    }

    #[test]
    fn last_write_wins_across_threads() {
        let signal = std::sync::Arc::new(MoodSignal::new());
        let writer = {
            let signal = std::sync::Arc::clone(&signal);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    signal.publish(i as f32, -(i as f32));
                }
            })
        };
        writer.join().unwrap();
        assert_eq!(signal.reading().arousal, 999.0);
        assert_eq!(signal.reading().valence, -999.0);
        assert_eq!(signal.cycles(), 1000);
    }
}
