use md_core::mood::MoodReading;

/// Exponential smoothing of the published mood, for display.
///
/// `current = (1 - λ) · previous + λ · raw` on each axis. A result outside
/// the open interval (-1, 1), NaN included, is discarded and the previous
/// value kept, so a single wild prediction never reaches the display.
///
/// # Example
/// ```
/// use md_core::mood::MoodReading;
/// use md_mood::smoothing::MoodSmoother;
/// let mut smoother = MoodSmoother::new(0.5);
/// let out = smoother.smooth(MoodReading { arousal: 0.5, valence: -0.5 });
/// assert_eq!(out, MoodReading { arousal: 0.25, valence: -0.25 });
/// ```
pub struct MoodSmoother {
    lambda: f32,
    prev: MoodReading,
}

impl MoodSmoother {
    /// Create a smoother starting at (0, 0). `lambda` is clamped to [0.01, 1].
    #[must_use]
    pub fn new(lambda: f32) -> Self {
        let lambda = if lambda.is_finite() { lambda.clamp(0.01, 1.0) } else { 0.5 };
        Self {
            lambda,
            prev: MoodReading::default(),
        }
    }

    /// Fold one raw reading in and return the smoothed value.
    pub fn smooth(&mut self, raw: MoodReading) -> MoodReading {
        let next = MoodReading {
            arousal: self.axis(raw.arousal, self.prev.arousal),
            valence: self.axis(raw.valence, self.prev.valence),
        };
        self.prev = next;
        next
    }

    /// Last smoothed value.
    #[must_use]
    pub fn current(&self) -> MoodReading {
        self.prev
    }

    #[inline(always)]
    fn axis(&self, raw: f32, previous: f32) -> f32 {
        let v = (1.0 - self.lambda) * previous + self.lambda * raw;
        if v > -1.0 && v < 1.0 { v } else { previous }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_towards_constant_input() {
        let mut smoother = MoodSmoother::new(0.5);
        let target = MoodReading {
            arousal: 0.8,
            valence: -0.4,
        };
        for _ in 0..30 {
            smoother.smooth(target);
        }
        let c = smoother.current();
        assert!((c.arousal - 0.8).abs() < 1e-5);
        assert!((c.valence + 0.4).abs() < 1e-5);
    }

    #[test]
    fn out_of_range_result_keeps_previous() {
        let mut smoother = MoodSmoother::new(1.0);
        smoother.smooth(MoodReading {
            arousal: 0.3,
            valence: 0.3,
        });
        let out = smoother.smooth(MoodReading {
            arousal: 1.5,
            valence: f32::NAN,
        });
        assert_eq!(out.arousal, 0.3);
        assert_eq!(out.valence, 0.3);
    }

    #[test]
    fn boundary_is_excluded() {
        let mut smoother = MoodSmoother::new(1.0);
        let out = smoother.smooth(MoodReading {
            arousal: -1.0,
            valence: 0.999,
        });
        assert_eq!(out.arousal, 0.0);
        assert_eq!(out.valence, 0.999);
    }
}
