//! The per-frame time source shared by every mounted scene.

use crate::time::{Duration, Instant};

/// Time of one frame, in seconds since the clock started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub elapsed: f64,
    pub delta: f64,
}

/// Monotonic animation clock.
///
/// Drive it either from wall time with [`AnimationClock::tick_at`] or manually
/// with [`AnimationClock::advance`] (headless hosts, tests). Elapsed time never
/// decreases.
#[derive(Debug, Clone, Default)]
pub struct AnimationClock {
    last: Option<Instant>,
    elapsed: f64,
    frames: u64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance to wall time `now`. The first tick reports a zero delta.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let delta = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(self.last.map_or(now, |last| last.max(now)));
        self.advance(delta)
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advance by a fixed step.
    pub fn advance(&mut self, dt: Duration) -> FrameTime {
        let delta = dt.as_secs_f64();
        self.elapsed += delta;
        self.frames += 1;
        FrameTime {
            elapsed: self.elapsed,
            delta,
        }
    }
}
