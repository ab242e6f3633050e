use std::time::{Duration, Instant};

/// Monotonic elapsed-time accumulator feeding the disk animation.
///
/// Starts at zero and only ever moves forward by the wall-clock delta between
/// ticks. Restarting the pipeline creates a fresh clock.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    elapsed: Duration,
    last_tick: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by the time since the previous tick. The first tick only
    /// anchors the clock and reports zero elapsed time.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let delta = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);
        self.advance(delta);
        delta
    }

    /// Advances by an explicit delta.
    pub fn advance(&mut self, delta: Duration) {
        self.elapsed = self.elapsed.saturating_add(delta);
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }
}
