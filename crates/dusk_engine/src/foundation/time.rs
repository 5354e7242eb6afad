//! Frame timing

use std::time::{Duration, Instant};

/// Frame timer feeding the update context
///
/// Can either sample the wall clock ([`Timer::update`]) or be advanced by a
/// caller-provided step ([`Timer::advance`]) for deterministic stepping.
#[derive(Debug, Clone)]
pub struct Timer {
    last_frame: Instant,
    max_step: Option<Duration>,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            max_step: None,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Sample the wall clock (should be called once per frame) and return the step
    pub fn update(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.advance(elapsed);
        elapsed
    }

    /// Clamp every later step to at most `max_step` seconds; non-positive disables clamping
    pub fn set_max_step(&mut self, max_step: f32) {
        self.max_step = Duration::try_from_secs_f32(max_step)
            .ok()
            .filter(|step| !step.is_zero());
    }

    /// Advance by an explicit step
    pub fn advance(&mut self, step: Duration) {
        let step = self.max_step.map_or(step, |max| step.min(max));
        self.delta_time = step.as_secs_f32();
        self.total_time += self.delta_time;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (based on last frame time)
    pub fn current_fps(&self) -> f32 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}
