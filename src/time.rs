//! Frame clock supplying the `time` uniform.
//!
//! The clock either follows the wall clock (interactive hosts) or advances by
//! a fixed step per frame (headless rendering, tests), which makes a run
//! reproducible. Either way the reported time never decreases.
//!
//! ```ignore
//! use emberflow::time::FrameClock;
//!
//! let mut clock = FrameClock::fixed(1.0 / 60.0);
//! let t = clock.tick(); // 1/60
//! let t = clock.tick(); // 2/60
//! ```

use std::time::{Duration, Instant};

/// Monotonic simulation clock.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    /// Step used instead of wall-clock deltas, if set.
    fixed_delta: Option<f32>,
    time_scale: f32,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
}

impl FrameClock {
    /// A clock following real time.
    pub fn realtime() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fixed_delta: None,
            time_scale: 1.0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// A clock advancing exactly `delta` seconds per tick (clamped to be
    /// non-negative).
    pub fn fixed(delta: f32) -> Self {
        let mut clock = Self::realtime();
        clock.fixed_delta = Some(delta.max(0.0));
        clock
    }

    /// Advance one frame and return the new time.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.delta_secs = self.fixed_delta.unwrap_or(raw_delta) * self.time_scale;
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.elapsed_secs
    }

    /// Simulation time in seconds.
    #[inline]
    pub fn time(&self) -> f32 {
        self.elapsed_secs
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Frames ticked so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Wall-clock frames per second, refreshed every half second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Wall-clock time since the clock was created.
    pub fn wall_elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Set the time scale multiplier (clamped to be non-negative, so time
    /// never runs backwards).
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::realtime()
    }
}
