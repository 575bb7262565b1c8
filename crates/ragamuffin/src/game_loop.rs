//! # Game Loop
//!
//! Real time arrives in uneven lumps; the simulation wants even ones.
//! [`GameLoop`] banks real time and pays it out as fixed steps:
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. CLAMP                                                            │
//! │    └─ A long stall counts as at most `max_delta`                    │
//! │                                                                     │
//! │ 2. ACCUMULATE                                                       │
//! │    └─ accumulator += delta                                          │
//! │                                                                     │
//! │ 3. STEP (up to `max_steps` times)                                   │
//! │    └─ while accumulator >= timestep: step(timestep)                 │
//! │                                                                     │
//! │ 4. DROP BACKLOG                                                     │
//! │    └─ Whole steps beyond the cap are forgotten                      │
//! │                                                                     │
//! │ 5. RECORD                                                           │
//! │    └─ Frame statistics                                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use tracing::{debug, info};

/// Default simulation rate.
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Most steps run for a single frame.
pub const MAX_STEPS_PER_FRAME: u32 = 5;

/// Longest real delta accepted for a single frame, in seconds.
pub const MAX_FRAME_DELTA: f32 = 0.25;

/// Configuration for the game loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameLoopConfig {
    /// Seconds per simulation step.
    pub timestep: f32,
    /// Step cap per frame.
    pub max_steps: u32,
    /// Real delta clamp.
    pub max_delta: f32,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self::with_tick_rate(DEFAULT_TICK_RATE)
    }
}

impl GameLoopConfig {
    /// Default limits at `rate` steps per second.
    #[must_use]
    pub fn with_tick_rate(rate: u32) -> Self {
        Self {
            timestep: 1.0 / rate.max(1) as f32,
            max_steps: MAX_STEPS_PER_FRAME,
            max_delta: MAX_FRAME_DELTA,
        }
    }
}

/// Timing for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Simulation steps run.
    pub steps: u32,
    /// Wall-clock time spent stepping, in microseconds.
    pub sim_us: u64,
    /// Whole steps thrown away because of the step cap.
    pub dropped_steps: u32,
}

/// Fixed-timestep accumulator.
#[derive(Clone, Debug)]
pub struct GameLoop {
    config: GameLoopConfig,
    accumulator: f32,
    frame_count: u64,
    step_count: u64,
    stats: FrameStatsAccumulator,
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new(GameLoopConfig::default())
    }
}

impl GameLoop {
    /// Creates a game loop.
    #[must_use]
    pub fn new(config: GameLoopConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            frame_count: 0,
            step_count: 0,
            stats: FrameStatsAccumulator::new(),
        }
    }

    /// Seconds per step.
    #[inline]
    #[must_use]
    pub const fn timestep(&self) -> f32 {
        self.config.timestep
    }

    /// Banks `real_delta` seconds and runs `step` once per whole timestep,
    /// up to the cap.
    pub fn advance(&mut self, real_delta: f32, mut step: impl FnMut(f32)) -> FrameStats {
        let started = Instant::now();
        // A NaN would poison the accumulator for good
        let delta = if real_delta.is_finite() {
            real_delta.clamp(0.0, self.config.max_delta)
        } else {
            0.0
        };
        self.accumulator += delta;

        let mut steps = 0;
        while self.accumulator >= self.config.timestep && steps < self.config.max_steps {
            step(self.config.timestep);
            self.accumulator -= self.config.timestep;
            steps += 1;
        }

        let dropped_steps = (self.accumulator / self.config.timestep) as u32;
        if dropped_steps > 0 {
            self.accumulator -= dropped_steps as f32 * self.config.timestep;
            debug!(frame = self.frame_count, dropped_steps, "simulation fell behind");
        }

        let stats = FrameStats {
            frame: self.frame_count,
            steps,
            sim_us: started.elapsed().as_micros() as u64,
            dropped_steps,
        };
        self.frame_count += 1;
        self.step_count += u64::from(steps);
        self.stats.record(stats, self.config.timestep);
        stats
    }

    /// Fraction of a step waiting in the accumulator, for interpolation.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.config.timestep
    }

    /// Frames advanced so far.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Steps run so far.
    #[inline]
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated seconds so far.
    #[must_use]
    pub fn simulated_seconds(&self) -> f64 {
        self.step_count as f64 * f64::from(self.config.timestep)
    }

    /// Accumulated statistics.
    #[must_use]
    pub const fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Total steps run.
    pub steps_sum: u64,
    /// Sum of stepping time.
    pub sim_us_sum: u64,
    /// Fastest frame.
    pub min_frame_us: u64,
    /// Slowest frame.
    pub max_frame_us: u64,
    /// Frames whose stepping took longer than the time they simulated.
    pub frames_over_budget: u64,
    /// Steps thrown away.
    pub dropped_steps: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            steps_sum: 0,
            sim_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
            dropped_steps: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats, timestep: f32) {
        self.frames_recorded += 1;
        self.steps_sum += u64::from(stats.steps);
        self.sim_us_sum += stats.sim_us;
        self.min_frame_us = self.min_frame_us.min(stats.sim_us);
        self.max_frame_us = self.max_frame_us.max(stats.sim_us);
        self.dropped_steps += u64::from(stats.dropped_steps);

        let budget_us = (f64::from(timestep) * 1e6) as u64 * u64::from(stats.steps.max(1));
        if stats.sim_us > budget_us {
            self.frames_over_budget += 1;
        }
    }

    /// Average stepping time per frame in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.sim_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Average stepping time per step in milliseconds.
    #[must_use]
    pub fn avg_step_ms(&self) -> f64 {
        if self.steps_sum == 0 {
            return 0.0;
        }
        (self.sim_us_sum as f64 / self.steps_sum as f64) / 1000.0
    }

    /// Share of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary.
    pub fn log_summary(&self) {
        info!(
            frames = self.frames_recorded,
            steps = self.steps_sum,
            avg_frame_ms = self.avg_frame_ms(),
            avg_step_ms = self.avg_step_ms(),
            max_frame_ms = self.max_frame_us as f64 / 1000.0,
            over_budget = self.frames_over_budget,
            dropped_steps = self.dropped_steps,
            "frame statistics"
        );
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
