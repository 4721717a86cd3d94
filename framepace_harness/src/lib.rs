// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic simulated pipeline and health grading for framepace.
//!
//! [`Harness`] plays the tick source for a
//! [`FrameLoop`](framepace_core::driver::FrameLoop), while
//! [`SimulatedPipeline`] plays the production side, the presentation side and
//! the surface owner. Callbacks are scheduled a configurable number of ticks
//! after the action that causes them, so slow stages can be modelled without
//! a clock. [`PathologyToggles`] inject the failure modes the engine has to
//! recover from.
//!
//! [`HealthTracker`] turns the per-tick summaries into a [`PipelineReport`]
//! with a letter grade.

#![no_std]

extern crate alloc;

mod harness;
mod health;
mod sim;

pub use harness::Harness;
pub use health::{HealthGrade, HealthTracker, PipelineReport};
pub use sim::{SimEvent, SimStats, SimulatedPipeline};

use framepace_core::settings::EngineSettings;
use framepace_core::time::Duration;

/// Runtime pathology toggles for stress tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathologyToggles {
    /// Production takes two extra ticks.
    pub slow_production: bool,
    /// Draws checkerboard in bursts long enough to force a redraw.
    pub checkerboard: bool,
    /// The surface is lost periodically.
    pub surface_loss: bool,
    /// Swap acknowledgements take two extra ticks.
    pub slow_swap_ack: bool,
    /// The output is hidden periodically.
    pub hide_periodically: bool,
}

/// Parameters of a simulated run.
#[derive(Clone, Copy, Debug)]
pub struct HarnessConfig {
    /// Engine configuration.
    pub settings: EngineSettings,
    /// Swap-queue depth handed to the engine.
    pub max_pending_swaps: u32,
    /// Tick periods to simulate.
    pub ticks: u32,
    /// Spacing between ticks.
    pub interval: Duration,
    /// Offset of the deadline from the tick's frame time.
    pub deadline_offset: Duration,
    /// Ticks from a production request to its commit being ready.
    pub production_ticks: u32,
    /// Ticks from a commit to its pending tree being ready to activate.
    pub raster_ticks: u32,
    /// Ticks from a swap to its acknowledgement. Clamped to at least one.
    pub swap_ack_ticks: u32,
    /// Request new content every this many ticks (0 = never).
    pub commit_every: u32,
    /// Request an animation tick every tick.
    pub animate: bool,
    /// Skip production for a tick whenever it runs a tick behind presentation.
    pub recover_latency: bool,
    /// Failure injection.
    pub toggles: PathologyToggles,
}

impl HarnessConfig {
    /// Nominal 60 Hz tick spacing in nanoseconds.
    pub const REFRESH_INTERVAL_NS: u64 = 16_666_667;

    /// A 60 Hz run of `ticks` periods with prompt stages and no pathologies.
    #[must_use]
    pub const fn new(settings: EngineSettings, ticks: u32) -> Self {
        Self {
            settings,
            max_pending_swaps: 1,
            ticks,
            interval: Duration(Self::REFRESH_INTERVAL_NS),
            deadline_offset: Duration(Self::REFRESH_INTERVAL_NS * 3 / 4),
            production_ticks: 0,
            raster_ticks: 0,
            swap_ack_ticks: 1,
            commit_every: 1,
            animate: true,
            recover_latency: false,
            toggles: PathologyToggles {
                slow_production: false,
                checkerboard: false,
                surface_loss: false,
                slow_swap_ack: false,
                hide_periodically: false,
            },
        }
    }

    /// Replaces the pathology toggles.
    #[must_use]
    pub const fn with_toggles(mut self, toggles: PathologyToggles) -> Self {
        self.toggles = toggles;
        self
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new(EngineSettings::default(), 120)
    }
}
