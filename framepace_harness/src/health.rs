// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presentation health tracking and grading.

use framepace_core::phase::SurfaceState;
use framepace_core::trace::TickSummary;

use crate::sim::SimStats;

/// Letter grade for a simulated run, from the missed-tick rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthGrade {
    /// Under 5% of expected ticks missed.
    A,
    /// Under 15%.
    B,
    /// Under 40%.
    C,
    /// Everything else.
    D,
}

impl HealthGrade {
    /// Grades a rate expressed in misses per thousand expected ticks.
    #[must_use]
    pub fn from_miss_rate(per_1000: f64) -> Self {
        if per_1000 < 50.0 {
            Self::A
        } else if per_1000 < 150.0 {
            Self::B
        } else if per_1000 < 400.0 {
            Self::C
        } else {
            Self::D
        }
    }

    /// Single-letter label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

/// Totals of a simulated run.
#[derive(Clone, Copy, Debug)]
pub struct PipelineReport {
    /// Tick periods simulated.
    pub ticks: u32,
    /// Periods in which the engine wanted no tick.
    pub idle_ticks: u32,
    /// Periods spent hidden.
    pub hidden_ticks: u32,
    /// Ticks that ended with a new swap on the display.
    pub presented_ticks: u32,
    /// Ticks where a frame was expected but none reached the display.
    pub missed_ticks: u32,
    /// Draws attempted, forced ones included.
    pub draws: u32,
    /// Forced draws.
    pub forced_draws: u32,
    /// Aborted draws.
    pub aborted_draws: u32,
    /// Draws that came out checkerboarded.
    pub checkerboarded_draws: u32,
    /// Commits.
    pub commits: u32,
    /// Pending-tree activations.
    pub activations: u32,
    /// Production requests.
    pub main_frames_sent: u32,
    /// Surfaces created.
    pub surfaces_created: u32,
    /// Surfaces lost.
    pub surfaces_lost: u32,
    /// Ticks whose deadline could fire as soon as the tick opened.
    pub early_deadlines: u32,
    /// Ticks that skipped production to let presentation catch up.
    pub latency_skips: u32,
    /// Missed ticks per thousand expected ticks.
    pub miss_rate_per_1000: f64,
    /// Overall grade.
    pub grade: HealthGrade,
}

/// Accumulates tick outcomes into a [`PipelineReport`].
///
/// A tick is *expected* to present when it ran while visible with an active
/// surface. Ticks skipped while hidden, and ticks spent bringing a surface
/// up, do not count against the grade.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealthTracker {
    ticks: u32,
    idle_ticks: u32,
    hidden_ticks: u32,
    expected_ticks: u32,
    presented_ticks: u32,
    missed_ticks: u32,
    early_deadlines: u32,
    latency_skips: u32,
}

impl HealthTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tick that ran.
    pub fn observe(&mut self, summary: &TickSummary, visible: bool, presented: bool) {
        self.ticks += 1;
        if presented {
            self.presented_ticks += 1;
        }
        if visible && summary.surface == SurfaceState::Active {
            self.expected_ticks += 1;
            if !presented {
                self.missed_ticks += 1;
            }
        }
    }

    /// Records a period in which no tick ran.
    pub fn observe_idle(&mut self, hidden: bool) {
        self.ticks += 1;
        self.idle_ticks += 1;
        if hidden {
            self.hidden_ticks += 1;
        }
    }

    /// Records a tick whose deadline did not need to be waited for.
    pub fn observe_early_deadline(&mut self) {
        self.early_deadlines += 1;
    }

    /// Records a tick opened with production skipped.
    pub fn observe_latency_skip(&mut self) {
        self.latency_skips += 1;
    }

    /// Missed ticks per thousand expected ticks.
    #[must_use]
    pub fn miss_rate_per_1000(&self) -> f64 {
        if self.expected_ticks == 0 {
            return 0.0;
        }
        f64::from(self.missed_ticks) * 1000.0 / f64::from(self.expected_ticks)
    }

    /// Combines the tick outcomes so far with the pipeline's action counts.
    #[must_use]
    pub fn report(&self, stats: &SimStats) -> PipelineReport {
        let miss_rate_per_1000 = self.miss_rate_per_1000();
        PipelineReport {
            ticks: self.ticks,
            idle_ticks: self.idle_ticks,
            hidden_ticks: self.hidden_ticks,
            presented_ticks: self.presented_ticks,
            missed_ticks: self.missed_ticks,
            draws: stats.draws,
            forced_draws: stats.forced_draws,
            aborted_draws: stats.aborted_draws,
            checkerboarded_draws: stats.checkerboarded_draws,
            commits: stats.commits,
            activations: stats.activations,
            main_frames_sent: stats.main_frames,
            surfaces_created: stats.surfaces_created,
            surfaces_lost: stats.surfaces_lost,
            early_deadlines: self.early_deadlines,
            latency_skips: self.latency_skips,
            miss_rate_per_1000,
            grade: HealthGrade::from_miss_rate(miss_rate_per_1000),
        }
    }
}
