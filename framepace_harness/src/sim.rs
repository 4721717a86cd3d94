// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A simulated production side, presentation side and surface owner.

use alloc::collections::VecDeque;

use framepace_core::action::{Action, DrawMode, DrawResult};
use framepace_core::driver::ActionExecutor;
use framepace_core::error::ContractViolation;
use framepace_core::machine::PipelineStateMachine;

use crate::{HarnessConfig, PathologyToggles};

/// A callback the simulated pipeline delivers some ticks after its cause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimEvent {
    /// The surface owner finished building a surface.
    SurfaceCreated,
    /// Production picked up a request.
    MainFrameStarted,
    /// Production finished.
    ReadyToCommit,
    /// Rasterization of the pending tree finished.
    ReadyToActivate,
    /// The display acknowledged a swap.
    SwapAck,
}

#[derive(Clone, Copy, Debug)]
struct Scheduled {
    due: u64,
    event: SimEvent,
}

/// Counters kept by [`SimulatedPipeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Draws attempted (`IfPossible` and `Forced`).
    pub draws: u32,
    /// Draws that reached the display.
    pub swaps: u32,
    /// Forced draws.
    pub forced_draws: u32,
    /// Aborted draws.
    pub aborted_draws: u32,
    /// Draws that came out checkerboarded.
    pub checkerboarded_draws: u32,
    /// Commits performed.
    pub commits: u32,
    /// Pending trees activated.
    pub activations: u32,
    /// Production requests received.
    pub main_frames: u32,
    /// Surfaces created.
    pub surfaces_created: u32,
    /// Surfaces lost.
    pub surfaces_lost: u32,
    /// Swap acknowledgements that died with a lost surface.
    pub acks_dropped: u32,
}

/// Performs engine actions against a deterministic model of the pipeline.
///
/// Callbacks are queued with the tick they become due and handed to the
/// engine by [`deliver_due`](Self::deliver_due), in the order they were
/// caused.
#[derive(Debug)]
pub struct SimulatedPipeline {
    production_ticks: u32,
    raster_ticks: u32,
    swap_ack_ticks: u32,
    pending_tree: bool,
    toggles: PathologyToggles,
    now: u64,
    queue: VecDeque<Scheduled>,
    stats: SimStats,
}

impl SimulatedPipeline {
    /// Creates a pipeline with the stage latencies of `config`.
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        let slow = |on: bool| if on { 2 } else { 0 };
        Self {
            production_ticks: config.production_ticks + slow(config.toggles.slow_production),
            raster_ticks: config.raster_ticks,
            swap_ack_ticks: config.swap_ack_ticks.max(1) + slow(config.toggles.slow_swap_ack),
            pending_tree: config.settings.supports_pending_tree,
            toggles: config.toggles,
            now: 0,
            queue: VecDeque::new(),
            stats: SimStats::default(),
        }
    }

    /// Advances the simulated clock to `tick`.
    pub fn set_now(&mut self, tick: u64) {
        self.now = tick;
    }

    /// Current simulated tick.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// Number of callbacks not yet delivered.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn schedule(&mut self, after: u32, event: SimEvent) {
        self.queue.push_back(Scheduled {
            due: self.now + u64::from(after),
            event,
        });
    }

    /// Hands every due callback to the engine. Returns how many were delivered.
    pub fn deliver_due(&mut self, m: &mut PipelineStateMachine) -> Result<u32, ContractViolation> {
        let mut delivered = 0;
        let mut i = 0;
        while i < self.queue.len() {
            if self.queue[i].due > self.now {
                i += 1;
                continue;
            }
            let Some(s) = self.queue.remove(i) else {
                break;
            };
            match s.event {
                SimEvent::SurfaceCreated => {
                    m.did_create_surface()?;
                    self.stats.surfaces_created += 1;
                }
                SimEvent::MainFrameStarted => m.notify_main_frame_started()?,
                SimEvent::ReadyToCommit => m.notify_ready_to_commit()?,
                SimEvent::ReadyToActivate => m.notify_ready_to_activate(),
                SimEvent::SwapAck => m.did_swap_complete()?,
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Takes the surface away. Acknowledgements for its swaps never arrive.
    pub fn lose_surface(&mut self, m: &mut PipelineStateMachine) {
        m.did_lose_surface();
        let before = self.queue.len();
        self.queue.retain(|s| s.event != SimEvent::SwapAck);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "at most one ack per pending swap"
        )]
        let dropped = (before - self.queue.len()) as u32;
        self.stats.acks_dropped += dropped;
        self.stats.surfaces_lost += 1;
    }

    fn checkerboards(&self) -> bool {
        self.toggles.checkerboard && (10..16).contains(&(self.now % 40))
    }

    fn present(&mut self, m: &mut PipelineStateMachine) -> Result<(), ContractViolation> {
        m.did_draw(DrawResult::Success);
        m.did_swap()?;
        self.stats.swaps += 1;
        self.schedule(self.swap_ack_ticks, SimEvent::SwapAck);
        Ok(())
    }
}

impl ActionExecutor for SimulatedPipeline {
    fn perform(
        &mut self,
        action: Action,
        m: &mut PipelineStateMachine,
    ) -> Result<(), ContractViolation> {
        match action {
            Action::BeginSurfaceCreation => self.schedule(0, SimEvent::SurfaceCreated),
            Action::SendMainFrame => {
                self.stats.main_frames += 1;
                self.schedule(0, SimEvent::MainFrameStarted);
                self.schedule(self.production_ticks, SimEvent::ReadyToCommit);
            }
            Action::Commit => {
                self.stats.commits += 1;
                if self.pending_tree {
                    self.schedule(self.raster_ticks, SimEvent::ReadyToActivate);
                }
            }
            Action::ActivatePendingTree => self.stats.activations += 1,
            Action::Draw(DrawMode::IfPossible) => {
                self.stats.draws += 1;
                if self.checkerboards() {
                    self.stats.checkerboarded_draws += 1;
                    m.did_draw(DrawResult::AbortedCheckerboard);
                } else {
                    self.present(m)?;
                }
            }
            Action::Draw(DrawMode::Forced) => {
                self.stats.draws += 1;
                self.stats.forced_draws += 1;
                self.present(m)?;
            }
            Action::Draw(DrawMode::Abort) => self.stats.aborted_draws += 1,
            Action::ManageTiles => m.did_manage_tiles(),
            Action::UpdateVisibleTiles | Action::Animate | Action::None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framepace_core::phase::{CommitPhase, SurfaceState};
    use framepace_core::settings::EngineSettings;

    fn make_machine() -> PipelineStateMachine {
        let mut m = PipelineStateMachine::new(EngineSettings::default());
        m.set_can_start(true);
        m.set_visible(true);
        m.set_can_draw(true);
        m
    }

    #[test]
    fn callbacks_wait_until_due() {
        let config = HarnessConfig {
            production_ticks: 2,
            ..HarnessConfig::default()
        };
        let mut sim = SimulatedPipeline::new(&config);
        let mut m = make_machine();

        m.apply(Action::BeginSurfaceCreation).unwrap();
        sim.perform(Action::BeginSurfaceCreation, &mut m).unwrap();
        assert_eq!(sim.deliver_due(&mut m), Ok(1));
        assert_eq!(m.surface_state(), SurfaceState::WaitingForFirstCommit);

        m.set_needs_commit();
        m.apply(Action::SendMainFrame).unwrap();
        sim.perform(Action::SendMainFrame, &mut m).unwrap();
        assert_eq!(sim.deliver_due(&mut m), Ok(1), "only the start is due");
        assert_eq!(m.commit_phase(), CommitPhase::MainFrameStarted);

        sim.set_now(2);
        assert_eq!(sim.deliver_due(&mut m), Ok(1));
        assert_eq!(m.commit_phase(), CommitPhase::ReadyToCommit);
        assert_eq!(sim.queued(), 0);
    }

    #[test]
    fn slow_toggles_add_latency() {
        let config = HarnessConfig::default().with_toggles(PathologyToggles {
            slow_production: true,
            slow_swap_ack: true,
            ..PathologyToggles::default()
        });
        let sim = SimulatedPipeline::new(&config);
        assert_eq!(sim.production_ticks, 2);
        assert_eq!(sim.swap_ack_ticks, 3);
    }

    #[test]
    fn lost_surface_drops_acks() {
        let mut sim = SimulatedPipeline::new(&HarnessConfig::default());
        let mut m = make_machine();
        m.apply(Action::BeginSurfaceCreation).unwrap();
        sim.perform(Action::BeginSurfaceCreation, &mut m).unwrap();
        sim.deliver_due(&mut m).unwrap();
        sim.present(&mut m).unwrap();
        assert_eq!(sim.queued(), 1, "ack queued");

        sim.lose_surface(&mut m);
        assert_eq!(sim.queued(), 0);
        let stats = sim.stats();
        assert_eq!(stats.acks_dropped, 1);
        assert_eq!(stats.surfaces_lost, 1);
        assert_eq!(m.surface_state(), SurfaceState::Lost);
    }

    #[test]
    fn checkerboard_window() {
        let config = HarnessConfig::default().with_toggles(PathologyToggles {
            checkerboard: true,
            ..PathologyToggles::default()
        });
        let mut sim = SimulatedPipeline::new(&config);
        sim.set_now(9);
        assert!(!sim.checkerboards());
        sim.set_now(10);
        assert!(sim.checkerboards());
        sim.set_now(56);
        assert!(!sim.checkerboards(), "56 % 40 == 16");
    }
}
