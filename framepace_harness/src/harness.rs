// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The simulated tick source.

use framepace_core::driver::FrameLoop;
use framepace_core::error::ContractViolation;
use framepace_core::machine::PipelineStateMachine;
use framepace_core::phase::SurfaceState;
use framepace_core::time::{FrameArgs, HostTime};
use framepace_core::trace::{TickSummary, Tracer, ViolationEvent};

use crate::HarnessConfig;
use crate::health::{HealthTracker, PipelineReport};
use crate::sim::SimulatedPipeline;

/// Delivery/action rounds per phase before the harness stops waiting for
/// the pipeline to settle.
const MAX_SETTLE_ROUNDS: u32 = 16;

/// Drives a [`FrameLoop`] against a [`SimulatedPipeline`].
///
/// Each period the harness applies the environment (visibility, surface
/// loss, new content), delivers due callbacks, and opens a tick if the
/// engine wants one. Between every phase it alternates callback delivery and
/// [`FrameLoop::run_actions`] until neither makes progress.
///
/// Simulated time only advances between periods, so the deadline always
/// fires right after the tick settles. Ticks where the engine would have
/// fired it early anyway are counted in the report. With
/// [`HarnessConfig::recover_latency`] set, a tick opened while production
/// runs behind presentation skips its production request.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    frame_loop: FrameLoop,
    sim: SimulatedPipeline,
    tracker: HealthTracker,
    period: u64,
    frame_time: HostTime,
}

impl Harness {
    /// Creates a harness with a visible, startable engine.
    pub fn new(config: HarnessConfig) -> Result<Self, ContractViolation> {
        let mut machine = PipelineStateMachine::new(config.settings);
        machine.set_can_start(true);
        machine.set_visible(true);
        machine.set_can_draw(true);
        machine.set_max_pending_swaps(config.max_pending_swaps)?;
        Ok(Self {
            sim: SimulatedPipeline::new(&config),
            frame_loop: FrameLoop::from_machine(machine),
            tracker: HealthTracker::new(),
            period: 0,
            frame_time: HostTime(0),
            config,
        })
    }

    /// The engine.
    #[must_use]
    pub fn machine(&self) -> &PipelineStateMachine {
        self.frame_loop.machine()
    }

    /// The simulated pipeline.
    #[must_use]
    pub fn sim(&self) -> &SimulatedPipeline {
        &self.sim
    }

    /// Periods simulated so far.
    #[must_use]
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Runs the configured number of periods and reports on them.
    pub fn run(&mut self, tracer: &mut Tracer<'_>) -> Result<PipelineReport, ContractViolation> {
        for _ in 0..self.config.ticks {
            self.step(tracer)?;
        }
        Ok(self.report())
    }

    /// Totals so far.
    #[must_use]
    pub fn report(&self) -> PipelineReport {
        self.tracker.report(&self.sim.stats())
    }

    /// Simulates one period. Returns the tick summary if a tick ran.
    pub fn step(
        &mut self,
        tracer: &mut Tracer<'_>,
    ) -> Result<Option<TickSummary>, ContractViolation> {
        self.period += 1;
        let n = self.period;
        self.sim.set_now(n);

        let toggles = self.config.toggles;
        let hidden = toggles.hide_periodically && (20..25).contains(&(n % 30));
        let m = self.frame_loop.machine_mut();
        m.set_visible(!hidden);
        if toggles.surface_loss && n % 45 == 30 && m.surface_state() == SurfaceState::Active {
            self.sim.lose_surface(m);
        }
        let m = self.frame_loop.machine_mut();
        let every = u64::from(self.config.commit_every);
        if every > 0 && n % every == 0 {
            m.set_needs_commit();
        }
        if self.config.animate {
            m.set_needs_animate();
        }

        let swaps_before = self.sim.stats().swaps;
        self.settle(tracer)?;

        let args = FrameArgs::new(
            self.frame_time,
            self.config.deadline_offset,
            self.config.interval,
        );
        self.frame_time = args.next_frame_time();

        if !self.frame_loop.machine().begin_frame_needed() {
            self.frame_loop.poll_for_draw_triggers(&mut self.sim, tracer)?;
            self.tracker.observe_idle(hidden);
            return Ok(None);
        }

        let behind = self.frame_loop.machine().production_in_high_latency_mode();
        if self.config.recover_latency && behind {
            self.frame_loop.machine_mut().set_skip_next_main_frame_to_reduce_latency();
            self.tracker.observe_latency_skip();
        }

        self.frame_loop.begin_frame(args, tracer)?;
        self.settle(tracer)?;
        self.frame_loop.deadline_pending(tracer)?;
        self.settle(tracer)?;
        if self.frame_loop.machine().should_trigger_deadline_early() {
            self.tracker.observe_early_deadline();
        }
        self.frame_loop.deadline(tracer)?;
        self.settle(tracer)?;
        let summary = self.frame_loop.end_frame(tracer)?;

        let presented = self.sim.stats().swaps > swaps_before;
        self.tracker.observe(&summary, !hidden, presented);
        Ok(Some(summary))
    }

    /// Alternates callback delivery and action passes until both go quiet.
    fn settle(&mut self, tracer: &mut Tracer<'_>) -> Result<(), ContractViolation> {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let delivered = match self.sim.deliver_due(self.frame_loop.machine_mut()) {
                Ok(delivered) => delivered,
                Err(violation) => {
                    tracer.violation(&ViolationEvent {
                        tick: self.frame_loop.machine().current_tick(),
                        violation,
                    });
                    return Err(violation);
                }
            };
            let performed = self.frame_loop.run_actions(&mut self.sim, tracer)?;
            if delivered == 0 && performed == 0 {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathologyToggles;
    use crate::health::HealthGrade;
    use framepace_core::settings::EngineSettings;

    fn run(config: HarnessConfig) -> PipelineReport {
        let mut harness = Harness::new(config).unwrap();
        harness.run(&mut Tracer::none()).unwrap()
    }

    fn with(toggles: PathologyToggles, ticks: u32) -> HarnessConfig {
        HarnessConfig::new(EngineSettings::immediate(), ticks).with_toggles(toggles)
    }

    #[test]
    fn clean_run_presents_every_tick() {
        let r = run(HarnessConfig::new(EngineSettings::immediate(), 60));
        assert_eq!(r.ticks, 60);
        assert_eq!(r.idle_ticks, 0);
        assert_eq!(r.presented_ticks, 60);
        assert_eq!(r.missed_ticks, 0);
        assert_eq!(r.surfaces_created, 1);
        assert_eq!(r.grade, HealthGrade::A);
    }

    #[test]
    fn lost_surface_is_recreated() {
        let r = run(with(
            PathologyToggles {
                surface_loss: true,
                ..PathologyToggles::default()
            },
            60,
        ));
        assert_eq!(r.surfaces_lost, 1, "lost at period 30");
        assert_eq!(r.surfaces_created, 2);
        assert_eq!(r.grade, HealthGrade::A);
    }

    #[test]
    fn checkerboard_bursts_force_a_redraw() {
        let r = run(with(
            PathologyToggles {
                checkerboard: true,
                ..PathologyToggles::default()
            },
            60,
        ));
        assert!(r.checkerboarded_draws >= 3, "{r:?}");
        assert!(r.forced_draws >= 1, "{r:?}");
        assert!(r.missed_ticks > 0, "checkerboarded ticks present nothing");
    }

    #[test]
    fn hidden_periods_are_idle() {
        let r = run(with(
            PathologyToggles {
                hide_periodically: true,
                ..PathologyToggles::default()
            },
            60,
        ));
        assert_eq!(r.hidden_ticks, 10, "periods 20..25 and 50..55");
        assert_eq!(r.missed_ticks, 0);
    }

    #[test]
    fn slow_acks_throttle_presentation() {
        let clean = run(HarnessConfig::new(EngineSettings::immediate(), 60));
        let slow = run(with(
            PathologyToggles {
                slow_swap_ack: true,
                ..PathologyToggles::default()
            },
            60,
        ));
        assert!(slow.draws < clean.draws, "{slow:?}");
        assert!(slow.grade > HealthGrade::A, "{slow:?}");
    }

    #[test]
    fn every_preset_runs_clean() {
        for settings in [
            EngineSettings::pending_tree(),
            EngineSettings::overlapped(),
            EngineSettings::synchronous(),
        ] {
            let r = run(HarnessConfig::new(settings, 60));
            assert!(r.draws > 0, "{settings:?}: {r:?}");
            if settings.supports_pending_tree {
                assert!(r.activations > 0, "{settings:?}: {r:?}");
            }
        }
    }

    #[test]
    fn every_pathology_at_once() {
        let mut config = with(
            PathologyToggles {
                slow_production: true,
                checkerboard: true,
                surface_loss: true,
                slow_swap_ack: true,
                hide_periodically: true,
            },
            200,
        );
        config.settings = EngineSettings::pending_tree();
        config.raster_ticks = 1;
        let mut harness = Harness::new(config).unwrap();
        let r = harness.run(&mut Tracer::none()).unwrap();
        assert_eq!(r.ticks, 200);
        assert!(r.presented_ticks > 0, "{r:?}");
        assert!(harness.machine().pending_swaps() <= 1);
    }

    #[test]
    fn prompt_pipeline_never_waits_for_the_deadline() {
        let r = run(HarnessConfig::new(EngineSettings::immediate(), 30));
        assert!(r.early_deadlines > 0, "{r:?}");
        assert!(r.early_deadlines <= r.ticks, "{r:?}");
        assert_eq!(r.latency_skips, 0, "recovery is off");
    }

    #[test]
    fn slow_production_skips_to_catch_up() {
        let mut config = with(
            PathologyToggles {
                slow_production: true,
                ..PathologyToggles::default()
            },
            60,
        );
        let plain = run(config);
        config.recover_latency = true;
        let mut harness = Harness::new(config).unwrap();
        let recovered = harness.run(&mut Tracer::none()).unwrap();
        assert!(recovered.latency_skips > 0, "{recovered:?}");
        assert!(recovered.commits > 0, "{recovered:?}");
        assert!(
            recovered.main_frames_sent <= plain.main_frames_sent,
            "{recovered:?}"
        );
        assert!(
            !harness.machine().snapshot().skip_next_main_frame,
            "latch consumed"
        );
    }

    #[test]
    fn synchronous_presenter_polls_for_commits() {
        let mut config = HarnessConfig::new(EngineSettings::synchronous(), 30);
        config.animate = false;
        let r = run(config);
        assert!(r.commits > 1, "{r:?}");
        assert!(r.draws > 1, "{r:?}");
    }
}
