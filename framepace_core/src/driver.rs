// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The driver loop that feeds a [`PipelineStateMachine`].
//!
//! [`FrameLoop`] owns the engine, advances its frame phases on the caller's
//! cadence and drains decisions into an [`ActionExecutor`]. Each action is
//! applied *before* the executor performs it, so callbacks the executor
//! makes from inside [`ActionExecutor::perform`] see the post-action state:
//!
//! ```text
//!   begin_frame ──► run_actions ──► deadline_pending ──► deadline
//!                       │                                   │
//!                       ▼                                   ▼
//!        next_action ─► apply ─► perform         run_actions ──► end_frame
//!            ▲                      │                               │
//!            └──────────────────────┘                               ▼
//!                                                              TickSummary
//! ```
//!
//! Every contract violation is reported to the [`Tracer`] before being
//! returned.

use crate::action::Action;
use crate::error::ContractViolation;
use crate::machine::PipelineStateMachine;
use crate::settings::EngineSettings;
use crate::time::FrameArgs;
use crate::trace::{
    ActionEvent, FramePhaseEvent, FrameStartEvent, TickSummary, TickSummaryBuilder, Tracer,
    ViolationEvent,
};

/// Upper bound on actions performed by one [`FrameLoop::run_actions`] pass.
pub const MAX_ACTIONS_PER_PASS: u32 = 64;

/// Performs the actions chosen by the engine.
///
/// Implementations stand in for the production side, the presentation side
/// and the surface owner. Completion callbacks (`did_draw`, `did_swap`,
/// `notify_ready_to_commit`, ...) may be made synchronously on `machine` or
/// deferred until a later event.
pub trait ActionExecutor {
    /// Carries out `action`, which has already been applied to `machine`.
    fn perform(
        &mut self,
        action: Action,
        machine: &mut PipelineStateMachine,
    ) -> Result<(), ContractViolation>;
}

/// Owns a [`PipelineStateMachine`] and runs the per-tick decision loop.
#[derive(Debug)]
pub struct FrameLoop {
    machine: PipelineStateMachine,
    summary: Option<TickSummaryBuilder>,
}

impl FrameLoop {
    /// Creates a loop around a fresh engine.
    #[must_use]
    pub const fn new(settings: EngineSettings) -> Self {
        Self::from_machine(PipelineStateMachine::new(settings))
    }

    /// Wraps an existing engine.
    #[must_use]
    pub const fn from_machine(machine: PipelineStateMachine) -> Self {
        Self {
            machine,
            summary: None,
        }
    }

    /// The engine.
    #[must_use]
    pub const fn machine(&self) -> &PipelineStateMachine {
        &self.machine
    }

    /// The engine, for delivering events between passes.
    pub fn machine_mut(&mut self) -> &mut PipelineStateMachine {
        &mut self.machine
    }

    /// Releases the engine.
    #[must_use]
    pub fn into_machine(self) -> PipelineStateMachine {
        self.machine
    }

    /// Opens a tick.
    pub fn begin_frame(
        &mut self,
        args: FrameArgs,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), ContractViolation> {
        let from = self.machine.frame_phase();
        if let Err(v) = self.machine.on_frame_start(args) {
            return Err(report(tracer, self.machine.current_tick(), v));
        }
        let start = FrameStartEvent {
            tick: self.machine.current_tick(),
            args,
        };
        tracer.frame_start(&start);
        tracer.frame_phase(&FramePhaseEvent {
            tick: start.tick,
            from,
            to: self.machine.frame_phase(),
        });
        self.summary = Some(TickSummaryBuilder::new(&start));
        Ok(())
    }

    /// Marks the deadline as scheduled.
    pub fn deadline_pending(&mut self, tracer: &mut Tracer<'_>) -> Result<(), ContractViolation> {
        self.advance(tracer, PipelineStateMachine::on_deadline_pending)
    }

    /// Fires the deadline.
    pub fn deadline(&mut self, tracer: &mut Tracer<'_>) -> Result<(), ContractViolation> {
        self.advance(tracer, PipelineStateMachine::on_deadline)
    }

    /// Closes the tick and returns its summary.
    pub fn end_frame(&mut self, tracer: &mut Tracer<'_>) -> Result<TickSummary, ContractViolation> {
        self.advance(tracer, PipelineStateMachine::on_frame_idle)?;
        let builder = self.summary.take().unwrap_or_else(|| {
            TickSummaryBuilder::new(&FrameStartEvent {
                tick: self.machine.current_tick(),
                args: self.machine.snapshot().frame_args.unwrap_or_default(),
            })
        });
        let summary = builder.finish(&self.machine);
        tracer.tick_summary(&summary);
        Ok(summary)
    }

    fn advance(
        &mut self,
        tracer: &mut Tracer<'_>,
        step: fn(&mut PipelineStateMachine) -> Result<(), ContractViolation>,
    ) -> Result<(), ContractViolation> {
        let tick = self.machine.current_tick();
        let from = self.machine.frame_phase();
        if let Err(v) = step(&mut self.machine) {
            return Err(report(tracer, tick, v));
        }
        tracer.frame_phase(&FramePhaseEvent {
            tick,
            from,
            to: self.machine.frame_phase(),
        });
        Ok(())
    }

    /// Performs actions until the engine has nothing left to do.
    ///
    /// Returns the number of actions performed. Fails if `apply` or the
    /// executor reports a violation, or if the pass does not settle within
    /// [`MAX_ACTIONS_PER_PASS`] actions.
    pub fn run_actions<E: ActionExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        tracer: &mut Tracer<'_>,
    ) -> Result<u32, ContractViolation> {
        let tick = self.machine.current_tick();
        for performed in 0..MAX_ACTIONS_PER_PASS {
            let action = self.machine.next_action();
            if action.is_none() {
                return Ok(performed);
            }
            if let Err(v) = self.machine.apply(action) {
                return Err(report(tracer, tick, v));
            }

            let sequence = self
                .summary
                .as_ref()
                .map_or(performed, TickSummaryBuilder::actions);
            tracer.action(&ActionEvent {
                tick,
                sequence,
                action,
            });
            if let Some(builder) = &mut self.summary {
                builder.record(action);
            }
            #[cfg(feature = "trace-rich")]
            tracer.state_snapshot(tick, &self.machine.snapshot());

            if let Err(v) = executor.perform(action, &mut self.machine) {
                return Err(report(tracer, tick, v));
            }
        }
        Err(report(
            tracer,
            tick,
            ContractViolation::RunawayActionLoop {
                limit: MAX_ACTIONS_PER_PASS,
            },
        ))
    }

    /// Runs an idle polling window if the engine asks for one.
    ///
    /// Returns the number of actions performed, or zero when no poll was due.
    pub fn poll_for_draw_triggers<E: ActionExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        tracer: &mut Tracer<'_>,
    ) -> Result<u32, ContractViolation> {
        if !self.machine.should_poll_for_draw_triggers() {
            return Ok(0);
        }
        self.machine.did_enter_poll_for_draw_triggers();
        let result = self.run_actions(executor, tracer);
        self.machine.did_leave_poll_for_draw_triggers();
        result
    }
}

fn report(tracer: &mut Tracer<'_>, tick: u64, violation: ContractViolation) -> ContractViolation {
    tracer.violation(&ViolationEvent { tick, violation });
    violation
}
