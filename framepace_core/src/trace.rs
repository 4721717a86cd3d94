// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the decision loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`FrameLoop`](crate::driver::FrameLoop) calls as ticks open, phases
//! advance and actions are taken. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`TickSummaryBuilder`] counts the actions taken during a tick and produces
//! a [`TickSummary`] when the tick closes.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): adds a full [`StateSnapshot`] after
//!   every applied action.

use crate::action::{Action, DrawMode};
use crate::error::ContractViolation;
#[cfg(feature = "trace-rich")]
use crate::machine::StateSnapshot;
use crate::machine::PipelineStateMachine;
use crate::phase::{CommitPhase, ForcedRedrawPhase, FramePhase, SurfaceState};
use crate::time::{FrameArgs, HostTime};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a tick opens.
#[derive(Clone, Copy, Debug)]
pub struct FrameStartEvent {
    /// Tick number after the increment.
    pub tick: u64,
    /// Timing handed to the engine.
    pub args: FrameArgs,
}

/// Emitted when the frame phase advances.
#[derive(Clone, Copy, Debug)]
pub struct FramePhaseEvent {
    /// Current tick.
    pub tick: u64,
    /// Phase before the transition.
    pub from: FramePhase,
    /// Phase after the transition.
    pub to: FramePhase,
}

/// Emitted after an action has been applied and before it is performed.
#[derive(Clone, Copy, Debug)]
pub struct ActionEvent {
    /// Current tick.
    pub tick: u64,
    /// Position of this action within the tick, starting at zero.
    pub sequence: u32,
    /// The action.
    pub action: Action,
}

/// Emitted when the driver or an executor breaks the calling contract.
#[derive(Clone, Copy, Debug)]
pub struct ViolationEvent {
    /// Current tick.
    pub tick: u64,
    /// What went wrong.
    pub violation: ContractViolation,
}

/// Per-tick action counts produced by [`TickSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TickSummary {
    /// Tick number.
    pub tick: u64,
    /// When the tick was generated.
    pub frame_time: HostTime,
    /// Presentation deadline.
    pub deadline: HostTime,
    /// Actions performed in total.
    pub actions: u32,
    /// Draws that requested a swap.
    pub draws: u32,
    /// Of those, forced draws.
    pub forced_draws: u32,
    /// Aborted draws.
    pub aborted_draws: u32,
    /// Commits.
    pub commits: u32,
    /// Pending-tree activations.
    pub activations: u32,
    /// Production requests.
    pub main_frames_sent: u32,
    /// Surface creations started.
    pub surface_creations: u32,
    /// Surface state when the tick closed.
    pub surface: SurfaceState,
    /// Commit phase when the tick closed.
    pub commit: CommitPhase,
    /// Forced-redraw phase when the tick closed.
    pub forced_redraw: ForcedRedrawPhase,
    /// Swaps outstanding when the tick closed.
    pub pending_swaps: u32,
    /// A redraw was still pending when the tick closed.
    pub redraw_deferred: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the decision loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a tick opens.
    fn on_frame_start(&mut self, e: &FrameStartEvent) {
        _ = e;
    }

    /// Called when the frame phase advances.
    fn on_frame_phase(&mut self, e: &FramePhaseEvent) {
        _ = e;
    }

    /// Called for every applied action.
    fn on_action(&mut self, e: &ActionEvent) {
        _ = e;
    }

    /// Called when a contract violation is detected.
    fn on_violation(&mut self, e: &ViolationEvent) {
        _ = e;
    }

    /// Called with the per-tick summary when the tick closes.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }

    /// Called with the full state after each applied action (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_state_snapshot(&mut self, tick: u64, snapshot: &StateSnapshot) {
        _ = (tick, snapshot);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameStartEvent`].
    #[inline]
    pub fn frame_start(&mut self, e: &FrameStartEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_start(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FramePhaseEvent`].
    #[inline]
    pub fn frame_phase(&mut self, e: &FramePhaseEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_phase(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ActionEvent`].
    #[inline]
    pub fn action(&mut self, e: &ActionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_action(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ViolationEvent`].
    #[inline]
    pub fn violation(&mut self, e: &ViolationEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_violation(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickSummary`].
    #[inline]
    pub fn tick_summary(&mut self, s: &TickSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_tick_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a state snapshot (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn state_snapshot(&mut self, tick: u64, snapshot: &StateSnapshot) {
        if let Some(s) = &mut self.sink {
            s.on_state_snapshot(tick, snapshot);
        }
    }
}

// ---------------------------------------------------------------------------
// TickSummaryBuilder
// ---------------------------------------------------------------------------

/// Counts actions during a tick and produces a [`TickSummary`].
#[derive(Debug)]
pub struct TickSummaryBuilder {
    summary: TickSummary,
}

impl TickSummaryBuilder {
    /// Starts a summary for the tick described by `start`.
    #[must_use]
    pub fn new(start: &FrameStartEvent) -> Self {
        Self {
            summary: TickSummary {
                tick: start.tick,
                frame_time: start.args.frame_time,
                deadline: start.args.deadline,
                ..TickSummary::default()
            },
        }
    }

    /// Number of actions recorded so far.
    #[must_use]
    pub fn actions(&self) -> u32 {
        self.summary.actions
    }

    /// Records one performed action.
    pub fn record(&mut self, action: Action) {
        let s = &mut self.summary;
        s.actions += 1;
        match action {
            Action::Draw(DrawMode::IfPossible) => s.draws += 1,
            Action::Draw(DrawMode::Forced) => {
                s.draws += 1;
                s.forced_draws += 1;
            }
            Action::Draw(DrawMode::Abort) => s.aborted_draws += 1,
            Action::Commit => s.commits += 1,
            Action::ActivatePendingTree => s.activations += 1,
            Action::SendMainFrame => s.main_frames_sent += 1,
            Action::BeginSurfaceCreation => s.surface_creations += 1,
            Action::UpdateVisibleTiles | Action::Animate | Action::ManageTiles | Action::None => {}
        }
    }

    /// Consumes the builder, capturing end-of-tick state from `machine`.
    #[must_use]
    pub fn finish(self, machine: &PipelineStateMachine) -> TickSummary {
        TickSummary {
            surface: machine.surface_state(),
            commit: machine.commit_phase(),
            forced_redraw: machine.forced_redraw_phase(),
            pending_swaps: machine.pending_swaps(),
            redraw_deferred: machine.redraw_pending(),
            ..self.summary
        }
    }
}
