// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pipeline state machine.
//!
//! [`PipelineStateMachine`] owns every flag, counter and phase the decision
//! logic looks at. Callers report events through the mutators in this module,
//! ask [`next_action`](PipelineStateMachine::next_action) what to do, perform
//! it, and then confirm with [`apply`](PipelineStateMachine::apply):
//!
//! ```
//! use framepace_core::action::Action;
//! use framepace_core::machine::PipelineStateMachine;
//! use framepace_core::settings::EngineSettings;
//!
//! let mut m = PipelineStateMachine::new(EngineSettings::default());
//! m.set_can_start(true);
//! m.set_visible(true);
//! m.set_can_draw(true);
//!
//! let action = m.next_action();
//! assert_eq!(action, Action::BeginSurfaceCreation);
//! m.apply(action).unwrap();
//! m.did_create_surface().unwrap();
//! ```
//!
//! Mutators that carry a precondition return [`ContractViolation`] and leave
//! the state untouched when it does not hold. The predicates behind
//! `next_action` live in the `decide` submodule.

mod decide;

use crate::action::{Action, DrawMode, DrawResult};
use crate::error::ContractViolation;
use crate::phase::{CommitPhase, ForcedRedrawPhase, FramePhase, SurfaceState};
use crate::settings::EngineSettings;
use crate::time::FrameArgs;

/// Read-only copy of every field of a [`PipelineStateMachine`].
///
/// Advisory only; useful for diagnostics and test assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Surface lifecycle.
    pub surface: SurfaceState,
    /// Position within the current tick.
    pub frame: FramePhase,
    /// Production progress.
    pub commit: CommitPhase,
    /// Forced-redraw recovery progress.
    pub forced_redraw: ForcedRedrawPhase,
    /// Arguments of the most recent tick, if any.
    pub frame_args: Option<FrameArgs>,
    /// Ticks started so far (including idle polling windows).
    pub current_tick: u64,
    /// Commits applied so far, aborted ones included.
    pub commit_count: u64,
    /// Swaps issued but not acknowledged.
    pub pending_swaps: u32,
    /// Maximum number of unacknowledged swaps.
    pub max_pending_swaps: u32,
    /// Consecutive checkerboarded draws.
    pub consecutive_checkerboard_redraws: u32,
    /// Tile-management funnel level.
    pub manage_tiles_funnel: u32,
    /// Tick of the last animate action.
    pub last_animate_tick: Option<u64>,
    /// Tick of the last acknowledged swap issue (`did_swap`).
    pub last_swap_tick: Option<u64>,
    /// Tick of the last draw that requested a swap.
    pub last_swap_request_tick: Option<u64>,
    /// Tick of the last production request.
    pub last_main_frame_send_tick: Option<u64>,
    /// Tick of the last visible-tile update.
    pub last_visible_tiles_tick: Option<u64>,
    /// A redraw was requested.
    pub needs_redraw: bool,
    /// An animation tick was requested.
    pub needs_animate: bool,
    /// Tile reprioritization was requested.
    pub needs_manage_tiles: bool,
    /// New content was requested from production.
    pub needs_commit: bool,
    /// The output is visible.
    pub visible: bool,
    /// The host allows the pipeline to start.
    pub can_start: bool,
    /// The presenter can draw.
    pub can_draw: bool,
    /// A pending tree exists.
    pub has_pending_tree: bool,
    /// The pending tree finished rasterizing.
    pub pending_tree_ready_for_activation: bool,
    /// The active tree has never been drawn.
    pub active_tree_needs_first_draw: bool,
    /// The last swap contained incomplete tiles.
    pub swap_used_incomplete_tile: bool,
    /// Presentation smoothness outranks fresh content.
    pub smoothness_takes_priority: bool,
    /// Every commit immediately requests another.
    pub continuous_painting: bool,
    /// Production is skipped on the next tick.
    pub skip_next_main_frame: bool,
    /// Production is skipped on this tick.
    pub skip_main_frame_this_tick: bool,
    /// Inside an idle polling window.
    pub inside_poll_for_draw_triggers: bool,
    /// A surface has been created at least once.
    pub did_create_first_surface: bool,
}

/// Decides the next step of a two-stage production/presentation pipeline.
///
/// One instance per pipeline. Not thread-safe; the owner serializes all calls.
#[derive(Clone, Debug)]
pub struct PipelineStateMachine {
    settings: EngineSettings,

    surface: SurfaceState,
    frame: FramePhase,
    commit: CommitPhase,
    forced_redraw: ForcedRedrawPhase,
    frame_args: Option<FrameArgs>,

    current_tick: u64,
    commit_count: u64,
    pending_swaps: u32,
    max_pending_swaps: u32,
    consecutive_checkerboard_redraws: u32,
    manage_tiles_funnel: u32,

    last_animate_tick: Option<u64>,
    last_swap_tick: Option<u64>,
    last_swap_request_tick: Option<u64>,
    last_main_frame_send_tick: Option<u64>,
    last_visible_tiles_tick: Option<u64>,

    needs_redraw: bool,
    needs_animate: bool,
    needs_manage_tiles: bool,
    needs_commit: bool,
    visible: bool,
    can_start: bool,
    can_draw: bool,
    has_pending_tree: bool,
    pending_tree_ready_for_activation: bool,
    active_tree_needs_first_draw: bool,
    swap_used_incomplete_tile: bool,
    smoothness_takes_priority: bool,
    continuous_painting: bool,
    skip_next_main_frame: bool,
    skip_main_frame_this_tick: bool,
    inside_poll_for_draw_triggers: bool,
    did_create_first_surface: bool,
}

impl PipelineStateMachine {
    /// Creates an engine with no surface, all phases idle and one swap slot.
    #[must_use]
    pub const fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            surface: SurfaceState::Lost,
            frame: FramePhase::Idle,
            commit: CommitPhase::Idle,
            forced_redraw: ForcedRedrawPhase::Idle,
            frame_args: None,
            current_tick: 0,
            commit_count: 0,
            pending_swaps: 0,
            max_pending_swaps: 1,
            consecutive_checkerboard_redraws: 0,
            manage_tiles_funnel: 0,
            last_animate_tick: None,
            last_swap_tick: None,
            last_swap_request_tick: None,
            last_main_frame_send_tick: None,
            last_visible_tiles_tick: None,
            needs_redraw: false,
            needs_animate: false,
            needs_manage_tiles: false,
            needs_commit: false,
            visible: false,
            can_start: false,
            can_draw: false,
            has_pending_tree: false,
            pending_tree_ready_for_activation: false,
            active_tree_needs_first_draw: false,
            swap_used_incomplete_tile: false,
            smoothness_takes_priority: false,
            continuous_painting: false,
            skip_next_main_frame: false,
            skip_main_frame_this_tick: false,
            inside_poll_for_draw_triggers: false,
            did_create_first_surface: false,
        }
    }

    // -- accessors ---------------------------------------------------------

    /// The configuration this engine was built with.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current surface lifecycle state.
    #[must_use]
    pub const fn surface_state(&self) -> SurfaceState {
        self.surface
    }

    /// Current position within the tick.
    #[must_use]
    pub const fn frame_phase(&self) -> FramePhase {
        self.frame
    }

    /// Current production phase.
    #[must_use]
    pub const fn commit_phase(&self) -> CommitPhase {
        self.commit
    }

    /// Current forced-redraw recovery phase.
    #[must_use]
    pub const fn forced_redraw_phase(&self) -> ForcedRedrawPhase {
        self.forced_redraw
    }

    /// Ticks started so far.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Swaps issued but not yet acknowledged.
    #[must_use]
    pub const fn pending_swaps(&self) -> u32 {
        self.pending_swaps
    }

    /// Maximum number of unacknowledged swaps.
    #[must_use]
    pub const fn max_pending_swaps(&self) -> u32 {
        self.max_pending_swaps
    }

    /// Commits applied so far, aborted ones included.
    #[must_use]
    pub const fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Consecutive draws aborted for checkerboarding.
    #[must_use]
    pub const fn consecutive_checkerboard_redraws(&self) -> u32 {
        self.consecutive_checkerboard_redraws
    }

    /// Whether a pending tree exists.
    #[must_use]
    pub const fn has_pending_tree(&self) -> bool {
        self.has_pending_tree
    }

    /// Whether the active tree has never been drawn.
    #[must_use]
    pub const fn active_tree_needs_first_draw(&self) -> bool {
        self.active_tree_needs_first_draw
    }

    /// Whether new content has been requested and not yet sent for.
    #[must_use]
    pub const fn needs_commit(&self) -> bool {
        self.needs_commit
    }

    /// Whether a redraw has been requested and not yet performed.
    #[must_use]
    pub const fn redraw_pending(&self) -> bool {
        self.needs_redraw
    }

    /// Whether tile management has been requested and not yet performed.
    #[must_use]
    pub const fn manage_tiles_pending(&self) -> bool {
        self.needs_manage_tiles
    }

    /// Whether a production request is outstanding and not yet committed.
    #[must_use]
    pub const fn commit_pending(&self) -> bool {
        self.commit.is_in_flight()
    }

    /// Whether a surface exists and is past creation.
    #[must_use]
    pub const fn has_initialized_surface(&self) -> bool {
        self.surface.is_initialized()
    }

    /// Copies every field into a [`StateSnapshot`].
    #[must_use]
    pub const fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            surface: self.surface,
            frame: self.frame,
            commit: self.commit,
            forced_redraw: self.forced_redraw,
            frame_args: self.frame_args,
            current_tick: self.current_tick,
            commit_count: self.commit_count,
            pending_swaps: self.pending_swaps,
            max_pending_swaps: self.max_pending_swaps,
            consecutive_checkerboard_redraws: self.consecutive_checkerboard_redraws,
            manage_tiles_funnel: self.manage_tiles_funnel,
            last_animate_tick: self.last_animate_tick,
            last_swap_tick: self.last_swap_tick,
            last_swap_request_tick: self.last_swap_request_tick,
            last_main_frame_send_tick: self.last_main_frame_send_tick,
            last_visible_tiles_tick: self.last_visible_tiles_tick,
            needs_redraw: self.needs_redraw,
            needs_animate: self.needs_animate,
            needs_manage_tiles: self.needs_manage_tiles,
            needs_commit: self.needs_commit,
            visible: self.visible,
            can_start: self.can_start,
            can_draw: self.can_draw,
            has_pending_tree: self.has_pending_tree,
            pending_tree_ready_for_activation: self.pending_tree_ready_for_activation,
            active_tree_needs_first_draw: self.active_tree_needs_first_draw,
            swap_used_incomplete_tile: self.swap_used_incomplete_tile,
            smoothness_takes_priority: self.smoothness_takes_priority,
            continuous_painting: self.continuous_painting,
            skip_next_main_frame: self.skip_next_main_frame,
            skip_main_frame_this_tick: self.skip_main_frame_this_tick,
            inside_poll_for_draw_triggers: self.inside_poll_for_draw_triggers,
            did_create_first_surface: self.did_create_first_surface,
        }
    }

    // -- tick phases -------------------------------------------------------

    /// Opens a new tick.
    ///
    /// Advances the tick counter, drains one unit of the tile funnel and
    /// promotes the latency-skip latch to this tick.
    pub fn on_frame_start(&mut self, args: FrameArgs) -> Result<(), ContractViolation> {
        self.expect_frame_phase("on_frame_start", FramePhase::Idle)?;
        self.current_tick += 1;
        self.manage_tiles_funnel = self.manage_tiles_funnel.saturating_sub(1);
        self.skip_main_frame_this_tick = self.skip_next_main_frame;
        self.skip_next_main_frame = false;
        self.frame_args = Some(args);
        self.frame = FramePhase::FrameStarting;
        Ok(())
    }

    /// The deadline for the current tick has been scheduled.
    pub fn on_deadline_pending(&mut self) -> Result<(), ContractViolation> {
        self.expect_frame_phase("on_deadline_pending", FramePhase::FrameStarting)?;
        self.frame = FramePhase::InsideFrame;
        Ok(())
    }

    /// The deadline for the current tick fired.
    pub fn on_deadline(&mut self) -> Result<(), ContractViolation> {
        self.expect_frame_phase("on_deadline", FramePhase::InsideFrame)?;
        self.frame = FramePhase::InsideDeadline;
        Ok(())
    }

    /// Closes the current tick.
    pub fn on_frame_idle(&mut self) -> Result<(), ContractViolation> {
        self.expect_frame_phase("on_frame_idle", FramePhase::InsideDeadline)?;
        self.frame = FramePhase::Idle;
        Ok(())
    }

    fn expect_frame_phase(
        &self,
        operation: &'static str,
        expected: FramePhase,
    ) -> Result<(), ContractViolation> {
        if self.frame == expected {
            Ok(())
        } else {
            Err(ContractViolation::FramePhaseMismatch {
                operation,
                expected,
                actual: self.frame,
            })
        }
    }

    /// Opens an idle polling window used by synchronous presenters.
    ///
    /// Counts as a tick for the at-most-once-per-tick markers.
    pub fn did_enter_poll_for_draw_triggers(&mut self) {
        self.current_tick += 1;
        self.inside_poll_for_draw_triggers = true;
    }

    /// Closes the idle polling window.
    pub fn did_leave_poll_for_draw_triggers(&mut self) {
        self.inside_poll_for_draw_triggers = false;
    }

    // -- latches and setters -----------------------------------------------

    /// Requests a redraw.
    pub fn set_needs_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Requests an animation tick.
    pub fn set_needs_animate(&mut self) {
        self.needs_animate = true;
    }

    /// Requests tile reprioritization.
    pub fn set_needs_manage_tiles(&mut self) {
        self.needs_manage_tiles = true;
    }

    /// Requests new content from production.
    pub fn set_needs_commit(&mut self) {
        self.needs_commit = true;
    }

    /// Sets output visibility.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Sets whether the presenter can draw.
    pub fn set_can_draw(&mut self, can_draw: bool) {
        self.can_draw = can_draw;
    }

    /// Allows (or holds back) surface creation.
    pub fn set_can_start(&mut self, can_start: bool) {
        self.can_start = can_start;
    }

    /// Gives presentation smoothness priority over fresh content.
    pub fn set_smoothness_takes_priority(&mut self, smoothness: bool) {
        self.smoothness_takes_priority = smoothness;
    }

    /// Makes every commit immediately request another one.
    pub fn set_continuous_painting(&mut self, continuous: bool) {
        self.continuous_painting = continuous;
    }

    /// Records whether the last swap contained incomplete tiles.
    pub fn set_swap_used_incomplete_tile(&mut self, incomplete: bool) {
        self.swap_used_incomplete_tile = incomplete;
    }

    /// Skips production on the next tick to bound end-to-end latency.
    pub fn set_skip_next_main_frame_to_reduce_latency(&mut self) {
        self.skip_next_main_frame = true;
    }

    /// Sets the swap-queue depth.
    ///
    /// Fails for zero, or for a limit below the swaps already outstanding.
    pub fn set_max_pending_swaps(&mut self, max: u32) -> Result<(), ContractViolation> {
        if max == 0 || max < self.pending_swaps {
            return Err(ContractViolation::InvalidMaxPendingSwaps {
                requested: max,
                pending: self.pending_swaps,
            });
        }
        self.max_pending_swaps = max;
        Ok(())
    }

    // -- production callbacks ----------------------------------------------

    /// The production side picked up the request.
    pub fn notify_main_frame_started(&mut self) -> Result<(), ContractViolation> {
        self.expect_commit_phase("notify_main_frame_started", CommitPhase::MainFrameSent)?;
        self.commit = CommitPhase::MainFrameStarted;
        Ok(())
    }

    /// Production finished; the commit may happen.
    pub fn notify_ready_to_commit(&mut self) -> Result<(), ContractViolation> {
        self.expect_commit_phase("notify_ready_to_commit", CommitPhase::MainFrameStarted)?;
        self.commit = CommitPhase::ReadyToCommit;
        Ok(())
    }

    /// The pending tree finished rasterizing. Ignored without a pending tree.
    pub fn notify_ready_to_activate(&mut self) {
        if self.has_pending_tree {
            self.pending_tree_ready_for_activation = true;
        }
    }

    /// Production gave up on the request before starting it.
    ///
    /// When `handled`, the request is treated as an empty commit. Otherwise
    /// production is simply re-requested.
    pub fn main_frame_aborted(&mut self, handled: bool) -> Result<(), ContractViolation> {
        self.expect_commit_phase("main_frame_aborted", CommitPhase::MainFrameSent)?;
        if handled {
            self.update_on_commit(true);
        } else {
            self.commit = CommitPhase::Idle;
            self.needs_commit = true;
        }
        Ok(())
    }

    fn expect_commit_phase(
        &self,
        operation: &'static str,
        expected: CommitPhase,
    ) -> Result<(), ContractViolation> {
        if self.commit == expected {
            Ok(())
        } else {
            Err(ContractViolation::CommitPhaseMismatch {
                operation,
                expected,
                actual: self.commit,
            })
        }
    }

    // -- surface callbacks -------------------------------------------------

    /// The surface owner finished creating a surface.
    pub fn did_create_surface(&mut self) -> Result<(), ContractViolation> {
        if self.surface != SurfaceState::Creating {
            return Err(ContractViolation::SurfaceStateMismatch {
                operation: "did_create_surface",
                expected: SurfaceState::Creating,
                actual: self.surface,
            });
        }
        self.surface = SurfaceState::WaitingForFirstCommit;
        if self.did_create_first_surface {
            // A replacement surface has no content of its own.
            self.needs_commit = true;
        }
        self.did_create_first_surface = true;
        self.pending_swaps = 0;
        Ok(())
    }

    /// The surface went away. No-op if it is already lost or being created.
    pub fn did_lose_surface(&mut self) {
        if matches!(self.surface, SurfaceState::Lost | SurfaceState::Creating) {
            return;
        }
        self.surface = SurfaceState::Lost;
        self.needs_redraw = false;
    }

    // -- presentation callbacks --------------------------------------------

    /// A swap was issued to the display.
    pub fn did_swap(&mut self) -> Result<(), ContractViolation> {
        if self.pending_swaps >= self.max_pending_swaps {
            return Err(ContractViolation::SwapQueueFull {
                max: self.max_pending_swaps,
            });
        }
        self.pending_swaps += 1;
        self.last_swap_tick = Some(self.current_tick);
        Ok(())
    }

    /// The display acknowledged a swap.
    pub fn did_swap_complete(&mut self) -> Result<(), ContractViolation> {
        if self.pending_swaps == 0 {
            return Err(ContractViolation::SwapQueueEmpty);
        }
        self.pending_swaps -= 1;
        Ok(())
    }

    /// Tile management ran. Fills the funnel so it runs at most about once
    /// per tick.
    pub fn did_manage_tiles(&mut self) {
        self.needs_manage_tiles = false;
        self.manage_tiles_funnel += 1;
    }

    /// Reports the outcome of a [`DrawMode::IfPossible`] or
    /// [`DrawMode::Forced`] draw.
    pub fn did_draw(&mut self, result: DrawResult) {
        match result {
            DrawResult::Success => {
                self.consecutive_checkerboard_redraws = 0;
                self.forced_redraw = ForcedRedrawPhase::Idle;
            }
            DrawResult::AbortedCheckerboard => {
                self.needs_redraw = true;
                // A recovery already in progress is not restarted.
                if self.forced_redraw != ForcedRedrawPhase::Idle {
                    return;
                }
                self.needs_commit = true;
                self.consecutive_checkerboard_redraws += 1;
                if self.settings.force_draw_after_repeated_checkerboard
                    && self.consecutive_checkerboard_redraws
                        >= self.settings.effective_checkerboard_limit()
                {
                    self.consecutive_checkerboard_redraws = 0;
                    self.forced_redraw = ForcedRedrawPhase::WaitingForCommit;
                }
            }
            DrawResult::AbortedMissingContent => {
                self.needs_commit = true;
            }
        }
    }

    // -- apply -------------------------------------------------------------

    /// Records that `action` was performed.
    ///
    /// Fails unless `action` is exactly what [`next_action`](Self::next_action)
    /// returns right now. Applying [`Action::None`] when nothing is due is a
    /// no-op.
    pub fn apply(&mut self, action: Action) -> Result<(), ContractViolation> {
        let expected = self.next_action();
        if action != expected {
            return Err(ContractViolation::ActionMismatch {
                requested: action,
                expected,
            });
        }

        match action {
            Action::None => {}
            Action::UpdateVisibleTiles => {
                self.last_visible_tiles_tick = Some(self.current_tick);
            }
            Action::ActivatePendingTree => self.update_on_activation(),
            Action::Commit => self.update_on_commit(false),
            Action::Animate => {
                self.last_animate_tick = Some(self.current_tick);
                self.needs_animate = false;
                self.needs_redraw = true;
            }
            Action::Draw(DrawMode::IfPossible | DrawMode::Forced) => self.update_on_draw(true),
            Action::Draw(DrawMode::Abort) => self.update_on_draw(false),
            Action::ManageTiles => {
                self.needs_manage_tiles = false;
            }
            Action::SendMainFrame => {
                self.commit = CommitPhase::MainFrameSent;
                self.needs_commit = false;
                self.last_main_frame_send_tick = Some(self.current_tick);
            }
            Action::BeginSurfaceCreation => {
                self.surface = SurfaceState::Creating;
            }
        }
        Ok(())
    }

    fn update_on_commit(&mut self, aborted: bool) {
        self.commit_count += 1;

        self.commit = if aborted || self.settings.commit_before_activation_allowed {
            CommitPhase::Idle
        } else if self.settings.commit_before_first_draw_allowed {
            if self.settings.supports_pending_tree {
                CommitPhase::WaitingForActivation
            } else {
                CommitPhase::Idle
            }
        } else {
            CommitPhase::WaitingForFirstDraw
        };

        // An aborted commit produced nothing to activate.
        self.has_pending_tree = self.settings.supports_pending_tree && !aborted;

        if self.forced_redraw == ForcedRedrawPhase::WaitingForCommit {
            self.forced_redraw = if self.has_pending_tree {
                ForcedRedrawPhase::WaitingForActivation
            } else {
                ForcedRedrawPhase::WaitingForDraw
            };
        }

        if self.surface == SurfaceState::WaitingForFirstCommit {
            if self.has_pending_tree {
                self.surface = SurfaceState::WaitingForFirstActivation;
            } else {
                self.surface = SurfaceState::Active;
                self.needs_redraw = true;
            }
        }

        // New active content, or an unchanged tree that still owes a forced draw.
        if !self.has_pending_tree
            && (!aborted || self.forced_redraw == ForcedRedrawPhase::WaitingForDraw)
        {
            self.needs_redraw = true;
            self.active_tree_needs_first_draw = true;
        }

        self.pending_tree_ready_for_activation = false;

        if self.continuous_painting {
            self.needs_commit = true;
        }
    }

    fn update_on_activation(&mut self) {
        if self.commit == CommitPhase::WaitingForActivation {
            self.commit = CommitPhase::Idle;
        }
        if self.surface == SurfaceState::WaitingForFirstActivation {
            self.surface = SurfaceState::Active;
        }
        if self.forced_redraw == ForcedRedrawPhase::WaitingForActivation {
            self.forced_redraw = ForcedRedrawPhase::WaitingForDraw;
        }
        self.has_pending_tree = false;
        self.pending_tree_ready_for_activation = false;
        self.active_tree_needs_first_draw = true;
        self.needs_redraw = true;
    }

    fn update_on_draw(&mut self, did_request_swap: bool) {
        if self.forced_redraw == ForcedRedrawPhase::WaitingForDraw {
            self.forced_redraw = ForcedRedrawPhase::Idle;
        }
        if !self.has_pending_tree && self.commit == CommitPhase::WaitingForFirstDraw {
            self.commit = CommitPhase::Idle;
        }
        self.needs_redraw = false;
        self.active_tree_needs_first_draw = false;
        if did_request_swap {
            self.last_swap_request_tick = Some(self.current_tick);
        }
    }

    const fn happened_this_tick(&self, marker: Option<u64>) -> bool {
        match marker {
            Some(tick) => tick == self.current_tick,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Duration, HostTime};

    fn make_args(tick: u64) -> FrameArgs {
        FrameArgs::new(HostTime(tick * 16_000), Duration(12_000), Duration(16_000))
    }

    fn make_ready() -> PipelineStateMachine {
        let mut m = PipelineStateMachine::new(EngineSettings::default());
        m.set_can_start(true);
        m.set_visible(true);
        m.set_can_draw(true);
        m
    }

    #[test]
    fn initial_state() {
        let m = PipelineStateMachine::new(EngineSettings::default());
        let s = m.snapshot();
        assert_eq!(s.surface, SurfaceState::Lost);
        assert_eq!(s.frame, FramePhase::Idle);
        assert_eq!(s.commit, CommitPhase::Idle);
        assert_eq!(s.forced_redraw, ForcedRedrawPhase::Idle);
        assert_eq!(s.max_pending_swaps, 1);
        assert_eq!(s.pending_swaps, 0);
        assert!(
            !s.needs_commit && !s.needs_redraw && !s.visible,
            "flags start false"
        );
        assert_eq!(s.last_swap_tick, None);
    }

    #[test]
    fn frame_phases_must_advance_in_order() {
        let mut m = make_ready();
        assert_eq!(
            m.on_deadline(),
            Err(ContractViolation::FramePhaseMismatch {
                operation: "on_deadline",
                expected: FramePhase::InsideFrame,
                actual: FramePhase::Idle,
            })
        );
        m.on_frame_start(make_args(1)).unwrap();
        assert!(m.on_frame_start(make_args(2)).is_err(), "tick already open");
        assert!(m.on_frame_idle().is_err(), "cannot skip to idle");
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
        m.on_frame_idle().unwrap();
        assert_eq!(m.frame_phase(), FramePhase::Idle);
        assert_eq!(m.current_tick(), 1);
    }

    #[test]
    fn failed_mutator_leaves_state_untouched() {
        let mut m = make_ready();
        let before = m.snapshot();
        assert!(m.on_deadline_pending().is_err(), "out of order");
        assert!(m.notify_ready_to_commit().is_err(), "no main frame sent");
        assert!(m.did_swap_complete().is_err(), "nothing pending");
        assert!(m.did_create_surface().is_err(), "not creating");
        assert!(m.apply(Action::Commit).is_err(), "commit not due");
        assert_eq!(m.snapshot(), before, "snapshot unchanged");
    }

    #[test]
    fn frame_start_drains_funnel_and_promotes_skip() {
        let mut m = make_ready();
        m.did_manage_tiles();
        m.did_manage_tiles();
        m.set_skip_next_main_frame_to_reduce_latency();
        m.on_frame_start(make_args(1)).unwrap();
        let s = m.snapshot();
        assert_eq!(s.manage_tiles_funnel, 1, "one unit drained");
        assert!(s.skip_main_frame_this_tick, "latch promoted");
        assert!(!s.skip_next_main_frame, "latch cleared");
        assert_eq!(s.frame_args, Some(make_args(1)));
    }

    #[test]
    fn swap_queue_bounds() {
        let mut m = make_ready();
        m.did_swap().unwrap();
        assert_eq!(
            m.did_swap(),
            Err(ContractViolation::SwapQueueFull { max: 1 })
        );
        assert_eq!(m.pending_swaps(), 1, "failed swap not counted");
        m.set_max_pending_swaps(2).unwrap();
        m.did_swap().unwrap();
        assert_eq!(
            m.set_max_pending_swaps(1),
            Err(ContractViolation::InvalidMaxPendingSwaps {
                requested: 1,
                pending: 2,
            })
        );
        m.did_swap_complete().unwrap();
        m.did_swap_complete().unwrap();
        assert_eq!(
            m.did_swap_complete(),
            Err(ContractViolation::SwapQueueEmpty)
        );
        assert!(m.set_max_pending_swaps(0).is_err(), "zero slots is invalid");
    }

    #[test]
    fn lose_surface_is_ignored_while_lost_or_creating() {
        let mut m = make_ready();
        m.set_needs_redraw();
        m.did_lose_surface();
        assert!(m.redraw_pending(), "already lost: untouched");
        m.apply(Action::BeginSurfaceCreation).unwrap();
        m.did_lose_surface();
        assert_eq!(m.surface_state(), SurfaceState::Creating);
        m.did_create_surface().unwrap();
        m.did_lose_surface();
        assert_eq!(m.surface_state(), SurfaceState::Lost);
        assert!(!m.redraw_pending(), "loss clears redraw");
    }

    #[test]
    fn recreated_surface_requests_content() {
        let mut m = make_ready();
        m.apply(Action::BeginSurfaceCreation).unwrap();
        m.did_create_surface().unwrap();
        assert!(!m.needs_commit(), "first surface does not relatch");
        m.did_swap().unwrap();
        m.did_lose_surface();
        m.apply(Action::BeginSurfaceCreation).unwrap();
        m.did_create_surface().unwrap();
        assert!(m.needs_commit(), "replacement surface needs content");
        assert_eq!(m.pending_swaps(), 0, "swap queue reset with the surface");
    }

    #[test]
    fn checkerboard_limit_enters_forced_redraw() {
        let mut m = make_ready();
        m.did_draw(DrawResult::AbortedCheckerboard);
        m.did_draw(DrawResult::AbortedCheckerboard);
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::Idle);
        assert_eq!(m.consecutive_checkerboard_redraws(), 2);
        m.did_draw(DrawResult::AbortedCheckerboard);
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::WaitingForCommit);
        assert_eq!(m.consecutive_checkerboard_redraws(), 0, "counter reset");

        // Further checkerboards do not restart the recovery.
        m.did_draw(DrawResult::AbortedCheckerboard);
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::WaitingForCommit);
        assert_eq!(m.consecutive_checkerboard_redraws(), 0, "not counted");

        m.did_draw(DrawResult::Success);
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::Idle);
    }

    #[test]
    fn checkerboard_without_forcing_only_counts() {
        let mut m = PipelineStateMachine::new(EngineSettings {
            force_draw_after_repeated_checkerboard: false,
            ..EngineSettings::default()
        });
        for _ in 0..10 {
            m.did_draw(DrawResult::AbortedCheckerboard);
        }
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::Idle);
        assert_eq!(m.consecutive_checkerboard_redraws(), 10);
        assert!(m.needs_commit() && m.redraw_pending(), "both relatched");
    }

    #[test]
    fn missing_content_only_requests_commit() {
        let mut m = make_ready();
        m.did_draw(DrawResult::AbortedMissingContent);
        assert!(m.needs_commit(), "commit relatched");
        assert!(!m.redraw_pending(), "redraw untouched");
        assert_eq!(m.consecutive_checkerboard_redraws(), 0);
    }

    #[test]
    fn main_frame_abort_paths() {
        let mut m = make_ready();
        m.apply(Action::BeginSurfaceCreation).unwrap();
        m.did_create_surface().unwrap();
        m.set_needs_commit();
        m.apply(Action::SendMainFrame).unwrap();
        m.main_frame_aborted(false).unwrap();
        assert_eq!(m.commit_phase(), CommitPhase::Idle);
        assert!(m.needs_commit(), "unhandled abort re-requests");
        assert_eq!(m.commit_count(), 0);

        m.apply(Action::SendMainFrame).unwrap();
        m.main_frame_aborted(true).unwrap();
        assert_eq!(m.commit_count(), 1, "handled abort counts as commit");
        assert_eq!(m.surface_state(), SurfaceState::Active);
        assert!(!m.active_tree_needs_first_draw(), "nothing new to draw");
        assert!(m.main_frame_aborted(true).is_err(), "nothing in flight");
    }

    #[test]
    fn ready_to_activate_requires_pending_tree() {
        let mut m = make_ready();
        m.notify_ready_to_activate();
        assert!(
            !m.snapshot().pending_tree_ready_for_activation,
            "no pending tree"
        );
    }

    #[test]
    fn poll_window_advances_tick() {
        let mut m = make_ready();
        m.did_enter_poll_for_draw_triggers();
        assert!(m.snapshot().inside_poll_for_draw_triggers, "inside poll");
        assert_eq!(m.current_tick(), 1);
        m.did_leave_poll_for_draw_triggers();
        assert!(!m.snapshot().inside_poll_for_draw_triggers, "left poll");
    }
}
