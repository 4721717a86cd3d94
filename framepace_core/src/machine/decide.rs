// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Action predicates and frame-request policy.
//!
//! Everything here is a pure read of the state. `next_action` evaluates the
//! predicates in priority order and returns the first that holds.

use crate::action::{Action, DrawMode};
use crate::phase::{CommitPhase, ForcedRedrawPhase, FramePhase, SurfaceState};

use super::PipelineStateMachine;

impl PipelineStateMachine {
    /// The single next action for the current state. Never mutates.
    #[must_use]
    pub fn next_action(&self) -> Action {
        if self.should_update_visible_tiles() {
            Action::UpdateVisibleTiles
        } else if self.should_activate_pending_tree() {
            Action::ActivatePendingTree
        } else if self.should_commit() {
            Action::Commit
        } else if self.should_animate() {
            Action::Animate
        } else if self.should_draw() {
            Action::Draw(self.draw_mode())
        } else if self.should_manage_tiles() {
            Action::ManageTiles
        } else if self.should_send_main_frame() {
            Action::SendMainFrame
        } else if self.should_begin_surface_creation() {
            Action::BeginSurfaceCreation
        } else {
            Action::None
        }
    }

    fn draw_mode(&self) -> DrawMode {
        if self.pending_draws_should_be_aborted() {
            DrawMode::Abort
        } else if self.forced_redraw == ForcedRedrawPhase::WaitingForDraw {
            DrawMode::Forced
        } else {
            DrawMode::IfPossible
        }
    }

    /// Pending activations are forced when the surface is lost, since no real
    /// draw will come along to unblock them.
    #[must_use]
    pub fn pending_activations_should_be_forced(&self) -> bool {
        self.surface == SurfaceState::Lost
    }

    /// Draws are aborted when nothing can be presented.
    #[must_use]
    pub fn pending_draws_should_be_aborted(&self) -> bool {
        self.pending_activations_should_be_forced() || !self.can_draw || !self.visible
    }

    fn should_begin_surface_creation(&self) -> bool {
        if !self.can_start {
            return false;
        }
        // The whole pipeline must be flushed before swapping surfaces.
        if self.commit != CommitPhase::Idle || self.frame != FramePhase::Idle {
            return false;
        }
        if self.active_tree_needs_first_draw || self.has_pending_tree {
            return false;
        }
        self.surface == SurfaceState::Lost
    }

    fn should_draw(&self) -> bool {
        // An undrawn active tree blocks activation and surface creation, so
        // abort it right away rather than waiting for a deadline.
        if self.pending_draws_should_be_aborted() {
            return self.active_tree_needs_first_draw;
        }
        if self.happened_this_tick(self.last_swap_request_tick) {
            return false;
        }
        if self.pending_swaps >= self.max_pending_swaps {
            return false;
        }
        if self.frame != FramePhase::InsideDeadline {
            return false;
        }
        if self.forced_redraw == ForcedRedrawPhase::WaitingForDraw {
            return true;
        }
        self.needs_redraw
    }

    fn should_activate_pending_tree(&self) -> bool {
        if !self.has_pending_tree {
            return false;
        }
        // Never activate a second tree before presenting the first; a forced
        // activation aborts the draw first.
        if self.active_tree_needs_first_draw {
            return false;
        }
        if self.pending_activations_should_be_forced() {
            return true;
        }
        self.pending_tree_ready_for_activation
    }

    fn should_update_visible_tiles(&self) -> bool {
        if !self.settings.supports_pending_tree {
            return false;
        }
        if self.happened_this_tick(self.last_visible_tiles_tick) {
            return false;
        }
        if self.happened_this_tick(self.last_swap_request_tick) {
            return false;
        }
        if !self.has_initialized_surface() {
            return false;
        }
        // As late as possible, so tiles have the most time to finish.
        if self.frame != FramePhase::InsideDeadline {
            return false;
        }
        self.swap_used_incomplete_tile
    }

    fn should_animate(&self) -> bool {
        if !self.can_draw {
            return false;
        }
        if self.happened_this_tick(self.last_animate_tick) {
            return false;
        }
        if !matches!(self.frame, FramePhase::FrameStarting | FramePhase::InsideDeadline) {
            return false;
        }
        self.needs_redraw || self.needs_animate
    }

    fn should_send_main_frame(&self) -> bool {
        if !self.needs_commit {
            return false;
        }
        if self.commit != CommitPhase::Idle {
            return false;
        }
        if self.smoothness_takes_priority
            && (self.has_pending_tree || self.active_tree_needs_first_draw)
        {
            return false;
        }
        if !self.visible {
            return false;
        }
        // A fresh surface gets its first content as soon as possible.
        if self.surface == SurfaceState::WaitingForFirstCommit {
            return true;
        }
        // Input may still arrive before the next tick starts.
        if self.frame == FramePhase::Idle && self.begin_frame_needed() {
            return false;
        }
        // The forced redraw needs new content; it will be presented, so the
        // once-per-tick limit does not apply.
        if self.forced_redraw == ForcedRedrawPhase::WaitingForCommit {
            return true;
        }
        if self.happened_this_tick(self.last_main_frame_send_tick) {
            return false;
        }
        if !self.has_initialized_surface() {
            return false;
        }
        let just_swapped_in_deadline = self.frame == FramePhase::InsideDeadline
            && self.happened_this_tick(self.last_swap_tick);
        if self.pending_swaps >= self.max_pending_swaps && !just_swapped_in_deadline {
            return false;
        }
        !self.skip_main_frame_this_tick
    }

    fn should_commit(&self) -> bool {
        if self.commit != CommitPhase::ReadyToCommit {
            return false;
        }
        // The pending tree slot must be free, even when production was
        // allowed to overlap it.
        if self.has_pending_tree {
            return false;
        }
        // Do not replace an active tree that has never been drawn.
        !self.active_tree_needs_first_draw
    }

    fn should_manage_tiles(&self) -> bool {
        if self.manage_tiles_funnel > 0 {
            return false;
        }
        if self.frame != FramePhase::InsideDeadline && !self.inside_poll_for_draw_triggers {
            return false;
        }
        self.needs_manage_tiles
    }

    // -- frame-request policy ----------------------------------------------

    /// Whether the driver should keep ticks coming.
    ///
    /// Synchronous presenters only tick for real work; they poll for
    /// anticipated work through
    /// [`should_poll_for_draw_triggers`](Self::should_poll_for_draw_triggers).
    #[must_use]
    pub fn begin_frame_needed(&self) -> bool {
        if self.settings.uses_synchronous_presentation {
            self.frame_needed_to_animate_or_draw()
        } else {
            self.frame_needed_to_animate_or_draw() || self.proactive_frame_wanted()
        }
    }

    /// Whether a tick is needed because something will be animated or drawn.
    #[must_use]
    pub fn frame_needed_to_animate_or_draw(&self) -> bool {
        if !self.has_initialized_surface() || !self.can_draw {
            return false;
        }
        // A forced draw follows normal draw scheduling and needs its tick.
        if self.forced_redraw == ForcedRedrawPhase::WaitingForDraw {
            return true;
        }
        if !self.visible {
            return false;
        }
        self.swap_used_incomplete_tile || self.needs_animate || self.needs_redraw
    }

    /// Whether a tick is wanted because work is likely to appear soon.
    #[must_use]
    pub fn proactive_frame_wanted(&self) -> bool {
        if !self.visible || !self.has_initialized_surface() {
            return false;
        }
        if self.needs_commit || self.commit != CommitPhase::Idle {
            return true;
        }
        if self.has_pending_tree || self.needs_manage_tiles {
            return true;
        }
        // Another frame usually follows a swap.
        self.happened_this_tick(self.last_swap_request_tick)
    }

    /// Whether a synchronous presenter should open an idle polling window.
    #[must_use]
    pub fn should_poll_for_draw_triggers(&self) -> bool {
        self.settings.uses_synchronous_presentation
            && !self.frame_needed_to_animate_or_draw()
            && self.proactive_frame_wanted()
    }

    /// Whether the driver should fire the deadline without waiting for it.
    #[must_use]
    pub fn should_trigger_deadline_early(&self) -> bool {
        if self.frame != FramePhase::InsideFrame {
            return false;
        }
        // Finish the tick so surface creation can start.
        if self.surface == SurfaceState::Lost {
            return true;
        }
        // Throttled: there will be no draw anyway.
        if self.pending_swaps >= self.max_pending_swaps {
            return false;
        }
        if self.active_tree_needs_first_draw {
            return true;
        }
        if !self.needs_redraw {
            return false;
        }
        // Production is idle, so nothing better will arrive before the deadline.
        if self.commit == CommitPhase::Idle && !self.has_pending_tree {
            return true;
        }
        self.smoothness_takes_priority
    }

    /// Whether production is running at least one tick behind presentation.
    #[must_use]
    pub fn production_in_high_latency_mode(&self) -> bool {
        // Producing again before the last result was presented.
        if self.commit_pending() && (self.active_tree_needs_first_draw || self.has_pending_tree) {
            return true;
        }
        let sent_this_tick = self.happened_this_tick(self.last_main_frame_send_tick);
        // A request sent in this tick before its deadline is on time.
        if sent_this_tick
            && matches!(self.frame, FramePhase::FrameStarting | FramePhase::InsideFrame)
        {
            return false;
        }
        // Anything else still in flight started in an earlier tick.
        if self.commit_pending() || self.has_pending_tree {
            return true;
        }
        // New content at the deadline is late unless this tick requested it.
        if self.frame == FramePhase::InsideDeadline {
            let swapped_this_tick = self.happened_this_tick(self.last_swap_tick);
            return (self.active_tree_needs_first_draw || swapped_this_tick) && !sent_this_tick;
        }
        self.active_tree_needs_first_draw
    }
}

#[cfg(test)]
mod tests {
    use crate::action::{Action, DrawMode, DrawResult};
    use crate::machine::PipelineStateMachine;
    use crate::phase::{CommitPhase, ForcedRedrawPhase, SurfaceState};
    use crate::settings::EngineSettings;
    use crate::time::{Duration, FrameArgs, HostTime};

    fn make_args() -> FrameArgs {
        FrameArgs::new(HostTime(0), Duration(12), Duration(16))
    }

    /// Visible, drawable, with an active surface that has had its first commit.
    fn make_active(settings: EngineSettings) -> PipelineStateMachine {
        let mut m = PipelineStateMachine::new(settings);
        m.set_can_start(true);
        m.set_visible(true);
        m.set_can_draw(true);
        m.apply(Action::BeginSurfaceCreation).unwrap();
        m.did_create_surface().unwrap();
        m.set_needs_commit();
        m.apply(Action::SendMainFrame).unwrap();
        m.notify_main_frame_started().unwrap();
        m.notify_ready_to_commit().unwrap();
        m.apply(Action::Commit).unwrap();
        if settings.supports_pending_tree {
            m.notify_ready_to_activate();
            m.apply(Action::ActivatePendingTree).unwrap();
        }
        m
    }

    fn enter_deadline(m: &mut PipelineStateMachine) {
        m.on_frame_start(make_args()).unwrap();
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
    }

    fn finish_tick(m: &mut PipelineStateMachine) {
        loop {
            let action = m.next_action();
            if action.is_none() {
                break;
            }
            m.apply(action).unwrap();
        }
        m.on_frame_idle().unwrap();
    }

    #[test]
    fn idle_machine_does_nothing() {
        let m = PipelineStateMachine::new(EngineSettings::default());
        assert_eq!(m.next_action(), Action::None, "cannot start yet");
    }

    #[test]
    fn draw_waits_for_deadline() {
        let mut m = make_active(EngineSettings::default());
        assert!(m.active_tree_needs_first_draw(), "fresh commit");
        m.on_frame_start(make_args()).unwrap();
        assert_eq!(m.next_action(), Action::Animate, "redraw implies animate");
        m.apply(Action::Animate).unwrap();
        assert_eq!(m.next_action(), Action::None, "no draw before deadline");
        m.on_deadline_pending().unwrap();
        assert!(m.should_trigger_deadline_early(), "undrawn tree");
        m.on_deadline().unwrap();
        assert_eq!(m.next_action(), Action::Draw(DrawMode::IfPossible));
        m.apply(Action::Draw(DrawMode::IfPossible)).unwrap();
        assert_eq!(m.next_action(), Action::None, "one draw per tick");
    }

    #[test]
    fn draw_is_swap_throttled() {
        let mut m = make_active(EngineSettings::default());
        m.did_swap().unwrap();
        enter_deadline(&mut m);
        m.apply(Action::Animate).unwrap();
        assert_eq!(m.next_action(), Action::None, "swap queue full");
        m.did_swap_complete().unwrap();
        assert_eq!(m.next_action(), Action::Draw(DrawMode::IfPossible));
    }

    #[test]
    fn invisible_undrawn_tree_is_aborted_immediately() {
        let mut m = make_active(EngineSettings::default());
        m.set_visible(false);
        assert_eq!(m.next_action(), Action::Draw(DrawMode::Abort));
        m.apply(Action::Draw(DrawMode::Abort)).unwrap();
        assert!(
            !m.active_tree_needs_first_draw(),
            "abort counts as the first draw"
        );
        assert!(
            m.snapshot().last_swap_request_tick.is_none(),
            "abort requests no swap"
        );
        assert_eq!(m.next_action(), Action::None);
    }

    #[test]
    fn forced_draw_mode() {
        let mut m = make_active(EngineSettings::default());
        enter_deadline(&mut m);
        finish_tick(&mut m);
        for _ in 0..3 {
            m.did_draw(DrawResult::AbortedCheckerboard);
        }
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::WaitingForCommit);

        // Forced commits ignore the once-per-tick send limit.
        m.on_frame_start(make_args()).unwrap();
        m.apply(Action::Animate).unwrap();
        assert_eq!(m.next_action(), Action::SendMainFrame);
        m.apply(Action::SendMainFrame).unwrap();
        m.notify_main_frame_started().unwrap();
        m.notify_ready_to_commit().unwrap();
        m.apply(Action::Commit).unwrap();
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::WaitingForDraw);
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
        assert_eq!(m.next_action(), Action::Draw(DrawMode::Forced));
        m.apply(Action::Draw(DrawMode::Forced)).unwrap();
        assert_eq!(m.forced_redraw_phase(), ForcedRedrawPhase::Idle);
    }

    #[test]
    fn send_main_frame_once_per_tick() {
        let mut m = make_active(EngineSettings::default());
        enter_deadline(&mut m);
        finish_tick(&mut m);

        m.on_frame_start(make_args()).unwrap();
        m.set_needs_commit();
        assert_eq!(m.next_action(), Action::SendMainFrame);
        m.apply(Action::SendMainFrame).unwrap();
        m.notify_main_frame_started().unwrap();
        m.notify_ready_to_commit().unwrap();
        m.apply(Action::Commit).unwrap();
        m.set_needs_commit();
        assert_ne!(
            m.next_action(),
            Action::SendMainFrame,
            "already sent this tick"
        );
    }

    #[test]
    fn send_main_frame_held_while_idle_if_frame_needed() {
        let mut m = make_active(EngineSettings::default());
        enter_deadline(&mut m);
        finish_tick(&mut m);
        m.set_needs_commit();
        m.set_needs_redraw();
        assert!(m.begin_frame_needed(), "redraw needs a tick");
        assert_eq!(m.next_action(), Action::None, "wait for the tick");
        m.on_frame_start(make_args()).unwrap();
        m.apply(Action::Animate).unwrap();
        assert_eq!(m.next_action(), Action::SendMainFrame);
    }

    #[test]
    fn skip_latch_blocks_one_tick() {
        let mut m = make_active(EngineSettings::default());
        enter_deadline(&mut m);
        finish_tick(&mut m);
        m.set_skip_next_main_frame_to_reduce_latency();
        m.on_frame_start(make_args()).unwrap();
        m.set_needs_commit();
        assert_eq!(m.next_action(), Action::None, "skipped");
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
        m.on_frame_idle().unwrap();
        m.on_frame_start(make_args()).unwrap();
        assert_eq!(m.next_action(), Action::SendMainFrame, "latch consumed");
    }

    #[test]
    fn smoothness_holds_production_behind_undrawn_tree() {
        let mut m = make_active(EngineSettings::default());
        m.set_smoothness_takes_priority(true);
        m.on_frame_start(make_args()).unwrap();
        m.apply(Action::Animate).unwrap();
        m.set_needs_commit();
        assert_eq!(m.next_action(), Action::None, "undrawn tree first");
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
        m.apply(Action::Draw(DrawMode::IfPossible)).unwrap();
        m.did_swap().unwrap();
        assert_eq!(
            m.next_action(),
            Action::SendMainFrame,
            "just swapped in the deadline releases the throttle"
        );
    }

    #[test]
    fn manage_tiles_is_funneled() {
        let mut m = make_active(EngineSettings::default());
        m.set_needs_manage_tiles();
        enter_deadline(&mut m);
        m.apply(Action::Animate).unwrap();
        m.apply(Action::Draw(DrawMode::IfPossible)).unwrap();
        assert_eq!(m.next_action(), Action::ManageTiles);
        m.apply(Action::ManageTiles).unwrap();
        m.did_manage_tiles();
        m.set_needs_manage_tiles();
        assert_eq!(m.next_action(), Action::None, "funnel is full");
        m.on_frame_idle().unwrap();
        enter_deadline(&mut m);
        assert_eq!(
            m.snapshot().manage_tiles_funnel,
            0,
            "drained at frame start"
        );
        assert_eq!(m.next_action(), Action::ManageTiles);
    }

    #[test]
    fn visible_tiles_update_once_after_incomplete_swap() {
        let mut m = make_active(EngineSettings::pending_tree());
        m.set_swap_used_incomplete_tile(true);
        enter_deadline(&mut m);
        assert_eq!(m.next_action(), Action::UpdateVisibleTiles);
        m.apply(Action::UpdateVisibleTiles).unwrap();
        assert_ne!(m.next_action(), Action::UpdateVisibleTiles, "once per tick");
    }

    #[test]
    fn visible_tiles_need_pending_tree_support() {
        let mut m = make_active(EngineSettings::default());
        m.set_swap_used_incomplete_tile(true);
        enter_deadline(&mut m);
        assert_ne!(m.next_action(), Action::UpdateVisibleTiles);
        assert!(
            m.frame_needed_to_animate_or_draw(),
            "incomplete tiles want frames"
        );
    }

    #[test]
    fn pending_tree_activation() {
        let mut m = make_active(EngineSettings::pending_tree());
        assert_eq!(m.surface_state(), SurfaceState::Active);
        enter_deadline(&mut m);
        finish_tick(&mut m);

        m.on_frame_start(make_args()).unwrap();
        m.set_needs_commit();
        m.apply(Action::SendMainFrame).unwrap();
        m.notify_main_frame_started().unwrap();
        m.notify_ready_to_commit().unwrap();
        m.apply(Action::Commit).unwrap();
        assert!(m.has_pending_tree(), "commit went to the pending tree");
        assert_eq!(m.commit_phase(), CommitPhase::WaitingForActivation);
        assert_ne!(
            m.next_action(),
            Action::ActivatePendingTree,
            "not ready yet"
        );
        m.notify_ready_to_activate();
        assert_eq!(m.next_action(), Action::ActivatePendingTree);
        m.apply(Action::ActivatePendingTree).unwrap();
        assert_eq!(m.commit_phase(), CommitPhase::Idle);
        assert!(
            m.active_tree_needs_first_draw(),
            "activated tree needs a draw"
        );
    }

    #[test]
    fn lost_surface_forces_activation_after_abort() {
        let mut m = make_active(EngineSettings::pending_tree());
        enter_deadline(&mut m);
        finish_tick(&mut m);
        m.set_needs_commit();
        m.on_frame_start(make_args()).unwrap();
        m.apply(Action::SendMainFrame).unwrap();
        m.notify_main_frame_started().unwrap();
        m.notify_ready_to_commit().unwrap();
        m.apply(Action::Commit).unwrap();
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
        m.on_frame_idle().unwrap();

        m.did_lose_surface();
        assert!(m.pending_activations_should_be_forced(), "lost");
        assert_eq!(m.next_action(), Action::ActivatePendingTree);
        m.apply(Action::ActivatePendingTree).unwrap();
        assert_eq!(m.next_action(), Action::Draw(DrawMode::Abort));
        m.apply(Action::Draw(DrawMode::Abort)).unwrap();
        assert_eq!(m.next_action(), Action::BeginSurfaceCreation);
    }

    #[test]
    fn synchronous_presentation_polls_instead_of_ticking() {
        let mut m = make_active(EngineSettings::synchronous());
        enter_deadline(&mut m);
        finish_tick(&mut m);
        m.set_needs_commit();
        assert!(m.proactive_frame_wanted(), "commit requested");
        assert!(
            !m.begin_frame_needed(),
            "synchronous does not tick proactively"
        );
        assert!(m.should_poll_for_draw_triggers(), "poll instead");

        let mut a = make_active(EngineSettings::default());
        enter_deadline(&mut a);
        finish_tick(&mut a);
        a.set_needs_commit();
        assert!(a.begin_frame_needed(), "asynchronous ticks proactively");
        assert!(!a.should_poll_for_draw_triggers(), "never polls");
    }

    #[test]
    fn poll_window_allows_manage_tiles() {
        let mut m = make_active(EngineSettings::synchronous());
        m.set_needs_manage_tiles();
        assert_ne!(m.next_action(), Action::ManageTiles, "outside deadline");
        m.did_enter_poll_for_draw_triggers();
        assert_eq!(m.next_action(), Action::ManageTiles);
        m.did_leave_poll_for_draw_triggers();
    }

    #[test]
    fn high_latency_detection() {
        let mut m = make_active(EngineSettings::default());
        assert!(m.production_in_high_latency_mode(), "undrawn commit");
        m.on_frame_start(make_args()).unwrap();
        m.apply(Action::Animate).unwrap();
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
        m.apply(Action::Draw(DrawMode::IfPossible)).unwrap();
        m.did_swap().unwrap();
        assert!(m.production_in_high_latency_mode(), "swapped old content");
        m.did_swap_complete().unwrap();
        m.on_frame_idle().unwrap();
        assert!(!m.production_in_high_latency_mode(), "nothing in flight");

        m.on_frame_start(make_args()).unwrap();
        m.set_needs_commit();
        m.apply(Action::SendMainFrame).unwrap();
        assert!(!m.production_in_high_latency_mode(), "sent this tick");
        m.on_deadline_pending().unwrap();
        m.on_deadline().unwrap();
        assert!(m.production_in_high_latency_mode(), "missed the deadline");
    }

    #[test]
    fn deadline_early_rules() {
        let mut m = make_active(EngineSettings::default());
        assert!(!m.should_trigger_deadline_early(), "only inside the frame");
        m.on_frame_start(make_args()).unwrap();
        m.on_deadline_pending().unwrap();
        m.did_swap().unwrap();
        assert!(!m.should_trigger_deadline_early(), "throttled");
        m.did_swap_complete().unwrap();
        assert!(m.should_trigger_deadline_early(), "undrawn tree");
        m.did_lose_surface();
        assert!(m.should_trigger_deadline_early(), "lost surface");
    }
}
