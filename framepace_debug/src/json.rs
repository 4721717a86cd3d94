// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON renderings of engine state.

use serde_json::{Value, json};

use framepace_core::machine::StateSnapshot;
use framepace_core::trace::TickSummary;

/// Renders every field of a [`StateSnapshot`].
///
/// Phases use their diagnostic labels; tick markers that never fired are
/// `null`.
#[must_use]
pub fn snapshot_json(s: &StateSnapshot) -> Value {
    json!({
        "phases": {
            "surface": s.surface.as_str(),
            "frame": s.frame.as_str(),
            "commit": s.commit.as_str(),
            "forced_redraw": s.forced_redraw.as_str(),
        },
        "frame_args": s.frame_args.map(|a| json!({
            "frame_time": a.frame_time.ticks(),
            "deadline": a.deadline.ticks(),
            "interval": a.interval.ticks(),
        })),
        "counters": {
            "current_tick": s.current_tick,
            "commit_count": s.commit_count,
            "pending_swaps": s.pending_swaps,
            "max_pending_swaps": s.max_pending_swaps,
            "consecutive_checkerboard_redraws": s.consecutive_checkerboard_redraws,
            "manage_tiles_funnel": s.manage_tiles_funnel,
        },
        "last_tick": {
            "animate": s.last_animate_tick,
            "swap": s.last_swap_tick,
            "swap_request": s.last_swap_request_tick,
            "main_frame_send": s.last_main_frame_send_tick,
            "visible_tiles": s.last_visible_tiles_tick,
        },
        "flags": {
            "needs_redraw": s.needs_redraw,
            "needs_animate": s.needs_animate,
            "needs_manage_tiles": s.needs_manage_tiles,
            "needs_commit": s.needs_commit,
            "visible": s.visible,
            "can_start": s.can_start,
            "can_draw": s.can_draw,
            "has_pending_tree": s.has_pending_tree,
            "pending_tree_ready_for_activation": s.pending_tree_ready_for_activation,
            "active_tree_needs_first_draw": s.active_tree_needs_first_draw,
            "swap_used_incomplete_tile": s.swap_used_incomplete_tile,
            "smoothness_takes_priority": s.smoothness_takes_priority,
            "continuous_painting": s.continuous_painting,
            "skip_next_main_frame": s.skip_next_main_frame,
            "skip_main_frame_this_tick": s.skip_main_frame_this_tick,
            "inside_poll_for_draw_triggers": s.inside_poll_for_draw_triggers,
            "did_create_first_surface": s.did_create_first_surface,
        },
    })
}

/// Renders a [`TickSummary`].
#[must_use]
pub fn summary_json(s: &TickSummary) -> Value {
    json!({
        "tick": s.tick,
        "frame_time": s.frame_time.ticks(),
        "deadline": s.deadline.ticks(),
        "actions": s.actions,
        "draws": s.draws,
        "forced_draws": s.forced_draws,
        "aborted_draws": s.aborted_draws,
        "commits": s.commits,
        "activations": s.activations,
        "main_frames_sent": s.main_frames_sent,
        "surface_creations": s.surface_creations,
        "surface": s.surface.as_str(),
        "commit": s.commit.as_str(),
        "forced_redraw": s.forced_redraw.as_str(),
        "pending_swaps": s.pending_swaps,
        "redraw_deferred": s.redraw_deferred,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use framepace_core::action::Action;
    use framepace_core::machine::PipelineStateMachine;
    use framepace_core::settings::EngineSettings;
    use framepace_core::time::{Duration, FrameArgs, HostTime};

    #[test]
    fn fresh_engine_snapshot() {
        let m = PipelineStateMachine::new(EngineSettings::default());
        let v = snapshot_json(&m.snapshot());
        assert_eq!(v["phases"]["surface"], "lost");
        assert_eq!(v["counters"]["max_pending_swaps"], 1);
        assert!(v["frame_args"].is_null(), "no tick yet");
        assert!(v["last_tick"]["swap"].is_null(), "never swapped");
        assert_eq!(v["flags"]["visible"], false);
    }

    #[test]
    fn snapshot_tracks_progress() {
        let mut m = PipelineStateMachine::new(EngineSettings::default());
        m.set_can_start(true);
        m.set_visible(true);
        m.apply(Action::BeginSurfaceCreation).unwrap();
        m.did_create_surface().unwrap();
        m.on_frame_start(FrameArgs::new(HostTime(50), Duration(10), Duration(16)))
            .unwrap();
        m.did_swap().unwrap();

        let v = snapshot_json(&m.snapshot());
        assert_eq!(v["phases"]["surface"], "waiting-for-first-commit");
        assert_eq!(v["phases"]["frame"], "starting");
        assert_eq!(v["frame_args"]["deadline"], 60);
        assert_eq!(v["last_tick"]["swap"], 1);
        assert_eq!(v["flags"]["did_create_first_surface"], true);
    }

    #[test]
    fn summary_fields() {
        let m = PipelineStateMachine::new(EngineSettings::default());
        let start = framepace_core::trace::FrameStartEvent {
            tick: 2,
            args: FrameArgs::new(HostTime(32), Duration(12), Duration(16)),
        };
        let mut b = framepace_core::trace::TickSummaryBuilder::new(&start);
        b.record(Action::Commit);
        let v = summary_json(&b.finish(&m));
        assert_eq!(v["tick"], 2);
        assert_eq!(v["commits"], 1);
        assert_eq!(v["deadline"], 44);
        assert_eq!(v["surface"], "lost");
    }
}
