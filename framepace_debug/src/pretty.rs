// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Frame times
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use framepace_core::machine::StateSnapshot;
use framepace_core::time::{HostTime, Timebase};
use framepace_core::trace::{
    ActionEvent, FramePhaseEvent, FrameStartEvent, TickSummary, TraceSink, ViolationEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
    snapshots: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .field("snapshots", &self.snapshots)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self::new(Box::new(std::io::stderr()), timebase)
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self::with_writer(writer, timebase)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self {
            writer,
            timebase,
            snapshots: false,
        }
    }

    /// Also prints a line for every per-action state snapshot.
    #[must_use]
    pub fn with_snapshots(mut self, snapshots: bool) -> Self {
        self.snapshots = snapshots;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_start(&mut self, e: &FrameStartEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] tick={} time={:.1}µs deadline={:.1}µs interval={:.1}µs",
            e.tick,
            self.host_us(e.args.frame_time),
            self.host_us(e.args.deadline),
            self.ticks_to_us(e.args.interval.ticks()),
        );
    }

    fn on_frame_phase(&mut self, e: &FramePhaseEvent) {
        let _ = writeln!(
            self.writer,
            "[phase] tick={} {} -> {}",
            e.tick,
            e.from.as_str(),
            e.to.as_str(),
        );
    }

    fn on_action(&mut self, e: &ActionEvent) {
        let _ = writeln!(
            self.writer,
            "[action] tick={} #{} {}",
            e.tick,
            e.sequence,
            e.action.as_str(),
        );
    }

    fn on_violation(&mut self, e: &ViolationEvent) {
        let _ = writeln!(self.writer, "[violation] tick={} {}", e.tick, e.violation);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        let redraw = if s.redraw_deferred { "DEFERRED" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[summary] tick={} actions={} draws={} forced={} aborted={} commits={} \
             activations={} sent={} surface={} commit={} recovery={} swaps={} redraw={redraw}",
            s.tick,
            s.actions,
            s.draws,
            s.forced_draws,
            s.aborted_draws,
            s.commits,
            s.activations,
            s.main_frames_sent,
            s.surface.as_str(),
            s.commit.as_str(),
            s.forced_redraw.as_str(),
            s.pending_swaps,
        );
    }

    fn on_state_snapshot(&mut self, tick: u64, snapshot: &StateSnapshot) {
        if !self.snapshots {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[state] tick={tick} surface={} frame={} commit={} swaps={}/{} \
             commit_needed={} redraw_needed={} pending_tree={} undrawn={}",
            snapshot.surface.as_str(),
            snapshot.frame.as_str(),
            snapshot.commit.as_str(),
            snapshot.pending_swaps,
            snapshot.max_pending_swaps,
            snapshot.needs_commit,
            snapshot.needs_redraw,
            snapshot.has_pending_tree,
            snapshot.active_tree_needs_first_draw,
        );
    }
}
