// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Each tick becomes a duration slice from its frame time to its deadline.
//! Actions carry no timestamp of their own, so they are placed at the frame
//! time of the tick they belong to, in sequence order.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use framepace_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Actions and snapshots between ticks are placed at the last known time.
    let mut now_us = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameStart(e) => {
                now_us = ticks_to_us(e.args.frame_time.ticks(), timebase);
                events.push(json!({
                    "ph": "B",
                    "name": "tick",
                    "cat": "Frame",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "tick": e.tick,
                        "interval_us": ticks_to_us(e.args.interval.ticks(), timebase),
                    }
                }));
            }
            RecordedEvent::FramePhase(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": e.to.as_str(),
                    "cat": "Phase",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "tick": e.tick,
                        "from": e.from.as_str(),
                    }
                }));
            }
            RecordedEvent::Action(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": e.action.as_str(),
                    "cat": "Action",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 1,
                    "s": "t",
                    "args": {
                        "tick": e.tick,
                        "sequence": e.sequence,
                    }
                }));
            }
            RecordedEvent::Violation { tick, message } => {
                events.push(json!({
                    "ph": "i",
                    "name": "violation",
                    "cat": "Violation",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "tick": tick,
                        "message": message,
                    }
                }));
            }
            RecordedEvent::TickSummary(s) => {
                let end_us = ticks_to_us(s.deadline.ticks(), timebase).max(now_us);
                events.push(json!({
                    "ph": "E",
                    "name": "tick",
                    "cat": "Frame",
                    "ts": end_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "tick": s.tick,
                        "actions": s.actions,
                        "draws": s.draws,
                        "forced_draws": s.forced_draws,
                        "aborted_draws": s.aborted_draws,
                        "commits": s.commits,
                        "activations": s.activations,
                        "main_frames_sent": s.main_frames_sent,
                        "surface": s.surface.as_str(),
                        "commit": s.commit.as_str(),
                        "forced_redraw": s.forced_redraw.as_str(),
                        "redraw_deferred": s.redraw_deferred,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "pending_swaps",
                    "cat": "Summary",
                    "ts": end_us,
                    "pid": 0,
                    "args": { "swaps": s.pending_swaps }
                }));
                now_us = end_us;
            }
            RecordedEvent::Snapshot { tick, digest } => {
                events.push(json!({
                    "ph": "i",
                    "name": "state",
                    "cat": "Rich",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 2,
                    "s": "t",
                    "args": {
                        "tick": tick,
                        "surface": digest.surface.as_str(),
                        "frame": digest.frame.as_str(),
                        "commit": digest.commit.as_str(),
                        "forced_redraw": digest.forced_redraw.as_str(),
                        "pending_swaps": digest.pending_swaps,
                        "has_pending_tree": digest.has_pending_tree,
                        "needs_commit": digest.needs_commit,
                        "needs_redraw": digest.needs_redraw,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}
