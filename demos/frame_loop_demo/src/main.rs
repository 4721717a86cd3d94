// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runs a simulated pipeline through the decision engine.
//!
//! Every trace event goes to both a
//! [`PrettyPrintSink`](framepace_debug::pretty::PrettyPrintSink) on stdout and
//! a [`RecorderSink`](framepace_debug::recorder::RecorderSink). When the run
//! ends the demo prints the health report and the final engine state, and can
//! export the recording as a Chrome trace.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use framepace_core::machine::StateSnapshot;
use framepace_core::settings::EngineSettings;
use framepace_core::time::Timebase;
use framepace_core::trace::{
    ActionEvent, FramePhaseEvent, FrameStartEvent, TickSummary, TraceSink, Tracer, ViolationEvent,
};
use framepace_debug::json::snapshot_json;
use framepace_debug::pretty::PrettyPrintSink;
use framepace_debug::recorder::RecorderSink;
use framepace_harness::{Harness, HarnessConfig, PathologyToggles, PipelineReport};

#[derive(Parser)]
#[command(version, about = "Simulated frame-production run")]
struct Arguments {
    /// Engine configuration preset.
    #[arg(long, value_enum, default_value = "immediate")]
    preset: Preset,
    /// Tick periods to simulate.
    #[arg(long, default_value_t = 120)]
    ticks: u32,
    /// Swap-queue depth.
    #[arg(long, default_value_t = 1)]
    max_pending_swaps: u32,
    /// Production takes two extra ticks.
    #[arg(long)]
    slow_production: bool,
    /// Draws checkerboard in periodic bursts.
    #[arg(long)]
    checkerboard: bool,
    /// The surface is lost periodically.
    #[arg(long)]
    surface_loss: bool,
    /// Swap acknowledgements take two extra ticks.
    #[arg(long)]
    slow_swap_ack: bool,
    /// The output is hidden periodically.
    #[arg(long)]
    hide: bool,
    /// Skip production while it runs a tick behind presentation.
    #[arg(long)]
    recover_latency: bool,
    /// Print the engine state after every action.
    #[arg(long)]
    snapshots: bool,
    /// Suppress per-event trace lines.
    #[arg(long, short = 'q')]
    quiet: bool,
    /// Write a Chrome trace of the run to this path.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Preset {
    Immediate,
    PendingTree,
    Overlapped,
    Synchronous,
}

impl Preset {
    fn settings(self) -> EngineSettings {
        match self {
            Self::Immediate => EngineSettings::immediate(),
            Self::PendingTree => EngineSettings::pending_tree(),
            Self::Overlapped => EngineSettings::overlapped(),
            Self::Synchronous => EngineSettings::synchronous(),
        }
    }
}

/// Forwards every event to the pretty printer (unless quiet) and the recorder.
struct Tee {
    pretty: Option<PrettyPrintSink>,
    recorder: RecorderSink,
}

impl TraceSink for Tee {
    fn on_frame_start(&mut self, e: &FrameStartEvent) {
        if let Some(p) = &mut self.pretty {
            p.on_frame_start(e);
        }
        self.recorder.on_frame_start(e);
    }

    fn on_frame_phase(&mut self, e: &FramePhaseEvent) {
        if let Some(p) = &mut self.pretty {
            p.on_frame_phase(e);
        }
        self.recorder.on_frame_phase(e);
    }

    fn on_action(&mut self, e: &ActionEvent) {
        if let Some(p) = &mut self.pretty {
            p.on_action(e);
        }
        self.recorder.on_action(e);
    }

    fn on_violation(&mut self, e: &ViolationEvent) {
        if let Some(p) = &mut self.pretty {
            p.on_violation(e);
        }
        self.recorder.on_violation(e);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        if let Some(p) = &mut self.pretty {
            p.on_tick_summary(s);
        }
        self.recorder.on_tick_summary(s);
    }

    fn on_state_snapshot(&mut self, tick: u64, snapshot: &StateSnapshot) {
        if let Some(p) = &mut self.pretty {
            p.on_state_snapshot(tick, snapshot);
        }
        self.recorder.on_state_snapshot(tick, snapshot);
    }
}

fn main() -> Result<()> {
    let arguments = Arguments::parse();
    let timebase = Timebase::NANOS;

    let mut config = HarnessConfig::new(arguments.preset.settings(), arguments.ticks);
    config.max_pending_swaps = arguments.max_pending_swaps;
    config.recover_latency = arguments.recover_latency;
    config.toggles = PathologyToggles {
        slow_production: arguments.slow_production,
        checkerboard: arguments.checkerboard,
        surface_loss: arguments.surface_loss,
        slow_swap_ack: arguments.slow_swap_ack,
        hide_periodically: arguments.hide,
    };

    let pretty = (!arguments.quiet).then(|| {
        PrettyPrintSink::new(Box::new(std::io::stdout()), timebase)
            .with_snapshots(arguments.snapshots)
    });
    let mut sink = Tee {
        pretty,
        recorder: RecorderSink::new(),
    };

    let mut harness = Harness::new(config).context("configure engine")?;
    let outcome = harness.run(&mut Tracer::new(&mut sink));

    // Export whatever was recorded, even when the run stopped on a violation.
    if let Some(path) = &arguments.trace_out {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        framepace_debug::chrome::export(sink.recorder.as_bytes(), timebase, &mut writer)
            .with_context(|| format!("write Chrome trace to {}", path.display()))?;
        println!("wrote {}", path.display());
    }

    let report = outcome.context("simulated run")?;
    print_report(&arguments, &report);
    let state = snapshot_json(&harness.machine().snapshot());
    println!(
        "{}",
        serde_json::to_string_pretty(&state).context("render final state")?
    );
    Ok(())
}

fn print_report(arguments: &Arguments, r: &PipelineReport) {
    println!(
        "preset={:?} ticks={} idle={} hidden={} presented={} missed={}",
        arguments.preset, r.ticks, r.idle_ticks, r.hidden_ticks, r.presented_ticks, r.missed_ticks,
    );
    println!(
        "draws={} forced={} aborted={} checkerboarded={} commits={} activations={} main_frames={}",
        r.draws,
        r.forced_draws,
        r.aborted_draws,
        r.checkerboarded_draws,
        r.commits,
        r.activations,
        r.main_frames_sent,
    );
    println!(
        "surfaces created={} lost={}",
        r.surfaces_created, r.surfaces_lost
    );
    println!(
        "early deadlines={} latency skips={}",
        r.early_deadlines, r.latency_skips
    );
    println!(
        "grade {} ({:.1} misses per 1000 expected ticks)",
        r.grade.as_str(),
        r.miss_rate_per_1000
    );
}
