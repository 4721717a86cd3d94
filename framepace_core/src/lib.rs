// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-production decision engine for pipelined renderers.
//!
//! `framepace_core` decides, one step at a time, what a two-stage rendering
//! pipeline should do next. A *production* stage builds new content and
//! commits it; a *presentation* stage activates, draws and swaps it. The
//! engine reconciles surface lifecycle, commit and activation ordering,
//! swap-queue depth, forced-redraw recovery and proactive frame requests into
//! a single deterministic [`Action`](action::Action), without letting the two
//! stages deadlock on each other.
//!
//! It is `no_std`, performs no I/O and never reads a clock.
//!
//! # Architecture
//!
//! ```text
//!   tick source ──► FrameLoop::begin_frame / deadline / end_frame
//!                        │
//!                        ▼
//!   events ──► PipelineStateMachine ──► next_action() ──► apply()
//!      ▲                                                     │
//!      │                                                     ▼
//!      └──────── callbacks ◄──────── ActionExecutor::perform()
//! ```
//!
//! **[`machine`]**: [`PipelineStateMachine`](machine::PipelineStateMachine),
//! the state record, event mutators, the pure `next_action` query and the
//! `apply` call that commits an action's consequences.
//!
//! **[`phase`]**: The four phase enums (surface, frame, commit, forced
//! redraw).
//!
//! **[`action`]**: [`Action`](action::Action), [`DrawMode`](action::DrawMode)
//! and [`DrawResult`](action::DrawResult).
//!
//! **[`settings`]**: [`EngineSettings`](settings::EngineSettings) with
//! presets for common pipeline shapes.
//!
//! **[`driver`]**: [`FrameLoop`](driver::FrameLoop) and the
//! [`ActionExecutor`](driver::ActionExecutor) seam.
//!
//! **[`error`]**: [`ContractViolation`](error::ContractViolation).
//!
//! **[`time`]**: Host time, durations and [`FrameArgs`](time::FrameArgs).
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Emits a full state
//!   snapshot after every applied action.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod action;
pub mod driver;
pub mod error;
pub mod machine;
pub mod phase;
pub mod settings;
pub mod time;
pub mod trace;
