// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording, and Chrome trace export for framepace
//! diagnostics.
//!
//! This crate provides [`TraceSink`](framepace_core::trace::TraceSink)
//! implementations and renderers for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: Chrome Trace Event Format JSON from recorded bytes.
//! - [`json`]: `serde_json` values for state snapshots and tick summaries.

pub mod chrome;
pub mod json;
pub mod pretty;
pub mod recorder;
