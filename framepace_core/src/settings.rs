// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-instance engine configuration.
//!
//! [`EngineSettings`] is fixed for the life of a
//! [`PipelineStateMachine`](crate::machine::PipelineStateMachine). The
//! presets cover the common pipeline shapes; individual fields can be
//! overridden with struct update syntax.

/// Configuration for a [`PipelineStateMachine`](crate::machine::PipelineStateMachine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Commits land in a pending tree that must be activated before it can be
    /// drawn.
    pub supports_pending_tree: bool,
    /// Production may start on the next frame while a pending tree is still
    /// waiting to be activated.
    pub commit_before_activation_allowed: bool,
    /// Production may start on the next frame before the last commit has
    /// been drawn.
    pub commit_before_first_draw_allowed: bool,
    /// Enter forced-redraw recovery after repeated checkerboarded draws.
    pub force_draw_after_repeated_checkerboard: bool,
    /// Consecutive checkerboarded draws before a forced redraw starts.
    ///
    /// Values below 1 behave as 1.
    pub checkerboard_limit: u32,
    /// Presentation happens synchronously inside the host's own draw
    /// callback. Disables proactive frame requests in favor of polling.
    pub uses_synchronous_presentation: bool,
}

impl EngineSettings {
    /// Single-tree pipeline where commits become drawable immediately.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            supports_pending_tree: false,
            commit_before_activation_allowed: false,
            commit_before_first_draw_allowed: true,
            force_draw_after_repeated_checkerboard: true,
            checkerboard_limit: 3,
            uses_synchronous_presentation: false,
        }
    }

    /// Pipeline that rasterizes into a pending tree and activates it once
    /// ready.
    #[must_use]
    pub const fn pending_tree() -> Self {
        Self {
            supports_pending_tree: true,
            ..Self::immediate()
        }
    }

    /// Pending-tree pipeline that lets the next production cycle overlap a
    /// pending tree awaiting activation.
    #[must_use]
    pub const fn overlapped() -> Self {
        Self {
            supports_pending_tree: true,
            commit_before_activation_allowed: true,
            ..Self::immediate()
        }
    }

    /// Host-driven presentation (e.g. an embedder that draws on demand).
    #[must_use]
    pub const fn synchronous() -> Self {
        Self {
            uses_synchronous_presentation: true,
            ..Self::immediate()
        }
    }

    /// The checkerboard limit with values below 1 clamped up.
    #[inline]
    #[must_use]
    pub const fn effective_checkerboard_limit(&self) -> u32 {
        if self.checkerboard_limit == 0 {
            1
        } else {
            self.checkerboard_limit
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::immediate()
    }
}
