// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Actions chosen by the engine and outcomes reported back by executors.

/// How a [`Action::Draw`] should be carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Draw and swap; the presenter may still abort on checkerboarding.
    IfPossible,
    /// Draw and swap regardless of missing content.
    Forced,
    /// Do not draw. Completes the bookkeeping of a draw that can never happen.
    Abort,
}

/// The single next step the driver should perform.
///
/// Variants are listed in decision priority order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Action {
    /// Poll rasterization for newly ready visible tiles.
    UpdateVisibleTiles,
    /// Promote the pending tree to the active tree.
    ActivatePendingTree,
    /// Commit finished production work.
    Commit,
    /// Tick animations on the presentation side.
    Animate,
    /// Draw the active tree.
    Draw(DrawMode),
    /// Reprioritize tile work.
    ManageTiles,
    /// Ask the production side for a new frame of content.
    SendMainFrame,
    /// Ask the surface owner to build a new presentation surface.
    BeginSurfaceCreation,
    /// Nothing to do until the next event.
    #[default]
    None,
}

impl Action {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdateVisibleTiles => "update-visible-tiles",
            Self::ActivatePendingTree => "activate",
            Self::Commit => "commit",
            Self::Animate => "animate",
            Self::Draw(DrawMode::IfPossible) => "draw",
            Self::Draw(DrawMode::Forced) => "draw-forced",
            Self::Draw(DrawMode::Abort) => "draw-abort",
            Self::ManageTiles => "manage-tiles",
            Self::SendMainFrame => "send-main-frame",
            Self::BeginSurfaceCreation => "begin-surface-creation",
            Self::None => "none",
        }
    }

    /// Whether this is [`Action::None`].
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether this draw will request a swap.
    #[inline]
    #[must_use]
    pub const fn requests_swap(self) -> bool {
        matches!(self, Self::Draw(DrawMode::IfPossible | DrawMode::Forced))
    }
}

/// Outcome of a draw reported via `did_draw`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawResult {
    /// The frame was drawn and swapped.
    Success,
    /// The draw was dropped because animated content would have checkerboarded.
    AbortedCheckerboard,
    /// The draw was dropped because high-resolution content was missing.
    AbortedMissingContent,
}
