// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The four independent phase machines tracked by the engine.
//!
//! Each group is a closed enum, so every transition in
//! [`machine`](crate::machine) is an exhaustive match over a single value.

/// Lifecycle of the presentation target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SurfaceState {
    /// No usable surface. Draws are aborted until a new one is created.
    #[default]
    Lost,
    /// The surface owner is building a new surface.
    Creating,
    /// A surface exists but has never received content.
    WaitingForFirstCommit,
    /// The first commit went into a pending tree that has not activated yet.
    WaitingForFirstActivation,
    /// The surface is presenting normally.
    Active,
}

impl SurfaceState {
    /// Whether a surface exists and is past creation.
    #[inline]
    #[must_use]
    pub const fn is_initialized(self) -> bool {
        !matches!(self, Self::Lost | Self::Creating)
    }

    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lost => "lost",
            Self::Creating => "creating",
            Self::WaitingForFirstCommit => "waiting-for-first-commit",
            Self::WaitingForFirstActivation => "waiting-for-first-activation",
            Self::Active => "active",
        }
    }
}

/// Position within one production/presentation tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// Between ticks.
    #[default]
    Idle,
    /// The tick has started; the deadline has not been scheduled yet.
    FrameStarting,
    /// The deadline is scheduled and has not fired.
    InsideFrame,
    /// The deadline fired. Presentation happens here.
    InsideDeadline,
}

impl FramePhase {
    /// The phase that legally follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::FrameStarting,
            Self::FrameStarting => Self::InsideFrame,
            Self::InsideFrame => Self::InsideDeadline,
            Self::InsideDeadline => Self::Idle,
        }
    }

    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FrameStarting => "starting",
            Self::InsideFrame => "inside-frame",
            Self::InsideDeadline => "inside-deadline",
        }
    }
}

/// Progress of one content-production cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CommitPhase {
    /// No production in flight.
    #[default]
    Idle,
    /// A production request was sent and not yet picked up.
    MainFrameSent,
    /// The production side has started working on the request.
    MainFrameStarted,
    /// Production finished; the commit can happen.
    ReadyToCommit,
    /// Committed into a pending tree that has not activated.
    WaitingForActivation,
    /// Committed content has not been drawn yet.
    WaitingForFirstDraw,
}

impl CommitPhase {
    /// Whether a production request is outstanding and not yet committed.
    #[inline]
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::MainFrameSent | Self::MainFrameStarted | Self::ReadyToCommit)
    }

    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::MainFrameSent => "main-frame-sent",
            Self::MainFrameStarted => "main-frame-started",
            Self::ReadyToCommit => "ready-to-commit",
            Self::WaitingForActivation => "waiting-for-activation",
            Self::WaitingForFirstDraw => "waiting-for-first-draw",
        }
    }
}

/// Recovery path used when presentation keeps failing and must be forced.
///
/// Once entered, the phase only moves forward through commit, activation and
/// draw, or drops back to [`Idle`](Self::Idle) after a successful draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ForcedRedrawPhase {
    /// No recovery in progress.
    #[default]
    Idle,
    /// Waiting for fresh content to be committed.
    WaitingForCommit,
    /// The fresh commit is in a pending tree awaiting activation.
    WaitingForActivation,
    /// The fresh content is active; the next draw is forced.
    WaitingForDraw,
}

impl ForcedRedrawPhase {
    /// Position in the recovery sequence, used to check forward progress.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::WaitingForCommit => 1,
            Self::WaitingForActivation => 2,
            Self::WaitingForDraw => 3,
        }
    }

    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForCommit => "waiting-for-commit",
            Self::WaitingForActivation => "waiting-for-activation",
            Self::WaitingForDraw => "waiting-for-draw",
        }
    }
}
