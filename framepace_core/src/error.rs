// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract violations reported by the engine.
//!
//! Every error here means the driver and the engine disagree about the state
//! of the pipeline. The call that returned the error left the engine
//! untouched, so the caller may log and continue, but further decisions are
//! only as good as the driver's bookkeeping.

use core::fmt;

use crate::action::Action;
use crate::phase::{CommitPhase, FramePhase, SurfaceState};

/// A call that broke the engine's calling contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractViolation {
    /// A frame-phase mutator was called out of order.
    FramePhaseMismatch {
        /// The mutator that was called.
        operation: &'static str,
        /// The phase the mutator requires.
        expected: FramePhase,
        /// The phase the engine was in.
        actual: FramePhase,
    },
    /// A production callback arrived in the wrong commit phase.
    CommitPhaseMismatch {
        /// The mutator that was called.
        operation: &'static str,
        /// The phase the mutator requires.
        expected: CommitPhase,
        /// The phase the engine was in.
        actual: CommitPhase,
    },
    /// A surface callback arrived in the wrong surface state.
    SurfaceStateMismatch {
        /// The mutator that was called.
        operation: &'static str,
        /// The state the mutator requires.
        expected: SurfaceState,
        /// The state the engine was in.
        actual: SurfaceState,
    },
    /// `apply` was called with something other than the current
    /// `next_action()`.
    ActionMismatch {
        /// The action passed to `apply`.
        requested: Action,
        /// The action the engine had chosen.
        expected: Action,
    },
    /// `did_swap` with the swap queue already at its limit.
    SwapQueueFull {
        /// The configured maximum number of pending swaps.
        max: u32,
    },
    /// `did_swap_complete` with no swap outstanding.
    SwapQueueEmpty,
    /// `set_max_pending_swaps` with zero, or with fewer slots than swaps
    /// already outstanding.
    InvalidMaxPendingSwaps {
        /// The requested limit.
        requested: u32,
        /// Swaps outstanding at the time of the call.
        pending: u32,
    },
    /// An executor kept re-latching work so a single pass never reached
    /// [`Action::None`].
    RunawayActionLoop {
        /// Actions performed before the pass was cut off.
        limit: u32,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FramePhaseMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "{operation}: frame phase is {}, expected {}",
                actual.as_str(),
                expected.as_str()
            ),
            Self::CommitPhaseMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "{operation}: commit phase is {}, expected {}",
                actual.as_str(),
                expected.as_str()
            ),
            Self::SurfaceStateMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "{operation}: surface is {}, expected {}",
                actual.as_str(),
                expected.as_str()
            ),
            Self::ActionMismatch {
                requested,
                expected,
            } => write!(
                f,
                "apply({}) does not match next action {}",
                requested.as_str(),
                expected.as_str()
            ),
            Self::SwapQueueFull { max } => {
                write!(f, "did_swap with {max} swaps already pending")
            }
            Self::SwapQueueEmpty => write!(f, "did_swap_complete with no pending swap"),
            Self::InvalidMaxPendingSwaps { requested, pending } => write!(
                f,
                "max pending swaps {requested} is invalid with {pending} pending"
            ),
            Self::RunawayActionLoop { limit } => {
                write!(f, "no idle point after {limit} actions in one pass")
            }
        }
    }
}

impl core::error::Error for ContractViolation {}
