// Copyright 2026 the Framepace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records, each led by a one-byte tag. [`decode`]
//! reads them back as an iterator of [`RecordedEvent`].
//!
//! Violations are stored as their rendered message. State snapshots are
//! reduced to a [`SnapshotDigest`].

use framepace_core::action::{Action, DrawMode};
use framepace_core::machine::StateSnapshot;
use framepace_core::phase::{CommitPhase, ForcedRedrawPhase, FramePhase, SurfaceState};
use framepace_core::time::{Duration, FrameArgs, HostTime};
use framepace_core::trace::{
    ActionEvent, FramePhaseEvent, FrameStartEvent, TickSummary, TraceSink, ViolationEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_START: u8 = 1;
const TAG_FRAME_PHASE: u8 = 2;
const TAG_ACTION: u8 = 3;
const TAG_VIOLATION: u8 = 4;
const TAG_TICK_SUMMARY: u8 = 5;
const TAG_SNAPSHOT: u8 = 6;

// ---------------------------------------------------------------------------
// Enum codes
// ---------------------------------------------------------------------------

fn surface_code(s: SurfaceState) -> u8 {
    match s {
        SurfaceState::Lost => 0,
        SurfaceState::Creating => 1,
        SurfaceState::WaitingForFirstCommit => 2,
        SurfaceState::WaitingForFirstActivation => 3,
        SurfaceState::Active => 4,
    }
}

fn surface_from_code(c: u8) -> Option<SurfaceState> {
    Some(match c {
        0 => SurfaceState::Lost,
        1 => SurfaceState::Creating,
        2 => SurfaceState::WaitingForFirstCommit,
        3 => SurfaceState::WaitingForFirstActivation,
        4 => SurfaceState::Active,
        _ => return None,
    })
}

fn frame_code(f: FramePhase) -> u8 {
    match f {
        FramePhase::Idle => 0,
        FramePhase::FrameStarting => 1,
        FramePhase::InsideFrame => 2,
        FramePhase::InsideDeadline => 3,
    }
}

fn frame_from_code(c: u8) -> Option<FramePhase> {
    Some(match c {
        0 => FramePhase::Idle,
        1 => FramePhase::FrameStarting,
        2 => FramePhase::InsideFrame,
        3 => FramePhase::InsideDeadline,
        _ => return None,
    })
}

fn commit_code(c: CommitPhase) -> u8 {
    match c {
        CommitPhase::Idle => 0,
        CommitPhase::MainFrameSent => 1,
        CommitPhase::MainFrameStarted => 2,
        CommitPhase::ReadyToCommit => 3,
        CommitPhase::WaitingForActivation => 4,
        CommitPhase::WaitingForFirstDraw => 5,
    }
}

fn commit_from_code(c: u8) -> Option<CommitPhase> {
    Some(match c {
        0 => CommitPhase::Idle,
        1 => CommitPhase::MainFrameSent,
        2 => CommitPhase::MainFrameStarted,
        3 => CommitPhase::ReadyToCommit,
        4 => CommitPhase::WaitingForActivation,
        5 => CommitPhase::WaitingForFirstDraw,
        _ => return None,
    })
}

fn forced_from_code(c: u8) -> Option<ForcedRedrawPhase> {
    Some(match c {
        0 => ForcedRedrawPhase::Idle,
        1 => ForcedRedrawPhase::WaitingForCommit,
        2 => ForcedRedrawPhase::WaitingForActivation,
        3 => ForcedRedrawPhase::WaitingForDraw,
        _ => return None,
    })
}

fn action_code(a: Action) -> u8 {
    match a {
        Action::None => 0,
        Action::UpdateVisibleTiles => 1,
        Action::ActivatePendingTree => 2,
        Action::Commit => 3,
        Action::Animate => 4,
        Action::Draw(DrawMode::IfPossible) => 5,
        Action::Draw(DrawMode::Forced) => 6,
        Action::Draw(DrawMode::Abort) => 7,
        Action::ManageTiles => 8,
        Action::SendMainFrame => 9,
        Action::BeginSurfaceCreation => 10,
    }
}

fn action_from_code(c: u8) -> Option<Action> {
    Some(match c {
        0 => Action::None,
        1 => Action::UpdateVisibleTiles,
        2 => Action::ActivatePendingTree,
        3 => Action::Commit,
        4 => Action::Animate,
        5 => Action::Draw(DrawMode::IfPossible),
        6 => Action::Draw(DrawMode::Forced),
        7 => Action::Draw(DrawMode::Abort),
        8 => Action::ManageTiles,
        9 => Action::SendMainFrame,
        10 => Action::BeginSurfaceCreation,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// SnapshotDigest
// ---------------------------------------------------------------------------

/// The parts of a [`StateSnapshot`] kept in a recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotDigest {
    /// Surface lifecycle.
    pub surface: SurfaceState,
    /// Position within the tick.
    pub frame: FramePhase,
    /// Production progress.
    pub commit: CommitPhase,
    /// Forced-redraw recovery progress.
    pub forced_redraw: ForcedRedrawPhase,
    /// Swaps issued but not acknowledged.
    pub pending_swaps: u32,
    /// A pending tree exists.
    pub has_pending_tree: bool,
    /// The active tree has never been drawn.
    pub active_tree_needs_first_draw: bool,
    /// New content was requested.
    pub needs_commit: bool,
    /// A redraw was requested.
    pub needs_redraw: bool,
}

impl SnapshotDigest {
    const PENDING_TREE: u8 = 1 << 0;
    const UNDRAWN: u8 = 1 << 1;
    const NEEDS_COMMIT: u8 = 1 << 2;
    const NEEDS_REDRAW: u8 = 1 << 3;

    /// Extracts the recorded fields from a full snapshot.
    #[must_use]
    pub fn from_snapshot(s: &StateSnapshot) -> Self {
        Self {
            surface: s.surface,
            frame: s.frame,
            commit: s.commit,
            forced_redraw: s.forced_redraw,
            pending_swaps: s.pending_swaps,
            has_pending_tree: s.has_pending_tree,
            active_tree_needs_first_draw: s.active_tree_needs_first_draw,
            needs_commit: s.needs_commit,
            needs_redraw: s.needs_redraw,
        }
    }

    fn flags(&self) -> u8 {
        let mut f = 0;
        if self.has_pending_tree {
            f |= Self::PENDING_TREE;
        }
        if self.active_tree_needs_first_draw {
            f |= Self::UNDRAWN;
        }
        if self.needs_commit {
            f |= Self::NEEDS_COMMIT;
        }
        if self.needs_redraw {
            f |= Self::NEEDS_REDRAW;
        }
        f
    }
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "message length capped at u32::MAX for recording"
        )]
        let len = s.len().min(u32::MAX as usize) as u32;
        self.write_u32(len);
        self.buf.extend_from_slice(&s.as_bytes()[..len as usize]);
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_start(&mut self, e: &FrameStartEvent) {
        self.write_u8(TAG_FRAME_START);
        self.write_u64(e.tick);
        self.write_u64(e.args.frame_time.ticks());
        self.write_u64(e.args.deadline.ticks());
        self.write_u64(e.args.interval.ticks());
    }

    fn on_frame_phase(&mut self, e: &FramePhaseEvent) {
        self.write_u8(TAG_FRAME_PHASE);
        self.write_u64(e.tick);
        self.write_u8(frame_code(e.from));
        self.write_u8(frame_code(e.to));
    }

    fn on_action(&mut self, e: &ActionEvent) {
        self.write_u8(TAG_ACTION);
        self.write_u64(e.tick);
        self.write_u32(e.sequence);
        self.write_u8(action_code(e.action));
    }

    fn on_violation(&mut self, e: &ViolationEvent) {
        self.write_u8(TAG_VIOLATION);
        self.write_u64(e.tick);
        self.write_str(&e.violation.to_string());
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.tick);
        self.write_u64(s.frame_time.ticks());
        self.write_u64(s.deadline.ticks());
        self.write_u32(s.actions);
        self.write_u32(s.draws);
        self.write_u32(s.forced_draws);
        self.write_u32(s.aborted_draws);
        self.write_u32(s.commits);
        self.write_u32(s.activations);
        self.write_u32(s.main_frames_sent);
        self.write_u32(s.surface_creations);
        self.write_u8(surface_code(s.surface));
        self.write_u8(commit_code(s.commit));
        self.write_u8(s.forced_redraw.ordinal());
        self.write_u32(s.pending_swaps);
        self.write_u8(u8::from(s.redraw_deferred));
    }

    fn on_state_snapshot(&mut self, tick: u64, snapshot: &StateSnapshot) {
        let d = SnapshotDigest::from_snapshot(snapshot);
        self.write_u8(TAG_SNAPSHOT);
        self.write_u64(tick);
        self.write_u8(surface_code(d.surface));
        self.write_u8(frame_code(d.frame));
        self.write_u8(commit_code(d.commit));
        self.write_u8(d.forced_redraw.ordinal());
        self.write_u32(d.pending_swaps);
        self.write_u8(d.flags());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameStartEvent`].
    FrameStart(FrameStartEvent),
    /// A [`FramePhaseEvent`].
    FramePhase(FramePhaseEvent),
    /// An [`ActionEvent`].
    Action(ActionEvent),
    /// A contract violation, as rendered when it was recorded.
    Violation {
        /// Tick it happened in.
        tick: u64,
        /// The violation's `Display` output.
        message: String,
    },
    /// A [`TickSummary`].
    TickSummary(TickSummary),
    /// A reduced state snapshot.
    Snapshot {
        /// Tick it was taken in.
        tick: u64,
        /// The recorded fields.
        digest: SnapshotDigest,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_string(&mut self) -> Option<String> {
        let len = self.read_u32()? as usize;
        Some(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    fn decode_frame_start(&mut self) -> Option<RecordedEvent> {
        let tick = self.read_u64()?;
        let frame_time = HostTime(self.read_u64()?);
        let deadline = HostTime(self.read_u64()?);
        let interval = Duration(self.read_u64()?);
        Some(RecordedEvent::FrameStart(FrameStartEvent {
            tick,
            args: FrameArgs {
                frame_time,
                deadline,
                interval,
            },
        }))
    }

    fn decode_frame_phase(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FramePhase(FramePhaseEvent {
            tick: self.read_u64()?,
            from: frame_from_code(self.read_u8()?)?,
            to: frame_from_code(self.read_u8()?)?,
        }))
    }

    fn decode_action(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Action(ActionEvent {
            tick: self.read_u64()?,
            sequence: self.read_u32()?,
            action: action_from_code(self.read_u8()?)?,
        }))
    }

    fn decode_violation(&mut self) -> Option<RecordedEvent> {
        let tick = self.read_u64()?;
        let message = self.read_string()?;
        Some(RecordedEvent::Violation { tick, message })
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            tick: self.read_u64()?,
            frame_time: HostTime(self.read_u64()?),
            deadline: HostTime(self.read_u64()?),
            actions: self.read_u32()?,
            draws: self.read_u32()?,
            forced_draws: self.read_u32()?,
            aborted_draws: self.read_u32()?,
            commits: self.read_u32()?,
            activations: self.read_u32()?,
            main_frames_sent: self.read_u32()?,
            surface_creations: self.read_u32()?,
            surface: surface_from_code(self.read_u8()?)?,
            commit: commit_from_code(self.read_u8()?)?,
            forced_redraw: forced_from_code(self.read_u8()?)?,
            pending_swaps: self.read_u32()?,
            redraw_deferred: self.read_u8()? != 0,
        }))
    }

    fn decode_snapshot(&mut self) -> Option<RecordedEvent> {
        let tick = self.read_u64()?;
        let surface = surface_from_code(self.read_u8()?)?;
        let frame = frame_from_code(self.read_u8()?)?;
        let commit = commit_from_code(self.read_u8()?)?;
        let forced_redraw = forced_from_code(self.read_u8()?)?;
        let pending_swaps = self.read_u32()?;
        let flags = self.read_u8()?;
        Some(RecordedEvent::Snapshot {
            tick,
            digest: SnapshotDigest {
                surface,
                frame,
                commit,
                forced_redraw,
                pending_swaps,
                has_pending_tree: flags & SnapshotDigest::PENDING_TREE != 0,
                active_tree_needs_first_draw: flags & SnapshotDigest::UNDRAWN != 0,
                needs_commit: flags & SnapshotDigest::NEEDS_COMMIT != 0,
                needs_redraw: flags & SnapshotDigest::NEEDS_REDRAW != 0,
            },
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_FRAME_START => self.decode_frame_start(),
            TAG_FRAME_PHASE => self.decode_frame_phase(),
            TAG_ACTION => self.decode_action(),
            TAG_VIOLATION => self.decode_violation(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            TAG_SNAPSHOT => self.decode_snapshot(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framepace_core::driver::{ActionExecutor, FrameLoop};
    use framepace_core::error::ContractViolation;
    use framepace_core::machine::PipelineStateMachine;
    use framepace_core::settings::EngineSettings;
    use framepace_core::trace::Tracer;

    /// Completes every callback as soon as its action is performed.
    struct Eager;

    impl ActionExecutor for Eager {
        fn perform(
            &mut self,
            action: Action,
            m: &mut PipelineStateMachine,
        ) -> Result<(), ContractViolation> {
            match action {
                Action::BeginSurfaceCreation => m.did_create_surface(),
                Action::SendMainFrame => {
                    m.notify_main_frame_started()?;
                    m.notify_ready_to_commit()
                }
                Action::Draw(DrawMode::IfPossible | DrawMode::Forced) => {
                    m.did_swap()?;
                    m.did_swap_complete()
                }
                _ => Ok(()),
            }
        }
    }

    fn record_one_tick() -> Vec<u8> {
        let mut machine = PipelineStateMachine::new(EngineSettings::default());
        machine.set_can_start(true);
        machine.set_visible(true);
        machine.set_can_draw(true);
        machine.set_needs_commit();
        let mut lp = FrameLoop::from_machine(machine);
        let mut rec = RecorderSink::new();
        let mut tracer = Tracer::new(&mut rec);
        let args = FrameArgs::new(HostTime(1_000), Duration(800), Duration(1_600));

        lp.run_actions(&mut Eager, &mut tracer).unwrap();
        lp.begin_frame(args, &mut tracer).unwrap();
        lp.run_actions(&mut Eager, &mut tracer).unwrap();
        lp.deadline_pending(&mut tracer).unwrap();
        lp.deadline(&mut tracer).unwrap();
        lp.run_actions(&mut Eager, &mut tracer).unwrap();
        let _ = lp.end_frame(&mut tracer).unwrap();
        rec.into_bytes()
    }

    #[test]
    fn recorded_tick_decodes_in_order() {
        let bytes = record_one_tick();
        let events: Vec<_> = decode(&bytes).collect();

        let actions: Vec<Action> = events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Action(a) => Some(a.action),
                _ => None,
            })
            .collect();
        assert_eq!(
            actions,
            [
                Action::BeginSurfaceCreation,
                Action::SendMainFrame,
                Action::Commit,
                Action::Animate,
                Action::Draw(DrawMode::IfPossible),
            ]
        );

        let first_start = events
            .iter()
            .position(|e| matches!(e, RecordedEvent::FrameStart(_)))
            .unwrap();
        match &events[first_start] {
            RecordedEvent::FrameStart(e) => {
                assert_eq!(e.tick, 1);
                assert_eq!(e.args.deadline, HostTime(1_800));
            }
            other => panic!("expected FrameStart, got {other:?}"),
        }

        match events.last() {
            Some(RecordedEvent::TickSummary(s)) => {
                assert_eq!(s.tick, 1);
                assert_eq!(s.draws, 1);
                assert_eq!(s.surface, SurfaceState::Active);
                assert!(!s.redraw_deferred, "drawn");
            }
            other => panic!("expected TickSummary last, got {other:?}"),
        }

        let snapshots = events
            .iter()
            .filter(|e| matches!(e, RecordedEvent::Snapshot { .. }))
            .count();
        assert_eq!(snapshots, actions.len(), "one snapshot per action");
    }

    #[test]
    fn violation_keeps_its_message() {
        let mut rec = RecorderSink::new();
        rec.on_violation(&ViolationEvent {
            tick: 4,
            violation: ContractViolation::SwapQueueFull { max: 2 },
        });
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match &events[..] {
            [RecordedEvent::Violation { tick, message }] => {
                assert_eq!(*tick, 4);
                assert_eq!(message, "did_swap with 2 swaps already pending");
            }
            other => panic!("expected one Violation, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_digest_keeps_flags() {
        let mut m = PipelineStateMachine::new(EngineSettings::default());
        m.set_needs_commit();
        let mut rec = RecorderSink::new();
        rec.on_state_snapshot(9, &m.snapshot());
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match &events[..] {
            [RecordedEvent::Snapshot { tick, digest }] => {
                assert_eq!(*tick, 9);
                assert_eq!(*digest, SnapshotDigest::from_snapshot(&m.snapshot()));
                assert!(digest.needs_commit, "flag survives");
            }
            other => panic!("expected one Snapshot, got {other:?}"),
        }
    }

    #[test]
    fn truncated_or_unknown_input_stops() {
        assert_eq!(decode(&[]).count(), 0);
        let bytes = record_one_tick();
        let full = decode(&bytes).count();
        assert!(
            decode(&bytes[..bytes.len() - 1]).count() < full,
            "truncated"
        );
        assert_eq!(decode(&[0xff, 0, 0]).count(), 0, "unknown tag");
    }
}
