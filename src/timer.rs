use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::TimerError;

/// Length of one tick, in milliseconds.
pub const TICK_MS: u64 = 10;

/// Longest session a stopwatch may record before it completes on its own (2m30s).
pub const STOPWATCH_MAX_MS: u64 = 150_000;

/// Returns true when a phase with `remaining` milliseconds left ends on the next tick.
///
/// Evaluated before the tick is applied, so the tick that satisfies it drains
/// the phase to exactly zero.
pub fn is_phase_exhausted(remaining: u64) -> bool {
    remaining <= TICK_MS
}

/// Opaque timer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TimerId(Uuid);

impl TimerId {
    fn new() -> Self {
        TimerId(Uuid::new_v4())
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerStatus {
    #[serde(rename = "not running")]
    NotRunning,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "completed")]
    Completed,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::NotRunning => "not running",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round and phase bookkeeping shared by the XY and tabata variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervals {
    rounds: u32,
    current_round: u32,
    work_time: u64,
    rest_time: u64,
    is_working: bool,
}

impl Intervals {
    fn new(rounds: u32, work_time: u64, rest_time: u64) -> Result<Self, TimerError> {
        if rounds == 0 {
            return Err(TimerError::InvalidTimer(
                "interval timer needs at least one round".to_string(),
            ));
        }
        if work_time == 0 {
            return Err(TimerError::InvalidTimer(
                "interval timer needs a non-zero work time".to_string(),
            ));
        }
        work_time
            .checked_add(rest_time)
            .and_then(|cycle| cycle.checked_mul(u64::from(rounds)))
            .ok_or_else(|| {
                TimerError::InvalidTimer("interval timer total length overflows".to_string())
            })?;
        Ok(Intervals {
            rounds,
            current_round: 1,
            work_time,
            rest_time,
            is_working: true,
        })
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// 1-indexed
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn work_time(&self) -> u64 {
        self.work_time
    }

    pub fn rest_time(&self) -> u64 {
        self.rest_time
    }

    pub fn is_working(&self) -> bool {
        self.is_working
    }

    /// Ceiling of the current phase
    pub fn phase_length(&self) -> u64 {
        if self.is_working {
            self.work_time
        } else {
            self.rest_time
        }
    }

    /// The phase that follows the current one, as `(round, is_working)`.
    ///
    /// Returns `None` once the final phase of the final round has run out.
    /// A zero rest time skips the rest phase entirely.
    pub fn next_phase(&self) -> Option<(u32, bool)> {
        if self.is_working && self.rest_time > 0 {
            Some((self.current_round, false))
        } else if self.current_round < self.rounds {
            Some((self.current_round + 1, true))
        } else {
            None
        }
    }

    fn enter(&mut self, round: u32, is_working: bool) -> u64 {
        self.current_round = round;
        self.is_working = is_working;
        self.phase_length()
    }

    /// Time left across every phase still to come, given `remaining` in the current one.
    fn remaining_total(&self, remaining: u64) -> u64 {
        let later_rounds = u64::from(self.rounds - self.current_round);
        let rest_this_round = if self.is_working { self.rest_time } else { 0 };
        let cycle = self.work_time.saturating_add(self.rest_time);
        remaining
            .saturating_add(rest_this_round)
            .saturating_add(later_rounds.saturating_mul(cycle))
    }

    fn total_time(&self) -> u64 {
        u64::from(self.rounds).saturating_mul(self.work_time.saturating_add(self.rest_time))
    }
}

fn secs_to_ms(work_secs: u64, rest_secs: u64) -> Result<(u64, u64), TimerError> {
    match (work_secs.checked_mul(1000), rest_secs.checked_mul(1000)) {
        (Some(work_time), Some(rest_time)) => Ok((work_time, rest_time)),
        _ => Err(TimerError::InvalidTimer(
            "interval length overflows milliseconds".to_string(),
        )),
    }
}

/// Variant-specific part of a timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TimerKind {
    #[serde(rename = "stopwatch")]
    Stopwatch,
    #[serde(rename = "countdown", rename_all = "camelCase")]
    Countdown { initial_duration: u64 },
    #[serde(rename = "XY")]
    Xy(Intervals),
    #[serde(rename = "tabata")]
    Tabata(Intervals),
}

impl TimerKind {
    pub fn label(&self) -> &'static str {
        match self {
            TimerKind::Stopwatch => "STOPWATCH",
            TimerKind::Countdown { .. } => "COUNTDOWN",
            TimerKind::Xy(_) => "XY",
            TimerKind::Tabata(_) => "TABATA",
        }
    }

    pub fn intervals(&self) -> Option<&Intervals> {
        match self {
            TimerKind::Xy(intervals) | TimerKind::Tabata(intervals) => Some(intervals),
            _ => None,
        }
    }

    fn intervals_mut(&mut self) -> Option<&mut Intervals> {
        match self {
            TimerKind::Xy(intervals) | TimerKind::Tabata(intervals) => Some(intervals),
            _ => None,
        }
    }
}

/// Result of applying one tick to a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still inside the same phase
    Advanced,
    /// An interval timer moved into a new phase
    PhaseChanged { round: u32, is_working: bool },
    /// Nothing left to run; the playlist should fast-forward
    Exhausted,
}

/// A single timer in the playlist.
///
/// `duration` is elapsed time for a stopwatch and remaining time (in the
/// current phase, for interval timers) for everything else. All times are
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timer {
    id: TimerId,
    status: TimerStatus,
    duration: u64,
    #[serde(flatten)]
    kind: TimerKind,
}

impl Timer {
    fn with_kind(duration: u64, kind: TimerKind) -> Self {
        Timer {
            id: TimerId::new(),
            status: TimerStatus::NotRunning,
            duration,
            kind,
        }
    }

    pub fn stopwatch() -> Self {
        Self::with_kind(0, TimerKind::Stopwatch)
    }

    /// Countdown from `seconds`. Lengths past `u64::MAX` milliseconds saturate.
    pub fn countdown(seconds: u64) -> Self {
        Self::countdown_ms(seconds.saturating_mul(1000))
    }

    pub fn countdown_ms(duration: u64) -> Self {
        Self::with_kind(
            duration,
            TimerKind::Countdown {
                initial_duration: duration,
            },
        )
    }

    /// XY timer: `rounds` cycles of work followed by rest, times in seconds
    pub fn xy(rounds: u32, work_secs: u64, rest_secs: u64) -> Result<Self, TimerError> {
        let (work_time, rest_time) = secs_to_ms(work_secs, rest_secs)?;
        Self::xy_ms(rounds, work_time, rest_time)
    }

    pub fn xy_ms(rounds: u32, work_time: u64, rest_time: u64) -> Result<Self, TimerError> {
        let intervals = Intervals::new(rounds, work_time, rest_time)?;
        Ok(Self::with_kind(work_time, TimerKind::Xy(intervals)))
    }

    /// Tabata timer, scheduled exactly like XY
    pub fn tabata(rounds: u32, work_secs: u64, rest_secs: u64) -> Result<Self, TimerError> {
        let (work_time, rest_time) = secs_to_ms(work_secs, rest_secs)?;
        Self::tabata_ms(rounds, work_time, rest_time)
    }

    pub fn tabata_ms(rounds: u32, work_time: u64, rest_time: u64) -> Result<Self, TimerError> {
        let intervals = Intervals::new(rounds, work_time, rest_time)?;
        Ok(Self::with_kind(work_time, TimerKind::Tabata(intervals)))
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn kind(&self) -> &TimerKind {
        &self.kind
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn is_stopwatch(&self) -> bool {
        matches!(self.kind, TimerKind::Stopwatch)
    }

    pub(crate) fn set_status(&mut self, status: TimerStatus) {
        self.status = status;
    }

    /// Length of the phase `duration` is measured against
    pub fn phase_length(&self) -> u64 {
        match &self.kind {
            TimerKind::Stopwatch => STOPWATCH_MAX_MS,
            TimerKind::Countdown { initial_duration } => *initial_duration,
            TimerKind::Xy(intervals) | TimerKind::Tabata(intervals) => intervals.phase_length(),
        }
    }

    /// Fraction of the current phase still to run; for a stopwatch, the
    /// fraction of the session maximum already used.
    pub fn progress(&self) -> f64 {
        let length = self.phase_length();
        if length == 0 {
            return 0.0;
        }
        (self.duration as f64 / length as f64).clamp(0.0, 1.0)
    }

    /// Time left until this timer completes on its own
    pub fn remaining_total(&self) -> u64 {
        match &self.kind {
            TimerKind::Stopwatch => STOPWATCH_MAX_MS.saturating_sub(self.duration),
            TimerKind::Countdown { .. } => self.duration,
            TimerKind::Xy(intervals) | TimerKind::Tabata(intervals) => {
                intervals.remaining_total(self.duration)
            }
        }
    }

    /// Configured length of the whole timer
    pub fn total_time(&self) -> u64 {
        match &self.kind {
            TimerKind::Stopwatch => STOPWATCH_MAX_MS,
            TimerKind::Countdown { initial_duration } => *initial_duration,
            TimerKind::Xy(intervals) | TimerKind::Tabata(intervals) => intervals.total_time(),
        }
    }

    /// Apply one tick. Does not touch `status`; the playlist owns that.
    pub(crate) fn step(&mut self) -> StepOutcome {
        if self.is_stopwatch() {
            self.duration = (self.duration + TICK_MS).min(STOPWATCH_MAX_MS);
            return if self.duration >= STOPWATCH_MAX_MS {
                StepOutcome::Exhausted
            } else {
                StepOutcome::Advanced
            };
        }

        let exhausted = is_phase_exhausted(self.duration);
        self.duration = self.duration.saturating_sub(TICK_MS);
        if !exhausted {
            return StepOutcome::Advanced;
        }

        match self.kind.intervals_mut() {
            Some(intervals) => match intervals.next_phase() {
                Some((round, is_working)) => {
                    self.duration = intervals.enter(round, is_working);
                    StepOutcome::PhaseChanged { round, is_working }
                }
                None => StepOutcome::Exhausted,
            },
            None => StepOutcome::Exhausted,
        }
    }

    /// Back to `not running`. Only a stopwatch gets its duration zeroed;
    /// other variants keep their current duration and round fields.
    pub(crate) fn reset(&mut self) {
        self.status = TimerStatus::NotRunning;
        if self.is_stopwatch() {
            self.duration = 0;
        }
    }
}
