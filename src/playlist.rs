use serde::Serialize;

use crate::timer::{StepOutcome, Timer, TimerId, TimerStatus};

/// Something observable that a playlist command or tick caused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaylistEvent {
    TimerStarted { index: usize, id: TimerId },
    TimerPaused { index: usize, id: TimerId },
    TimerResumed { index: usize, id: TimerId },
    PhaseChanged {
        index: usize,
        id: TimerId,
        round: u32,
        is_working: bool,
    },
    TimerCompleted { index: usize, id: TimerId },
    PlaylistFinished,
    PlaylistReset,
}

/// Read model handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnapshot {
    pub timers: Vec<Timer>,
    pub current_timer_index: Option<usize>,
}

impl PlaylistSnapshot {
    pub fn active_timer(&self) -> Option<&Timer> {
        self.current_timer_index.and_then(|i| self.timers.get(i))
    }
}

/// What a single tick did to the active timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub index: usize,
    pub outcome: StepOutcome,
    pub events: Vec<PlaylistEvent>,
}

/// Ordered timers plus the index of the active one.
///
/// Sole owner of timer state: every status or duration change goes through
/// one of the commands below or through [`Playlist::tick`].
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    timers: Vec<Timer>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn active_timer(&self) -> Option<&Timer> {
        self.current.and_then(|i| self.timers.get(i))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Index of the active timer if, and only if, it is running
    pub fn running_index(&self) -> Option<usize> {
        self.current
            .filter(|&i| self.timers[i].status() == TimerStatus::Running)
    }

    pub fn is_running(&self) -> bool {
        self.running_index().is_some()
    }

    pub fn snapshot(&self) -> PlaylistSnapshot {
        PlaylistSnapshot {
            timers: self.timers.clone(),
            current_timer_index: self.current,
        }
    }

    /// Append a timer. Other timers and the active index are untouched.
    pub fn add_timer(&mut self, timer: Timer) -> Vec<PlaylistEvent> {
        log::debug!(
            "Adding {} timer '{}' at index {}",
            timer.label(),
            timer.id(),
            self.timers.len()
        );
        self.timers.push(timer);
        Vec::new()
    }

    /// Start the playlist, or flip the active timer between running and paused
    pub fn toggle_start_pause(&mut self) -> Vec<PlaylistEvent> {
        let Some(index) = self.current else {
            return match self.timers.first().map(Timer::status) {
                Some(status) if status != TimerStatus::Completed => self.activate(0),
                Some(_) => {
                    log::debug!("Playlist already ran to completion; reset before starting again");
                    Vec::new()
                }
                None => Vec::new(),
            };
        };

        let timer = &mut self.timers[index];
        let id = timer.id();
        match timer.status() {
            TimerStatus::Running => {
                timer.set_status(TimerStatus::Paused);
                log::debug!("Paused timer {} ('{}')", index, id);
                vec![PlaylistEvent::TimerPaused { index, id }]
            }
            TimerStatus::Paused | TimerStatus::NotRunning => {
                timer.set_status(TimerStatus::Running);
                log::debug!("Resumed timer {} ('{}')", index, id);
                vec![PlaylistEvent::TimerResumed { index, id }]
            }
            TimerStatus::Completed => Vec::new(),
        }
    }

    /// Complete the active timer and hand control to the next one.
    ///
    /// The only path from one timer to the next; tick-driven completion
    /// comes through here too.
    pub fn fast_forward(&mut self) -> Vec<PlaylistEvent> {
        let Some(index) = self.current else {
            return Vec::new();
        };

        let timer = &mut self.timers[index];
        timer.set_status(TimerStatus::Completed);
        let mut events = vec![PlaylistEvent::TimerCompleted {
            index,
            id: timer.id(),
        }];
        log::debug!("Completed timer {} ('{}')", index, timer.id());

        let next = index + 1;
        if next < self.timers.len() {
            events.extend(self.activate(next));
        } else {
            self.current = None;
            log::debug!("Playlist finished; no timer left to run");
            events.push(PlaylistEvent::PlaylistFinished);
        }
        events
    }

    /// Every timer back to `not running` and the active index cleared.
    /// Only stopwatches get their elapsed time zeroed.
    pub fn reset_timers(&mut self) -> Vec<PlaylistEvent> {
        for timer in &mut self.timers {
            timer.reset();
        }
        self.current = None;
        log::debug!("Reset {} timer(s)", self.timers.len());
        vec![PlaylistEvent::PlaylistReset]
    }

    /// Apply one tick to the running timer. `None` when nothing is running.
    pub fn tick(&mut self) -> Option<TickReport> {
        let index = self.running_index()?;
        let timer = &mut self.timers[index];
        let id = timer.id();
        let outcome = timer.step();
        log::trace!("Tick on timer {}: duration {}", index, timer.duration());

        let events = match outcome {
            StepOutcome::Advanced => Vec::new(),
            StepOutcome::PhaseChanged { round, is_working } => {
                log::debug!(
                    "Timer {} entered round {} {}",
                    index,
                    round,
                    if is_working { "work" } else { "rest" }
                );
                vec![PlaylistEvent::PhaseChanged {
                    index,
                    id,
                    round,
                    is_working,
                }]
            }
            StepOutcome::Exhausted => self.fast_forward(),
        };

        Some(TickReport {
            index,
            outcome,
            events,
        })
    }

    fn activate(&mut self, index: usize) -> Vec<PlaylistEvent> {
        self.current = Some(index);
        let timer = &mut self.timers[index];
        timer.set_status(TimerStatus::Running);
        log::debug!("Started {} timer {} ('{}')", timer.label(), index, timer.id());
        vec![PlaylistEvent::TimerStarted {
            index,
            id: timer.id(),
        }]
    }
}
