use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::DriverConfig;
use crate::error::TimerError;
use crate::playlist::{Playlist, PlaylistEvent, PlaylistSnapshot};
use crate::timer::{Timer, TICK_MS};

/// Owns the playlist and drives its active timer.
///
/// Commands and ticks are handled by the same loop, so a tick always sees
/// the result of every command that arrived before it.
pub struct PlaylistDriver {
    /// Instance name for logging
    name: String,

    /// Channel for receiving playlist commands
    command_rx: mpsc::Receiver<PlaylistCommand>,

    /// Channel for sending playlist events
    event_tx: mpsc::Sender<PlaylistEvent>,

    /// Single source of truth for timer state
    playlist: Playlist,

    /// Tick schedule for the running timer, if any
    ticker: Option<Ticker>,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
}

/// Handle for controlling the playlist driver
pub struct PlaylistHandle {
    /// Channel for sending commands to the driver
    command_tx: mpsc::Sender<PlaylistCommand>,

    /// Channel for receiving playlist events
    event_rx: mpsc::Receiver<PlaylistEvent>,
}

/// Playlist command enum
#[derive(Debug)]
pub enum PlaylistCommand {
    AddTimer(Timer),
    ToggleStartPause,
    FastForward,
    ResetTimers,
    Snapshot {
        reply: oneshot::Sender<PlaylistSnapshot>,
    },
    Shutdown,
}

/// The one periodic schedule alive at a time, bound to the timer it was built for
struct Ticker {
    index: usize,
    interval: Interval,
}

impl Ticker {
    fn start(index: usize) -> Self {
        let period = Duration::from_millis(TICK_MS);
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Ticker { index, interval }
    }
}

async fn next_tick(ticker: &mut Option<Ticker>) {
    match ticker {
        Some(ticker) => {
            ticker.interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl PlaylistDriver {
    /// Create a new PlaylistDriver with bounded channels and an empty playlist
    ///
    /// Returns (PlaylistDriver, PlaylistHandle)
    pub fn new(config: DriverConfig, cancel_token: CancellationToken) -> (Self, PlaylistHandle) {
        Self::with_playlist(config, Playlist::new(), cancel_token)
    }

    /// Same as [`PlaylistDriver::new`], starting from an existing playlist
    pub fn with_playlist(
        config: DriverConfig,
        playlist: Playlist,
        cancel_token: CancellationToken,
    ) -> (Self, PlaylistHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size.max(1));
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer_size.max(1));

        let driver = PlaylistDriver {
            name: config.name,
            command_rx,
            event_tx,
            playlist,
            ticker: None,
            cancel_token,
        };

        let handle = PlaylistHandle {
            command_tx,
            event_rx,
        };

        (driver, handle)
    }

    /// Run the driver until shutdown, cancellation, or every handle is dropped
    pub async fn run(mut self) {
        log::info!("Playlist driver '{}' started", self.name);
        self.sync_ticker();

        loop {
            tokio::select! {
                // Handle incoming commands
                command = self.command_rx.recv() => {
                    match command {
                        _ if self.cancel_token.is_cancelled() => {
                            log::info!("Playlist driver '{}' cancelled", self.name);
                            break;
                        }
                        Some(command) => {
                            if self.handle_command(command) {
                                break;
                            }
                        }
                        None => {
                            log::info!("Playlist driver '{}' shutting down - all senders dropped", self.name);
                            break;
                        }
                    }
                },

                // Step the running timer
                _ = next_tick(&mut self.ticker), if self.ticker.is_some() => {
                    self.handle_tick();
                },

                // Handle cancellation token
                _ = self.cancel_token.cancelled() => {
                    log::info!("Playlist driver '{}' cancelled via token", self.name);
                    break;
                },
            }
        }

        log::info!("Playlist driver '{}' stopped", self.name);
    }

    /// Handle playlist commands. Returns true on shutdown.
    fn handle_command(&mut self, command: PlaylistCommand) -> bool {
        let events = match command {
            PlaylistCommand::AddTimer(timer) => self.playlist.add_timer(timer),
            PlaylistCommand::ToggleStartPause => self.playlist.toggle_start_pause(),
            PlaylistCommand::FastForward => self.playlist.fast_forward(),
            PlaylistCommand::ResetTimers => self.playlist.reset_timers(),
            PlaylistCommand::Snapshot { reply } => {
                if reply.send(self.playlist.snapshot()).is_err() {
                    log::debug!("Snapshot requester in '{}' went away", self.name);
                }
                Vec::new()
            }
            PlaylistCommand::Shutdown => {
                log::info!("Playlist driver '{}' shutting down", self.name);
                return true;
            }
        };
        self.sync_ticker();
        self.publish(events);
        false
    }

    fn handle_tick(&mut self) {
        if let Some(report) = self.playlist.tick() {
            self.publish(report.events);
        }
        self.sync_ticker();
    }

    /// Keep exactly one schedule alive for the running timer, none otherwise.
    /// The old schedule is dropped before a new one is built.
    fn sync_ticker(&mut self) {
        let running = self.playlist.running_index();
        if self.ticker.as_ref().map(|t| t.index) == running {
            return;
        }
        self.ticker = None;
        if let Some(index) = running {
            log::debug!("Driver '{}' ticking timer {}", self.name, index);
            self.ticker = Some(Ticker::start(index));
        }
    }

    fn publish(&self, events: Vec<PlaylistEvent>) {
        for event in events {
            // Use try_send to avoid blocking the tick loop if the event channel is full
            if let Err(e) = self.event_tx.try_send(event) {
                match e {
                    mpsc::error::TrySendError::Full(event) => {
                        log::warn!(
                            "Event channel full in '{}', dropping {:?}",
                            self.name,
                            event
                        );
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        log::warn!(
                            "Event channel closed in '{}', cannot publish events",
                            self.name
                        );
                        break;
                    }
                }
            }
        }
    }
}

impl PlaylistHandle {
    /// Append a timer to the playlist
    pub async fn add_timer(&self, timer: Timer) -> Result<(), TimerError> {
        Ok(self.command_tx.send(PlaylistCommand::AddTimer(timer)).await?)
    }

    /// Append a timer (non-blocking)
    pub fn try_add_timer(&self, timer: Timer) -> Result<(), TimerError> {
        Ok(self.command_tx.try_send(PlaylistCommand::AddTimer(timer))?)
    }

    /// Start the playlist, or pause/resume the active timer
    pub async fn toggle_start_pause(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.send(PlaylistCommand::ToggleStartPause).await?)
    }

    /// Start, pause or resume (non-blocking)
    pub fn try_toggle_start_pause(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.try_send(PlaylistCommand::ToggleStartPause)?)
    }

    /// Complete the active timer and move to the next one
    pub async fn fast_forward(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.send(PlaylistCommand::FastForward).await?)
    }

    /// Fast-forward (non-blocking)
    pub fn try_fast_forward(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.try_send(PlaylistCommand::FastForward)?)
    }

    /// Return every timer to `not running` and clear the active index
    pub async fn reset_timers(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.send(PlaylistCommand::ResetTimers).await?)
    }

    /// Reset (non-blocking)
    pub fn try_reset_timers(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.try_send(PlaylistCommand::ResetTimers)?)
    }

    /// Current timers and active index, as of every command sent before this call
    pub async fn snapshot(&self) -> Result<PlaylistSnapshot, TimerError> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(PlaylistCommand::Snapshot { reply })
            .await?;
        Ok(response.await?)
    }

    /// Shutdown the driver
    pub async fn shutdown(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.send(PlaylistCommand::Shutdown).await?)
    }

    /// Shutdown the driver (non-blocking)
    pub fn try_shutdown(&self) -> Result<(), TimerError> {
        Ok(self.command_tx.try_send(PlaylistCommand::Shutdown)?)
    }

    /// Receive the next playlist event
    pub async fn recv_event(&mut self) -> Option<PlaylistEvent> {
        self.event_rx.recv().await
    }

    /// Try to receive a playlist event (non-blocking)
    pub fn try_recv_event(&mut self) -> Result<PlaylistEvent, mpsc::error::TryRecvError> {
        self.event_rx.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerStatus;
    use tokio::time::sleep;
    use tokio_test::{assert_err, assert_ok};

    fn spawn_driver(
        event_buffer_size: usize,
    ) -> (
        tokio::task::JoinHandle<()>,
        PlaylistHandle,
        CancellationToken,
    ) {
        let _ = env_logger::builder().is_test(true).try_init();
        let cancel_token = CancellationToken::new();
        let config = DriverConfig::new("test").with_event_buffer_size(event_buffer_size);
        let (driver, handle) = PlaylistDriver::new(config, cancel_token.clone());
        (tokio::spawn(driver.run()), handle, cancel_token)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopwatch_counts_while_running() {
        let (task, handle, _) = spawn_driver(10);

        assert_ok!(handle.add_timer(Timer::stopwatch()).await);
        assert_ok!(handle.toggle_start_pause().await);
        sleep(Duration::from_millis(55)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_timer_index, Some(0));
        assert_eq!(snapshot.timers[0].status(), TimerStatus::Running);
        assert_eq!(snapshot.timers[0].duration(), 50);

        assert_ok!(handle.shutdown().await);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_completes_and_playlist_idles() {
        let (task, mut handle, _) = spawn_driver(10);

        handle.add_timer(Timer::countdown_ms(1000)).await.unwrap();
        handle.toggle_start_pause().await.unwrap();
        sleep(Duration::from_millis(55)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.timers[0].duration(), 950);
        assert_eq!(snapshot.timers[0].status(), TimerStatus::Running);

        let id = snapshot.timers[0].id();
        assert_eq!(
            handle.recv_event().await,
            Some(PlaylistEvent::TimerStarted { index: 0, id })
        );
        assert_eq!(
            handle.recv_event().await,
            Some(PlaylistEvent::TimerCompleted { index: 0, id })
        );
        assert_eq!(
            handle.recv_event().await,
            Some(PlaylistEvent::PlaylistFinished)
        );

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_timer_index, None);
        assert_eq!(snapshot.timers[0].status(), TimerStatus::Completed);
        assert_eq!(snapshot.timers[0].duration(), 0);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_ticking() {
        let (task, handle, _) = spawn_driver(10);

        handle.add_timer(Timer::countdown(1)).await.unwrap();
        handle.toggle_start_pause().await.unwrap();
        sleep(Duration::from_millis(35)).await;
        handle.toggle_start_pause().await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.timers[0].status(), TimerStatus::Paused);
        assert_eq!(snapshot.timers[0].duration(), 970);

        handle.toggle_start_pause().await.unwrap();
        sleep(Duration::from_millis(25)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.timers[0].duration(), 950);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_forward_leaves_no_orphan_ticks() {
        let (task, handle, _) = spawn_driver(10);

        handle.add_timer(Timer::countdown(1)).await.unwrap();
        handle.add_timer(Timer::countdown(1)).await.unwrap();
        handle.toggle_start_pause().await.unwrap();
        sleep(Duration::from_millis(15)).await;
        handle.fast_forward().await.unwrap();
        sleep(Duration::from_millis(15)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_timer_index, Some(1));
        assert_eq!(snapshot.timers[0].status(), TimerStatus::Completed);
        assert_eq!(snapshot.timers[0].duration(), 990);
        assert_eq!(snapshot.timers[1].status(), TimerStatus::Running);
        assert_eq!(snapshot.timers[1].duration(), 990);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stops_ticking() {
        let (task, handle, _) = spawn_driver(10);

        handle.add_timer(Timer::stopwatch()).await.unwrap();
        handle.toggle_start_pause().await.unwrap();
        sleep(Duration::from_millis(45)).await;
        handle.reset_timers().await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_timer_index, None);
        assert_eq!(snapshot.timers[0].status(), TimerStatus::NotRunning);
        assert_eq!(snapshot.timers[0].duration(), 0);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_xy_phases_then_next_timer() {
        let (task, mut handle, _) = spawn_driver(32);

        handle
            .add_timer(Timer::xy_ms(2, 1000, 500).unwrap())
            .await
            .unwrap();
        handle.add_timer(Timer::countdown_ms(100)).await.unwrap();
        let last_id = handle.snapshot().await.unwrap().timers[1].id();
        handle.toggle_start_pause().await.unwrap();

        let mut phases = vec![(1, true)];
        loop {
            match handle.recv_event().await.unwrap() {
                PlaylistEvent::PhaseChanged {
                    round, is_working, ..
                } => phases.push((round, is_working)),
                PlaylistEvent::TimerStarted { index: 1, .. } => break,
                _ => {}
            }
        }
        assert_eq!(phases, vec![(1, true), (1, false), (2, true), (2, false)]);

        assert_eq!(
            handle.recv_event().await,
            Some(PlaylistEvent::TimerCompleted {
                index: 1,
                id: last_id
            })
        );
        assert_eq!(
            handle.recv_event().await,
            Some(PlaylistEvent::PlaylistFinished)
        );

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_event_channel_does_not_stall_driver() {
        let (task, handle, _) = spawn_driver(1);

        for _ in 0..4 {
            handle.add_timer(Timer::stopwatch()).await.unwrap();
        }
        handle.toggle_start_pause().await.unwrap();
        for _ in 0..4 {
            handle.fast_forward().await.unwrap();
        }

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_timer_index, None);
        assert!(snapshot
            .timers
            .iter()
            .all(|t| t.status() == TimerStatus::Completed));

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_fail_after_shutdown() {
        let (task, handle, _) = spawn_driver(10);

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(
            handle.toggle_start_pause().await,
            Err(TimerError::DriverClosed)
        );
        assert_eq!(handle.snapshot().await, Err(TimerError::DriverClosed));
        assert_err!(handle.try_add_timer(Timer::stopwatch()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_token() {
        let (task, mut handle, cancel_token) = spawn_driver(10);

        handle.add_timer(Timer::countdown(1)).await.unwrap();
        handle.toggle_start_pause().await.unwrap();
        sleep(Duration::from_millis(20)).await;

        cancel_token.cancel();
        task.await.unwrap();

        // The start event was published before cancellation; nothing after it
        assert!(matches!(
            handle.try_recv_event(),
            Ok(PlaylistEvent::TimerStarted { index: 0, .. })
        ));
        assert!(handle.try_recv_event().is_err());
        assert_eq!(
            handle.try_fast_forward(),
            Err(TimerError::DriverClosed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_blocking_commands() {
        let (task, handle, _) = spawn_driver(10);

        assert_ok!(handle.try_add_timer(Timer::stopwatch()));
        assert_ok!(handle.try_toggle_start_pause());
        sleep(Duration::from_millis(25)).await;
        assert_ok!(handle.try_toggle_start_pause());

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.timers[0].status(), TimerStatus::Paused);
        assert_eq!(snapshot.timers[0].duration(), 20);

        assert_ok!(handle.try_reset_timers());
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_timer_index, None);
        assert_eq!(snapshot.timers[0].status(), TimerStatus::NotRunning);
        assert_eq!(snapshot.timers[0].duration(), 0);

        assert_ok!(handle.try_shutdown());
        task.await.unwrap();
        assert_eq!(
            handle.try_reset_timers(),
            Err(TimerError::DriverClosed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_command_queue() {
        let cancel_token = CancellationToken::new();
        let config = DriverConfig::new("test").with_command_buffer_size(1);
        let (_driver, handle) = PlaylistDriver::new(config, cancel_token);

        // Driver never runs, so the single slot stays taken
        assert_ok!(handle.try_toggle_start_pause());
        assert_eq!(
            handle.try_toggle_start_pause(),
            Err(TimerError::CommandQueueFull)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_driver() {
        let (task, handle, _) = spawn_driver(10);
        drop(handle);
        assert_ok!(task.await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_resumes_running_playlist() {
        let mut playlist = Playlist::new();
        playlist.add_timer(Timer::stopwatch());
        playlist.toggle_start_pause();

        let (driver, handle) =
            PlaylistDriver::with_playlist(DriverConfig::default(), playlist, CancellationToken::new());
        let task = tokio::spawn(driver.run());
        sleep(Duration::from_millis(25)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.timers[0].duration(), 20);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
