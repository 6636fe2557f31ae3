//! Basic usage example for the playlist driver

use workout_timers::{CancellationToken, DriverConfig, PlaylistDriver, PlaylistEvent, Timer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let cancel_token = CancellationToken::new();

    let (driver, mut handle) =
        PlaylistDriver::new(DriverConfig::new("example_playlist"), cancel_token.clone());

    // Spawn the driver task
    let driver_task = tokio::spawn(driver.run());

    // Build a short session
    handle.add_timer(Timer::stopwatch()).await?;
    handle.add_timer(Timer::countdown(1)).await?;
    handle.add_timer(Timer::xy(2, 1, 1)?).await?;
    handle.add_timer(Timer::tabata(2, 1, 1)?).await?;

    handle.toggle_start_pause().await?;
    println!("Playlist started!");

    // Let the stopwatch run a little, then skip ahead
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    handle.fast_forward().await?;

    // Pause the countdown briefly
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    handle.toggle_start_pause().await?;
    let snapshot = handle.snapshot().await?;
    if let Some(timer) = snapshot.active_timer() {
        println!(
            "Paused {} with {}ms left ({:.0}% of phase)",
            timer.label(),
            timer.duration(),
            timer.progress() * 100.0
        );
    }
    handle.toggle_start_pause().await?;

    while let Some(event) = handle.recv_event().await {
        match event {
            PlaylistEvent::TimerStarted { index, .. } => println!("Timer {} started", index),
            PlaylistEvent::PhaseChanged {
                index,
                round,
                is_working,
                ..
            } => println!(
                "Timer {} round {}: {}",
                index,
                round,
                if is_working { "work" } else { "rest" }
            ),
            PlaylistEvent::TimerCompleted { index, .. } => println!("Timer {} completed", index),
            PlaylistEvent::PlaylistFinished => {
                println!("Playlist finished!");
                break;
            }
            other => println!("{:?}", other),
        }
    }

    // Shutdown gracefully
    handle.shutdown().await?;
    driver_task.await?;

    println!("Playlist driver shut down successfully!");
    Ok(())
}
