//! Terminal playback loop
//!
//! Starts the queue, prints each track as it begins and a progress line as
//! snapshots arrive, and returns once the queue finishes.

use riff_playback::{PlaybackEvent, PlaybackSnapshot, PlaybackStatus, Player, SessionGeneration};
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Width of the progress bar in characters
const BAR_WIDTH: usize = 30;

/// How long a metadata-only track stays on screen
pub const METADATA_ONLY_DWELL: Duration = Duration::from_secs(2);

/// Why [`drive`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// Queue reached its end
    Finished,
    /// `interrupt` resolved first
    Interrupted,
    /// Every queued track failed to load
    NoPlayableTracks,
    /// Player task went away
    Closed,
}

/// Play the queue from its current slot until it ends or `interrupt` fires
pub async fn drive<F>(player: &Player, interrupt: F) -> DriveOutcome
where
    F: Future<Output = ()>,
{
    let mut events = player.subscribe_events();
    let mut snapshots = player.subscribe();
    let queue_length = player.snapshot().queue_length;
    tokio::pin!(interrupt);

    start(player);

    // Consecutive load failures
    let mut failures = 0usize;
    // Every new session generation that reaches Playing is a track start,
    // including a replay of the same slot
    let mut announced: Option<SessionGeneration> = None;

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                info!("Interrupted");
                return DriveOutcome::Interrupted;
            }
            event = events.recv() => match event {
                Ok(PlaybackEvent::StatusChanged { status: PlaybackStatus::Playing }) => {
                    failures = 0;
                }
                Ok(PlaybackEvent::StatusChanged { status: PlaybackStatus::Ended }) => {
                    println!();
                    info!("Queue finished");
                    return DriveOutcome::Finished;
                }
                Ok(PlaybackEvent::LoadFailed { track_id, message }) => {
                    warn!(%track_id, %message, "Skipping unplayable track");
                    failures += 1;
                    if failures >= queue_length {
                        error!("No playable tracks");
                        return DriveOutcome::NoPlayableTracks;
                    }
                    skip_after(player, Duration::ZERO);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => return DriveOutcome::Closed,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return DriveOutcome::Closed;
                }
                let snapshot = snapshots.borrow_and_update().clone();

                if snapshot.is_playing() && announced != Some(snapshot.generation) {
                    announced = Some(snapshot.generation);
                    announce(player, &snapshot);
                }
                render(&snapshot);
            }
        }
    }
}

fn announce(player: &Player, snapshot: &PlaybackSnapshot) {
    let Some(track) = &snapshot.current_track else {
        return;
    };

    println!();
    println!("Now playing: {} - {}", track.title, track.artist);

    // No session means no end signal; show it briefly
    if track.source().is_none() {
        println!("(metadata only)");
        skip_after(player, METADATA_ONLY_DWELL);
    }
}

/// Resume from the current slot in the background so events keep flowing
fn start(player: &Player) {
    let player = player.clone();
    tokio::spawn(async move {
        if let Err(e) = player.resume().await {
            warn!("Failed to start playback: {}", e);
        }
    });
}

/// Skip ahead after `delay`
fn skip_after(player: &Player, delay: Duration) {
    let player = player.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = player.next_track().await {
            warn!("Failed to skip track: {}", e);
        }
    });
}

/// Draw the single-line progress display
pub fn render(snapshot: &PlaybackSnapshot) {
    let Some(track) = &snapshot.current_track else {
        return;
    };

    let filled = ((snapshot.progress_percent() / 100.0) * BAR_WIDTH as f64).round() as usize;
    let bar: String = "#".repeat(filled) + &".".repeat(BAR_WIDTH.saturating_sub(filled));
    let volume = if snapshot.muted {
        "muted".to_string()
    } else {
        format!("vol {:.0}%", snapshot.volume * 100.0)
    };

    print!(
        "\r[{:<7}] {} {} [{}] {} / {}  {}   ",
        snapshot.status.as_str(),
        track.id,
        track.title,
        bar,
        snapshot.elapsed_label(),
        snapshot.duration_label(),
        volume,
    );
    let _ = std::io::stdout().flush();
}
