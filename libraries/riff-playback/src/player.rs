//! Async player
//!
//! Owns a [`PlaybackEngine`] on a single tokio task and serialises every
//! input onto it: UI commands, load completions, end-of-track signals and
//! progress ticks. After each input the task publishes a fresh
//! [`PlaybackSnapshot`] and forwards drained [`PlaybackEvent`]s.

use crate::{
    engine::{LoadResolution, PlaybackEngine},
    error::{PlaybackError, Result},
    events::PlaybackEvent,
    progress::ProgressSynchronizer,
    session::{AudioBackend, EndSignal, LoadCompletion, LoadRequest},
    types::{PlaybackConfig, PlaybackSnapshot, RepeatMode, SessionGeneration, Track},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info};

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 256;

/// How a transport intent resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A load was issued and the session is now live
    Started,

    /// Applied without loading anything
    Applied,

    /// A newer intent replaced this one before its load finished
    Superseded,
}

/// Intents that may start a load
#[derive(Debug)]
enum Transport {
    PlayTrack(Track),
    Next,
    Previous,
    Resume,
    TogglePlayPause,
}

/// Intents that never load
#[derive(Debug)]
enum Action {
    Pause,
    Seek(f64),
    SeekToPercent(f64),
    SetVolume(f64),
    Mute,
    Unmute,
    ToggleMute,
    AddToQueue(Vec<Track>),
    ClearQueue,
    ToggleShuffle,
    SetShuffle(bool),
    SetRepeat(RepeatMode),
}

/// Commands sent to the player task
#[derive(Debug)]
enum PlayerCommand {
    Transport {
        intent: Transport,
        reply: oneshot::Sender<Result<PlayOutcome>>,
    },
    Apply {
        action: Action,
        reply: oneshot::Sender<()>,
    },
    ToggleRepeat {
        reply: oneshot::Sender<RepeatMode>,
    },
    Queue {
        reply: oneshot::Sender<Vec<Track>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running player task
///
/// Cheap to clone. The task stops on [`Player::shutdown`] or once every
/// handle has been dropped; either way the live session is stopped.
#[derive(Clone)]
pub struct Player {
    command_tx: mpsc::Sender<PlayerCommand>,
    snapshot_rx: watch::Receiver<PlaybackSnapshot>,
    event_tx: broadcast::Sender<PlaybackEvent>,
}

impl Player {
    /// Spawn the player task on the current tokio runtime
    ///
    /// `tracks` are queued before `config.shuffle` is applied.
    pub fn spawn(
        config: PlaybackConfig,
        backend: Arc<dyn AudioBackend>,
        tracks: Vec<Track>,
    ) -> Result<Self> {
        config.validate()?;

        let engine = PlaybackEngine::with_queue(&config, tracks);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (end_tx, end_rx) = mpsc::unbounded_channel();

        let task = PlayerTask {
            engine,
            backend,
            pending: None,
            completion_tx,
            end_tx,
            snapshot_tx,
            event_tx: event_tx.clone(),
        };
        let progress =
            ProgressSynchronizer::new(Duration::from_millis(config.progress_interval_ms));

        info!(
            queue_length = task.engine.queue().len(),
            "Starting player task"
        );
        tokio::spawn(task.run(command_rx, completion_rx, end_rx, progress));

        Ok(Self {
            command_tx,
            snapshot_rx,
            event_tx,
        })
    }

    // ===== Transport =====

    /// Play a track, queueing it first if needed
    ///
    /// Resolves once the load finished, failed, or was superseded.
    pub async fn play_track(&self, track: Track) -> Result<PlayOutcome> {
        self.transport(Transport::PlayTrack(track)).await
    }

    /// Skip to the next track in play order
    pub async fn next_track(&self) -> Result<PlayOutcome> {
        self.transport(Transport::Next).await
    }

    /// Go back to the previous track in play order
    pub async fn previous_track(&self) -> Result<PlayOutcome> {
        self.transport(Transport::Previous).await
    }

    /// Resume playback (re-plays the current track from Idle or Ended)
    pub async fn resume(&self) -> Result<PlayOutcome> {
        self.transport(Transport::Resume).await
    }

    /// Pause when playing, resume otherwise
    pub async fn toggle_play_pause(&self) -> Result<PlayOutcome> {
        self.transport(Transport::TogglePlayPause).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.apply(Action::Pause).await
    }

    /// Seek to a position in seconds
    pub async fn seek(&self, time: f64) -> Result<()> {
        self.apply(Action::Seek(time)).await
    }

    /// Seek to a fraction (0.0-1.0) of the track
    pub async fn seek_to_percent(&self, fraction: f64) -> Result<()> {
        self.apply(Action::SeekToPercent(fraction)).await
    }

    // ===== Volume =====

    pub async fn set_volume(&self, level: f64) -> Result<()> {
        self.apply(Action::SetVolume(level)).await
    }

    pub async fn mute(&self) -> Result<()> {
        self.apply(Action::Mute).await
    }

    pub async fn unmute(&self) -> Result<()> {
        self.apply(Action::Unmute).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.apply(Action::ToggleMute).await
    }

    // ===== Queue =====

    pub async fn add_to_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.apply(Action::AddToQueue(tracks)).await
    }

    pub async fn clear_queue(&self) -> Result<()> {
        self.apply(Action::ClearQueue).await
    }

    /// Tracks in play order
    pub async fn queue(&self) -> Result<Vec<Track>> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Queue { reply }).await?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)
    }

    // ===== Shuffle & Repeat =====

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.apply(Action::ToggleShuffle).await
    }

    pub async fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.apply(Action::SetShuffle(enabled)).await
    }

    /// Cycle repeat mode, returning the new mode
    pub async fn toggle_repeat(&self) -> Result<RepeatMode> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::ToggleRepeat { reply }).await?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)
    }

    pub async fn set_repeat(&self, mode: RepeatMode) -> Result<()> {
        self.apply(Action::SetRepeat(mode)).await
    }

    // ===== Observation =====

    /// Latest published state
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Receive playback events published from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_tx.subscribe()
    }

    /// Stop the live session and end the task
    ///
    /// Other handles get [`PlaybackError::PlayerClosed`] afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Shutdown { reply }).await?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)
    }

    async fn transport(&self, intent: Transport) -> Result<PlayOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Transport { intent, reply }).await?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)?
    }

    async fn apply(&self, action: Action) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Apply { action, reply }).await?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)
    }

    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| PlaybackError::PlayerClosed)
    }
}

/// Transport reply waiting on a load
struct PendingReply {
    generation: SessionGeneration,
    reply: oneshot::Sender<Result<PlayOutcome>>,
}

/// State owned by the player task
struct PlayerTask {
    engine: PlaybackEngine,
    backend: Arc<dyn AudioBackend>,
    pending: Option<PendingReply>,
    completion_tx: mpsc::UnboundedSender<LoadCompletion>,
    end_tx: mpsc::UnboundedSender<SessionGeneration>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    event_tx: broadcast::Sender<PlaybackEvent>,
}

impl PlayerTask {
    async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<PlayerCommand>,
        mut completion_rx: mpsc::UnboundedReceiver<LoadCompletion>,
        mut end_rx: mpsc::UnboundedReceiver<SessionGeneration>,
        mut progress: ProgressSynchronizer,
    ) {
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(PlayerCommand::Shutdown { reply }) => {
                        self.stop();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All player handles dropped");
                        self.stop();
                        break;
                    }
                },
                Some(completion) = completion_rx.recv() => self.handle_completion(completion),
                Some(generation) = end_rx.recv() => self.handle_end(generation),
                () = progress.tick() => {
                    self.engine.sync_position();
                }
            }

            self.settle_pending();
            progress.observe(self.engine.status(), self.engine.has_live_session());
            self.publish();
        }

        info!("Player task stopped");
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Transport { intent, reply } => {
                let request = match intent {
                    Transport::PlayTrack(track) => self.engine.play_track(track),
                    Transport::Next => self.engine.next_track(),
                    Transport::Previous => self.engine.previous_track(),
                    Transport::Resume => self.engine.resume(),
                    Transport::TogglePlayPause => self.engine.toggle_play_pause(),
                };

                match request {
                    Some(request) => {
                        self.supersede_pending();
                        self.pending = Some(PendingReply {
                            generation: request.generation,
                            reply,
                        });
                        self.spawn_load(request);
                    }
                    None => {
                        let _ = reply.send(Ok(PlayOutcome::Applied));
                    }
                }
            }
            PlayerCommand::Apply { action, reply } => {
                self.apply(action);
                let _ = reply.send(());
            }
            PlayerCommand::ToggleRepeat { reply } => {
                let _ = reply.send(self.engine.toggle_repeat());
            }
            PlayerCommand::Queue { reply } => {
                let _ = reply.send(self.engine.queue().iter().cloned().collect());
            }
            // Handled by the run loop
            PlayerCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Pause => self.engine.pause(),
            Action::Seek(time) => self.engine.seek_to(time),
            Action::SeekToPercent(fraction) => self.engine.seek_to_percent(fraction),
            Action::SetVolume(level) => self.engine.set_volume(level),
            Action::Mute => self.engine.mute(),
            Action::Unmute => self.engine.unmute(),
            Action::ToggleMute => self.engine.toggle_mute(),
            Action::AddToQueue(tracks) => self.engine.add_to_queue(tracks),
            Action::ClearQueue => self.engine.clear_queue(),
            Action::ToggleShuffle => self.engine.toggle_shuffle(),
            Action::SetShuffle(enabled) => self.engine.set_shuffle(enabled),
            Action::SetRepeat(mode) => self.engine.set_repeat(mode),
        }
    }

    fn handle_completion(&mut self, completion: LoadCompletion) {
        let generation = completion.generation;

        match self.engine.complete_load(completion) {
            LoadResolution::Started => self.resolve(generation, Ok(PlayOutcome::Started)),
            LoadResolution::Failed(err) => self.resolve(generation, Err(err)),
            LoadResolution::Stale => {}
        }
    }

    fn handle_end(&mut self, generation: SessionGeneration) {
        if let Some(request) = self.engine.track_ended(generation) {
            self.spawn_load(request);
        }
    }

    /// Run a load off the task and feed the result back
    fn spawn_load(&self, request: LoadRequest) {
        let backend = Arc::clone(&self.backend);
        let completion_tx = self.completion_tx.clone();
        let on_end = EndSignal::new(request.generation, self.end_tx.clone());

        debug!(
            track_id = %request.track_id,
            generation = %request.generation,
            "Spawning load"
        );

        tokio::spawn(async move {
            let result = backend.load(&request.source, on_end).await;
            let completion = LoadCompletion {
                generation: request.generation,
                result,
            };

            // Player gone: nobody else will stop this session
            if let Err(mpsc::error::SendError(orphan)) = completion_tx.send(completion) {
                if let Ok(mut loaded) = orphan.result {
                    loaded.session.stop();
                }
            }
        });
    }

    fn resolve(&mut self, generation: SessionGeneration, outcome: Result<PlayOutcome>) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
        {
            if let Some(pending) = self.pending.take() {
                let _ = pending.reply.send(outcome);
            }
        }
    }

    fn supersede_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(generation = %pending.generation, "Transport intent superseded");
            let _ = pending.reply.send(Ok(PlayOutcome::Superseded));
        }
    }

    /// Resolve a waiting reply whose load can no longer complete
    fn settle_pending(&mut self) {
        let obsolete = self.pending.as_ref().is_some_and(|pending| {
            pending.generation != self.engine.generation() || !self.engine.is_loading()
        });
        if obsolete {
            self.supersede_pending();
        }
    }

    fn stop(&mut self) {
        self.engine.shutdown();
        self.supersede_pending();
        self.publish();
    }

    /// Snapshot first, so event subscribers reading it see the new state
    fn publish(&mut self) {
        let snapshot = self.engine.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        for event in self.engine.drain_events() {
            // No subscribers is fine
            let _ = self.event_tx.send(event);
        }
    }
}
