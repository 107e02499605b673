//! Async player session.
//!
//! A session owns the media element and fullscreen ports and runs one task
//! that resolves sources, attaches the adaptive engine, feeds messages
//! through the reducer, executes the resulting commands, fires deadlines,
//! saves progress and publishes a [`SessionView`] after every step.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;

use marquee_common::{ContentId, ContentRecord, PlayableContent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::controller::{Command, PlaybackState, PlayerMessage, RenderPolicy};
use crate::hls::{self, Attachment, EngineEvent, EngineLoader, NoEngine};
use crate::ports::{FullscreenPort, MediaElement, ObjectStorage};
use crate::progress::ProgressStore;
use crate::resolver::{ResolveError, SourceResolver};
use crate::source::{PlaybackStrategy, ResolvedSource};

/// Requests accepted by a running session.
#[derive(Debug, Clone)]
pub enum SessionInput {
    /// Play `record`, seeking to `start_time` when given, otherwise to the
    /// stored resume position.
    Load {
        record: Box<ContentRecord>,
        start_time: Option<f64>,
    },
    Dispatch(PlayerMessage),
    Close,
}

/// Snapshot published after every processed input.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub state: PlaybackState,
    pub content_id: Option<ContentId>,
    pub source: Option<ResolvedSource>,
    pub strategy: Option<PlaybackStrategy>,
    pub render: Option<RenderPolicy>,
    pub closed: bool,
}

impl SessionView {
    fn initial(config: &PlayerConfig) -> Self {
        Self {
            state: PlaybackState::new(config),
            content_id: None,
            source: None,
            strategy: None,
            render: None,
            closed: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("player session is closed")]
pub struct SessionClosed;

/// Client side of a spawned session.
pub struct SessionHandle {
    inputs: mpsc::UnboundedSender<SessionInput>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn load(&self, record: ContentRecord, start_time: Option<f64>) -> Result<(), SessionClosed> {
        self.send(SessionInput::Load {
            record: Box::new(record),
            start_time,
        })
    }

    pub fn dispatch(&self, message: PlayerMessage) -> Result<(), SessionClosed> {
        self.send(SessionInput::Dispatch(message))
    }

    pub fn send(&self, input: SessionInput) -> Result<(), SessionClosed> {
        self.inputs.send(input).map_err(|_| SessionClosed)
    }

    /// The latest published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Close the session and wait for teardown to finish.
    pub async fn close(self) {
        let _ = self.inputs.send(SessionInput::Close);
        if let Err(e) = self.task.await {
            warn!(error = %e, "player session task failed");
        }
    }
}

/// A player session before it is spawned.
pub struct PlayerSession<M, F> {
    media: M,
    fullscreen: F,
    resolver: SourceResolver<dyn ObjectStorage>,
    loader: Arc<dyn EngineLoader>,
    progress: Arc<ProgressStore>,
    config: PlayerConfig,
}

enum Work {
    Input(SessionInput),
    Engine(EngineEvent),
    Reload,
}

struct Current {
    record: ContentRecord,
    source: Option<ResolvedSource>,
    attachment: Option<Attachment>,
    cancel: CancellationToken,
}

impl Current {
    fn teardown(&mut self) {
        self.cancel.cancel();
        if let Some(attachment) = self.attachment.as_mut() {
            attachment.teardown();
        }
    }
}

impl<M, F> PlayerSession<M, F>
where
    M: MediaElement + 'static,
    F: FullscreenPort + 'static,
{
    pub fn new(
        media: M,
        fullscreen: F,
        resolver: SourceResolver<dyn ObjectStorage>,
        progress: Arc<ProgressStore>,
    ) -> Self {
        Self {
            media,
            fullscreen,
            resolver,
            loader: Arc::new(NoEngine),
            progress,
            config: PlayerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_engine_loader(mut self, loader: Arc<dyn EngineLoader>) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the session task on the current runtime.
    pub fn spawn(self) -> SessionHandle {
        let (inputs, rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(SessionView::initial(&self.config));
        let task = tokio::spawn(self.run(rx, view_tx));
        SessionHandle { inputs, view, task }
    }

    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<SessionInput>,
        view: watch::Sender<SessionView>,
    ) {
        let mut state = PlaybackState::new(&self.config);
        let mut current: Option<Current> = None;
        let mut backlog: VecDeque<Work> = VecDeque::new();

        let period = self.config.progress_save_interval();
        let mut save_timer = interval_at(Instant::now() + period, period);
        save_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let work = match backlog.pop_front() {
                Some(work) => work,
                None => {
                    let deadline = state.next_deadline();
                    tokio::select! {
                        input = inputs.recv() => Work::Input(input.unwrap_or(SessionInput::Close)),
                        _ = wait_until(deadline) => Work::Input(SessionInput::Dispatch(PlayerMessage::Tick)),
                        _ = save_timer.tick() => Work::Input(SessionInput::Dispatch(PlayerMessage::SaveTick)),
                        event = next_engine_event(current.as_mut()) => Work::Engine(event),
                    }
                }
            };

            match work {
                Work::Input(SessionInput::Close) => break,
                Work::Input(SessionInput::Load { record, start_time }) => {
                    self.load(
                        &mut state,
                        &mut current,
                        *record,
                        start_time,
                        &mut inputs,
                        &mut backlog,
                    )
                    .await;
                }
                Work::Input(SessionInput::Dispatch(message)) => {
                    self.dispatch(&mut state, &current, message, &mut backlog);
                }
                Work::Engine(event) => {
                    let fault = current
                        .as_mut()
                        .and_then(|c| c.attachment.as_mut())
                        .and_then(Attachment::adaptive_mut)
                        .and_then(|adaptive| adaptive.handle(event));
                    if fault.is_some() {
                        self.dispatch(&mut state, &current, PlayerMessage::StreamFault, &mut backlog);
                    }
                }
                Work::Reload => {
                    self.reload(&mut state, &mut current, &mut inputs, &mut backlog)
                        .await;
                }
            }

            publish(&view, &state, current.as_ref(), false);
        }

        if let Some(mut previous) = current.take() {
            previous.teardown();
        }
        publish(&view, &state, None, true);
        debug!("player session closed");
    }

    async fn load(
        &mut self,
        state: &mut PlaybackState,
        current: &mut Option<Current>,
        record: ContentRecord,
        start_time: Option<f64>,
        inputs: &mut mpsc::UnboundedReceiver<SessionInput>,
        backlog: &mut VecDeque<Work>,
    ) {
        if let Some(mut previous) = current.take() {
            debug!(content_id = %previous.record.id, "tearing down previous source");
            previous.teardown();
        }
        state.reset_for_new_source();

        info!(content_id = %record.id, "loading content");
        let playable = record.playable();
        let cancel = CancellationToken::new();

        let prepared = {
            let work = prepare_source(
                &mut self.media,
                &self.resolver,
                self.loader.as_ref(),
                &playable,
                &cancel,
            );
            tokio::pin!(work);
            loop {
                tokio::select! {
                    prepared = &mut work => break prepared,
                    input = inputs.recv(), if !cancel.is_cancelled() => {
                        let input = input.unwrap_or(SessionInput::Close);
                        if matches!(input, SessionInput::Load { .. } | SessionInput::Close) {
                            debug!(content_id = %record.id, "load superseded");
                            cancel.cancel();
                        }
                        backlog.push_back(Work::Input(input));
                    }
                }
            }
        };

        match prepared {
            Ok(Some((source, attachment))) => {
                let strategy = source.strategy();
                debug!(
                    content_id = %record.id,
                    classification = source.classification.label(),
                    ?attachment,
                    "source ready"
                );
                let resume_at = self
                    .progress
                    .resume_position(&record.id, start_time)
                    .or(start_time);
                *current = Some(Current {
                    record,
                    source: Some(source),
                    attachment,
                    cancel,
                });

                if let Some(position) = resume_at.filter(|_| strategy.uses_media_element()) {
                    debug!(position, "seeking to start position");
                    self.dispatch(state, current, PlayerMessage::Seek(position), backlog);
                }
            }
            Ok(None) => {
                debug!(content_id = %record.id, "load cancelled");
            }
            Err(e) => {
                warn!(content_id = %record.id, error = %e, "failed to resolve source");
                *current = Some(Current {
                    record,
                    source: None,
                    attachment: None,
                    cancel,
                });
                self.dispatch(state, current, PlayerMessage::SourceFailed, backlog);
            }
        }
    }

    async fn reload(
        &mut self,
        state: &mut PlaybackState,
        current: &mut Option<Current>,
        inputs: &mut mpsc::UnboundedReceiver<SessionInput>,
        backlog: &mut VecDeque<Work>,
    ) {
        let Some(active) = current.as_ref() else {
            return;
        };
        let plain_source = active.source.is_some()
            && !active.attachment.as_ref().is_some_and(Attachment::is_adaptive);

        if plain_source {
            self.media.reload();
        } else {
            let record = active.record.clone();
            self.load(state, current, record, None, inputs, backlog).await;
        }
    }

    fn dispatch(
        &mut self,
        state: &mut PlaybackState,
        current: &Option<Current>,
        message: PlayerMessage,
        backlog: &mut VecDeque<Work>,
    ) {
        for command in state.update(message, Instant::now()) {
            self.execute(command, current.as_ref(), backlog);
        }
    }

    fn execute(&mut self, command: Command, current: Option<&Current>, backlog: &mut VecDeque<Work>) {
        match command {
            Command::Play => self.media.play(),
            Command::Pause => self.media.pause(),
            Command::Seek(position) => self.media.seek(position),
            Command::SetVolume(volume) => self.media.set_volume(volume),
            Command::SetMuted(muted) => self.media.set_muted(muted),
            Command::SetRate(rate) => self.media.set_rate(rate),
            Command::RequestFullscreen => self.fullscreen.request_fullscreen(),
            Command::ExitFullscreen => self.fullscreen.exit_fullscreen(),
            Command::Reload => backlog.push_back(Work::Reload),
            Command::SaveProgress {
                current_time,
                duration,
            } => {
                let Some(active) = current else {
                    return;
                };
                if let Err(e) = self.progress.save_progress(
                    &active.record.id,
                    current_time,
                    duration,
                    Some(&active.record),
                ) {
                    warn!(content_id = %active.record.id, error = %e, "failed to save progress");
                }
            }
        }
    }
}

type Prepared = Option<(ResolvedSource, Option<Attachment>)>;

/// Resolve and attach. `Ok(None)` when cancelled.
async fn prepare_source<M>(
    media: &mut M,
    resolver: &SourceResolver<dyn ObjectStorage>,
    loader: &dyn EngineLoader,
    playable: &PlayableContent,
    cancel: &CancellationToken,
) -> Result<Prepared, ResolveError>
where
    M: MediaElement + ?Sized,
{
    let source = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(None),
        source = resolver.resolve(playable) => source?,
    };

    let strategy = source.strategy();
    if !strategy.uses_media_element() {
        return Ok(Some((source, None)));
    }

    match hls::attach(media, strategy.url(), loader, cancel).await {
        Attachment::Cancelled => Ok(None),
        attachment => Ok(Some((source, Some(attachment)))),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn next_engine_event(current: Option<&mut Current>) -> EngineEvent {
    let adaptive = current
        .and_then(|c| c.attachment.as_mut())
        .and_then(Attachment::adaptive_mut);
    match adaptive {
        Some(adaptive) => match adaptive.next_event().await {
            Some(event) => event,
            None => pending().await,
        },
        None => pending().await,
    }
}

fn publish(
    view: &watch::Sender<SessionView>,
    state: &PlaybackState,
    current: Option<&Current>,
    closed: bool,
) {
    let source = current.and_then(|c| c.source.clone());
    view.send_replace(SessionView {
        state: state.clone(),
        content_id: current.map(|c| c.record.id.clone()),
        strategy: source.as_ref().map(ResolvedSource::strategy),
        render: source
            .as_ref()
            .map(|s| RenderPolicy::for_source(&s.classification, state)),
        source,
        closed,
    });
}
