mod poller;
mod stream;

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use cueline_core::{Action, ClientEvent, QueueSnapshot, SequenceNumber, Song, SongId};
use futures_util::future::join;
use log::{info, warn};
use serde_json::json;

pub use poller::*;
pub use stream::*;

use crate::{ApiRequest, ClientContext, ClientError, ClientResult, Endpoint, Transport};

/// Keeps a local copy of the remote queue, and performs queue commands.
pub struct QueueSync<T> {
    context: ClientContext<T>,
    queue: PollStream<Arc<QueueSnapshot>>,
    current_song: PollStream<Option<Arc<Song>>>,
}

impl<T> QueueSync<T>
where
    T: Transport,
{
    pub fn new(context: &ClientContext<T>) -> Self {
        Self {
            context: context.clone(),
            queue: PollStream::new(),
            current_song: PollStream::new(),
        }
    }

    /// Starts polling the queue and the current song on their own schedules.
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        let config = &self.context.config;
        let alive = Arc::new(AtomicCell::new(true));

        let queue = {
            let sync = self.clone();
            let stream_alive = alive.clone();

            spawn_stream(
                "queue",
                config.queue_poll_interval,
                config.stop_on_session_loss,
                &alive,
                move || {
                    let sync = sync.clone();
                    let alive = stream_alive.clone();

                    async move { sync.poll_queue_while(&alive).await.map(|_| ()) }
                },
            )
        };

        let current_song = {
            let sync = self.clone();
            let stream_alive = alive.clone();

            spawn_stream(
                "current song",
                config.current_song_poll_interval,
                config.stop_on_session_loss,
                &alive,
                move || {
                    let sync = sync.clone();
                    let alive = stream_alive.clone();

                    async move { sync.poll_current_song_while(&alive).await.map(|_| ()) }
                },
            )
        };

        info!("Started polling");
        PollerHandle::new(alive, vec![queue, current_song])
    }

    /// Fetches the queue once, outside of the schedule.
    pub async fn poll_queue(&self) -> ClientResult<Arc<QueueSnapshot>> {
        self.poll_queue_while(&AtomicCell::new(true)).await
    }

    /// Fetches the current song once, outside of the schedule.
    pub async fn poll_current_song(&self) -> ClientResult<Option<Arc<Song>>> {
        self.poll_current_song_while(&AtomicCell::new(true)).await
    }

    pub fn queue_state(&self) -> StreamState<Arc<QueueSnapshot>> {
        self.queue.state()
    }

    pub fn current_state(&self) -> StreamState<Option<Arc<Song>>> {
        self.current_song.state()
    }

    /// Returns the latest queue combined with the current song.
    ///
    /// Returns `None` while the queue is unavailable.
    pub fn view(&self) -> Option<QueueSnapshot> {
        let snapshot = self.queue.value()?;
        let current_song = self.current_song.value().flatten();

        Some(snapshot.merged(current_song.as_deref()))
    }

    /// Adds a song to the queue by url or search query
    pub async fn submit(&self, query: &str) -> ClientResult<()> {
        let query = query.trim();

        if query.is_empty() {
            return Err(ClientError::InvalidInput("Query is empty".to_string()));
        }

        let request = ApiRequest::post(Endpoint::Submit).with_json(json!({ "queries": [query] }));
        self.command(Action::Submit, request).await
    }

    pub async fn skip(&self) -> ClientResult<()> {
        self.command(Action::Skip, ApiRequest::post(Endpoint::Skip))
            .await
    }

    pub async fn delete(&self, id: &SongId) -> ClientResult<()> {
        self.command(Action::Delete, ApiRequest::delete(Endpoint::Song(id.clone())))
            .await
    }

    pub async fn upvote(&self, id: &SongId) -> ClientResult<()> {
        self.vote(id, true).await
    }

    pub async fn downvote(&self, id: &SongId) -> ClientResult<()> {
        self.vote(id, false).await
    }

    async fn vote(&self, id: &SongId, upvote: bool) -> ClientResult<()> {
        let request =
            ApiRequest::post(Endpoint::Vote(id.clone())).with_json(json!({ "upvote": upvote }));

        self.command(Action::Vote, request).await
    }

    /// Performs a command, reporting failures as events.
    async fn command(&self, action: Action, request: ApiRequest) -> ClientResult<()> {
        let result = self.perform(action, request).await;

        if let Err(error) = &result {
            warn!("Could not {}: {}", action, error);

            self.context.emit(ClientEvent::CommandFailed {
                action,
                error: error.to_string(),
            });
        }

        result
    }

    async fn perform(&self, action: Action, request: ApiRequest) -> ClientResult<()> {
        self.context.ensure_allowed(action)?;
        self.context.credentials.execute(request).await?;

        // Spending coins changes the balance
        let refreshed = if matches!(action, Action::Submit | Action::Vote) {
            let (queue, identity) = join(self.poll_queue(), self.context.identity.refresh()).await;

            if let Err(error) = identity {
                warn!("Could not refresh identity after {}: {}", action, error);
            }

            queue
        } else {
            self.poll_queue().await
        };

        // The command went through regardless, the next scheduled poll catches up
        if let Err(error) = refreshed {
            warn!("Could not refresh queue after {}: {}", action, error);
        }

        Ok(())
    }

    async fn poll_queue_while(&self, alive: &AtomicCell<bool>) -> ClientResult<Arc<QueueSnapshot>> {
        let sequence = self.queue.begin();

        let result = self
            .context
            .credentials
            .execute(ApiRequest::get(Endpoint::QueueSnapshot))
            .await
            .and_then(|r| r.json::<QueueSnapshot>())
            .map(Arc::new);

        if alive.load() && self.queue.apply(sequence, result.clone()) {
            self.context.emit(queue_event(sequence, &result));
        }

        result
    }

    async fn poll_current_song_while(
        &self,
        alive: &AtomicCell<bool>,
    ) -> ClientResult<Option<Arc<Song>>> {
        let sequence = self.current_song.begin();

        let result = self
            .context
            .credentials
            .execute(ApiRequest::get(Endpoint::CurrentSong))
            .await
            .and_then(|r| r.json::<Song>())
            .map(|song| (!song.is_placeholder()).then(|| Arc::new(song)));

        if alive.load() && self.current_song.apply(sequence, result.clone()) {
            self.context.emit(match &result {
                Ok(song) => ClientEvent::CurrentSongUpdated {
                    sequence,
                    song: song.clone(),
                },
                Err(error) => ClientEvent::CurrentSongUnavailable {
                    sequence,
                    error: error.to_string(),
                },
            });
        }

        result
    }
}

fn queue_event(sequence: SequenceNumber, result: &ClientResult<Arc<QueueSnapshot>>) -> ClientEvent {
    match result {
        Ok(snapshot) => ClientEvent::QueueUpdated {
            sequence,
            snapshot: snapshot.clone(),
        },
        Err(error) => ClientEvent::QueueUnavailable {
            sequence,
            error: error.to_string(),
        },
    }
}
