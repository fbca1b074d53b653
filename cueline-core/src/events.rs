use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};

use crate::{Action, Identity, QueueSnapshot, SequenceNumber, Song};

pub type EventSender = Sender<ClientEvent>;
pub type EventReceiver = Receiver<ClientEvent>;

/// Describes the events that can be emitted by a queue client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The session could not be renewed or was revoked, the user must log in again.
    SessionExpired,
    /// A new session was established.
    LoggedIn { username: String },
    /// The session was ended on request.
    LoggedOut,
    /// A new queue snapshot was applied.
    QueueUpdated {
        sequence: SequenceNumber,
        snapshot: Arc<QueueSnapshot>,
    },
    /// Polling the queue failed, the previous snapshot is no longer valid.
    QueueUnavailable {
        sequence: SequenceNumber,
        error: String,
    },
    /// The current song, or its playback position, changed.
    CurrentSongUpdated {
        sequence: SequenceNumber,
        song: Option<Arc<Song>>,
    },
    /// Polling the current song failed.
    CurrentSongUnavailable {
        sequence: SequenceNumber,
        error: String,
    },
    /// The identity was fetched again, or cleared if `None`.
    IdentityUpdated { identity: Option<Identity> },
    /// A mutating command failed.
    CommandFailed {
        action: Action,
        /// The error that happened while performing the command
        error: String,
    },
}

impl ClientEvent {
    /// Returns true if the event should be shown to a user as an error notification.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired
                | Self::QueueUnavailable { .. }
                | Self::CurrentSongUnavailable { .. }
                | Self::CommandFailed { .. }
        )
    }
}
