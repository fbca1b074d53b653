use cueline_core::{Sequence, SequenceNumber};
use parking_lot::RwLock;

use crate::ClientError;

/// The last applied result of a polling stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamState<T> {
    /// Nothing was applied yet
    Idle,
    Updated { sequence: SequenceNumber, value: T },
    /// The last poll failed, there is no valid value
    Unavailable {
        sequence: SequenceNumber,
        error: ClientError,
    },
}

/// Tags polls with sequence numbers, and applies their results in order.
#[derive(Debug)]
pub struct PollStream<T> {
    sequence: Sequence,
    state: RwLock<StreamState<T>>,
}

impl<T> StreamState<T> {
    /// Returns the sequence of the applied result, or zero if nothing was applied.
    pub fn sequence(&self) -> SequenceNumber {
        match self {
            Self::Idle => 0,
            Self::Updated { sequence, .. } | Self::Unavailable { sequence, .. } => *sequence,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Updated { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Unavailable { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<T> PollStream<T>
where
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            sequence: Sequence::new(),
            state: RwLock::new(StreamState::Idle),
        }
    }

    /// Tags a poll that is about to be issued.
    pub fn begin(&self) -> SequenceNumber {
        self.sequence.next()
    }

    /// Applies the result of a poll, unless a later poll was applied already.
    ///
    /// Returns true if the result was applied.
    pub fn apply(&self, sequence: SequenceNumber, result: Result<T, ClientError>) -> bool {
        let mut state = self.state.write();

        if sequence <= state.sequence() {
            return false;
        }

        *state = match result {
            Ok(value) => StreamState::Updated { sequence, value },
            Err(error) => StreamState::Unavailable { sequence, error },
        };

        true
    }

    pub fn state(&self) -> StreamState<T> {
        self.state.read().clone()
    }

    /// Returns the current value, if the last applied poll succeeded
    pub fn value(&self) -> Option<T> {
        self.state.read().value().cloned()
    }
}

impl<T> Default for PollStream<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stale_results_are_discarded() {
        let stream = PollStream::<u32>::new();

        let first = stream.begin();
        let second = stream.begin();

        assert!(stream.apply(second, Ok(2)));
        assert!(!stream.apply(first, Ok(1)));
        assert!(!stream.apply(second, Ok(3)), "same sequence twice");

        assert_eq!(
            stream.state(),
            StreamState::Updated {
                sequence: second,
                value: 2
            }
        );
    }

    #[test]
    fn test_failure_replaces_value() {
        let stream = PollStream::<u32>::new();
        assert_eq!(stream.state(), StreamState::Idle);

        stream.apply(stream.begin(), Ok(1));
        stream.apply(stream.begin(), Err(ClientError::Transient("down".into())));

        assert_eq!(stream.value(), None);
        assert!(stream.state().error().is_some());

        stream.apply(stream.begin(), Ok(5));
        assert_eq!(stream.value(), Some(5));
    }
}
