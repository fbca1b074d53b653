use crossbeam::atomic::AtomicCell;

pub type SequenceNumber = u64;

/// Hands out strictly increasing sequence numbers, starting at 1.
///
/// Zero is never handed out, so it can be used as "nothing applied yet".
#[derive(Debug, Default)]
pub struct Sequence {
    counter: AtomicCell<SequenceNumber>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number.
    pub fn next(&self) -> SequenceNumber {
        self.counter.fetch_add(1) + 1
    }

    /// Returns the last sequence number that was handed out.
    pub fn last(&self) -> SequenceNumber {
        self.counter.load()
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_increasing() {
        let sequence = Sequence::new();

        assert_eq!(sequence.last(), 0);
        assert_eq!(sequence.next(), 1);
        assert_eq!(sequence.next(), 2);
        assert_eq!(sequence.last(), 2);
    }

    #[test]
    fn test_unique_across_threads() {
        let sequence = Arc::new(Sequence::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sequence = sequence.clone();
                thread::spawn(move || (0..100).map(|_| sequence.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        all.sort();
        all.dedup();

        assert_eq!(all.len(), 400, "every number is handed out once");
    }
}
