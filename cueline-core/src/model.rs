use std::{collections::HashSet, time::Duration};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{nanos, Role};

/// The opaque unique identifier of a song
pub type SongId = String;

/// A song request somewhere in the queue
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub id: SongId,
    #[serde(default)]
    pub name: String,
    /// Where the song is fetched from
    #[serde(default, rename = "url")]
    pub source_locator: String,
    #[serde(default, rename = "hash")]
    pub content_hash: String,
    #[serde(default, rename = "addedby")]
    pub added_by: String,
    #[serde(
        default,
        rename = "addedat",
        alias = "addedAt",
        deserialize_with = "deserialize_timestamp"
    )]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "playedat",
        alias = "playedAt",
        deserialize_with = "deserialize_timestamp"
    )]
    pub played_at: Option<DateTime<Utc>>,
    /// The sum of up and down votes, may be negative
    #[serde(default, rename = "points")]
    pub vote_score: i64,
    #[serde(default, rename = "position", with = "nanos")]
    pub playback_position: Duration,
    #[serde(default, rename = "length", with = "nanos")]
    pub duration: Duration,
}

/// One of the collections a request passes through before it is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Prepare,
    Download,
    Play,
}

/// An immutable view of the queue at a point in time.
///
/// Snapshots are never mutated after they are built, a newer one replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default, rename = "preparequeue", deserialize_with = "deserialize_songs")]
    pub prepare_queue: Vec<Song>,
    #[serde(default, rename = "downloadqueue", deserialize_with = "deserialize_songs")]
    pub download_queue: Vec<Song>,
    #[serde(default, rename = "playqueue", deserialize_with = "deserialize_songs")]
    pub play_queue: Vec<Song>,
    /// The song actively playing, never listed in any of the stages
    #[serde(skip)]
    pub current_song: Option<Song>,
}

/// The profile of the logged in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(rename = "right")]
    pub role: Role,
    /// Only meaningful when coins are enabled
    #[serde(default, rename = "coins", deserialize_with = "deserialize_coins")]
    pub coin_balance: u64,
}

impl Song {
    /// The current song endpoint answers with an empty song when nothing is playing.
    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty() && self.name.is_empty()
    }

    /// Returns how far into the song playback is, between 0 and 1.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 0.;
        }

        (self.playback_position.as_secs_f32() / self.duration.as_secs_f32()).clamp(0., 1.)
    }
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Prepare, Stage::Download, Stage::Play];
}

impl QueueSnapshot {
    /// Returns the songs of a stage in order.
    pub fn stage(&self, stage: Stage) -> &[Song] {
        match stage {
            Stage::Prepare => &self.prepare_queue,
            Stage::Download => &self.download_queue,
            Stage::Play => &self.play_queue,
        }
    }

    /// Finds a queued song and the stage it is in.
    pub fn find(&self, id: &str) -> Option<(Stage, &Song)> {
        Stage::ALL
            .into_iter()
            .find_map(|stage| self.stage(stage).iter().find(|s| s.id == id).map(|s| (stage, s)))
    }

    /// Returns the amount of queued songs, excluding the current song.
    pub fn len(&self) -> usize {
        self.prepare_queue.len() + self.download_queue.len() + self.play_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combines the stages with a current song into a consistent view.
    ///
    /// A song listed in several stages is only kept in the most advanced one,
    /// and the current song is removed from all stages.
    pub fn merged(&self, current_song: Option<&Song>) -> QueueSnapshot {
        let mut seen: HashSet<&str> = HashSet::new();

        if let Some(current) = current_song.filter(|s| !s.id.is_empty()) {
            seen.insert(current.id.as_str());
        }

        // Most advanced stage first, so it wins on duplicates
        let play_queue = unseen(&self.play_queue, &seen);
        seen.extend(self.play_queue.iter().map(|s| s.id.as_str()));
        let download_queue = unseen(&self.download_queue, &seen);
        seen.extend(self.download_queue.iter().map(|s| s.id.as_str()));
        let prepare_queue = unseen(&self.prepare_queue, &seen);

        QueueSnapshot {
            prepare_queue: dedup(prepare_queue),
            download_queue: dedup(download_queue),
            play_queue: dedup(play_queue),
            current_song: current_song.cloned(),
        }
    }
}

fn unseen(songs: &[Song], seen: &HashSet<&str>) -> Vec<Song> {
    songs
        .iter()
        .filter(|s| s.id.is_empty() || !seen.contains(s.id.as_str()))
        .cloned()
        .collect()
}

/// Removes repeated ids within a single stage, keeping the first occurrence.
fn dedup(songs: Vec<Song>) -> Vec<Song> {
    let mut seen = HashSet::new();

    songs
        .into_iter()
        .filter(|s| s.id.is_empty() || seen.insert(s.id.clone()))
        .collect()
}

fn deserialize_songs<'de, D>(deserializer: D) -> Result<Vec<Song>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Song>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The server encodes "never" as the zero time, year 1.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(timestamp.filter(|t| t.year() > 1))
}

fn deserialize_coins<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let coins = i64::deserialize(deserializer)?;
    Ok(coins.max(0) as u64)
}

#[cfg(test)]
mod test {
    use super::*;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            name: format!("song {id}"),
            ..Default::default()
        }
    }

    fn ids(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_parse_snapshot() {
        let json = r#"{
            "preparequeue": null,
            "downloadqueue": [{"id": "b", "name": "Bee", "url": "https://example.com/b", "points": -2}],
            "playqueue": [{
                "id": "a",
                "name": "Ay",
                "hash": "abc",
                "addedby": "mary",
                "addedat": "2024-05-01T12:00:00Z",
                "playedat": "0001-01-01T00:00:00Z",
                "points": 3,
                "position": 0,
                "length": 180000000000
            }]
        }"#;

        let snapshot: QueueSnapshot = serde_json::from_str(json).unwrap();

        assert!(snapshot.prepare_queue.is_empty());
        assert_eq!(snapshot.download_queue[0].vote_score, -2);
        assert_eq!(snapshot.download_queue[0].source_locator, "https://example.com/b");

        let a = &snapshot.play_queue[0];
        assert_eq!(a.duration, Duration::from_secs(180));
        assert_eq!(a.added_by, "mary");
        assert!(a.added_at.is_some());
        assert!(a.played_at.is_none(), "zero time means never played");
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_placeholder_song() {
        let json = r#"{"name": "", "position": 0, "length": 0, "addedby": "", "addedat": "0001-01-01T00:00:00Z", "points": 0}"#;
        let song: Song = serde_json::from_str(json).unwrap();

        assert!(song.is_placeholder());
        assert_eq!(song.progress(), 0.);
    }

    #[test]
    fn test_merged_removes_current_song() {
        let snapshot = QueueSnapshot {
            play_queue: vec![song("a"), song("b")],
            ..Default::default()
        };

        let current = song("a");
        let merged = snapshot.merged(Some(&current));

        assert_eq!(ids(&merged.play_queue), vec!["b"]);
        assert_eq!(merged.current_song, Some(current));
    }

    #[test]
    fn test_merged_keeps_most_advanced_stage() {
        let snapshot = QueueSnapshot {
            prepare_queue: vec![song("a"), song("c")],
            download_queue: vec![song("a"), song("b")],
            play_queue: vec![song("b"), song("d"), song("d")],
            current_song: None,
        };

        let merged = snapshot.merged(None);

        assert_eq!(ids(&merged.play_queue), vec!["b", "d"]);
        assert_eq!(ids(&merged.download_queue), vec!["a"]);
        assert_eq!(ids(&merged.prepare_queue), vec!["c"]);
        assert_eq!(merged.find("a").map(|(stage, _)| stage), Some(Stage::Download));
    }

    #[test]
    fn test_identity_coins_clamped() {
        let identity: Identity =
            serde_json::from_str(r#"{"username": "john", "right": 2, "coins": -5}"#).unwrap();

        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.coin_balance, 0);
    }
}
