//! Serializes a [Duration] as an integer amount of nanoseconds, which is how the server encodes time spans.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_nanos().min(u64::MAX as u128) as u64)
}

/// Negative spans are clamped to zero
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let nanos = i64::deserialize(deserializer)?;
    Ok(Duration::from_nanos(nanos.max(0) as u64))
}
