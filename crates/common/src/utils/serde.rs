//! Serde adapters for configuration values
//!
//! Configuration documents express intervals and timeouts as integer
//! milliseconds (`session_check_interval = 60000`); the auth core works with
//! [`Duration`].

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize/deserialize a [`Duration`] as integer milliseconds
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use serde::{Deserialize, Serialize};
/// use webgate_common::duration_millis;
///
/// #[derive(Serialize, Deserialize)]
/// struct Timeouts {
///     #[serde(with = "duration_millis")]
///     silent_auth: Duration,
/// }
///
/// let parsed: Timeouts = serde_json::from_str(r#"{"silent_auth":10000}"#).unwrap();
/// assert_eq!(parsed.silent_auth, Duration::from_secs(10));
/// ```
pub mod duration_millis {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    /// Serde serialization result type
    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as milliseconds, saturating at `u64::MAX`
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserialize milliseconds into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
