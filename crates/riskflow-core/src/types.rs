use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

const SHORT_ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SHORT_ID_LEN: usize = 10;

/// Short random identifier (uppercase letters and digits).
///
/// Used for assessment IDs and note IDs, which are shown to users and typed
/// back on the command line, so they stay short rather than being UUIDs.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortId(pub String);

impl ShortId {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..SHORT_ID_LEN)
            .map(|_| SHORT_ID_CHARS[rng.gen_range(0..SHORT_ID_CHARS.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ShortId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShortId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Step counter of an assessment. `0` means the workflow has not been entered.
pub type Step = u32;

/// Deserialize helper treating an explicit `null` like a missing field.
///
/// Older snapshot files write `null` for empty collections.
pub fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
