use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Who a recognized face belongs to.
///
/// Known identities are 1-indexed positions in the reference gallery.
/// Variant order matters: `Known` sorts before `Unknown`, and known
/// identities sort by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Known(u32),
    Unknown,
}

/// Wire value of [`Identity::Unknown`].
pub const UNKNOWN_INDEX: i64 = -1;

impl Identity {
    /// Maps a wire index to an identity; anything below 1 is unknown.
    pub fn from_index(index: i64) -> Self {
        if index >= 1 && index <= u32::MAX as i64 {
            Identity::Known(index as u32)
        } else {
            Identity::Unknown
        }
    }

    pub fn index(self) -> i64 {
        match self {
            Identity::Known(n) => n as i64,
            Identity::Unknown => UNKNOWN_INDEX,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Identity::Known(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Known(n) => write!(f, "user {n}"),
            Identity::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.index())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Identity::from_index)
    }
}

/// Most frequent identity among reference matches.
///
/// Ties go to the lowest index; an empty match list is `Unknown`.
pub fn most_common_identity(matches: &[Identity]) -> Identity {
    let mut counts: BTreeMap<Identity, usize> = BTreeMap::new();
    for &identity in matches {
        *counts.entry(identity).or_default() += 1;
    }
    let mut best: Option<(Identity, usize)> = None;
    for (identity, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((identity, count));
        }
    }
    best.map_or(Identity::Unknown, |(identity, _)| identity)
}
