use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::identity::Identity;

/// Sliding window of per-frame identity sets.
///
/// Each slot holds the identities seen in one frame that produced any
/// recognition result; `None` marks a slot that was never filled. Frames
/// without results never overwrite a slot, so consensus spans the last
/// `window` frames that actually saw someone.
#[derive(Clone, Debug)]
pub struct IdentityVoteBuffer {
    slots: Vec<Option<Vec<Identity>>>,
    cursor: usize,
    last_detection: Option<Instant>,
}

impl IdentityVoteBuffer {
    pub fn new(window: usize) -> Result<Self, &'static str> {
        if window == 0 {
            return Err("vote window must be at least 1");
        }
        Ok(Self {
            slots: vec![None; window],
            cursor: 0,
            last_detection: None,
        })
    }

    pub fn window(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot the next vote overwrites.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn slots(&self) -> &[Option<Vec<Identity>>] {
        &self.slots
    }

    /// Time of the last non-empty vote, `None` before the first one.
    pub fn last_detection_time(&self) -> Option<Instant> {
        self.last_detection
    }

    /// Time since the last non-empty vote. Never-voted buffers report `None`.
    pub fn since_last_detection(&self, now: Instant) -> Option<Duration> {
        self.last_detection
            .map(|t| now.saturating_duration_since(t))
    }

    /// Stores one frame's identities. An empty list is ignored entirely.
    /// Returns whether a slot was written.
    pub fn record(&mut self, identities: &[Identity], now: Instant) -> bool {
        if identities.is_empty() {
            return false;
        }
        let mut vote = identities.to_vec();
        vote.sort_unstable();
        vote.dedup();
        self.slots[self.cursor] = Some(vote);
        self.cursor = (self.cursor + 1) % self.slots.len();
        self.last_detection = Some(now);
        true
    }

    /// Identity present in every slot of the window, if any.
    ///
    /// Each identity counts once per slot. When several identities are
    /// present everywhere, known identities win over `Unknown` and the
    /// lowest index wins among known ones.
    pub fn is_consistent(&self) -> Option<Identity> {
        let mut tally: BTreeMap<Identity, usize> = BTreeMap::new();
        for vote in self.slots.iter().flatten() {
            for &identity in vote {
                *tally.entry(identity).or_default() += 1;
            }
        }
        tally
            .into_iter()
            .find(|&(_, count)| count == self.slots.len())
            .map(|(identity, _)| identity)
    }

    /// Clears every slot and rewinds the cursor. The last detection time is
    /// kept.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.cursor = 0;
    }
}
