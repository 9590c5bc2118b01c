//! Play queue
//!
//! Tracks are stored in enqueue order and never reordered. Play order is a
//! separate permutation of indices into that list:
//!
//! ```text
//! tracks (enqueue order):  [A, B, C, D]
//! order  (play order):     [2, 0, 3, 1]   -> C, A, D, B
//! position:                 ^ slot 1      -> current = A
//! ```
//!
//! Because `tracks` is the enqueue record, turning shuffle off is just
//! resetting `order` to the identity.

use crate::shuffle::{identity_order, shuffled_order};
use crate::types::{Track, TrackId};
use rand::Rng;

/// Queue with a play-order permutation and a current slot
///
/// Invariant: `position` is `Some(slot)` with `slot < order.len()` whenever
/// the queue is non-empty, and `None` when it is empty.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Tracks in enqueue order
    tracks: Vec<Track>,

    /// Play order, indices into `tracks`
    order: Vec<usize>,

    /// Current slot in `order`
    position: Option<usize>,

    /// Whether `order` is currently a shuffle
    shuffled: bool,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tracks in enqueue order
    ///
    /// New tracks go to the end of the play order even when shuffled. Tracks
    /// whose id is already queued are skipped and returned.
    pub fn append(&mut self, tracks: Vec<Track>) -> Vec<Track> {
        let mut rejected = Vec::new();
        for track in tracks {
            if self.contains(&track.id) {
                rejected.push(track);
                continue;
            }
            self.order.push(self.tracks.len());
            self.tracks.push(track);
        }

        if self.position.is_none() && !self.tracks.is_empty() {
            self.position = Some(0);
        }

        rejected
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.order.clear();
        self.position = None;
        self.shuffled = false;
    }

    /// Shuffle the play order, keeping the current track as anchor
    ///
    /// The position follows the current track to wherever it lands.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let current = self.current_index();
        self.order = shuffled_order(self.tracks.len(), rng);
        self.shuffled = true;
        self.relocate(current);
    }

    /// Restore enqueue order, keeping the current track as anchor
    pub fn restore_original_order(&mut self) {
        let current = self.current_index();
        self.order = identity_order(self.tracks.len());
        self.shuffled = false;
        self.relocate(current);
    }

    /// Move the current slot
    ///
    /// Returns false (and leaves position alone) if `slot` is out of range.
    pub fn set_position(&mut self, slot: usize) -> bool {
        if slot < self.order.len() {
            self.position = Some(slot);
            true
        } else {
            false
        }
    }

    /// Current slot in play order
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Track at the current slot
    pub fn current(&self) -> Option<&Track> {
        self.current_index().map(|index| &self.tracks[index])
    }

    /// Track at a slot in play order
    pub fn get(&self, slot: usize) -> Option<&Track> {
        self.order.get(slot).map(|&index| &self.tracks[index])
    }

    /// Slot in play order holding the track with this id
    pub fn slot_of(&self, id: &TrackId) -> Option<usize> {
        let index = self.tracks.iter().position(|t| &t.id == id)?;
        self.order.iter().position(|&i| i == index)
    }

    /// Check whether a track id is queued
    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.iter().any(|t| &t.id == id)
    }

    /// Tracks in play order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.order.iter().map(move |&index| &self.tracks[index])
    }

    /// Tracks in enqueue order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Play order as indices into enqueue order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Total number of tracks in queue
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Check if play order is shuffled
    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    fn current_index(&self) -> Option<usize> {
        self.position.and_then(|slot| self.order.get(slot).copied())
    }

    fn relocate(&mut self, current: Option<usize>) {
        self.position = match current {
            Some(index) => self.order.iter().position(|&i| i == index),
            None if self.order.is_empty() => None,
            None => Some(0),
        };
    }
}
