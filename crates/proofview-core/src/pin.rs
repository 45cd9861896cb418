//! The pinned-location set and its key allocator

use crate::{Location, PinnedLocation};

/// Pinned locations plus the allocator for their keys.
///
/// Keys are handed out once and never reused, even after an unpin, so a key
/// names the same pin on both sides of the view boundary for the whole
/// session.
#[derive(Debug, Clone)]
pub struct PinSet {
    pins: Vec<PinnedLocation>,
    next_key: u64,
}

impl PinSet {
    pub fn new() -> Self {
        PinSet {
            pins: Vec::new(),
            next_key: 1,
        }
    }

    /// Pin `loc`. Returns `false` and changes nothing if a structurally
    /// equal location is already pinned.
    pub fn pin(&mut self, loc: Location) -> bool {
        if self.is_pinned(&loc) {
            return false;
        }
        let key = self.next_key;
        self.next_key += 1;
        self.pins.push(PinnedLocation { loc, key });
        true
    }

    /// Remove the pin with `key`. Returns whether one was there.
    pub fn unpin_key(&mut self, key: u64) -> bool {
        let before = self.pins.len();
        self.pins.retain(|p| p.key != key);
        self.pins.len() != before
    }

    /// Remove whatever is pinned exactly at `loc`, returning its key.
    pub fn unpin_at(&mut self, loc: &Location) -> Option<u64> {
        let idx = self.pins.iter().position(|p| &p.loc == loc)?;
        Some(self.pins.remove(idx).key)
    }

    pub fn is_pinned(&self, loc: &Location) -> bool {
        self.pins.iter().any(|p| &p.loc == loc)
    }

    pub fn pins(&self) -> &[PinnedLocation] {
        &self.pins
    }

    /// Mutable view for dragging pins through document edits.
    pub fn pins_mut(&mut self) -> &mut [PinnedLocation] {
        &mut self.pins
    }

    /// Adopt a replicated list wholesale. The allocator jumps past every
    /// adopted key so keys minted later stay unique.
    pub fn replace(&mut self, pins: Vec<PinnedLocation>) {
        if let Some(max) = pins.iter().map(|p| p.key).max() {
            self.next_key = self.next_key.max(max + 1);
        }
        self.pins = pins;
    }
}

impl Default for PinSet {
    fn default() -> Self {
        Self::new()
    }
}
