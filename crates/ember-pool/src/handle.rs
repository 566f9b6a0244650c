//! Generational slot handles

use std::fmt;

/// An opaque reference to a pool slot.
///
/// The generation counter is bumped every time the slot is freed, so a key
/// held across a free dereferences to `None` instead of reading whatever
/// object recycled the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Packed form, stable for the life of the slot. Used as a hash input
    /// for per-object tick staggering.
    pub fn raw(&self) -> u64 {
        ((self.index as u64) << 32) | self.generation as u64
    }
}

impl fmt::Debug for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotKey({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_packs_index_and_generation() {
        let k = SlotKey::new(5, 3);
        assert_eq!(k.raw(), (5u64 << 32) | 3);
        assert_eq!(k.index(), 5);
        assert_eq!(k.generation(), 3);
    }

    #[test]
    fn display_format() {
        let k = SlotKey::new(12, 2);
        assert_eq!(k.to_string(), "12v2");
    }
}
