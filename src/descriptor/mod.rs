//! Technique Descriptors
//!
//! A [`TechniqueDescriptor`] is the 32-bit key the host renderer computes for
//! every draw. Bits 24..=29 carry the technique id; every other bit is an
//! independent boolean flag whose meaning depends on the [`ShaderFamily`].
//!
//! ```text
//!  31 30 | 29 ........ 24 | 23 ................................ 0
//!  flags |  technique id  |               flags
//! ```
//!
//! Descriptors are normalized (see [`normalize`]) before they are used as
//! cache keys so that flag combinations which cannot change the generated
//! program share one entry.

mod class;
pub mod flags;
mod normalize;

use std::fmt;

pub use class::{ShaderClass, ShaderFamily};
pub use normalize::{NormalizationRule, PassContext, RULES, normalize, normalize_for_pass, rule};

pub const TECHNIQUE_SHIFT: u32 = 24;
pub const TECHNIQUE_BITS: u32 = 0x3F;
pub const TECHNIQUE_MASK: u32 = TECHNIQUE_BITS << TECHNIQUE_SHIFT;

/// Technique id plus flag bits, packed into a `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TechniqueDescriptor(u32);

impl TechniqueDescriptor {
    /// Packs a technique id and a flag word. The technique field wins over
    /// any flag bits that collide with it.
    #[inline]
    #[must_use]
    pub const fn encode(technique: u32, flags: u32) -> Self {
        Self(((technique & TECHNIQUE_BITS) << TECHNIQUE_SHIFT) | (flags & !TECHNIQUE_MASK))
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn technique(self) -> u32 {
        (self.0 >> TECHNIQUE_SHIFT) & TECHNIQUE_BITS
    }

    #[inline]
    #[must_use]
    pub const fn flags(self) -> u32 {
        self.0 & !TECHNIQUE_MASK
    }

    #[inline]
    #[must_use]
    pub const fn with_technique(self, technique: u32) -> Self {
        Self::encode(technique, self.flags())
    }

    #[inline]
    #[must_use]
    pub const fn with_flags(self, flags: u32) -> Self {
        Self::encode(self.technique(), flags)
    }

    #[inline]
    #[must_use]
    pub const fn insert_flags(self, flags: u32) -> Self {
        self.with_flags(self.flags() | flags)
    }

    #[inline]
    #[must_use]
    pub const fn remove_flags(self, flags: u32) -> Self {
        self.with_flags(self.flags() & !flags)
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, flags: u32) -> bool {
        self.flags() & flags == flags
    }
}

impl fmt::Debug for TechniqueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TechniqueDescriptor")
            .field("technique", &self.technique())
            .field("flags", &format_args!("{:#010x}", self.flags()))
            .finish()
    }
}

impl fmt::Display for TechniqueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl From<u32> for TechniqueDescriptor {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode() {
        let d = TechniqueDescriptor::encode(17, 0b1011);
        assert_eq!(d.technique(), 17);
        assert_eq!(d.flags(), 0b1011);
        assert_eq!(d.raw(), (17 << 24) | 0b1011);
    }

    #[test]
    fn technique_wins_over_colliding_flags() {
        let d = TechniqueDescriptor::encode(0, 1 << 25);
        assert_eq!(d.flags(), 0);
        assert_eq!(d.technique(), 0);

        let d = TechniqueDescriptor::encode(64 + 5, 0);
        assert_eq!(d.technique(), 5);
    }

    #[test]
    fn high_flag_bits_survive() {
        let d = TechniqueDescriptor::encode(3, 1 << 31 | 1 << 30);
        assert_eq!(d.technique(), 3);
        assert!(d.contains(1 << 31));
        assert!(d.contains(1 << 30));
    }

    #[test]
    fn every_technique_round_trips() {
        for technique in 0..64 {
            for flags in [0, 1, 0x00FF_FFFF, 0xC000_0000] {
                let d = TechniqueDescriptor::encode(technique, flags);
                assert_eq!(d.technique(), technique);
                assert_eq!(d.flags(), flags);
            }
        }
    }

    #[test]
    fn flag_editing_keeps_technique() {
        let d = TechniqueDescriptor::encode(9, 0b100)
            .insert_flags(0b1)
            .remove_flags(0b100);
        assert_eq!(d.technique(), 9);
        assert_eq!(d.flags(), 0b1);
    }
}
