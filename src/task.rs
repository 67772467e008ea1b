//! Compilation tasks.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::descriptor::{ShaderClass, ShaderFamily, TechniqueDescriptor};

/// One unit of compilation work: a normalized `(class, family, descriptor)`
/// key plus the cache generation it was created in.
///
/// Identity is [`CompilationTask::id`] alone; two tasks for the same key from
/// different generations compare equal.
#[derive(Clone, Copy)]
pub struct CompilationTask {
    pub class: ShaderClass,
    pub family: ShaderFamily,
    pub descriptor: TechniqueDescriptor,
    pub generation: u64,
}

impl CompilationTask {
    #[must_use]
    pub fn new(
        class: ShaderClass,
        family: ShaderFamily,
        descriptor: TechniqueDescriptor,
        generation: u64,
    ) -> Self {
        Self {
            class,
            family,
            descriptor,
            generation,
        }
    }

    /// `descriptor + (family << 32) + (class << 60)`.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        u64::from(self.descriptor.raw())
            + (u64::from(self.family.id()) << 32)
            + ((self.class as u64) << 60)
    }

    /// Key into the per-class program map.
    #[inline]
    #[must_use]
    pub fn program_key(&self) -> (ShaderFamily, TechniqueDescriptor) {
        (self.family, self.descriptor)
    }
}

impl PartialEq for CompilationTask {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for CompilationTask {}

impl Hash for CompilationTask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for CompilationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationTask")
            .field("class", &self.class)
            .field("family", &self.family)
            .field("descriptor", &self.descriptor)
            .field("generation", &self.generation)
            .finish()
    }
}

impl fmt::Display for CompilationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.family, self.class, self.descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_layout() {
        let task = CompilationTask::new(
            ShaderClass::Pixel,
            ShaderFamily::Water,
            TechniqueDescriptor::from_raw(0xDEAD),
            0,
        );
        assert_eq!(task.id(), 0xDEAD + (6 << 32) + (1 << 60));
    }

    #[test]
    fn generation_is_not_part_of_identity() {
        let d = TechniqueDescriptor::encode(1, 2);
        let a = CompilationTask::new(ShaderClass::Vertex, ShaderFamily::Lighting, d, 1);
        let b = CompilationTask::new(ShaderClass::Vertex, ShaderFamily::Lighting, d, 7);
        assert_eq!(a, b);

        let c = CompilationTask::new(ShaderClass::Pixel, ShaderFamily::Lighting, d, 1);
        assert_ne!(a, c);
    }

    #[test]
    fn display_is_readable() {
        let task = CompilationTask::new(
            ShaderClass::Vertex,
            ShaderFamily::Sky,
            TechniqueDescriptor::encode(4, 0x100),
            0,
        );
        assert_eq!(task.to_string(), "Sky:Vertex:04000100");
    }
}
