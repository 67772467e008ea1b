//! Compiled programs and their constant tables.

use std::fmt;

use smallvec::SmallVec;

use crate::descriptor::{ShaderClass, ShaderFamily, TechniqueDescriptor};
use crate::device::NativeProgram;
use crate::layout;

/// The engine-owned constant buffers a program may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantBuffer {
    PerTechnique = 0,
    PerMaterial = 1,
    PerGeometry = 2,
}

impl ConstantBuffer {
    pub const ALL: [ConstantBuffer; 3] = [Self::PerTechnique, Self::PerMaterial, Self::PerGeometry];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PerTechnique => "PerTechnique",
            Self::PerMaterial => "PerMaterial",
            Self::PerGeometry => "PerGeometry",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|buffer| buffer.name() == name)
    }
}

/// A variable reported by reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedVariable {
    pub name: String,
    /// Byte offset from the start of the buffer.
    pub offset: u32,
    pub size: u32,
}

/// A constant buffer reported by reflection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReflectedBuffer {
    pub name: String,
    /// Size in bytes.
    pub size: u32,
    pub variables: Vec<ReflectedVariable>,
}

/// Maps engine constant slots to offsets inside the program's buffers.
#[derive(Clone, PartialEq, Eq)]
pub struct ConstantTable {
    /// Offset per slot in 4-byte units, `-1` when the program does not use
    /// the slot.
    offsets: SmallVec<[i16; 32]>,
    /// Size of each [`ConstantBuffer`] in 16-byte registers.
    buffer_sizes: [u32; 3],
}

impl Default for ConstantTable {
    fn default() -> Self {
        Self::with_slots(0)
    }
}

impl ConstantTable {
    pub const UNUSED: i16 = -1;

    #[must_use]
    pub fn with_slots(slots: usize) -> Self {
        Self {
            offsets: SmallVec::from_elem(Self::UNUSED, slots),
            buffer_sizes: [0; 3],
        }
    }

    /// Builds the table for a `(family, class)` program from reflection.
    /// Buffers other than the three engine buffers are ignored, as are
    /// variables without an engine slot.
    #[must_use]
    pub fn from_reflection(
        family: ShaderFamily,
        class: ShaderClass,
        buffers: &[ReflectedBuffer],
    ) -> Self {
        let mut table = Self::with_slots(layout::slot_names(family, class).len());

        for buffer in buffers {
            let Some(kind) = ConstantBuffer::from_name(&buffer.name) else {
                log::trace!("Skipping buffer {} of {family}/{class}", buffer.name);
                continue;
            };

            for variable in &buffer.variables {
                match layout::slot_of(family, class, &variable.name) {
                    Some(slot) => table.offsets[slot] = (variable.offset / 4) as i16,
                    None => log::trace!(
                        "Unknown variable {} in {family}/{class} buffer {}",
                        variable.name,
                        buffer.name
                    ),
                }
            }

            table.buffer_sizes[kind as usize] = buffer.size.div_ceil(16);
        }

        table
    }

    /// Offset of `slot` in 4-byte units, or `None` if unused.
    #[must_use]
    pub fn offset(&self, slot: usize) -> Option<u32> {
        self.offsets
            .get(slot)
            .copied()
            .filter(|&offset| offset != Self::UNUSED)
            .map(|offset| offset as u32)
    }

    /// Raw offsets, `-1` for unused slots.
    #[must_use]
    pub fn offsets(&self) -> &[i16] {
        &self.offsets
    }

    /// Buffer size in 16-byte registers; 0 if the buffer is absent.
    #[must_use]
    pub fn buffer_size(&self, buffer: ConstantBuffer) -> u32 {
        self.buffer_sizes[buffer as usize]
    }
}

impl fmt::Debug for ConstantTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantTable")
            .field("used_slots", &self.offsets.iter().filter(|&&o| o != Self::UNUSED).count())
            .field("buffer_sizes", &self.buffer_sizes)
            .finish()
    }
}

/// A ready-to-bind program.
///
/// Owns the native program object; it is released when the last `Arc`
/// holding this program is dropped.
pub struct CompiledProgram {
    pub class: ShaderClass,
    pub family: ShaderFamily,
    pub descriptor: TechniqueDescriptor,
    native: Box<dyn NativeProgram>,
    bytecode_len: usize,
    constants: ConstantTable,
}

impl CompiledProgram {
    #[must_use]
    pub fn new(
        class: ShaderClass,
        family: ShaderFamily,
        descriptor: TechniqueDescriptor,
        native: Box<dyn NativeProgram>,
        bytecode_len: usize,
        constants: ConstantTable,
    ) -> Self {
        Self {
            class,
            family,
            descriptor,
            native,
            bytecode_len,
            constants,
        }
    }

    #[inline]
    #[must_use]
    pub fn native(&self) -> &dyn NativeProgram {
        self.native.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn bytecode_len(&self) -> usize {
        self.bytecode_len
    }

    #[inline]
    #[must_use]
    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }
}

impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("class", &self.class)
            .field("family", &self.family)
            .field("descriptor", &self.descriptor)
            .field("native", &self.native.label())
            .field("bytecode_len", &self.bytecode_len)
            .field("constants", &self.constants)
            .finish()
    }
}
