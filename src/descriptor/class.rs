//! Shader classes (pipeline stages) and shader families.

use std::fmt;

/// The pipeline stage a program is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ShaderClass {
    Vertex = 0,
    Pixel = 1,
    Compute = 2,
}

impl ShaderClass {
    pub const ALL: [ShaderClass; 3] = [Self::Vertex, Self::Pixel, Self::Compute];

    /// Dense index, suitable for per-class arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Compiler target profile.
    #[must_use]
    pub const fn profile(self) -> &'static str {
        match self {
            Self::Vertex => "vs_5_0",
            Self::Pixel => "ps_5_0",
            Self::Compute => "cs_5_0",
        }
    }

    /// Stage define injected into every compilation of this class.
    #[must_use]
    pub const fn stage_define(self) -> &'static str {
        match self {
            Self::Vertex => "VSHADER",
            Self::Pixel => "PSHADER",
            Self::Compute => "CSHADER",
        }
    }

    /// File extension used by the disk cache.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Vertex => "vso",
            Self::Pixel => "pso",
            Self::Compute => "cso",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "Vertex",
            Self::Pixel => "Pixel",
            Self::Compute => "Compute",
        }
    }
}

impl fmt::Display for ShaderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The engine shader subsystem that owns a technique.
///
/// Each family maps to one HLSL source file under the shader root and has its
/// own flag vocabulary (see [`super::flags`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ShaderFamily {
    Lighting = 0,
    BloodSplatter = 1,
    DistantTree = 2,
    Sky = 3,
    Grass = 4,
    Particle = 5,
    Water = 6,
    Effect = 7,
    Utility = 8,
    ImageSpace = 9,
}

impl ShaderFamily {
    pub const ALL: [ShaderFamily; 10] = [
        Self::Lighting,
        Self::BloodSplatter,
        Self::DistantTree,
        Self::Sky,
        Self::Grass,
        Self::Particle,
        Self::Water,
        Self::Effect,
        Self::Utility,
        Self::ImageSpace,
    ];

    /// Stable numeric id, folded into task ids and disk cache hashes.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lighting => "Lighting",
            Self::BloodSplatter => "BloodSplatter",
            Self::DistantTree => "DistantTree",
            Self::Sky => "Sky",
            Self::Grass => "RunGrass",
            Self::Particle => "Particle",
            Self::Water => "Water",
            Self::Effect => "Effect",
            Self::Utility => "Utility",
            Self::ImageSpace => "ImageSpace",
        }
    }

    /// Source file name relative to the shader root.
    #[must_use]
    pub fn source_file(self) -> String {
        format!("{}.hlsl", self.name())
    }

    /// Looks a family up by its source file stem.
    #[must_use]
    pub fn from_source_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.name() == stem)
    }

    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.id() == id)
    }
}

impl fmt::Display for ShaderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_metadata() {
        assert_eq!(ShaderClass::Vertex.profile(), "vs_5_0");
        assert_eq!(ShaderClass::Pixel.stage_define(), "PSHADER");
        assert_eq!(ShaderClass::Compute.extension(), "cso");
        for (i, class) in ShaderClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
    }

    #[test]
    fn family_ids_are_unique_and_round_trip() {
        for family in ShaderFamily::ALL {
            assert_eq!(ShaderFamily::from_id(family.id()), Some(family));
            assert_eq!(ShaderFamily::from_source_stem(family.name()), Some(family));
        }
        assert_eq!(ShaderFamily::Lighting.source_file(), "Lighting.hlsl");
        assert_eq!(ShaderFamily::from_source_stem("Common"), None);
    }
}
