//! Per-family flag vocabularies and technique ids.
//!
//! Flag constants are named after the preprocessor define they enable, so
//! define generation can walk [`bitflags::Flags::iter_names`] directly. Every
//! vocabulary is checked at compile time to stay clear of the technique field.

use bitflags::bitflags;

use super::TECHNIQUE_MASK;

macro_rules! techniques {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $id:literal => [$($define:literal),* $(,)?]),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $id),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),*];

            #[inline]
            #[must_use]
            pub const fn id(self) -> u32 {
                self as u32
            }

            #[must_use]
            pub fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($id => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Defines selecting this technique in the family source.
            #[must_use]
            pub const fn defines(self) -> &'static [&'static str] {
                match self {
                    $(Self::$variant => &[$($define),*],)*
                }
            }
        }
    };
}

// ============================================================================
// Lighting
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LightingFlags: u32 {
        const VC = 1 << 0;
        const SKINNED = 1 << 1;
        const MODELSPACENORMALS = 1 << 2;
        const TRUE_PBR = 1 << 3;
        const DEFERRED = 1 << 4;
        const SPECULAR = 1 << 9;
        const SOFT_LIGHTING = 1 << 10;
        const RIM_LIGHTING = 1 << 11;
        const BACK_LIGHTING = 1 << 12;
        const SHADOW_DIR = 1 << 13;
        const DEFSHADOW = 1 << 14;
        const PROJECTED_UV = 1 << 15;
        const ANISO_LIGHTING = 1 << 16;
        const AMBIENT_SPECULAR = 1 << 17;
        const WORLD_MAP = 1 << 18;
        const BASE_OBJECT_IS_SNOW = 1 << 19;
        const DO_ALPHA_TEST = 1 << 20;
        const SNOW = 1 << 21;
        const CHARACTER_LIGHT = 1 << 22;
        const ADDITIONAL_ALPHA_MASK = 1 << 23;
    }
}

techniques! {
    LightingTechnique {
        None = 0 => [],
        Envmap = 1 => ["ENVMAP"],
        Glowmap = 2 => ["GLOWMAP"],
        Parallax = 3 => ["PARALLAX"],
        Facegen = 4 => ["FACEGEN"],
        FacegenRgbTint = 5 => ["FACEGEN_RGB_TINT"],
        Hair = 6 => ["HAIR"],
        ParallaxOcc = 7 => ["PARALLAX_OCC"],
        MtLand = 8 => ["MULTI_TEXTURE", "LANDSCAPE"],
        LodLand = 9 => ["LODLANDSCAPE"],
        Snow = 10 => ["SNOW_FLAG"],
        MultilayerParallax = 11 => ["MULTI_LAYER_PARALLAX"],
        TreeAnim = 12 => ["TREE_ANIM"],
        LodObjects = 13 => ["LODOBJECTS"],
        MultiIndexSparkle = 14 => ["MULTI_INDEX", "SPARKLE"],
        LodObjectHd = 15 => ["LODOBJECTSHD"],
        Eye = 16 => ["EYE"],
        Cloud = 17 => ["CLOUD", "INSTANCED"],
        LodLandNoise = 18 => ["LODLANDSCAPE", "LODLANDNOISE"],
        MtLandLodBlend = 19 => ["MULTI_TEXTURE", "LANDSCAPE", "LOD_LAND_BLEND"],
        Outline = 20 => ["OUTLINE"],
    }
}

// ============================================================================
// Water
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WaterFlags: u32 {
        const VC = 1 << 0;
        const NORMAL_TEXCOORD = 1 << 1;
        const REFLECTIONS = 1 << 2;
        const REFRACTIONS = 1 << 3;
        const DEPTH = 1 << 4;
        const INTERIOR = 1 << 5;
        const WADING = 1 << 6;
        const VERTEX_ALPHA_DEPTH = 1 << 7;
        const CUBEMAP = 1 << 8;
        const FLOWMAP = 1 << 9;
        const BLEND_NORMALS = 1 << 10;
    }
}

/// Water technique. Ids below [`WaterTechnique::FIRST_NAMED`] select the
/// specular technique with that many specular lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaterTechnique {
    Specular { lights: u32 },
    Underwater,
    Lod,
    Stencil,
    Simple,
}

impl WaterTechnique {
    pub const FIRST_NAMED: u32 = 8;

    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::Specular { lights } => lights,
            Self::Underwater => 8,
            Self::Lod => 9,
            Self::Stencil => 10,
            Self::Simple => 11,
        }
    }

    #[must_use]
    pub const fn from_id(id: u32) -> Option<Self> {
        match id {
            0..Self::FIRST_NAMED => Some(Self::Specular { lights: id }),
            8 => Some(Self::Underwater),
            9 => Some(Self::Lod),
            10 => Some(Self::Stencil),
            11 => Some(Self::Simple),
            _ => None,
        }
    }
}

// ============================================================================
// Effect
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EffectFlags: u32 {
        const VC = 1 << 0;
        const TEXCOORD = 1 << 1;
        const TEXCOORD_INDEX = 1 << 2;
        const SKINNED = 1 << 3;
        const NORMALS = 1 << 4;
        const BINORMAL_TANGENT = 1 << 5;
        const TEXTURE = 1 << 6;
        const INDEXED_TEXTURE = 1 << 7;
        const FALLOFF = 1 << 8;
        const ADDBLEND = 1 << 10;
        const MULTBLEND = 1 << 11;
        const PARTICLES = 1 << 12;
        const STRIP_PARTICLES = 1 << 13;
        const BLOOD = 1 << 14;
        const MEMBRANE = 1 << 15;
        const LIGHTING = 1 << 16;
        const PROJECTED_UV = 1 << 17;
        const SOFT = 1 << 18;
        const GRAYSCALE_TO_COLOR = 1 << 19;
        const GRAYSCALE_TO_ALPHA = 1 << 20;
        const IGNORE_TEX_ALPHA = 1 << 21;
        const MULTBLEND_DECAL = 1 << 22;
        const ALPHA_TEST = 1 << 23;
        const SKY_OBJECT = 1 << 30;
        const DEFERRED = 1 << 31;
    }
}

// ============================================================================
// Grass
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GrassFlags: u32 {
        const DO_ALPHA_TEST = 1 << 16;
    }
}

techniques! {
    GrassTechnique {
        Default = 0 => [],
        RenderDepth = 1 => ["RENDER_DEPTH"],
        TruePbr = 2 => ["TRUE_PBR"],
    }
}

// ============================================================================
// Distant trees
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DistantTreeFlags: u32 {
        const DEFERRED = 1 << 8;
        const DO_ALPHA_TEST = 1 << 16;
    }
}

techniques! {
    DistantTreeTechnique {
        Default = 0 => [],
        Depth = 1 => ["RENDER_DEPTH"],
    }
}

// ============================================================================
// Sky
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SkyFlags: u32 {
        const DEFERRED = 1 << 8;
    }
}

techniques! {
    SkyTechnique {
        SunOcclude = 0 => ["OCCLUSION"],
        SunGlare = 1 => ["TEX", "DITHER"],
        MoonAndStarsMask = 2 => ["TEX", "MOONMASK"],
        Stars = 3 => ["HORIZFADE"],
        Clouds = 4 => ["TEX", "CLOUDS"],
        CloudsLerp = 5 => ["TEX", "CLOUDS", "TEXLERP"],
        CloudsFade = 6 => ["TEX", "CLOUDS", "TEXFADE"],
        Texture = 7 => ["TEX"],
        Sky = 8 => ["DITHER"],
    }
}

// ============================================================================
// Blood splatter
// ============================================================================

techniques! {
    BloodSplatterTechnique {
        Splatter = 0 => ["SPLATTER"],
        Flare = 1 => ["FLARE"],
    }
}

// ============================================================================
// Utility
// ============================================================================

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UtilityFlags: u32 {
        const VC = 1 << 0;
        const TEXTURE = 1 << 1;
        const SKINNED = 1 << 2;
        const NORMALS = 1 << 3;
        const ALPHA_TEST = 1 << 7;
        const LOD_LANDSCAPE = 1 << 8;
        const RENDER_NORMAL = 1 << 9;
        const RENDER_NORMAL_FALLOFF = 1 << 10;
        const RENDER_NORMAL_CLAMP = 1 << 11;
        const RENDER_NORMAL_CLEAR = 1 << 12;
        const RENDER_DEPTH = 1 << 13;
        const RENDER_SHADOWMAP = 1 << 14;
        const OPAQUE_EFFECT = 1 << 17;
        const ADDITIONAL_ALPHA_MASK = 1 << 19;
        const GRAYSCALE_TO_ALPHA = 1 << 22;
    }
}

const _: () = assert!(LightingFlags::all().bits() & TECHNIQUE_MASK == 0);
const _: () = assert!(WaterFlags::all().bits() & TECHNIQUE_MASK == 0);
const _: () = assert!(EffectFlags::all().bits() & TECHNIQUE_MASK == 0);
const _: () = assert!(GrassFlags::all().bits() & TECHNIQUE_MASK == 0);
const _: () = assert!(DistantTreeFlags::all().bits() & TECHNIQUE_MASK == 0);
const _: () = assert!(SkyFlags::all().bits() & TECHNIQUE_MASK == 0);
const _: () = assert!(UtilityFlags::all().bits() & TECHNIQUE_MASK == 0);
