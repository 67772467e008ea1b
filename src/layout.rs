//! Engine constant slots.
//!
//! The host renderer fills constant buffers by *slot*: a per-`(family,
//! class)` index into the parameter list it knows. A replacement program may
//! lay its buffers out differently, so the slot of every reflected variable is
//! looked up here by name and its actual offset is recorded in the
//! program's [`ConstantTable`](crate::program::ConstantTable).

use crate::descriptor::{ShaderClass, ShaderFamily};

const LIGHTING_VS: &[&str] = &[
    "World",
    "PreviousWorld",
    "EyePosition",
    "LandBlendParams",
    "TreeParams",
    "WindTimers",
    "TextureProj",
    "IndexScale",
    "WorldMapOverlayParameters",
    "LeftEyeCenter",
    "RightEyeCenter",
    "TexcoordOffset",
    "HighDetailRange",
    "FogParam",
    "FogNearColor",
    "FogFarColor",
    "Bones",
];

const LIGHTING_PS: &[&str] = &[
    "NumLightNumShadowLight",
    "PointLightPosition",
    "PointLightColor",
    "DirLightDirection",
    "DirLightColor",
    "DirectionalAmbient",
    "AmbientSpecularTintAndFresnelPower",
    "MaterialData",
    "EmitColor",
    "AlphaTestRef",
    "ShadowLightMaskSelect",
    "VPOSOffset",
    "ProjectedUVParams",
    "ProjectedUVParams2",
    "ProjectedUVParams3",
    "SplitDistance",
    "SSRParams",
    "WorldMapOverlayParametersPS",
    "AmbientColor",
    "FogColor",
    "ColourOutputClamp",
    "EnvmapData",
    "ParallaxOccData",
    "TintColor",
    "LODTexParams",
    "SpecularColor",
    "SparkleParams",
    "MultiLayerParallaxData",
    "LightingEffectParams",
    "IBLParams",
    "LandscapeTexture1to4IsSnow",
    "LandscapeTexture5to6IsSnow",
    "LandscapeTexture1to4IsSpecPower",
    "LandscapeTexture5to6IsSpecPower",
    "SnowRimLightParameters",
    "CharacterLightParams",
    "PBRFlags",
    "PBRParams1",
    "PBRParams2",
];

const BLOOD_SPLATTER_VS: &[&str] = &["WorldViewProj", "LightLoc", "Ctrl"];
const BLOOD_SPLATTER_PS: &[&str] = &["Alpha"];

const DISTANT_TREE_VS: &[&str] = &[
    "InstanceData",
    "WorldViewProj",
    "World",
    "PreviousWorld",
    "FogParam",
    "FogNearColor",
    "FogFarColor",
    "DiffuseDir",
    "IndexScale",
];
const DISTANT_TREE_PS: &[&str] = &["DiffuseColor", "AmbientColor"];

const SKY_VS: &[&str] = &[
    "WorldViewProj",
    "World",
    "PreviousWorld",
    "BlendColor",
    "EyePosition",
    "TexCoordOff",
    "VParams",
];
const SKY_PS: &[&str] = &["PParams"];

const GRASS_VS: &[&str] = &[
    "WorldViewProj",
    "WorldView",
    "World",
    "PreviousWorld",
    "FogNearColor",
    "WindVector",
    "WindTimer",
    "DirLightDirection",
    "PreviousWindTimer",
    "DirLightColor",
    "AlphaParam1",
    "AmbientColor",
    "AlphaParam2",
    "ScaleMask",
    "ShadowClampValue",
];
const GRASS_PS: &[&str] = &["PBRFlags", "PBRParams1", "PBRParams2"];

const PARTICLE_VS: &[&str] = &[
    "WorldViewProj",
    "PrevWorldViewProj",
    "PrecipitationOcclusionWorldViewProj",
    "fVars0",
    "fVars1",
    "fVars2",
    "fVars3",
    "fVars4",
    "Color1",
    "Color2",
    "Color3",
    "Velocity",
    "Acceleration",
    "ScaleAdjust",
    "Wind",
];
const PARTICLE_PS: &[&str] = &["ColorScale", "TextureSize"];

const EFFECT_VS: &[&str] = &[
    "World",
    "PreviousWorld",
    "Bones",
    "EyePosition",
    "FogParam",
    "FogNearColor",
    "FogFarColor",
    "FalloffData",
    "SoftMateralVSParams",
    "TexcoordOffset",
    "TexcoordOffsetMembrane",
    "SubTexOffset",
    "PosAdjust",
    "MatProj",
];
const EFFECT_PS: &[&str] = &[
    "PropertyColor",
    "AlphaTestRef",
    "MembraneRimColor",
    "MembraneVars",
    "PLightPositionX",
    "PLightPositionY",
    "PLightPositionZ",
    "PLightingRadiusInverseSquared",
    "PLightColorR",
    "PLightColorG",
    "PLightColorB",
    "DLightColor",
    "VPOSOffset",
    "CameraData",
    "FilteringParam",
    "BaseColor",
    "BaseColorScale",
    "LightingInfluence",
];

const WATER_VS: &[&str] = &[
    "WorldViewProj",
    "World",
    "PreviousWorld",
    "QPosAdjust",
    "ObjectUV",
    "NormalsScroll0",
    "NormalsScroll1",
    "NormalsScale",
    "VSFogParam",
    "VSFogNearColor",
    "VSFogFarColor",
    "CellTexCoordOffset",
    "SubTexOffset",
    "PosAdjust",
    "MatProj",
];
const WATER_PS: &[&str] = &[
    "TextureProj",
    "ShallowColor",
    "DeepColor",
    "ReflectionColor",
    "FresnelRI",
    "BlendRadius",
    "PosAdjust",
    "ReflectPlane",
    "CameraData",
    "ProjData",
    "VarAmounts",
    "FogParam",
    "FogNearColor",
    "FogFarColor",
    "SunDir",
    "SunColor",
    "NumLights",
    "LightPos",
    "LightColor",
    "WaterParams",
    "DepthControl",
    "SSRParams",
    "SSRParams2",
    "NormalsAmplitude",
    "VPOSOffset",
];

const UTILITY_VS: &[&str] = &[
    "World",
    "TexcoordOffset",
    "EyePos",
    "HighDetailRange",
    "ParabolaParam",
    "ShadowFadeParam",
    "TreeParams",
    "WaterParams",
    "Bones",
];
const UTILITY_PS: &[&str] = &[
    "AlphaTestRef",
    "RefractionPower",
    "DebugColor",
    "BaseColor",
    "PropertyColor",
    "FocusShadowMapProj",
    "ShadowMapProj",
    "ShadowSampleParam",
    "ShadowLightParam",
    "ShadowFadeParam",
    "FocusShadowFadeParam",
    "EndSplitDistances",
    "StartSplitDistances",
    "FogNearColor",
    "VPOSOffset",
];

/// Names of the engine constant slots for `(family, class)`, indexed by slot.
/// Compute programs and image-space programs have no engine-side slots.
#[must_use]
pub fn slot_names(family: ShaderFamily, class: ShaderClass) -> &'static [&'static str] {
    use ShaderClass::{Pixel, Vertex};

    match (family, class) {
        (ShaderFamily::Lighting, Vertex) => LIGHTING_VS,
        (ShaderFamily::Lighting, Pixel) => LIGHTING_PS,
        (ShaderFamily::BloodSplatter, Vertex) => BLOOD_SPLATTER_VS,
        (ShaderFamily::BloodSplatter, Pixel) => BLOOD_SPLATTER_PS,
        (ShaderFamily::DistantTree, Vertex) => DISTANT_TREE_VS,
        (ShaderFamily::DistantTree, Pixel) => DISTANT_TREE_PS,
        (ShaderFamily::Sky, Vertex) => SKY_VS,
        (ShaderFamily::Sky, Pixel) => SKY_PS,
        (ShaderFamily::Grass, Vertex) => GRASS_VS,
        (ShaderFamily::Grass, Pixel) => GRASS_PS,
        (ShaderFamily::Particle, Vertex) => PARTICLE_VS,
        (ShaderFamily::Particle, Pixel) => PARTICLE_PS,
        (ShaderFamily::Effect, Vertex) => EFFECT_VS,
        (ShaderFamily::Effect, Pixel) => EFFECT_PS,
        (ShaderFamily::Water, Vertex) => WATER_VS,
        (ShaderFamily::Water, Pixel) => WATER_PS,
        (ShaderFamily::Utility, Vertex) => UTILITY_VS,
        (ShaderFamily::Utility, Pixel) => UTILITY_PS,
        _ => &[],
    }
}

/// Slot of a reflected variable, if the engine knows it.
#[must_use]
pub fn slot_of(family: ShaderFamily, class: ShaderClass, name: &str) -> Option<usize> {
    slot_names(family, class).iter().position(|&slot| slot == name)
}

/// Largest slot table, the capacity every constant table is sized to.
pub const MAX_SLOTS: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_lookup() {
        assert_eq!(slot_of(ShaderFamily::Lighting, ShaderClass::Vertex, "World"), Some(0));
        assert_eq!(slot_of(ShaderFamily::Lighting, ShaderClass::Vertex, "Bones"), Some(16));
        assert_eq!(slot_of(ShaderFamily::Water, ShaderClass::Pixel, "Bones"), None);
        assert!(slot_names(ShaderFamily::ImageSpace, ShaderClass::Pixel).is_empty());
        assert!(slot_names(ShaderFamily::Lighting, ShaderClass::Compute).is_empty());
    }

    #[test]
    fn tables_fit_and_have_unique_names() {
        for family in ShaderFamily::ALL {
            for class in ShaderClass::ALL {
                let names = slot_names(family, class);
                assert!(names.len() <= MAX_SLOTS);
                for (i, name) in names.iter().enumerate() {
                    assert_eq!(slot_of(family, class, name), Some(i), "{family}/{class}: {name}");
                }
            }
        }
    }
}
