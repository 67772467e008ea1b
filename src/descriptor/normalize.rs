//! Descriptor normalization.
//!
//! A flag that a stage never reads still changes the descriptor, and a
//! different descriptor means a different cache key and another compile. The
//! [`RULES`] table lists, for every `(family, class)` pair, which flag bits are
//! irrelevant and which techniques compile to the same program as `None`.

use super::flags::{
    DistantTreeFlags, EffectFlags, LightingFlags, LightingTechnique, SkyFlags, WaterFlags,
};
use super::{ShaderClass, ShaderFamily, TechniqueDescriptor};

/// Irrelevant state for one `(family, class)` pair.
#[derive(Debug, Clone, Copy)]
pub struct NormalizationRule {
    pub family: ShaderFamily,
    pub class: ShaderClass,
    /// Flag bits cleared from the descriptor.
    pub clear: u32,
    /// Technique ids rewritten to 0.
    pub collapse: &'static [u32],
}

impl NormalizationRule {
    const fn keep(family: ShaderFamily, class: ShaderClass) -> Self {
        Self { family, class, clear: 0, collapse: &[] }
    }

    const fn clear(family: ShaderFamily, class: ShaderClass, clear: u32) -> Self {
        Self { family, class, clear, collapse: &[] }
    }

    #[must_use]
    pub fn apply(&self, descriptor: TechniqueDescriptor) -> TechniqueDescriptor {
        let technique = descriptor.technique();
        let technique = if self.collapse.contains(&technique) { 0 } else { technique };
        TechniqueDescriptor::encode(technique, descriptor.flags() & !self.clear)
    }
}

const LIGHTING_VERTEX_CLEAR: u32 = LightingFlags::ADDITIONAL_ALPHA_MASK
    .union(LightingFlags::AMBIENT_SPECULAR)
    .union(LightingFlags::DO_ALPHA_TEST)
    .union(LightingFlags::SHADOW_DIR)
    .union(LightingFlags::DEFSHADOW)
    .union(LightingFlags::CHARACTER_LIGHT)
    .union(LightingFlags::RIM_LIGHTING)
    .union(LightingFlags::SOFT_LIGHTING)
    .union(LightingFlags::BACK_LIGHTING)
    .union(LightingFlags::SPECULAR)
    .union(LightingFlags::ANISO_LIGHTING)
    .union(LightingFlags::BASE_OBJECT_IS_SNOW)
    .union(LightingFlags::SNOW)
    .bits();

const LIGHTING_PIXEL_CLEAR: u32 = LightingFlags::AMBIENT_SPECULAR
    .union(LightingFlags::SHADOW_DIR)
    .union(LightingFlags::DEFSHADOW)
    .union(LightingFlags::CHARACTER_LIGHT)
    .bits();

const LIGHTING_VERTEX_COLLAPSE: &[u32] = &[
    LightingTechnique::Glowmap as u32,
    LightingTechnique::Parallax as u32,
    LightingTechnique::Facegen as u32,
    LightingTechnique::FacegenRgbTint as u32,
    LightingTechnique::LodObjects as u32,
    LightingTechnique::LodObjectHd as u32,
    LightingTechnique::MultiIndexSparkle as u32,
    LightingTechnique::Hair as u32,
];

const LIGHTING_PIXEL_COLLAPSE: &[u32] = &[LightingTechnique::Glowmap as u32];

const WATER_CLEAR: u32 = WaterFlags::REFLECTIONS
    .union(WaterFlags::CUBEMAP)
    .union(WaterFlags::INTERIOR)
    .bits();

const EFFECT_CLEAR: u32 = EffectFlags::GRAYSCALE_TO_COLOR
    .union(EffectFlags::GRAYSCALE_TO_ALPHA)
    .union(EffectFlags::IGNORE_TEX_ALPHA)
    .bits();

/// One rule per `(family, class)` pair, in `ShaderFamily::ALL` x
/// `ShaderClass::ALL` order.
pub const RULES: [NormalizationRule; 30] = {
    use ShaderClass::{Compute, Pixel, Vertex};
    use ShaderFamily::{
        BloodSplatter, DistantTree, Effect, Grass, ImageSpace, Lighting, Particle, Sky, Utility,
        Water,
    };
    [
        NormalizationRule {
            family: Lighting,
            class: Vertex,
            clear: LIGHTING_VERTEX_CLEAR,
            collapse: LIGHTING_VERTEX_COLLAPSE,
        },
        NormalizationRule {
            family: Lighting,
            class: Pixel,
            clear: LIGHTING_PIXEL_CLEAR,
            collapse: LIGHTING_PIXEL_COLLAPSE,
        },
        NormalizationRule::keep(Lighting, Compute),
        NormalizationRule::keep(BloodSplatter, Vertex),
        NormalizationRule::keep(BloodSplatter, Pixel),
        NormalizationRule::keep(BloodSplatter, Compute),
        NormalizationRule::keep(DistantTree, Vertex),
        NormalizationRule::keep(DistantTree, Pixel),
        NormalizationRule::keep(DistantTree, Compute),
        NormalizationRule::keep(Sky, Vertex),
        NormalizationRule::keep(Sky, Pixel),
        NormalizationRule::keep(Sky, Compute),
        NormalizationRule::keep(Grass, Vertex),
        NormalizationRule::keep(Grass, Pixel),
        NormalizationRule::keep(Grass, Compute),
        NormalizationRule::keep(Particle, Vertex),
        NormalizationRule::keep(Particle, Pixel),
        NormalizationRule::keep(Particle, Compute),
        NormalizationRule::clear(Water, Vertex, WATER_CLEAR),
        NormalizationRule::clear(Water, Pixel, WATER_CLEAR),
        NormalizationRule::keep(Water, Compute),
        NormalizationRule::clear(Effect, Vertex, EFFECT_CLEAR),
        NormalizationRule::clear(Effect, Pixel, EFFECT_CLEAR),
        NormalizationRule::keep(Effect, Compute),
        NormalizationRule::keep(Utility, Vertex),
        NormalizationRule::keep(Utility, Pixel),
        NormalizationRule::keep(Utility, Compute),
        NormalizationRule::keep(ImageSpace, Vertex),
        NormalizationRule::keep(ImageSpace, Pixel),
        NormalizationRule::keep(ImageSpace, Compute),
    ]
};

/// Returns the rule for a `(family, class)` pair.
#[inline]
#[must_use]
pub fn rule(family: ShaderFamily, class: ShaderClass) -> &'static NormalizationRule {
    &RULES[family.id() as usize * ShaderClass::ALL.len() + class.index()]
}

/// Clears flags and collapses techniques that cannot affect the program
/// compiled for `(family, class)`. Idempotent.
#[must_use]
pub fn normalize(
    family: ShaderFamily,
    class: ShaderClass,
    descriptor: TechniqueDescriptor,
) -> TechniqueDescriptor {
    rule(family, class).apply(descriptor)
}

/// Render-pass state that feeds into descriptor selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassContext {
    /// The draw belongs to the deferred geometry pass.
    pub deferred: bool,
    /// Snow shading is handled by the replacement lighting shader.
    pub improved_snow: bool,
}

/// [`normalize`] plus the pass-dependent adjustments the draw hooks apply:
/// pixel programs drawn in the deferred pass always carry their family's
/// deferred flag, and the Lighting snow flag is dropped unless improved snow
/// is enabled.
#[must_use]
pub fn normalize_for_pass(
    family: ShaderFamily,
    class: ShaderClass,
    descriptor: TechniqueDescriptor,
    pass: PassContext,
) -> TechniqueDescriptor {
    let mut descriptor = normalize(family, class, descriptor);
    if class != ShaderClass::Pixel {
        return descriptor;
    }

    if pass.deferred {
        let deferred = match family {
            ShaderFamily::Lighting => LightingFlags::DEFERRED.bits(),
            ShaderFamily::Effect => EffectFlags::DEFERRED.bits(),
            ShaderFamily::DistantTree => DistantTreeFlags::DEFERRED.bits(),
            ShaderFamily::Sky => SkyFlags::DEFERRED.bits(),
            _ => 0,
        };
        descriptor = descriptor.insert_flags(deferred);
    }

    if family == ShaderFamily::Lighting && !pass.improved_snow {
        descriptor = descriptor.remove_flags(LightingFlags::SNOW.bits());
    }

    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_pair_in_order() {
        let mut expected = Vec::new();
        for family in ShaderFamily::ALL {
            for class in ShaderClass::ALL {
                expected.push((family, class));
            }
        }
        let actual: Vec<_> = RULES.iter().map(|r| (r.family, r.class)).collect();
        assert_eq!(actual, expected);

        for family in ShaderFamily::ALL {
            for class in ShaderClass::ALL {
                let r = rule(family, class);
                assert_eq!((r.family, r.class), (family, class));
            }
        }
    }

    #[test]
    fn lighting_vertex_collapses_techniques() {
        let glow = TechniqueDescriptor::encode(LightingTechnique::Glowmap.id(), 0);
        let hair = TechniqueDescriptor::encode(LightingTechnique::Hair.id(), 0);
        let none = TechniqueDescriptor::encode(LightingTechnique::None.id(), 0);

        assert_eq!(normalize(ShaderFamily::Lighting, ShaderClass::Vertex, glow), none);
        assert_eq!(normalize(ShaderFamily::Lighting, ShaderClass::Vertex, hair), none);
        assert_eq!(normalize(ShaderFamily::Lighting, ShaderClass::Pixel, glow), none);
        assert_eq!(normalize(ShaderFamily::Lighting, ShaderClass::Pixel, hair), hair);
    }

    #[test]
    fn lighting_vertex_drops_pixel_only_flags() {
        let flags = LightingFlags::VC | LightingFlags::SPECULAR | LightingFlags::SNOW;
        let d = TechniqueDescriptor::encode(LightingTechnique::Envmap.id(), flags.bits());

        let v = normalize(ShaderFamily::Lighting, ShaderClass::Vertex, d);
        assert_eq!(v.flags(), LightingFlags::VC.bits());
        assert_eq!(v.technique(), LightingTechnique::Envmap.id());

        let p = normalize(ShaderFamily::Lighting, ShaderClass::Pixel, d);
        assert_eq!(p.flags(), flags.bits());
    }

    #[test]
    fn water_and_effect_masks() {
        let water = TechniqueDescriptor::encode(
            9,
            (WaterFlags::REFLECTIONS | WaterFlags::DEPTH | WaterFlags::CUBEMAP).bits(),
        );
        let normalized = normalize(ShaderFamily::Water, ShaderClass::Pixel, water);
        assert_eq!(normalized.flags(), WaterFlags::DEPTH.bits());
        assert_eq!(normalized.technique(), 9);

        let effect = TechniqueDescriptor::encode(
            0,
            (EffectFlags::LIGHTING | EffectFlags::IGNORE_TEX_ALPHA).bits(),
        );
        let normalized = normalize(ShaderFamily::Effect, ShaderClass::Vertex, effect);
        assert_eq!(normalized.flags(), EffectFlags::LIGHTING.bits());
    }

    #[test]
    fn normalize_is_idempotent() {
        for r in &RULES {
            for technique in [0, 2, 3, 6, 13, 20, 63] {
                for flags in [0, 0x00FF_FFFF, 0xC0FF_FFFF, 0x0000_A5A5] {
                    let d = TechniqueDescriptor::encode(technique, flags);
                    let once = normalize(r.family, r.class, d);
                    assert_eq!(normalize(r.family, r.class, once), once);
                }
            }
        }
    }

    #[test]
    fn deferred_pass_forces_deferred_flag_on_pixel_only() {
        let pass = PassContext { deferred: true, improved_snow: false };
        let d = TechniqueDescriptor::encode(0, 0);

        let p = normalize_for_pass(ShaderFamily::Sky, ShaderClass::Pixel, d, pass);
        assert_eq!(p.flags(), 256);
        let v = normalize_for_pass(ShaderFamily::Sky, ShaderClass::Vertex, d, pass);
        assert_eq!(v.flags(), 0);
        let e = normalize_for_pass(ShaderFamily::Effect, ShaderClass::Pixel, d, pass);
        assert!(e.contains(EffectFlags::DEFERRED.bits()));
        let w = normalize_for_pass(ShaderFamily::Water, ShaderClass::Pixel, d, pass);
        assert_eq!(w, d);
    }

    #[test]
    fn snow_flag_requires_improved_snow() {
        let d = TechniqueDescriptor::encode(0, LightingFlags::SNOW.bits());
        let plain = PassContext::default();
        let improved = PassContext { deferred: false, improved_snow: true };

        let p = normalize_for_pass(ShaderFamily::Lighting, ShaderClass::Pixel, d, plain);
        assert!(!p.contains(LightingFlags::SNOW.bits()));
        let p = normalize_for_pass(ShaderFamily::Lighting, ShaderClass::Pixel, d, improved);
        assert!(p.contains(LightingFlags::SNOW.bits()));
    }
}
