//! Descriptor Integration Tests
//!
//! Tests for:
//! - Normalization idempotence across every family and class
//! - Pass adjustments staying stable under repeated application
//! - Define generation for normalized descriptors

use kiln::defines::build_defines;
use kiln::descriptor::flags::{LightingFlags, LightingTechnique, WaterTechnique};
use kiln::descriptor::{PassContext, RULES};
use kiln::{ShaderClass, ShaderDefines, ShaderFamily, TechniqueDescriptor, normalize, normalize_for_pass};

/// A spread of raw descriptors: sparse bit patterns across every technique.
fn sample_descriptors() -> impl Iterator<Item = TechniqueDescriptor> {
    let patterns = [0u32, 1, 0x5555, 0xAAAA, 0x00FF_FFFF, 0x0012_3456, 0x00F0_0F0F];
    (0..64u32).flat_map(move |technique| {
        patterns
            .into_iter()
            .map(move |flags| TechniqueDescriptor::encode(technique, flags))
    })
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn normalize_is_idempotent_everywhere() {
    for family in ShaderFamily::ALL {
        for class in ShaderClass::ALL {
            for descriptor in sample_descriptors() {
                let once = normalize(family, class, descriptor);
                assert_eq!(
                    normalize(family, class, once),
                    once,
                    "{family}:{class} not idempotent for {descriptor}"
                );
            }
        }
    }
}

#[test]
fn pass_normalization_is_idempotent() {
    let passes = [
        PassContext::default(),
        PassContext { deferred: true, improved_snow: false },
        PassContext { deferred: true, improved_snow: true },
    ];
    for family in ShaderFamily::ALL {
        for class in ShaderClass::ALL {
            for pass in passes {
                for descriptor in sample_descriptors() {
                    let once = normalize_for_pass(family, class, descriptor, pass);
                    assert_eq!(normalize_for_pass(family, class, once, pass), once);
                }
            }
        }
    }
}

#[test]
fn rules_cover_every_pair() {
    assert_eq!(RULES.len(), ShaderFamily::ALL.len() * ShaderClass::ALL.len());
    for (index, rule) in RULES.iter().enumerate() {
        assert_eq!(rule.family.id() as usize, index / ShaderClass::ALL.len());
        assert_eq!(rule.class.index(), index % ShaderClass::ALL.len());
    }
}

#[test]
fn normalization_never_touches_technique_bits_outside_collapse() {
    let descriptor = TechniqueDescriptor::encode(WaterTechnique::Lod.id(), 0x3FF);
    for class in ShaderClass::ALL {
        let normalized = normalize(ShaderFamily::Water, class, descriptor);
        assert_eq!(normalized.technique(), WaterTechnique::Lod.id());
    }
}

// ============================================================================
// Defines
// ============================================================================

#[test]
fn equivalent_descriptors_build_identical_defines() {
    let globals = ShaderDefines::new();
    let plain = TechniqueDescriptor::encode(LightingTechnique::None as u32, LightingFlags::VC.bits());
    let noisy = TechniqueDescriptor::encode(
        LightingTechnique::Glowmap as u32,
        (LightingFlags::VC | LightingFlags::RIM_LIGHTING).bits(),
    );

    let a = build_defines(
        ShaderFamily::Lighting,
        ShaderClass::Vertex,
        normalize(ShaderFamily::Lighting, ShaderClass::Vertex, plain),
        &globals,
    );
    let b = build_defines(
        ShaderFamily::Lighting,
        ShaderClass::Vertex,
        normalize(ShaderFamily::Lighting, ShaderClass::Vertex, noisy),
        &globals,
    );

    assert_eq!(a, b);
    assert!(a.contains("VSHADER"));
    assert!(a.contains("VC"));
    assert!(!a.contains("GLOWMAP"));
}
