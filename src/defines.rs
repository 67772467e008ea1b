//! Preprocessor Define Lists
//!
//! Every compilation is parameterized by an ordered list of `#define`s
//! derived from `(family, class, descriptor)` plus the global defines from
//! the settings. The list is what actually distinguishes two programs built
//! from the same source, so it is also what the bytecode result map and the
//! disk cache key on.
//!
//! # Ordering
//!
//! [`ShaderDefines`] stores interned [`Symbol`] pairs sorted by the *resolved
//! name*. Symbol ids depend on interning order and differ between runs, while
//! name order does not, so the same set always iterates, hashes and persists
//! identically.
//!
//! ```rust,ignore
//! use kiln::defines::{ShaderDefines, build_defines};
//!
//! let defines = build_defines(ShaderFamily::Water, ShaderClass::Pixel, d, &ShaderDefines::new());
//! assert!(defines.contains("WATER"));
//! ```

use std::hash::{Hash, Hasher};

use crate::descriptor::flags::{
    BloodSplatterTechnique, DistantTreeFlags, DistantTreeTechnique, EffectFlags, GrassFlags,
    GrassTechnique, LightingFlags, LightingTechnique, SkyFlags, SkyTechnique, UtilityFlags,
    WaterFlags, WaterTechnique,
};
use crate::descriptor::{ShaderClass, ShaderFamily, TechniqueDescriptor};
use crate::utils::interner::{self, Symbol};

/// An ordered set of `NAME=VALUE` preprocessor definitions.
#[derive(Debug, Clone, Default)]
pub struct ShaderDefines {
    defines: Vec<(Symbol, Symbol)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            defines: Vec::with_capacity(capacity),
        }
    }

    fn position(&self, key: &str) -> Result<usize, usize> {
        self.defines
            .binary_search_by(|&(k, _)| interner::resolve(k).cmp(key))
    }

    /// Sets a define, replacing the value if the name is already present.
    pub fn set(&mut self, key: &str, value: &str) {
        let value_sym = interner::intern(value);
        match self.position(key) {
            Ok(idx) => self.defines[idx].1 = value_sym,
            Err(idx) => self.defines.insert(idx, (interner::intern(key), value_sym)),
        }
    }

    /// Sets a value-less define (`#define NAME`).
    #[inline]
    pub fn define(&mut self, key: &str) {
        self.set(key, "");
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if let Ok(idx) = self.position(key) {
            self.defines.remove(idx);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_ok()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        self.position(key)
            .ok()
            .map(|idx| interner::resolve(self.defines[idx].1))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Iterates `(name, value)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.defines
            .iter()
            .map(|&(k, v)| (interner::resolve(k), interner::resolve(v)))
    }

    /// Merges `other` into `self`; values from `other` win.
    pub fn merge(&mut self, other: &ShaderDefines) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    /// In-process hash of the set. Not stable across runs.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        use std::hash::BuildHasher;

        rustc_hash::FxBuildHasher.hash_one(self)
    }

    /// Feeds the set into a persistent hasher as resolved strings.
    pub fn write_stable(&self, sink: &mut impl FnMut(&[u8])) {
        for (key, value) in self.iter() {
            sink(key.as_bytes());
            sink(b"=");
            sink(value.as_bytes());
            sink(b"\n");
        }
    }
}

impl Hash for ShaderDefines {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.defines.hash(state);
    }
}

impl PartialEq for ShaderDefines {
    fn eq(&self, other: &Self) -> bool {
        self.defines == other.defines
    }
}

impl Eq for ShaderDefines {}

impl From<&[(&str, &str)]> for ShaderDefines {
    fn from(defines: &[(&str, &str)]) -> Self {
        let mut result = Self::with_capacity(defines.len());
        for (k, v) in defines {
            result.set(k, v);
        }
        result
    }
}

// ============================================================================
// Per-family define generation
// ============================================================================

/// Builds the full define list for one compilation: the stage define, the
/// family's technique and flag defines, then the global defines.
#[must_use]
pub fn build_defines(
    family: ShaderFamily,
    class: ShaderClass,
    descriptor: TechniqueDescriptor,
    globals: &ShaderDefines,
) -> ShaderDefines {
    let mut defines = ShaderDefines::with_capacity(16 + globals.len());
    defines.define(class.stage_define());

    let technique = descriptor.technique();
    let flags = descriptor.flags();

    match family {
        ShaderFamily::Lighting => lighting_defines(&mut defines, technique, flags),
        ShaderFamily::Water => water_defines(&mut defines, technique, flags),
        ShaderFamily::Effect => {
            define_names(&mut defines, EffectFlags::from_bits_truncate(flags).iter_names());
        }
        ShaderFamily::Grass => {
            define_technique(&mut defines, GrassTechnique::from_id(technique).map(GrassTechnique::defines));
            define_names(&mut defines, GrassFlags::from_bits_truncate(flags).iter_names());
        }
        ShaderFamily::DistantTree => {
            define_technique(
                &mut defines,
                DistantTreeTechnique::from_id(technique).map(DistantTreeTechnique::defines),
            );
            define_names(&mut defines, DistantTreeFlags::from_bits_truncate(flags).iter_names());
        }
        ShaderFamily::Sky => {
            define_technique(&mut defines, SkyTechnique::from_id(technique).map(SkyTechnique::defines));
            define_names(&mut defines, SkyFlags::from_bits_truncate(flags).iter_names());
        }
        ShaderFamily::BloodSplatter => {
            define_technique(
                &mut defines,
                BloodSplatterTechnique::from_id(technique).map(BloodSplatterTechnique::defines),
            );
        }
        ShaderFamily::Utility => utility_defines(&mut defines, UtilityFlags::from_bits_truncate(flags)),
        ShaderFamily::Particle | ShaderFamily::ImageSpace => {}
    }

    defines.merge(globals);
    defines
}

fn define_names<'a, F>(defines: &mut ShaderDefines, names: impl Iterator<Item = (&'a str, F)>) {
    for (name, _) in names {
        defines.define(name);
    }
}

fn define_technique(defines: &mut ShaderDefines, names: Option<&'static [&'static str]>) {
    for name in names.unwrap_or_default() {
        defines.define(name);
    }
}

fn lighting_defines(defines: &mut ShaderDefines, technique: u32, flags: u32) {
    define_technique(defines, LightingTechnique::from_id(technique).map(LightingTechnique::defines));

    let flags = LightingFlags::from_bits_truncate(flags);
    define_names(defines, flags.iter_names());
    if flags.contains(LightingFlags::TRUE_PBR | LightingFlags::ANISO_LIGHTING) {
        defines.define("GLINT");
    }
}

fn water_defines(defines: &mut ShaderDefines, technique: u32, flags: u32) {
    defines.define("WATER");
    defines.define("FOG");
    define_names(defines, WaterFlags::from_bits_truncate(flags).iter_names());

    match WaterTechnique::from_id(technique) {
        Some(WaterTechnique::Specular { lights }) => {
            defines.define("SPECULAR");
            defines.set("NUM_SPECULAR_LIGHTS", &lights.to_string());
        }
        Some(WaterTechnique::Underwater) => defines.define("UNDERWATER"),
        Some(WaterTechnique::Lod) => defines.define("LOD"),
        Some(WaterTechnique::Stencil) => defines.define("STENCIL"),
        Some(WaterTechnique::Simple) => defines.define("SIMPLE"),
        None => {}
    }
}

fn utility_defines(defines: &mut ShaderDefines, flags: UtilityFlags) {
    let simple = flags
        & (UtilityFlags::VC
            | UtilityFlags::TEXTURE
            | UtilityFlags::SKINNED
            | UtilityFlags::NORMALS
            | UtilityFlags::ALPHA_TEST
            | UtilityFlags::LOD_LANDSCAPE
            | UtilityFlags::RENDER_NORMAL_FALLOFF
            | UtilityFlags::RENDER_NORMAL_CLAMP
            | UtilityFlags::RENDER_DEPTH);
    define_names(defines, simple.iter_names());

    let normal = flags.contains(UtilityFlags::RENDER_NORMAL);
    let clear = flags.contains(UtilityFlags::RENDER_NORMAL_CLEAR);
    match (normal, clear) {
        (true, false) => defines.define("RENDER_NORMAL"),
        (false, true) => defines.define("RENDER_NORMAL_CLEAR"),
        (true, true) => defines.define("STENCIL_ABOVE_WATER"),
        (false, false) => {}
    }

    let alpha_mask = flags.contains(UtilityFlags::ADDITIONAL_ALPHA_MASK);
    let shadowmap = flags.contains(UtilityFlags::RENDER_SHADOWMAP);
    if flags.contains(UtilityFlags::OPAQUE_EFFECT) {
        defines.define("OPAQUE_EFFECT");
        if alpha_mask && !shadowmap {
            defines.define("ADDITIONAL_ALPHA_MASK");
        }
        if flags.contains(UtilityFlags::GRAYSCALE_TO_ALPHA) {
            defines.define("GRAYSCALE_TO_ALPHA");
        }
    } else if shadowmap {
        defines.define("RENDER_SHADOWMAP");
    } else if alpha_mask {
        defines.define("ADDITIONAL_ALPHA_MASK");
    }
}
