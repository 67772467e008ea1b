//! Draw interception.
//!
//! Integration layers sit between the host engine's technique selection and
//! its draw submission. For every draw they call
//! [`RendererExtension::before_draw`] to adjust the descriptors for the
//! current pass, [`RendererExtension::substitute_program`] to fetch
//! replacement programs, and [`RendererExtension::after_draw`] once the draw
//! has been issued.
//!
//! [`ProgramSubstitution`] is the implementation backed by a [`ShaderCache`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::cache::ShaderCache;
use crate::descriptor::{ShaderClass, ShaderFamily, TechniqueDescriptor, normalize_for_pass};
use crate::program::CompiledProgram;

/// The technique the host engine selected for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub family: ShaderFamily,
    pub vertex: TechniqueDescriptor,
    pub pixel: TechniqueDescriptor,
    /// The draw belongs to the deferred geometry pass.
    pub deferred: bool,
    /// The engine binds no pixel program (depth-only passes).
    pub skip_pixel: bool,
}

impl DrawCall {
    #[must_use]
    pub fn new(family: ShaderFamily, descriptor: TechniqueDescriptor) -> Self {
        Self {
            family,
            vertex: descriptor,
            pixel: descriptor,
            deferred: false,
            skip_pixel: false,
        }
    }

    #[must_use]
    pub fn deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    #[must_use]
    pub fn skip_pixel(mut self, skip: bool) -> Self {
        self.skip_pixel = skip;
        self
    }
}

/// Programs bound in place of the engine's.
#[derive(Clone)]
pub struct Substitutes {
    pub vertex: Arc<CompiledProgram>,
    /// `None` when the draw skips the pixel stage.
    pub pixel: Option<Arc<CompiledProgram>>,
}

/// Hooks an integration layer drives around every draw.
pub trait RendererExtension: Send + Sync {
    /// Adjusts the draw's descriptors before lookup.
    fn before_draw(&self, _draw: &mut DrawCall) {}

    /// Returns replacement programs, or `None` to keep the engine's.
    fn substitute_program(&self, draw: &DrawCall) -> Option<Substitutes>;

    /// Called after the draw was submitted.
    fn after_draw(&self, _draw: &DrawCall) {}
}

/// Counters describing what the substitution layer did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionStats {
    pub draws: u64,
    pub substituted: u64,
    pub passed_through: u64,
}

/// [`RendererExtension`] that substitutes programs from a [`ShaderCache`].
///
/// A draw is substituted only when every stage it binds is ready; a partial
/// substitution would pair replacement and engine programs with mismatched
/// interfaces.
pub struct ProgramSubstitution {
    cache: Arc<ShaderCache>,
    draws: AtomicU64,
    substituted: AtomicU64,
    last_draw: Mutex<Option<DrawCall>>,
}

impl ProgramSubstitution {
    #[must_use]
    pub fn new(cache: Arc<ShaderCache>) -> Self {
        Self {
            cache,
            draws: AtomicU64::new(0),
            substituted: AtomicU64::new(0),
            last_draw: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ShaderCache> {
        &self.cache
    }

    /// Requests both pixel variants (forward and deferred) and the vertex
    /// program of a technique the engine just loaded, so they are compiled
    /// before the first draw asks for them.
    pub fn warm(&self, family: ShaderFamily, descriptor: TechniqueDescriptor) {
        let forward = self.adjust(DrawCall::new(family, descriptor));
        let deferred = self.adjust(DrawCall::new(family, descriptor).deferred(true));

        // Lookups only queue the compiles here; the programs are fetched at draw time.
        let _ = self.cache.get_vertex_shader(family, forward.vertex);
        let _ = self.cache.get_pixel_shader(family, forward.pixel);
        if deferred.pixel != forward.pixel {
            let _ = self.cache.get_pixel_shader(family, deferred.pixel);
        }
    }

    /// The last draw seen by [`RendererExtension::after_draw`].
    #[must_use]
    pub fn last_draw(&self) -> Option<DrawCall> {
        *self.last_draw.lock()
    }

    #[must_use]
    pub fn stats(&self) -> SubstitutionStats {
        let draws = self.draws.load(Ordering::Relaxed);
        let substituted = self.substituted.load(Ordering::Relaxed);
        SubstitutionStats {
            draws,
            substituted,
            passed_through: draws.saturating_sub(substituted),
        }
    }

    fn adjust(&self, mut draw: DrawCall) -> DrawCall {
        let pass = self.cache.pass_context(draw.deferred);
        draw.vertex = normalize_for_pass(draw.family, ShaderClass::Vertex, draw.vertex, pass);
        draw.pixel = normalize_for_pass(draw.family, ShaderClass::Pixel, draw.pixel, pass);
        draw
    }
}

impl RendererExtension for ProgramSubstitution {
    fn before_draw(&self, draw: &mut DrawCall) {
        *draw = self.adjust(*draw);
    }

    fn substitute_program(&self, draw: &DrawCall) -> Option<Substitutes> {
        self.draws.fetch_add(1, Ordering::Relaxed);
        if !self.cache.is_enabled() {
            return None;
        }

        let vertex = self.cache.get_vertex_shader(draw.family, draw.vertex);
        let pixel = if draw.skip_pixel {
            None
        } else {
            Some(self.cache.get_pixel_shader(draw.family, draw.pixel)?)
        };

        let substitutes = Substitutes { vertex: vertex?, pixel };
        self.substituted.fetch_add(1, Ordering::Relaxed);
        Some(substitutes)
    }

    fn after_draw(&self, draw: &DrawCall) {
        *self.last_draw.lock() = Some(*draw);
    }
}
