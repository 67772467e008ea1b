//! Draw Interception Tests
//!
//! Tests for:
//! - Pass adjustments applied in `before_draw`
//! - All-or-nothing program substitution
//! - Warming both pixel variants of a technique

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockCompiler, Scratch, cache_with, memory_settings};
use kiln::descriptor::flags::{LightingFlags, SkyFlags};
use kiln::host::{DrawCall, ProgramSubstitution, RendererExtension};
use kiln::{KilnSettings, ShaderClass, ShaderFamily, TechniqueDescriptor};

fn substitution(settings: &KilnSettings, compiler: &Arc<MockCompiler>) -> ProgramSubstitution {
    let (cache, _device) = cache_with(settings, compiler);
    ProgramSubstitution::new(Arc::new(cache))
}

fn sync_settings(scratch: &Scratch) -> KilnSettings {
    KilnSettings {
        async_compilation: false,
        ..memory_settings(scratch)
    }
}

// ============================================================================
// before_draw
// ============================================================================

#[test]
fn before_draw_marks_deferred_pixel_programs() {
    let scratch = Scratch::new("kiln-host");
    let host = substitution(&sync_settings(&scratch), &MockCompiler::new());

    let descriptor = TechniqueDescriptor::encode(0, LightingFlags::VC.bits());
    let mut draw = DrawCall::new(ShaderFamily::Lighting, descriptor).deferred(true);
    host.before_draw(&mut draw);

    assert!(draw.pixel.contains(LightingFlags::DEFERRED.bits()));
    assert!(!draw.vertex.contains(LightingFlags::DEFERRED.bits()));
}

#[test]
fn before_draw_drops_snow_without_improved_snow() {
    let scratch = Scratch::new("kiln-host");
    let descriptor = TechniqueDescriptor::encode(0, (LightingFlags::VC | LightingFlags::SNOW).bits());

    let host = substitution(&sync_settings(&scratch), &MockCompiler::new());
    let mut draw = DrawCall::new(ShaderFamily::Lighting, descriptor);
    host.before_draw(&mut draw);
    assert!(!draw.pixel.contains(LightingFlags::SNOW.bits()));

    let snowy = KilnSettings {
        improved_snow: true,
        ..sync_settings(&scratch)
    };
    let host = substitution(&snowy, &MockCompiler::new());
    let mut draw = DrawCall::new(ShaderFamily::Lighting, descriptor);
    host.before_draw(&mut draw);
    assert!(draw.pixel.contains(LightingFlags::SNOW.bits()));
}

// ============================================================================
// substitute_program
// ============================================================================

#[test]
fn substitutes_both_stages() {
    let scratch = Scratch::new("kiln-host");
    let compiler = MockCompiler::new();
    let host = substitution(&sync_settings(&scratch), &compiler);

    let mut draw = DrawCall::new(ShaderFamily::Sky, TechniqueDescriptor::encode(2, 0));
    host.before_draw(&mut draw);
    let substitutes = host.substitute_program(&draw).expect("sync cache substitutes");
    host.after_draw(&draw);

    assert_eq!(substitutes.vertex.class, ShaderClass::Vertex);
    assert_eq!(substitutes.pixel.as_ref().map(|p| p.class), Some(ShaderClass::Pixel));
    assert_eq!(host.last_draw(), Some(draw));
    assert_eq!(host.stats().substituted, 1);
    assert_eq!(compiler.calls(), 2);
}

#[test]
fn depth_only_draw_skips_pixel_stage() {
    let scratch = Scratch::new("kiln-host");
    let compiler = MockCompiler::new();
    let host = substitution(&sync_settings(&scratch), &compiler);

    let draw = DrawCall::new(ShaderFamily::Grass, TechniqueDescriptor::encode(1, 0)).skip_pixel(true);
    let substitutes = host.substitute_program(&draw).unwrap();

    assert!(substitutes.pixel.is_none());
    assert_eq!(compiler.calls(), 1);
}

#[test]
fn failed_stage_passes_draw_through() {
    let scratch = Scratch::new("kiln-host");
    let compiler = MockCompiler::new();
    let descriptor = TechniqueDescriptor::encode(0, SkyFlags::empty().bits());
    compiler.fail(format!("{}:{}:{descriptor}", ShaderFamily::Sky, ShaderClass::Pixel));
    let host = substitution(&sync_settings(&scratch), &compiler);

    let draw = DrawCall::new(ShaderFamily::Sky, descriptor);
    assert!(host.substitute_program(&draw).is_none());

    let stats = host.stats();
    assert_eq!(stats.draws, 1);
    assert_eq!(stats.passed_through, 1);
}

#[test]
fn disabled_cache_passes_through() {
    let scratch = Scratch::new("kiln-host");
    let compiler = MockCompiler::new();
    let host = substitution(&sync_settings(&scratch), &compiler);
    host.cache().set_enabled(false);

    let draw = DrawCall::new(ShaderFamily::Lighting, TechniqueDescriptor::encode(0, 0));
    assert!(host.substitute_program(&draw).is_none());
    assert_eq!(compiler.calls(), 0);
}

#[test]
fn async_cache_substitutes_once_ready() {
    let scratch = Scratch::new("kiln-host");
    let compiler = MockCompiler::with_delay(Duration::from_millis(20));
    let host = substitution(&memory_settings(&scratch), &compiler);

    let draw = DrawCall::new(ShaderFamily::Water, TechniqueDescriptor::encode(11, 0));
    assert!(host.substitute_program(&draw).is_none());
    assert!(host.cache().wait_until_idle(Duration::from_secs(10)));
    assert!(host.substitute_program(&draw).is_some());
}

// ============================================================================
// Warming
// ============================================================================

#[test]
fn warm_requests_forward_and_deferred_variants() {
    let scratch = Scratch::new("kiln-host");
    let compiler = MockCompiler::new();
    let host = substitution(&memory_settings(&scratch), &compiler);

    host.warm(ShaderFamily::Lighting, TechniqueDescriptor::encode(0, LightingFlags::VC.bits()));
    assert!(host.cache().wait_until_idle(Duration::from_secs(10)));

    assert_eq!(host.cache().total_tasks(), 3);
    assert_eq!(host.cache().program_count(), 3);
}
