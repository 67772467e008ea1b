//! Shared fixtures for the integration tests: a scripted compiler, scratch
//! directories and settings pointing into them.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use kiln::compiler::{CompileRequest, ShaderCompiler};
use kiln::device::HeadlessDevice;
use kiln::errors::{KilnError, Result};
use kiln::settings::KilnSettings;
use kiln::{ShaderCache, ShaderFamily};
use parking_lot::Mutex;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Scripted compiler
// ============================================================================

/// Compiler that sleeps, optionally fails, and records what it was asked.
#[derive(Default)]
pub struct MockCompiler {
    pub delay: Duration,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    running: Mutex<HashMap<String, usize>>,
    overlapped: AtomicBool,
    labels: Mutex<Vec<String>>,
}

impl MockCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    /// Makes every compile whose label (`family:class:descriptor`) matches
    /// fail.
    pub fn fail(&self, label: impl Into<String>) {
        self.failing.lock().insert(label.into());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `true` if the same key was ever compiled by two threads at once.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().clone()
    }
}

impl ShaderCompiler for MockCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<u8>> {
        let label = request.label();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.labels.lock().push(label.clone());

        {
            let mut running = self.running.lock();
            let count = running.entry(label.clone()).or_default();
            *count += 1;
            if *count > 1 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
        }

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if let Some(count) = self.running.lock().get_mut(&label) {
            *count -= 1;
        }

        if self.failing.lock().contains(&label) {
            return Err(KilnError::Compile {
                task: label,
                diagnostics: "error X3000: scripted failure".to_string(),
            });
        }

        let mut bytecode = b"DXBC".to_vec();
        bytecode.extend_from_slice(label.as_bytes());
        Ok(bytecode)
    }
}

// ============================================================================
// Scratch directories
// ============================================================================

/// Temporary directory removed on drop.
pub struct Scratch(PathBuf);

impl Scratch {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn shader_root(&self) -> PathBuf {
        self.0.join("Shaders")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.0.join("ShaderCache")
    }

    /// Writes a `<Family>.hlsl` source for every family.
    pub fn write_sources(&self) {
        let root = self.shader_root();
        fs::create_dir_all(root.join("Common")).unwrap();
        for family in ShaderFamily::ALL {
            fs::write(root.join(family.source_file()), format!("// {family}\n")).unwrap();
        }
        fs::write(root.join("Common").join("Color.hlsli"), "float3 Tint;\n").unwrap();
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Settings with the disk cache off and two compiler threads.
pub fn memory_settings(scratch: &Scratch) -> KilnSettings {
    KilnSettings {
        disk_cache: false,
        thread_count: 2,
        background_thread_count: 1,
        shader_root: scratch.shader_root(),
        cache_root: scratch.cache_root(),
        ..KilnSettings::default()
    }
}

/// Settings with the disk cache on and shared includes.
pub fn disk_settings(scratch: &Scratch) -> KilnSettings {
    KilnSettings {
        disk_cache: true,
        include_dirs: vec![scratch.shader_root().join("Common")],
        ..memory_settings(scratch)
    }
}

pub fn cache_with(
    settings: &KilnSettings,
    compiler: &Arc<MockCompiler>,
) -> (ShaderCache, Arc<HeadlessDevice>) {
    init_logger();
    let device = Arc::new(HeadlessDevice::new());
    let cache = ShaderCache::new(settings, Arc::clone(compiler), Arc::clone(&device)).unwrap();
    (cache, device)
}
