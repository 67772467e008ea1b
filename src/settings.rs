//! Cache Settings
//!
//! [`KilnSettings`] is the persisted configuration of the shader cache. It
//! round-trips through JSON and tolerates missing fields, so settings files
//! written by older versions keep loading.
//!
//! ```rust,ignore
//! use kiln::settings::KilnSettings;
//!
//! let mut settings = KilnSettings::load("Kiln.json")?;
//! settings.async_compilation = false;
//! cache.apply_settings(&settings)?;
//! settings.save("Kiln.json")?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defines::ShaderDefines;
use crate::errors::Result;

/// Persistent cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnSettings {
    /// Replace engine programs at all.
    pub enabled: bool,
    /// Compile on worker threads; lookups never block.
    pub async_compilation: bool,
    /// Persist bytecode between runs.
    pub disk_cache: bool,
    /// Compiler threads in foreground mode. `0` picks
    /// `available_parallelism - 1`.
    pub thread_count: usize,
    /// Compiler threads in background mode. `0` picks half the hardware
    /// threads.
    pub background_thread_count: usize,
    /// Recompile automatically when shader sources change.
    pub use_file_watcher: bool,
    /// Compile with debug information.
    pub developer_mode: bool,
    /// Directory holding the `<Family>.hlsl` sources.
    pub shader_root: PathBuf,
    /// Additional include directories; their contents are part of every
    /// disk cache key.
    pub include_dirs: Vec<PathBuf>,
    pub cache_root: PathBuf,
    /// Defines passed to every compilation.
    pub global_defines: Vec<(String, String)>,
    /// Keep the Lighting snow flag in pixel descriptors.
    pub improved_snow: bool,
}

impl Default for KilnSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            async_compilation: true,
            disk_cache: true,
            thread_count: 0,
            background_thread_count: 0,
            use_file_watcher: false,
            developer_mode: false,
            shader_root: PathBuf::from("Shaders"),
            include_dirs: Vec::new(),
            cache_root: PathBuf::from("ShaderCache"),
            global_defines: Vec::new(),
            improved_snow: false,
        }
    }
}

impl KilnSettings {
    /// Loads settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Resolved foreground thread count.
    #[must_use]
    pub fn foreground_threads(&self) -> usize {
        if self.thread_count > 0 {
            return self.thread_count;
        }
        hardware_threads().saturating_sub(1).max(1)
    }

    /// Resolved background thread count.
    #[must_use]
    pub fn background_threads(&self) -> usize {
        if self.background_thread_count > 0 {
            return self.background_thread_count;
        }
        (hardware_threads() / 2).max(1)
    }

    #[must_use]
    pub fn global_shader_defines(&self) -> ShaderDefines {
        let mut defines = ShaderDefines::with_capacity(self.global_defines.len());
        for (name, value) in &self.global_defines {
            defines.set(name, value);
        }
        defines
    }
}

fn hardware_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
