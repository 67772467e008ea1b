//! Shader Cache
//!
//! The top-level keyed store of compiled programs, and the only type a
//! renderer integration needs to hold.
//!
//! # Lookup
//!
//! `get_*_shader` normalizes the descriptor, then takes a read lock on the
//! class's program map. A hit returns a shared handle. A miss, when the cache
//! is enabled, either queues a task and returns `None` (asynchronous mode) or
//! compiles inline and returns the result (synchronous mode). The renderer
//! treats `None` as "keep the engine's own program".
//!
//! # Result flow
//!
//! A compile resolves the define list first. Bytecode is remembered per
//! `(class, family, defines)`, so descriptors that differ only in bits no
//! define reads share one compile; failures are remembered the same way.
//! Bytecode then comes from the disk cache or the compiler, becomes a native
//! program through the device, and is inserted into the map *before* the task
//! is marked complete.
//!
//! # Clearing
//!
//! [`ShaderCache::clear`] holds every program map's write lock while it
//! empties the maps and bumps the compilation generation. Workers check the
//! generation under the same lock before inserting, so a compile that was
//! already running when the cache was cleared is discarded instead of
//! resurrecting an outdated program.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::compilation::{Claim, CompilationSet, CompilationStats};
use crate::compiler::{CompileRequest, ShaderCompiler};
use crate::defines::{ShaderDefines, build_defines};
use crate::descriptor::flags::EffectFlags;
use crate::descriptor::{PassContext, ShaderClass, ShaderFamily, TechniqueDescriptor, normalize};
use crate::device::ProgramDevice;
use crate::disk_cache::DiskCache;
use crate::errors::{KilnError, Result};
use crate::program::CompiledProgram;
use crate::settings::KilnSettings;
use crate::task::CompilationTask;
use crate::utils::interner;
use crate::watcher::{SourceChange, SourceWatcher};
use crate::worker::{TaskRunner, WorkerPool};

type ProgramMap = FxHashMap<(ShaderFamily, TechniqueDescriptor), Arc<CompiledProgram>>;
type ResultKey = (ShaderClass, ShaderFamily, ShaderDefines);

#[derive(Clone)]
enum BytecodeResult {
    Bytecode(Arc<[u8]>),
    Failed,
}

/// Inputs shared by every compilation.
#[derive(Clone, PartialEq, Eq)]
struct CompileConfig {
    shader_root: PathBuf,
    include_dirs: Vec<PathBuf>,
    global_defines: ShaderDefines,
    developer_mode: bool,
    cache_root: PathBuf,
}

impl CompileConfig {
    fn from_settings(settings: &KilnSettings) -> Self {
        Self {
            shader_root: settings.shader_root.clone(),
            include_dirs: settings.include_dirs.clone(),
            global_defines: settings.global_shader_defines(),
            developer_mode: settings.developer_mode,
            cache_root: settings.cache_root.clone(),
        }
    }

    fn source_path(&self, family: ShaderFamily) -> PathBuf {
        self.shader_root.join(family.source_file())
    }

    fn disk_cache(&self) -> DiskCache {
        DiskCache::new(
            self.cache_root.clone(),
            self.shader_root.clone(),
            self.include_dirs.clone(),
            self.global_defines.clone(),
        )
    }
}

struct Inner {
    programs: [RwLock<ProgramMap>; ShaderClass::ALL.len()],
    results: RwLock<FxHashMap<ResultKey, BytecodeResult>>,
    set: CompilationSet,
    compiler: Box<dyn ShaderCompiler>,
    device: Box<dyn ProgramDevice>,
    config: RwLock<CompileConfig>,
    disk: RwLock<Arc<DiskCache>>,

    enabled: AtomicBool,
    async_compilation: AtomicBool,
    use_disk_cache: AtomicBool,
    class_enabled: [AtomicBool; ShaderClass::ALL.len()],
    hide_errors: AtomicBool,
    background: AtomicBool,
    improved_snow: AtomicBool,
    background_threads: AtomicUsize,

    blocking: AtomicBool,
    block: Mutex<ShaderBlock>,
}

/// Debug state for bisecting a broken replacement: one define set whose
/// programs are withheld from the renderer.
#[derive(Default)]
struct ShaderBlock {
    key: Option<ResultKey>,
    index: usize,
    /// Descriptors that hit the blocked define set since it was selected.
    blocked: Vec<TechniqueDescriptor>,
}

fn block_label((class, family, defines): &ResultKey) -> String {
    let defines: Vec<String> = defines
        .iter()
        .map(|(name, value)| if value.is_empty() { name.to_string() } else { format!("{name}={value}") })
        .collect();
    format!("{family}:{class}:{}", defines.join(" "))
}

impl Inner {
    fn produce_bytecode(&self, task: &CompilationTask, request: &CompileRequest<'_>) -> Result<Vec<u8>> {
        if !self.use_disk_cache.load(Ordering::Acquire) {
            return self.compiler.compile(request);
        }

        let disk = Arc::clone(&self.disk.read());
        let hash = disk.key(request)?;
        match disk.load(task.family, task.class, hash) {
            Ok(Some(bytecode)) => {
                log::debug!("Loaded {task} from disk cache");
                self.set.record_cache_hit();
                return Ok(bytecode);
            }
            Ok(None) => {}
            Err(err) => log::warn!("{err}; recompiling {task}"),
        }

        let bytecode = self.compiler.compile(request)?;
        if let Err(err) = disk.store(task.family, task.class, hash, &bytecode) {
            log::warn!("Failed to store {task} in disk cache: {err}");
        }
        Ok(bytecode)
    }

    fn is_blocked(&self, class: ShaderClass, family: ShaderFamily, descriptor: TechniqueDescriptor) -> bool {
        let defines = build_defines(family, class, descriptor, &self.config.read().global_defines);
        let key = (class, family, defines);
        let mut block = self.block.lock();
        if block.key.as_ref() != Some(&key) {
            return false;
        }
        if !block.blocked.contains(&descriptor) {
            block.blocked.push(descriptor);
            log::debug!(
                "Skipping blocked shader {descriptor}:{} total: {}",
                block_label(&key),
                block.blocked.len()
            );
        }
        true
    }

    fn report(task: &CompilationTask, err: &KilnError) {
        match err {
            KilnError::MissingSource(path) => {
                log::error!("Missing shader source {} for {task}", path.display());
            }
            KilnError::Compile { .. } => log::error!("{err}"),
            _ => log::error!("Failed to build {task}: {err}"),
        }
    }

    fn remember(&self, task: &CompilationTask, key: ResultKey, result: BytecodeResult) {
        let mut results = self.results.write();
        if !self.set.is_stale(task) {
            results.insert(key, result);
        }
    }

    fn build_program(&self, task: &CompilationTask, bytecode: &[u8]) -> Result<Arc<CompiledProgram>> {
        let native = self.device.create_program(task.class, bytecode)?;
        let constants = self.compiler.reflect(task.class, task.family, bytecode);
        Ok(Arc::new(CompiledProgram::new(
            task.class,
            task.family,
            task.descriptor,
            native,
            bytecode.len(),
            constants,
        )))
    }

    fn insert(&self, task: &CompilationTask, program: Arc<CompiledProgram>) -> bool {
        let mut map = self.programs[task.class.index()].write();
        if self.set.is_stale(task) {
            log::debug!("Discarding late result for {task}");
            return false;
        }
        map.entry(task.program_key()).or_insert(program);
        true
    }

    fn clear(&self) {
        let mut maps: Vec<_> = self.programs.iter().map(|map| map.write()).collect();
        let mut results = self.results.write();
        for map in &mut maps {
            map.clear();
        }
        results.clear();
        self.set.clear();
        drop(results);
        drop(maps);

        self.disk.read().invalidate_sources();
        log::info!("Shader cache cleared");
    }

    fn clear_family(&self, family: ShaderFamily) {
        let mut maps: Vec<_> = self.programs.iter().map(|map| map.write()).collect();
        let mut results = self.results.write();
        for map in &mut maps {
            map.retain(|(f, _), _| *f != family);
        }
        results.retain(|(_, f, _), _| *f != family);
        self.set.clear_family(family);
        drop(results);
        drop(maps);

        self.disk.read().invalidate_sources();
        log::info!("Cleared {family} shaders");
    }

    fn delete_disk_cache(&self) -> Result<()> {
        let disk = Arc::clone(&self.disk.read());
        disk.delete_all()?;
        if self.use_disk_cache.load(Ordering::Acquire) {
            disk.write_info()?;
        }
        Ok(())
    }

    fn handle_source_change(&self, change: &SourceChange) {
        match change {
            SourceChange::Family(family) => self.clear_family(*family),
            SourceChange::Include(path) => {
                log::info!("Include {} changed, rebuilding every shader", path.display());
                if let Err(err) = self.delete_disk_cache() {
                    log::warn!("Failed to delete disk cache: {err}");
                }
                self.clear();
            }
        }
    }
}

impl TaskRunner for Inner {
    fn compilation_set(&self) -> &CompilationSet {
        &self.set
    }

    fn run(&self, task: &CompilationTask) -> bool {
        if self.set.is_stale(task) {
            return false;
        }

        let (source_path, include_dirs, defines, debug) = {
            let config = self.config.read();
            (
                config.source_path(task.family),
                config.include_dirs.clone(),
                build_defines(task.family, task.class, task.descriptor, &config.global_defines),
                config.developer_mode,
            )
        };
        let request = CompileRequest {
            class: task.class,
            family: task.family,
            descriptor: task.descriptor,
            source_path: &source_path,
            include_dirs: &include_dirs,
            defines: &defines,
            debug,
        };

        let key = (task.class, task.family, defines.clone());
        let known = self.results.read().get(&key).cloned();
        let bytecode = match known {
            Some(BytecodeResult::Bytecode(bytecode)) => {
                log::debug!("{task} shares bytecode with an earlier task");
                self.set.record_cache_hit();
                bytecode
            }
            Some(BytecodeResult::Failed) => {
                log::debug!("{task} shares a failed define set");
                return false;
            }
            None => match self.produce_bytecode(task, &request) {
                Ok(bytecode) => {
                    let bytecode: Arc<[u8]> = bytecode.into();
                    self.remember(task, key, BytecodeResult::Bytecode(Arc::clone(&bytecode)));
                    bytecode
                }
                Err(err) => {
                    Self::report(task, &err);
                    if err.is_permanent() {
                        self.remember(task, key, BytecodeResult::Failed);
                    }
                    return false;
                }
            },
        };

        match self.build_program(task, &bytecode) {
            Ok(program) => self.insert(task, program),
            Err(err) => {
                Self::report(task, &err);
                false
            }
        }
    }
}

// ============================================================================
// Public handle
// ============================================================================

/// Keyed, asynchronous, disk-backed store of compiled programs.
pub struct ShaderCache {
    inner: Arc<Inner>,
    pool: Mutex<Option<WorkerPool>>,
    foreground_threads: AtomicUsize,
    watcher: Mutex<Option<SourceWatcher>>,
}

impl ShaderCache {
    /// Creates a cache, validates the disk cache and starts the compiler
    /// threads.
    pub fn new(
        settings: &KilnSettings,
        compiler: impl ShaderCompiler,
        device: impl ProgramDevice,
    ) -> Result<Self> {
        interner::preload_shader_defines();
        let config = CompileConfig::from_settings(settings);
        let disk = Arc::new(config.disk_cache());

        let inner = Arc::new(Inner {
            programs: std::array::from_fn(|_| RwLock::new(ProgramMap::default())),
            results: RwLock::new(FxHashMap::default()),
            set: CompilationSet::new(),
            compiler: Box::new(compiler),
            device: Box::new(device),
            config: RwLock::new(config),
            disk: RwLock::new(disk),
            enabled: AtomicBool::new(settings.enabled),
            async_compilation: AtomicBool::new(settings.async_compilation),
            use_disk_cache: AtomicBool::new(false),
            class_enabled: std::array::from_fn(|_| AtomicBool::new(true)),
            hide_errors: AtomicBool::new(false),
            background: AtomicBool::new(false),
            improved_snow: AtomicBool::new(settings.improved_snow),
            background_threads: AtomicUsize::new(settings.background_threads()),
            blocking: AtomicBool::new(false),
            block: Mutex::new(ShaderBlock::default()),
        });

        let threads = settings.foreground_threads();
        let cache = Self {
            pool: Mutex::new(Some(WorkerPool::spawn(&inner, threads)?)),
            inner,
            foreground_threads: AtomicUsize::new(threads),
            watcher: Mutex::new(None),
        };

        cache.set_disk_cache(settings.disk_cache);
        if settings.use_file_watcher {
            cache.start_watcher()?;
        }

        log::info!(
            "Shader cache ready: {threads} threads, async={}, disk cache={}",
            settings.async_compilation,
            settings.disk_cache
        );
        Ok(cache)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    #[inline]
    pub fn get_vertex_shader(
        &self,
        family: ShaderFamily,
        descriptor: TechniqueDescriptor,
    ) -> Option<Arc<CompiledProgram>> {
        self.get_shader(ShaderClass::Vertex, family, descriptor)
    }

    #[inline]
    pub fn get_pixel_shader(
        &self,
        family: ShaderFamily,
        descriptor: TechniqueDescriptor,
    ) -> Option<Arc<CompiledProgram>> {
        self.get_shader(ShaderClass::Pixel, family, descriptor)
    }

    #[inline]
    pub fn get_compute_shader(
        &self,
        family: ShaderFamily,
        descriptor: TechniqueDescriptor,
    ) -> Option<Arc<CompiledProgram>> {
        self.get_shader(ShaderClass::Compute, family, descriptor)
    }

    /// Returns the program for `(class, family, descriptor)` if it is ready.
    ///
    /// On a miss this queues a compile (asynchronous mode) or compiles
    /// inline (synchronous mode). Never returns an error: `None` means the
    /// caller should keep using the engine's program.
    pub fn get_shader(
        &self,
        class: ShaderClass,
        family: ShaderFamily,
        descriptor: TechniqueDescriptor,
    ) -> Option<Arc<CompiledProgram>> {
        let inner = &self.inner;
        if !inner.enabled.load(Ordering::Acquire)
            || !inner.class_enabled[class.index()].load(Ordering::Acquire)
        {
            return None;
        }
        // Only lit effects are replaced.
        if family == ShaderFamily::Effect
            && class != ShaderClass::Compute
            && !descriptor.contains(EffectFlags::LIGHTING.bits())
        {
            return None;
        }

        let descriptor = normalize(family, class, descriptor);
        if inner.blocking.load(Ordering::Acquire) && inner.is_blocked(class, family, descriptor) {
            return None;
        }
        let key = (family, descriptor);
        if let Some(program) = inner.programs[class.index()].read().get(&key) {
            return Some(Arc::clone(program));
        }

        let task = CompilationTask::new(class, family, descriptor, inner.set.generation(family));
        if inner.async_compilation.load(Ordering::Acquire) {
            if inner.set.add(task) {
                log::debug!("Queued {task}");
            }
            return None;
        }

        match inner.set.claim(task) {
            Claim::Claimed => {
                let succeeded = inner.run(&task);
                inner.set.complete(task, succeeded);
            }
            Claim::InFlight => inner.set.wait_resolved(&task),
            Claim::Resolved => {}
        }
        inner.programs[class.index()].read().get(&key).cloned()
    }

    /// Number of programs currently held.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.inner.programs.iter().map(|map| map.read().len()).sum()
    }

    /// Pass state for [`crate::descriptor::normalize_for_pass`].
    #[must_use]
    pub fn pass_context(&self, deferred: bool) -> PassContext {
        PassContext {
            deferred,
            improved_snow: self.inner.improved_snow.load(Ordering::Acquire),
        }
    }

    // ------------------------------------------------------------------
    // Switches
    // ------------------------------------------------------------------

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Enables or disables replacement for one class only.
    pub fn set_class_enabled(&self, class: ShaderClass, enabled: bool) {
        self.inner.class_enabled[class.index()].store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn is_class_enabled(&self, class: ShaderClass) -> bool {
        self.inner.class_enabled[class.index()].load(Ordering::Acquire)
    }

    pub fn set_async(&self, async_compilation: bool) {
        self.inner.async_compilation.store(async_compilation, Ordering::Release);
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.inner.async_compilation.load(Ordering::Acquire)
    }

    /// Turns disk persistence on or off. Turning it on validates the
    /// cache directory first.
    pub fn set_disk_cache(&self, use_disk_cache: bool) {
        if use_disk_cache {
            if let Err(err) = self.inner.disk.read().validate() {
                log::warn!("Disk cache unavailable: {err}");
                self.inner.use_disk_cache.store(false, Ordering::Release);
                return;
            }
        }
        self.inner.use_disk_cache.store(use_disk_cache, Ordering::Release);
    }

    #[must_use]
    pub fn is_disk_cache(&self) -> bool {
        self.inner.use_disk_cache.load(Ordering::Acquire)
    }

    pub fn delete_disk_cache(&self) -> Result<()> {
        self.inner.delete_disk_cache()
    }

    /// Drops every program and task. Programs still referenced by the
    /// renderer stay alive until released.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Drops the programs and tasks of one family.
    pub fn clear_family(&self, family: ShaderFamily) {
        self.inner.clear_family(family);
    }

    /// Throttles compilation to the background thread budget so the game
    /// keeps running smoothly while shaders build.
    pub fn set_background_compilation(&self, background: bool) {
        self.inner.background.store(background, Ordering::Release);
        let limit = if background {
            self.inner.background_threads.load(Ordering::Acquire)
        } else {
            usize::MAX
        };
        self.inner.set.set_active_limit(limit);
    }

    #[must_use]
    pub fn is_background_compilation(&self) -> bool {
        self.inner.background.load(Ordering::Acquire)
    }

    /// Shows or hides the failure indicator.
    pub fn toggle_error_messages(&self) {
        self.inner.hide_errors.fetch_xor(true, Ordering::AcqRel);
    }

    #[must_use]
    pub fn is_hide_errors(&self) -> bool {
        self.inner.hide_errors.load(Ordering::Acquire)
    }

    /// Whether the UI should show a persistent "some shaders failed" notice.
    #[must_use]
    pub fn show_error_indicator(&self) -> bool {
        !self.is_hide_errors() && self.failed_tasks() > 0
    }

    // ------------------------------------------------------------------
    // Shader blocking
    // ------------------------------------------------------------------

    /// Withholds the next (or previous) compiled define set from the
    /// renderer, cycling through every set that produced bytecode in sorted
    /// order. Returns a label of the blocked set, or `None` when nothing has
    /// been compiled yet.
    pub fn iterate_shader_block(&self, forward: bool) -> Option<String> {
        let mut keys: Vec<(String, ResultKey)> = self
            .inner
            .results
            .read()
            .iter()
            .filter(|(_, result)| matches!(result, BytecodeResult::Bytecode(_)))
            .map(|(key, _)| (block_label(key), key.clone()))
            .collect();
        if keys.is_empty() {
            return None;
        }
        keys.sort_by(|a, b| a.0.cmp(&b.0));

        let len = keys.len();
        let mut block = self.inner.block.lock();
        let index = match block.key {
            Some(_) if block.index < len && forward => (block.index + 1) % len,
            Some(_) if block.index < len => (block.index + len - 1) % len,
            _ if forward => 0,
            _ => len - 1,
        };
        let (label, key) = keys.swap_remove(index);
        block.key = Some(key);
        block.index = index;
        block.blocked.clear();
        self.inner.blocking.store(true, Ordering::Release);

        log::debug!("Blocking shader ({}/{len}) {label}", index + 1);
        Some(label)
    }

    /// Stops withholding programs.
    pub fn disable_shader_blocking(&self) {
        let mut block = self.inner.block.lock();
        *block = ShaderBlock::default();
        self.inner.blocking.store(false, Ordering::Release);
        log::debug!("Stopped blocking shaders");
    }

    #[must_use]
    pub fn is_shader_blocking(&self) -> bool {
        self.inner.blocking.load(Ordering::Acquire)
    }

    /// Descriptors refused because they resolve to the blocked define set.
    #[must_use]
    pub fn blocked_descriptors(&self) -> Vec<TechniqueDescriptor> {
        self.inner.block.lock().blocked.clone()
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    /// Replaces the worker pool with one of `threads` workers.
    pub fn set_thread_count(&self, threads: usize) -> Result<()> {
        let threads = threads.max(1);
        let mut pool = self.pool.lock();
        if let Some(old) = pool.take() {
            old.shutdown(&self.inner.set);
        }
        *pool = Some(WorkerPool::spawn(&self.inner, threads)?);
        self.foreground_threads.store(threads, Ordering::Release);
        Ok(())
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.pool.lock().as_ref().map_or(0, WorkerPool::len)
    }

    // ------------------------------------------------------------------
    // Progress
    // ------------------------------------------------------------------

    #[must_use]
    pub fn is_compiling(&self) -> bool {
        self.inner.set.is_compiling()
    }

    /// Tasks resolved since the last clear, failures included.
    #[must_use]
    pub fn completed_tasks(&self) -> u64 {
        self.inner.set.completed()
    }

    #[must_use]
    pub fn total_tasks(&self) -> u64 {
        self.inner.set.total()
    }

    #[must_use]
    pub fn failed_tasks(&self) -> u64 {
        self.inner.set.failed()
    }

    #[must_use]
    pub fn cache_hit_tasks(&self) -> u64 {
        self.inner.set.cache_hits()
    }

    #[must_use]
    pub fn stats(&self) -> CompilationStats {
        self.inner.set.stats()
    }

    #[must_use]
    pub fn stats_string(&self) -> String {
        self.stats().to_string()
    }

    /// Blocks until no task is pending or `timeout` elapses. Returns `true`
    /// if the cache went idle.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_compiling() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    // ------------------------------------------------------------------
    // Settings and watcher
    // ------------------------------------------------------------------

    /// Applies changed settings live. Changing any compile input clears the
    /// cache; changing the thread count rebuilds the pool.
    pub fn apply_settings(&self, settings: &KilnSettings) -> Result<()> {
        self.set_enabled(settings.enabled);
        self.set_async(settings.async_compilation);
        self.inner.improved_snow.store(settings.improved_snow, Ordering::Release);

        let config = CompileConfig::from_settings(settings);
        let changed = *self.inner.config.read() != config;
        if changed {
            *self.inner.disk.write() = Arc::new(config.disk_cache());
            *self.inner.config.write() = config;
            self.clear();
        }
        if changed || settings.disk_cache != self.is_disk_cache() {
            self.set_disk_cache(settings.disk_cache);
        }

        self.inner
            .background_threads
            .store(settings.background_threads(), Ordering::Release);
        self.set_background_compilation(self.is_background_compilation());

        let threads = settings.foreground_threads();
        if threads != self.foreground_threads.load(Ordering::Acquire) {
            self.set_thread_count(threads)?;
        }

        let watching = self.watcher.lock().is_some();
        if changed && watching {
            self.stop_watcher();
        }
        if settings.use_file_watcher && (changed || !watching) {
            self.start_watcher()?;
        } else if !settings.use_file_watcher {
            self.stop_watcher();
        }
        Ok(())
    }

    /// Starts watching the shader root and include directories.
    pub fn start_watcher(&self) -> Result<()> {
        let (root, includes) = {
            let config = self.inner.config.read();
            (config.shader_root.clone(), config.include_dirs.clone())
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let watcher = SourceWatcher::spawn(root, includes, move |change| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_source_change(&change);
            }
        })?;
        *self.watcher.lock() = Some(watcher);
        Ok(())
    }

    pub fn stop_watcher(&self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.stop();
        }
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }
}

impl Drop for ShaderCache {
    fn drop(&mut self) {
        self.stop_watcher();
        if let Some(pool) = self.pool.get_mut().take() {
            pool.shutdown(&self.inner.set);
        }
    }
}
