//! Compilation Set
//!
//! The shared work set between lookups (producers) and compiler workers
//! (consumers). A task moves `available -> in progress -> processed`; a key
//! that reached `processed` is never queued again until the set is cleared,
//! which is what keeps a failing shader from being recompiled every frame.
//!
//! # Generations
//!
//! Every family carries a generation number. Clearing bumps it, and a task
//! remembers the generation it was created in. Results and completions of
//! tasks from an older generation are dropped, so a compile that was already
//! running when the cache was cleared cannot resurrect a stale program.
//!
//! # Counters
//!
//! `total`, `completed`, `failed` and `cache_hits` are atomics so that UI
//! polling never contends with workers. They are only written while the set
//! mutex is held, which keeps `total - completed` equal to the number of
//! unresolved tasks at every observable point.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::descriptor::ShaderFamily;
use crate::errors::KilnError;
use crate::task::CompilationTask;
use crate::utils::time::{Hms, Stopwatch, estimate_total};

/// Outcome of [`CompilationSet::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns the task and must compile and complete it.
    Claimed,
    /// Another thread is compiling the task.
    InFlight,
    /// The task already finished (successfully or not) in this generation,
    /// or belongs to an older generation.
    Resolved,
}

#[derive(Default)]
struct SetState {
    queue: VecDeque<CompilationTask>,
    available: FxHashSet<CompilationTask>,
    in_progress: FxHashSet<CompilationTask>,
    /// Resolved tasks and whether they succeeded.
    processed: FxHashMap<CompilationTask, bool>,
    active_limit: usize,
    shutdown: bool,
    stopwatch: Stopwatch,
}

impl SetState {
    fn knows(&self, task: &CompilationTask) -> bool {
        self.available.contains(task)
            || self.in_progress.contains(task)
            || self.processed.contains_key(task)
    }
}

/// Thread-safe set of pending, running and finished compilation tasks.
pub struct CompilationSet {
    state: Mutex<SetState>,
    work_available: Condvar,
    task_resolved: Condvar,
    generations: [AtomicU64; ShaderFamily::ALL.len()],
    total: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
}

impl Default for CompilationSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SetState {
                active_limit: usize::MAX,
                ..SetState::default()
            }),
            work_available: Condvar::new(),
            task_resolved: Condvar::new(),
            generations: std::array::from_fn(|_| AtomicU64::new(0)),
            total: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// Current generation of `family`. New tasks must be stamped with it.
    #[inline]
    pub fn generation(&self, family: ShaderFamily) -> u64 {
        self.generations[family.id() as usize].load(Ordering::Acquire)
    }

    /// Returns `true` if `task` was created before the last clear of its
    /// family.
    #[inline]
    pub fn is_stale(&self, task: &CompilationTask) -> bool {
        task.generation != self.generation(task.family)
    }

    /// Queues `task` unless it is already known. Returns `true` if it was
    /// queued.
    pub fn add(&self, task: CompilationTask) -> bool {
        let mut state = self.state.lock();
        if self.is_stale(&task) || state.knows(&task) {
            return false;
        }

        state.queue.push_back(task);
        state.available.insert(task);
        state.stopwatch.start();
        self.total.fetch_add(1, Ordering::AcqRel);
        drop(state);

        self.work_available.notify_one();
        true
    }

    fn pop_available(&self, state: &mut SetState) -> Option<CompilationTask> {
        if state.in_progress.len() >= state.active_limit {
            return None;
        }
        let task = state.queue.pop_front()?;
        state.available.remove(&task);
        state.in_progress.insert(task);
        Some(task)
    }

    /// Blocks until a task can be started, then moves it to in-progress.
    /// Returns `None` once the set is shut down.
    pub fn wait_take(&self) -> Option<CompilationTask> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(task) = self.pop_available(&mut state) {
                return Some(task);
            }
            self.work_available.wait(&mut state);
        }
    }

    /// Non-blocking variant of [`Self::wait_take`].
    pub fn try_take(&self) -> Option<CompilationTask> {
        let mut state = self.state.lock();
        if state.shutdown {
            return None;
        }
        self.pop_available(&mut state)
    }

    /// Takes ownership of a specific task for an inline (synchronous)
    /// compile. A queued task is pulled out of the queue; an unknown task is
    /// counted as a new one.
    pub fn claim(&self, task: CompilationTask) -> Claim {
        let mut state = self.state.lock();
        if self.is_stale(&task) || state.processed.contains_key(&task) {
            return Claim::Resolved;
        }
        if state.in_progress.contains(&task) {
            return Claim::InFlight;
        }

        if state.available.remove(&task) {
            state.queue.retain(|queued| queued != &task);
        } else {
            self.total.fetch_add(1, Ordering::AcqRel);
            state.stopwatch.start();
        }
        state.in_progress.insert(task);
        Claim::Claimed
    }

    /// Blocks while `task` is being compiled by someone else.
    ///
    /// [`Self::shutdown`] does not release the wait: a worker that is
    /// stopped mid-task still finishes and completes it, and a clear drops
    /// it from the in-progress set.
    pub fn wait_resolved(&self, task: &CompilationTask) {
        let mut state = self.state.lock();
        while state.in_progress.contains(task) {
            self.task_resolved.wait(&mut state);
        }
    }

    /// Marks an in-progress task as finished.
    ///
    /// Completions from an older generation are dropped silently. Completing
    /// a task that is not in progress is a caller bug: it trips a debug
    /// assertion and is otherwise ignored.
    pub fn complete(&self, task: CompilationTask, succeeded: bool) {
        let mut state = self.state.lock();
        if self.is_stale(&task) {
            log::debug!("Dropping completion of {task} from generation {}", task.generation);
            return;
        }
        if !state.in_progress.remove(&task) {
            drop(state);
            let violation =
                KilnError::ConcurrencyViolation(format!("completed task {task} that is not in progress"));
            if cfg!(debug_assertions) {
                panic!("{violation}");
            }
            log::warn!("{violation}; completion ignored");
            return;
        }

        state.processed.insert(task, succeeded);
        self.completed.fetch_add(1, Ordering::AcqRel);
        if !succeeded {
            self.failed.fetch_add(1, Ordering::AcqRel);
        }
        if state.queue.is_empty() && state.in_progress.is_empty() {
            state.stopwatch.stop();
        }
        drop(state);

        self.task_resolved.notify_all();
        self.work_available.notify_one();
    }

    /// Records that a task was served from a stored result instead of the
    /// compiler.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops every task, resets the counters and starts a new generation for
    /// all families.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.available.clear();
        state.in_progress.clear();
        state.processed.clear();
        state.stopwatch.reset();
        for generation in &self.generations {
            generation.fetch_add(1, Ordering::AcqRel);
        }
        self.total.store(0, Ordering::Release);
        self.completed.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
        self.cache_hits.store(0, Ordering::Release);
        drop(state);

        self.task_resolved.notify_all();
        self.work_available.notify_all();
    }

    /// Drops every task of `family` and starts a new generation for it.
    /// Counters are reduced by the dropped tasks.
    pub fn clear_family(&self, family: ShaderFamily) {
        let mut state = self.state.lock();
        let before = state.queue.len();
        state.queue.retain(|task| task.family != family);
        state.available.retain(|task| task.family != family);
        let mut dropped = (before - state.queue.len()) as u64;

        let running = state.in_progress.len();
        state.in_progress.retain(|task| task.family != family);
        dropped += (running - state.in_progress.len()) as u64;

        let mut resolved = 0;
        let mut failed = 0;
        state.processed.retain(|task, succeeded| {
            let keep = task.family != family;
            if !keep {
                resolved += 1;
                failed += u64::from(!*succeeded);
            }
            keep
        });

        self.generations[family.id() as usize].fetch_add(1, Ordering::AcqRel);
        self.total.fetch_sub(dropped + resolved, Ordering::AcqRel);
        self.completed.fetch_sub(resolved, Ordering::AcqRel);
        self.failed.fetch_sub(failed, Ordering::AcqRel);
        drop(state);

        self.task_resolved.notify_all();
        self.work_available.notify_all();
    }

    /// Caps how many tasks may be in progress at once.
    pub fn set_active_limit(&self, limit: usize) {
        self.state.lock().active_limit = limit.max(1);
        self.work_available.notify_all();
    }

    #[must_use]
    pub fn active_limit(&self) -> usize {
        self.state.lock().active_limit
    }

    /// Wakes every blocked caller; [`Self::wait_take`] returns `None` until
    /// [`Self::reopen`].
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.work_available.notify_all();
        self.task_resolved.notify_all();
    }

    pub fn reopen(&self) {
        self.state.lock().shutdown = false;
    }

    /// Number of tasks queued or in progress.
    #[must_use]
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.queue.len() + state.in_progress.len()
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Tasks resolved in this generation, including failures.
    #[inline]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_compiling(&self) -> bool {
        self.completed() < self.total()
    }

    /// Snapshot of the counters plus timing.
    #[must_use]
    pub fn stats(&self) -> CompilationStats {
        let elapsed = self.state.lock().stopwatch.elapsed();
        let total = self.total();
        let completed = self.completed();
        CompilationStats {
            total,
            completed,
            failed: self.failed(),
            cache_hits: self.cache_hits(),
            elapsed,
            estimated: estimate_total(elapsed, completed, total),
        }
    }
}

/// Point-in-time view of a [`CompilationSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilationStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub elapsed: Duration,
    pub estimated: Duration,
}

impl CompilationStats {
    #[must_use]
    pub fn successful(&self) -> u64 {
        self.completed - self.failed
    }

    /// Just the `elapsed/estimated` part.
    #[must_use]
    pub fn time_string(&self) -> String {
        format!("{}/{}", Hms(self.elapsed), Hms(self.estimated))
    }
}

impl fmt::Display for CompilationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} (successful/total)\tfailed: {}\tcachehits: {}\nElapsed/Estimated Time: {}",
            self.successful(),
            self.total,
            self.failed,
            self.cache_hits,
            self.time_string()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ShaderClass, TechniqueDescriptor};

    fn task(set: &CompilationSet, family: ShaderFamily, raw: u32) -> CompilationTask {
        CompilationTask::new(
            ShaderClass::Pixel,
            family,
            TechniqueDescriptor::from_raw(raw),
            set.generation(family),
        )
    }

    fn assert_accounting(set: &CompilationSet) {
        assert_eq!((set.total() - set.completed()) as usize, set.pending());
    }

    #[test]
    fn add_deduplicates_across_states() {
        let set = CompilationSet::new();
        let t = task(&set, ShaderFamily::Lighting, 1);

        assert!(set.add(t));
        assert!(!set.add(t));
        let taken = set.try_take().unwrap();
        assert_eq!(taken, t);
        assert!(!set.add(t));
        set.complete(t, true);
        assert!(!set.add(t));
        assert_eq!(set.total(), 1);
    }

    #[test]
    fn accounting_holds_through_bursts() {
        let set = CompilationSet::new();
        for raw in 0..20 {
            set.add(task(&set, ShaderFamily::Water, raw));
            assert_accounting(&set);
        }
        let mut taken = Vec::new();
        while let Some(t) = set.try_take() {
            taken.push(t);
            assert_accounting(&set);
        }
        for (i, t) in taken.into_iter().enumerate() {
            set.complete(t, i % 3 != 0);
            assert_accounting(&set);
        }
        assert_eq!(set.completed(), 20);
        assert_eq!(set.failed(), 7);
        assert!(!set.is_compiling());
    }

    #[test]
    fn active_limit_throttles_take() {
        let set = CompilationSet::new();
        set.set_active_limit(1);
        set.add(task(&set, ShaderFamily::Sky, 1));
        set.add(task(&set, ShaderFamily::Sky, 2));

        let first = set.try_take().unwrap();
        assert!(set.try_take().is_none());
        set.complete(first, true);
        assert!(set.try_take().is_some());
    }

    #[test]
    fn claim_states() {
        let set = CompilationSet::new();
        let queued = task(&set, ShaderFamily::Grass, 1);
        let fresh = task(&set, ShaderFamily::Grass, 2);
        set.add(queued);

        assert_eq!(set.claim(queued), Claim::Claimed);
        assert_eq!(set.claim(queued), Claim::InFlight);
        assert!(set.try_take().is_none());
        assert_eq!(set.claim(fresh), Claim::Claimed);
        assert_eq!(set.total(), 2);

        set.complete(queued, false);
        assert_eq!(set.claim(queued), Claim::Resolved);
        set.wait_resolved(&queued);
        assert_accounting(&set);
    }

    #[test]
    fn clear_resets_and_drops_stale_completions() {
        let set = CompilationSet::new();
        let t = task(&set, ShaderFamily::Effect, 5);
        set.add(t);
        let running = set.try_take().unwrap();
        set.record_cache_hit();

        set.clear();
        assert_eq!(set.total(), 0);
        assert_eq!(set.completed(), 0);
        assert_eq!(set.cache_hits(), 0);
        assert!(set.is_stale(&running));

        set.complete(running, true);
        assert_eq!(set.completed(), 0);
        assert!(!set.add(running));

        let again = task(&set, ShaderFamily::Effect, 5);
        assert!(set.add(again));
    }

    #[test]
    fn clear_family_keeps_other_families() {
        let set = CompilationSet::new();
        let water = task(&set, ShaderFamily::Water, 1);
        let sky = task(&set, ShaderFamily::Sky, 1);
        let failed = task(&set, ShaderFamily::Water, 2);
        set.add(water);
        set.add(sky);
        set.add(failed);
        let _ = set.claim(failed);
        set.complete(failed, false);

        set.clear_family(ShaderFamily::Water);
        assert_eq!(set.total(), 1);
        assert_eq!(set.completed(), 0);
        assert_eq!(set.failed(), 0);
        assert!(!set.is_stale(&sky));
        assert!(set.is_stale(&water));
        assert_eq!(set.try_take(), Some(sky));
        assert_accounting(&set);
    }

    #[test]
    fn shutdown_releases_waiters() {
        let set = std::sync::Arc::new(CompilationSet::new());
        let waiter = {
            let set = set.clone();
            std::thread::spawn(move || set.wait_take())
        };
        std::thread::sleep(Duration::from_millis(20));
        set.shutdown();
        assert!(waiter.join().unwrap().is_none());

        set.reopen();
        set.add(task(&set, ShaderFamily::Utility, 3));
        assert!(set.wait_take().is_some());
    }

    #[test]
    fn stats_display_format() {
        let stats = CompilationStats {
            total: 10,
            completed: 6,
            failed: 2,
            cache_hits: 3,
            elapsed: Duration::from_secs(61),
            estimated: Duration::from_secs(122),
        };
        assert_eq!(
            stats.to_string(),
            "4/10 (successful/total)\tfailed: 2\tcachehits: 3\nElapsed/Estimated Time: 00:01:01/00:02:02"
        );
    }

    #[test]
    fn wait_resolved_outlasts_shutdown() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicBool;

        let set = Arc::new(CompilationSet::new());
        let t = task(&set, ShaderFamily::Sky, 4);
        set.add(t);
        let t = set.try_take().unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let waiter = {
            let set = Arc::clone(&set);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                assert_eq!(set.claim(t), Claim::InFlight);
                set.wait_resolved(&t);
                done.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        set.shutdown();
        std::thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));

        set.complete(t, true);
        waiter.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn double_complete_is_ignored() {
        let set = CompilationSet::new();
        let t = task(&set, ShaderFamily::Lighting, 9);
        set.add(t);
        let t = set.try_take().unwrap();
        set.complete(t, true);
        set.complete(t, false);
        assert_eq!(set.completed(), 1);
        assert_eq!(set.failed(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Concurrency invariant violated")]
    fn double_complete_is_a_bug() {
        let set = CompilationSet::new();
        let t = task(&set, ShaderFamily::Lighting, 9);
        set.add(t);
        let t = set.try_take().unwrap();
        set.complete(t, true);
        set.complete(t, true);
    }
}
