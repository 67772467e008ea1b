//! Compiler worker pool.
//!
//! A fixed number of named OS threads, each looping
//! `wait_take -> run -> complete` on a shared [`CompilationSet`]. Compiles are
//! CPU bound and call into blocking toolchains, so plain threads are used
//! rather than an async runtime.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::compilation::CompilationSet;
use crate::errors::Result;
use crate::task::CompilationTask;

/// The work a pool thread performs for one task.
pub trait TaskRunner: Send + Sync + 'static {
    fn compilation_set(&self) -> &CompilationSet;

    /// Runs `task` to completion. Returns whether it produced a program.
    fn run(&self, task: &CompilationTask) -> bool;
}

/// Owned set of compiler threads.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `threads` workers (at least one) draining `runner`'s set.
    pub fn spawn<R: TaskRunner>(runner: &Arc<R>, threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let mut workers = Vec::with_capacity(threads);

        for index in 0..threads {
            let worker_runner = Arc::clone(runner);
            let handle = std::thread::Builder::new()
                .name(format!("kiln-compiler-{index}"))
                .spawn(move || worker_loop(worker_runner.as_ref()));

            match handle {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    Self { workers }.shutdown(runner.compilation_set());
                    return Err(err.into());
                }
            }
        }

        log::info!("Started {threads} shader compiler threads");
        Ok(Self { workers })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stops every worker and waits for it to exit. A task that is being
    /// compiled finishes first. The set is reopened afterwards so a new pool
    /// can drain it.
    pub fn shutdown(self, set: &CompilationSet) {
        set.shutdown();
        for worker in self.workers {
            let name = worker.thread().name().unwrap_or("kiln-compiler").to_string();
            if worker.join().is_err() {
                log::error!("Compiler thread {name} panicked");
            }
        }
        set.reopen();
    }
}

fn worker_loop<R: TaskRunner>(runner: &R) {
    let set = runner.compilation_set();
    while let Some(task) = set.wait_take() {
        log::debug!("Compiling {task}");
        let succeeded = runner.run(&task);
        set.complete(task, succeeded);
    }
}
