//! Shader source watcher.
//!
//! Watches the shader root (and include directories) with `notify`, forwards
//! changed paths over a `flume` channel to a debounce thread, and reports
//! what has to be invalidated once the burst of events settles. Editors tend
//! to emit several events per save, so a short quiet period is awaited
//! before acting.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::descriptor::ShaderFamily;
use crate::errors::Result;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// What a source edit invalidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChange {
    /// A family source file changed; only that family is stale.
    Family(ShaderFamily),
    /// A shared file changed; everything is stale.
    Include(PathBuf),
}

/// Running watcher. Dropping it (or calling [`SourceWatcher::stop`]) stops
/// the debounce thread.
pub struct SourceWatcher {
    watcher: Option<RecommendedWatcher>,
    debouncer: Option<JoinHandle<()>>,
}

impl SourceWatcher {
    /// Watches `shader_root` and `include_dirs`, calling `on_change` for
    /// every settled change.
    pub fn spawn(
        shader_root: PathBuf,
        include_dirs: Vec<PathBuf>,
        on_change: impl Fn(SourceChange) + Send + 'static,
    ) -> Result<Self> {
        let (sender, receiver) = flume::unbounded::<PathBuf>();

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        for path in event.paths {
                            let _ = sender.send(path);
                        }
                    }
                }
                Err(err) => log::warn!("Shader watcher error: {err}"),
            },
            notify::Config::default(),
        )?;

        watcher.watch(&shader_root, RecursiveMode::Recursive)?;
        for dir in &include_dirs {
            if !dir.starts_with(&shader_root) {
                watcher.watch(dir, RecursiveMode::Recursive)?;
            }
        }
        log::info!("Watching {} for shader changes", shader_root.display());

        let root = shader_root.canonicalize().unwrap_or(shader_root);
        let debouncer = spawn_debouncer(receiver, root, on_change)?;

        Ok(Self {
            watcher: Some(watcher),
            debouncer: Some(debouncer),
        })
    }

    /// Stops watching and joins the debounce thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the watcher drops the channel sender, which ends the
        // debounce loop.
        self.watcher.take();
        if let Some(thread) = self.debouncer.take() {
            if thread.join().is_err() {
                log::error!("Shader watcher thread panicked");
            }
        }
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_debouncer(
    receiver: flume::Receiver<PathBuf>,
    root: PathBuf,
    on_change: impl Fn(SourceChange) + Send + 'static,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("kiln-watcher".to_string())
        .spawn(move || {
            while let Ok(first) = receiver.recv() {
                let mut paths = vec![first];
                while let Ok(path) = receiver.recv_timeout(DEBOUNCE) {
                    paths.push(path);
                }

                let changes = coalesce(paths.into_iter().filter_map(|path| {
                    let path = path.canonicalize().unwrap_or(path);
                    classify(&path, &root)
                }));
                for change in changes {
                    log::info!("Shader source change: {change:?}");
                    on_change(change);
                }
            }
        })?;
    Ok(handle)
}

/// Maps a changed path to what it invalidates. Non-shader files are ignored.
#[must_use]
pub fn classify(path: &Path, shader_root: &Path) -> Option<SourceChange> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case("hlsl") && !extension.eq_ignore_ascii_case("hlsli") {
        return None;
    }

    let in_root = path.parent() == Some(shader_root);
    let family = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(ShaderFamily::from_source_stem);

    match family {
        Some(family) if in_root && extension.eq_ignore_ascii_case("hlsl") => {
            Some(SourceChange::Family(family))
        }
        _ => Some(SourceChange::Include(path.to_path_buf())),
    }
}

/// Collapses a burst of changes: any include change supersedes everything,
/// otherwise each family is reported once.
#[must_use]
pub fn coalesce(changes: impl IntoIterator<Item = SourceChange>) -> Vec<SourceChange> {
    let mut families = Vec::new();
    for change in changes {
        match change {
            SourceChange::Include(_) => return vec![change],
            SourceChange::Family(family) if !families.contains(&family) => families.push(family),
            SourceChange::Family(_) => {}
        }
    }
    families.into_iter().map(SourceChange::Family).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn classify_family_and_include() {
        let root = Path::new("/game/Shaders");

        assert_eq!(
            classify(Path::new("/game/Shaders/Water.hlsl"), root),
            Some(SourceChange::Family(ShaderFamily::Water))
        );
        assert_eq!(
            classify(Path::new("/game/Shaders/RunGrass.hlsl"), root),
            Some(SourceChange::Family(ShaderFamily::Grass))
        );
        assert_eq!(
            classify(Path::new("/game/Shaders/Common/Color.hlsli"), root),
            Some(SourceChange::Include(PathBuf::from("/game/Shaders/Common/Color.hlsli")))
        );
        assert_eq!(
            classify(Path::new("/game/Shaders/Common/Water.hlsl"), root),
            Some(SourceChange::Include(PathBuf::from("/game/Shaders/Common/Water.hlsl")))
        );
        assert_eq!(classify(Path::new("/game/Shaders/readme.txt"), root), None);
        assert_eq!(classify(Path::new("/game/Shaders/Water.hlsl~"), root), None);
    }

    #[test]
    fn coalesce_deduplicates_and_escalates() {
        let families = coalesce([
            SourceChange::Family(ShaderFamily::Sky),
            SourceChange::Family(ShaderFamily::Sky),
            SourceChange::Family(ShaderFamily::Lighting),
        ]);
        assert_eq!(
            families,
            [SourceChange::Family(ShaderFamily::Sky), SourceChange::Family(ShaderFamily::Lighting)]
        );

        let escalated = coalesce([
            SourceChange::Family(ShaderFamily::Sky),
            SourceChange::Include(PathBuf::from("Common.hlsli")),
        ]);
        assert_eq!(escalated, [SourceChange::Include(PathBuf::from("Common.hlsli"))]);
    }

    #[test]
    fn debouncer_batches_bursts() {
        let (sender, receiver) = flume::unbounded();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let root = PathBuf::from("/shaders");

        let thread = spawn_debouncer(receiver, root, move |change| sink.lock().push(change)).unwrap();
        for _ in 0..5 {
            sender.send(PathBuf::from("/shaders/Effect.hlsl")).unwrap();
        }
        sender.send(PathBuf::from("/shaders/notes.md")).unwrap();
        drop(sender);
        thread.join().unwrap();

        assert_eq!(*seen.lock(), [SourceChange::Family(ShaderFamily::Effect)]);
    }
}
