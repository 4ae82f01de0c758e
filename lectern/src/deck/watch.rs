use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Flags changes to a deck manifest so the runtime can reload slides.
pub struct DeckWatch {
    changed: Arc<AtomicBool>,
    _watcher: RecommendedWatcher,
}

impl DeckWatch {
    pub fn start(path: PathBuf) -> Result<Self, notify::Error> {
        let changed = Arc::new(AtomicBool::new(false));
        let changed_flag = changed.clone();
        let manifest_path = path.clone();

        let mut watcher = notify::recommended_watcher(move |result| {
            let Ok(event) = result else {
                return;
            };

            if manifest_changed(&event, &manifest_path) {
                changed_flag.store(true, Ordering::SeqCst);
            }
        })?;

        // Editors often replace the file, so watch the parent directory.
        let watch_target = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        watcher.watch(&watch_target, RecursiveMode::NonRecursive)?;

        Ok(Self {
            changed,
            _watcher: watcher,
        })
    }

    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::SeqCst)
    }
}

fn manifest_changed(event: &Event, manifest_path: &Path) -> bool {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }

    event
        .paths
        .iter()
        .any(|path| path_matches_target(path, manifest_path))
}

fn path_matches_target(path: &Path, target: &Path) -> bool {
    if path == target {
        return true;
    }

    if path.file_name() == target.file_name() {
        return true;
    }

    let path_canon = path.canonicalize().ok();
    let target_canon = target.canonicalize().ok();

    match (path_canon, target_canon) {
        (Some(path_canon), Some(target_canon)) => path_canon == target_canon,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    use super::*;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn detects_writes_to_the_manifest() {
        let target = Path::new("/tmp/talks/decks.yml");

        assert!(manifest_changed(
            &event(EventKind::Modify(ModifyKind::Any), "/tmp/talks/decks.yml"),
            target
        ));
        assert!(manifest_changed(
            &event(
                EventKind::Create(CreateKind::File),
                "/elsewhere/decks.yml"
            ),
            target
        ));
    }

    #[test]
    fn ignores_unrelated_files_and_access_events() {
        let target = Path::new("/tmp/talks/decks.yml");

        assert!(!manifest_changed(
            &event(EventKind::Modify(ModifyKind::Any), "/tmp/talks/notes.md"),
            target
        ));
        assert!(!manifest_changed(
            &event(
                EventKind::Access(AccessKind::Any),
                "/tmp/talks/decks.yml"
            ),
            target
        ));
    }
}
