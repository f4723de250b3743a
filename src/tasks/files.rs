use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::{Result, SlideshowError};
use crate::slideshow::host::{CandidateListing, CandidateSource, SourceResolver};

/// Candidate source backed by a directory tree.
///
/// Identifiers are paths relative to the root with `/` separators. The
/// change-token is a generation counter bumped by [`watch`]; the listing is
/// only re-walked when the generation moved since the last read.
pub struct DirectorySource {
    root: PathBuf,
    generation: Arc<AtomicU64>,
    cache: Mutex<Option<(u64, Vec<String>)>>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            generation: Arc::new(AtomicU64::new(0)),
            cache: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared counter; bump it to force a re-walk on the next read.
    pub fn generation(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.generation)
    }

    fn cached(&self, generation: u64) -> Option<Vec<String>> {
        let cache = self.cache.lock().ok()?;
        match cache.as_ref() {
            Some((cached_generation, items)) if *cached_generation == generation => {
                Some(items.clone())
            }
            _ => None,
        }
    }

    fn store(&self, generation: u64, items: &[String]) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some((generation, items.to_vec()));
        }
    }
}

impl CandidateSource for DirectorySource {
    async fn read_candidates(&self) -> Result<CandidateListing> {
        let generation = self.generation.load(Ordering::Acquire);
        let change_token = generation.to_string();
        if let Some(items) = self.cached(generation) {
            return Ok(CandidateListing {
                items,
                change_token,
            });
        }

        let root = self.root.clone();
        let items = tokio::task::spawn_blocking(move || scan(&root))
            .await
            .map_err(|err| SlideshowError::SourceUnavailable(format!("scan task failed: {err}")))??;
        info!(
            root = %self.root.display(),
            files = items.len(),
            generation,
            "scanned image root"
        );
        self.store(generation, &items);
        Ok(CandidateListing {
            items,
            change_token,
        })
    }
}

fn scan(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(SlideshowError::SourceUnavailable(format!(
            "{} is not a readable directory",
            root.display()
        )));
    }
    let mut items = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
    {
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        match identifier(relative) {
            Some(id) => items.push(id),
            // Could never be resolved back to the same file.
            None => warn!(path = %entry.path().display(), "skipping file with a non-UTF-8 name"),
        }
    }
    Ok(items)
}

fn identifier(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Maps identifiers to file paths under the image root.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceResolver for FileResolver {
    async fn resolve(&self, identifier: &str) -> Result<String> {
        let failed = |reason: String| SlideshowError::ResolutionFailed {
            id: identifier.to_string(),
            reason,
        };
        let relative = Path::new(identifier);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(failed("not a path inside the image root".into()));
        }
        let path = self.root.join(relative);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path.display().to_string()),
            Ok(_) => Err(failed("not a regular file".into())),
            Err(err) => Err(failed(err.to_string())),
        }
    }
}

/// Watch `root` recursively and bump `generation` whenever the set of files changes.
#[instrument(skip_all, fields(root = %root.display()))]
pub async fn watch(
    root: PathBuf,
    generation: Arc<AtomicU64>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("notify watcher initialized (recursive)");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting watcher task");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) if changes_listing(&event.kind) => {
                    let current = generation.fetch_add(1, Ordering::AcqRel) + 1;
                    debug!(generation = current, kind = ?event.kind, paths = ?event.paths, "image root changed");
                }
                Ok(event) => debug!(kind = ?event.kind, "fs: ignored"),
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}

fn changes_listing(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange};

    #[test]
    fn identifiers_use_forward_slashes() {
        let relative: PathBuf = ["2024", "summer", "beach.jpg"].iter().collect();
        assert_eq!(identifier(&relative).as_deref(), Some("2024/summer/beach.jpg"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_have_no_identifier() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let relative = Path::new("2024").join(OsStr::from_bytes(b"a\xff.jpg"));
        assert_eq!(identifier(&relative), None);
    }

    #[test]
    fn only_structural_events_change_the_listing() {
        assert!(changes_listing(&EventKind::Create(CreateKind::File)));
        assert!(!changes_listing(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
    }
}
