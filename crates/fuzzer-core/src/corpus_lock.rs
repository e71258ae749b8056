//! Per-corpus-directory run serialization.
//!
//! The engine's corpus format is not safe for concurrent writers. Runs that
//! share a corpus directory take turns; runs on different directories do not
//! wait on each other.
//!
//! Two layers: an in-process async mutex per directory, so waiting tasks do
//! not tie up blocking threads, and an exclusive OS file lock on
//! `<corpus_dir>/.lock`, so separate orchestrators and separate processes on
//! the same corpus also take turns.

use fs4::fs_std::FileExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

pub const LOCK_FILE: &str = ".lock";

type LockMap = Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>;

#[derive(Debug, Clone, Default)]
pub struct CorpusLocks {
    locks: LockMap,
}

/// Exclusive use of one corpus directory. Dropping it releases the file
/// lock, then the in-process lock, then forgets the directory if nobody
/// else is waiting on it.
#[derive(Debug)]
pub struct CorpusGuard {
    file: Option<File>,
    held: Option<OwnedMutexGuard<()>>,
    key: PathBuf,
    locks: LockMap,
}

impl CorpusLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `corpus_dir`, creating it if needed.
    pub async fn acquire(&self, corpus_dir: &Path) -> io::Result<CorpusGuard> {
        std::fs::create_dir_all(corpus_dir)?;
        let key = normalize(corpus_dir);
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let mut guard = CorpusGuard {
            file: None,
            held: Some(lock.lock_owned().await),
            key,
            locks: Arc::clone(&self.locks),
        };

        let lock_path = guard.key.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        debug!(path = %lock_path.display(), "acquiring corpus file lock");
        let file = tokio::task::spawn_blocking(move || {
            FileExt::lock_exclusive(&file)?;
            Ok::<_, io::Error>(file)
        })
        .await
        .map_err(io::Error::other)??;
        guard.file = Some(file);
        Ok(guard)
    }

    /// Directories with a holder or a waiter.
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

impl Drop for CorpusGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = FileExt::unlock(&file) {
                warn!(dir = %self.key.display(), error = %err, "failed to unlock corpus");
            }
        }
        drop(self.held.take());

        let mut locks = self.locks.lock();
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
