//! Process-wide exclusion of concurrent runs on one work directory.

use crate::error::StageError;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tracing::debug;

static ACTIVE: LazyLock<Mutex<HashSet<Utf8PathBuf>>> = LazyLock::new(Default::default);

fn active() -> MutexGuard<'static, HashSet<Utf8PathBuf>> {
    // The set stays consistent even if a holder panicked.
    ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Held for the duration of one pipeline run; releases the directory on drop.
#[derive(Debug)]
pub struct WorkdirGuard {
    key: Utf8PathBuf,
}

impl WorkdirGuard {
    pub fn acquire(work_dir: &Utf8Path) -> Result<Self, StageError> {
        let key = normalize(work_dir);
        if !active().insert(key.clone()) {
            return Err(StageError::WorkdirBusy {
                path: work_dir.to_path_buf(),
            });
        }
        debug!(work_dir = %key, "work dir acquired");
        Ok(Self { key })
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        active().remove(&self.key);
    }
}

fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    path.canonicalize_utf8()
        .unwrap_or_else(|_| path.components().collect())
}
