use crate::error::{PatchError, PatchResult};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Write};
use tailpatch_types::Lineage;

/// A patch target read fresh for one operation. Holds no file handle.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path.
    pub path: Utf8PathBuf,
    /// Path relative to the lineage root.
    pub rel: Utf8PathBuf,
    pub content: String,
    pub lineage: Lineage,
}

impl SourceFile {
    pub fn read(root: &Utf8Path, rel: &Utf8Path, lineage: Lineage) -> PatchResult<Self> {
        let path = root.join(rel);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PatchError::FileNotFound { path });
            }
            Err(source) => return Err(PatchError::Io { path, source }),
        };
        Ok(Self {
            path,
            rel: rel.to_path_buf(),
            content,
            lineage,
        })
    }
}

/// Replace `path` with `contents` via a sibling temp file and rename.
///
/// Either the old or the new content is on disk afterwards, never a mix.
pub fn write_atomic(path: &Utf8Path, contents: &str) -> PatchResult<()> {
    let io_err = |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    if let Ok(meta) = fs::metadata(path) {
        // Keep the original mode bits (scripts may be executable).
        let _ = tmp.as_file().set_permissions(meta.permissions());
    }

    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
