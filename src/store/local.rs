//! Local directory-tree object store: each object lives under a path built
//! by peeling hex-pair segments off the high bits of its ID, the same
//! layout `S3BackupFileSystem::GetObjectURI` uses for remote keys (see
//! [`super::remote`]), just rooted in a directory tree instead of a URI.
//! Keeping the two backends' path-construction logic structurally
//! identical means the two modules stay easy to compare and is itself
//! the reason to implement `LocalStore` as "a remote store minus HTTP"
//! rather than as its own bespoke scheme.

use super::{BackendError, ObjectKind, ObjectStore};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Number of bits of the object ID consumed by each directory level.
/// BoxBackup calls this STORE_ID_SEGMENT_LENGTH; 8 bits gives at most 256
/// entries per directory level, keeping any one directory small regardless
/// of how many objects the store holds.
pub const STORE_ID_SEGMENT_LENGTH: u32 = 8;

pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Build the on-disk path for an object, without touching the
    /// filesystem. Mirrors `GetObjectURI`: segments come from the high
    /// bits of the ID, least significant segment first (the same order
    /// its `while (id != 0) { ... id >>= SEG_LEN; }` loop emits them),
    /// then the full ID in hex forms the leaf filename.
    pub fn path_for(&self, id: u64, kind: ObjectKind) -> PathBuf {
        let mut path = self.base_dir.clone();
        let mut remaining = id >> STORE_ID_SEGMENT_LENGTH;
        while remaining != 0 {
            path.push(format!("{:02x}", remaining & 0xff));
            remaining >>= STORE_ID_SEGMENT_LENGTH;
        }
        path.push(format!("{:016x}.{}", id, kind.suffix()));
        path
    }

    fn parent_dir(&self, path: &Path) -> Result<(), BackendError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ObjectStore for LocalStore {
    type Read = File;
    type Write = File;

    fn open_read(&self, id: u64, kind: ObjectKind) -> Result<Self::Read, BackendError> {
        let path = self.path_for(id, kind);
        File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::NotFound(id)
            } else {
                BackendError::Io(e)
            }
        })
    }

    fn open_write(&self, id: u64, kind: ObjectKind) -> Result<Self::Write, BackendError> {
        let path = self.path_for(id, kind);
        self.parent_dir(&path)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(file)
    }

    fn exists(&self, id: u64, kind: ObjectKind) -> Result<bool, BackendError> {
        Ok(self.path_for(id, kind).exists())
    }

    fn revision_id(&self, id: u64, kind: ObjectKind) -> Result<i64, BackendError> {
        let path = self.path_for(id, kind);
        let meta = fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::NotFound(id)
            } else {
                BackendError::Io(e)
            }
        })?;
        let mtime = meta
            .modified()
            .map_err(BackendError::Io)?
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        // Timestamp and size together, as a RaidFile's revision id is
        // derived: same mtime with a different size must still compare
        // unequal.
        Ok((mtime.as_secs() as i64).wrapping_add(meta.len() as i64))
    }
}
