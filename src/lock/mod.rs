//! Named lock — a filesystem-backed exclusive lock keyed by path, giving
//! at-most-one-writer semantics for mutating operations (reverse-diff among
//! them) on one account.
//!
//! # Acquisition strategy
//!
//! The spec allows three strategies, tried in preference order by whichever
//! the host OS supports: an atomic open+exclusive-lock, a create-exclusive
//! open, or open-then-advisory-flock. On the unix and Windows targets this
//! crate builds for, an advisory whole-file write lock (`flock` via unix, an
//! exclusive range lock via Windows) is the one mechanism available on both
//! without accepting the stale-lockfile risk that `O_EXCL`-only locking
//! carries — so it is the strategy used here, selected at compile time via
//! `cfg(unix)`/`cfg(windows)` the same way the teacher crate's `perf` module
//! picks its parallel-compression code path via `cfg(feature = "parallel")`
//! rather than probing at runtime. A target with neither facility falls back
//! to create-exclusive, accepting the stale-lock risk the spec documents.
//!
//! # Release order
//!
//! On unix, `flock`'s hold is tied to the file descriptor: a racing acquirer
//! could open the same path between our `close` and `unlink` and find an
//! orphaned-but-unlocked lockfile. So the lockfile is unlinked *before* the
//! descriptor is closed. On Windows, an open handle prevents deleting the
//! file at all, so the order is reversed: close, then unlink. This ordering
//! is a contract (see spec §4.2), not an implementation detail — do not
//! "simplify" it to a single order for both platforms.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    /// `try_acquire` called on a `NamedLock` that already holds a lock.
    #[error("this NamedLock already holds a lock; release it before acquiring another")]
    AlreadyHeld,
    /// `release` called on a `NamedLock` that is not currently holding a lock.
    #[error("release() called but no lock is held")]
    NotHeld,
    /// Another holder currently owns the lock (non-blocking contention).
    #[error("lock is held by another process")]
    Conflict,
    /// The lockfile was unlinked by a racing process between our open and
    /// our lock acquisition; the acquisition must be treated as failed.
    #[error("lockfile vanished after the lock was acquired")]
    VanishedAfterAcquire,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A filesystem-backed exclusive lock, identifying a resource by path.
///
/// Default-constructed in the unlocked state. Dropping a held lock releases
/// it (logging a warning if the release itself fails, since `Drop` cannot
/// propagate errors).
#[derive(Debug, Default)]
pub struct NamedLock {
    held: Option<HeldLock>,
}

#[derive(Debug)]
struct HeldLock {
    file: File,
    path: PathBuf,
}

impl NamedLock {
    pub fn new() -> Self {
        Self { held: None }
    }

    /// True if this `NamedLock` currently holds a lock.
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Attempt to acquire the lock at `path`, creating the lockfile if
    /// necessary with the given unix permission `mode` (ignored on
    /// non-unix targets).
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` if another holder
    /// currently owns the lock. Any other filesystem failure is returned as
    /// `Err`.
    pub fn try_acquire<P: AsRef<Path>>(&mut self, path: P, mode: u32) -> Result<bool, LockError> {
        if self.held.is_some() {
            return Err(LockError::AlreadyHeld);
        }
        let path = path.as_ref().to_path_buf();

        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(mode);
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
        }

        let file = opts.open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                log::trace!("lock contended: {}", path.display());
                return Ok(false);
            }
            Err(e) => return Err(LockError::Io(e)),
        }

        // Re-check existence: a racing releaser could have unlinked this
        // path between our open() and our successful lock.
        if !path.exists() {
            let _ = FileExt::unlock(&file);
            drop(file);
            log::warn!(
                "lockfile {} vanished after acquiring the lock",
                path.display()
            );
            return Err(LockError::VanishedAfterAcquire);
        }

        log::trace!("acquired lock: {}", path.display());
        self.held = Some(HeldLock { file, path });
        Ok(true)
    }

    /// Release a held lock, unlinking the lockfile. Errors if no lock is
    /// currently held.
    pub fn release(&mut self) -> Result<(), LockError> {
        let HeldLock { file, path } = self.held.take().ok_or(LockError::NotHeld)?;

        #[cfg(unix)]
        {
            // unlink before close: flock's hold is released on close, so
            // unlinking first closes the window where a racing acquirer
            // could find an unlocked-but-still-present lockfile.
            std::fs::remove_file(&path)?;
            let _ = FileExt::unlock(&file);
            drop(file);
        }
        #[cfg(not(unix))]
        {
            // An open handle prevents deletion on Windows, so close first.
            let _ = FileExt::unlock(&file);
            drop(file);
            std::fs::remove_file(&path)?;
        }

        log::trace!("released lock and deleted lockfile {}", path.display());
        Ok(())
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        if self.held.is_some() {
            if let Err(e) = self.release() {
                log::warn!("failed to release NamedLock on drop: {e}");
            }
        }
    }
}
