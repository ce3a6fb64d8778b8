//! Object store facade: a uniform view over where objects actually live,
//! local directory tree or remote object storage, behind one trait so the
//! reverse-diff engine and callers never need to know which.

pub mod local;
pub mod remote;

use std::io::{Read, Seek, Write};
use thiserror::Error;

pub use local::LocalStore;
pub use remote::RemoteStore;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("object {0:#x} not found")]
    NotFound(u64),
    #[error("response carried no ETag header")]
    MissingEtagHeader,
    #[error("ETag header could not be parsed as a revision id: {0:?}")]
    InvalidEtagHeader(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The two object kinds the store layout distinguishes by filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    File,
    Directory,
}

impl ObjectKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ObjectKind::File => "file",
            ObjectKind::Directory => "dir",
        }
    }
}

/// A handle on an object's byte stream, readable and seekable, as the
/// reverse-diff engine requires (spec §4.3: "a single logical byte stream
/// with random access").
pub trait ObjectStream: Read + Seek {}
impl<T: Read + Seek> ObjectStream for T {}

/// Uniform facade over a store backend. Implementations must give the
/// reverse-diff engine random-access streams; a backend unable to do so
/// (e.g. one that can only append) would need to materialize a local
/// scratch copy first, which is outside this trait's contract.
pub trait ObjectStore {
    type Read: Read + Seek;
    type Write: Write;

    /// Open an existing object for reading.
    fn open_read(&self, id: u64, kind: ObjectKind) -> Result<Self::Read, BackendError>;

    /// Open an object for writing, creating or replacing it.
    fn open_write(&self, id: u64, kind: ObjectKind) -> Result<Self::Write, BackendError>;

    /// Whether an object currently exists.
    fn exists(&self, id: u64, kind: ObjectKind) -> Result<bool, BackendError>;

    /// A revision identifier for the current content of an object, used by
    /// callers to detect concurrent modification. Local stores derive this
    /// from mtime; remote stores derive it from the backend's ETag.
    fn revision_id(&self, id: u64, kind: ObjectKind) -> Result<i64, BackendError>;

    /// Probe for an object by id alone, without knowing its kind ahead of
    /// time. Mirrors `ObjectExists`: since the same id can exist as both a
    /// file and a directory, `Directory` is checked before `File`. Returns
    /// the kind that was found, or `None` if neither exists.
    fn exists_any_kind(&self, id: u64) -> Result<Option<ObjectKind>, BackendError> {
        if self.exists(id, ObjectKind::Directory)? {
            Ok(Some(ObjectKind::Directory))
        } else if self.exists(id, ObjectKind::File)? {
            Ok(Some(ObjectKind::File))
        } else {
            Ok(None)
        }
    }
}
