//! Core binary object format, reverse-diff engine, named lock, and object
//! store facade for a versioned backup store.
//!
//! Layered bottom-up:
//! - [`wire`]: big-endian integer primitives.
//! - [`format`]: the stored-object codec (header, filename/attributes
//!   blocks, data area, trailing block index) built on top of `wire`.
//! - [`lock`]: filesystem-backed exclusive locking, independent of the
//!   object format.
//! - [`store`]: a uniform facade over local-directory and remote-object
//!   backends, addressing objects by ID.
//! - [`revdiff`]: the reverse-diff engine, built on `format` and used
//!   against streams a [`store::ObjectStore`] hands back.
//!
//! [`logging`] and [`config`] are ambient: a structured log-sink trait and
//! the store's own small serde-based configuration type.

pub mod config;
pub mod format;
pub mod lock;
pub mod logging;
pub mod revdiff;
pub mod store;
pub mod wire;

pub use format::{FormatError, Header, IndexEntry, IndexHeader};
pub use lock::{LockError, NamedLock};
pub use logging::{BackupLogSink, LogLevel};
pub use revdiff::{reverse_diff, RevDiffError};
pub use store::{BackendError, LocalStore, ObjectKind, ObjectStore, RemoteStore};
