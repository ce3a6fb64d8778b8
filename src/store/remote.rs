//! Remote object store backend: objects live at URIs under a base path,
//! addressed the same way `S3BackupFileSystem::GetObjectURI` builds S3
//! keys, with the backend's ETag response header standing in for a
//! revision id (`S3BackupFileSystem::GetRevisionID`).

use super::{BackendError, ObjectKind, ObjectStore};
use std::io::{Cursor, Read, Write};

pub struct RemoteStore {
    /// Must start and end with `/`, matching the original's assertion on
    /// `mBasePath` before any URI is built from it.
    base_url: String,
    agent: ureq::Agent,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        debug_assert!(base_url.starts_with('/') || base_url.contains("://"));
        debug_assert!(base_url.ends_with('/'), "base_url must end with '/'");
        Self {
            base_url,
            agent: ureq::Agent::new(),
        }
    }

    /// Build the object URI exactly as `GetObjectURI` does: segments peeled
    /// from the high bits of the ID, least significant segment first (its
    /// `while (id != 0) { ... id >>= SEG_LEN; }` loop never reverses what
    /// it emits), then the full ID in hex plus the kind suffix as the leaf
    /// component.
    pub fn object_uri(&self, id: u64, kind: ObjectKind) -> String {
        let mut uri = self.base_url.clone();
        let mut remaining = id >> crate::store::local::STORE_ID_SEGMENT_LENGTH;
        while remaining != 0 {
            uri.push_str(&format!("{:02x}", remaining & 0xff));
            uri.push('/');
            remaining >>= crate::store::local::STORE_ID_SEGMENT_LENGTH;
        }
        uri.push_str(&format!("{:016x}.{}", id, kind.suffix()));
        uri
    }

    /// Parse a revision id out of an ETag header value, per
    /// `S3BackupFileSystem::GetRevisionID`: strip one leading `"` if
    /// present, then parse the next 16 hex characters as an i64.
    fn parse_etag(etag: &str) -> Result<i64, BackendError> {
        let stripped = etag.strip_prefix('"').unwrap_or(etag);
        let hex_part = stripped.get(0..16).ok_or_else(|| {
            BackendError::InvalidEtagHeader(etag.to_string())
        })?;
        i64::from_str_radix(hex_part, 16)
            .map_err(|_| BackendError::InvalidEtagHeader(etag.to_string()))
    }

    fn map_ureq_error(err: ureq::Error, id: u64, uri: &str) -> BackendError {
        match err {
            ureq::Error::Status(404, _) => BackendError::NotFound(id),
            ureq::Error::Status(code, resp) => {
                BackendError::Http(format!("{uri}: HTTP {code} {}", resp.status_text()))
            }
            ureq::Error::Transport(t) => BackendError::Http(format!("{uri}: {t}")),
        }
    }
}

impl ObjectStore for RemoteStore {
    type Read = Cursor<Vec<u8>>;
    type Write = RemoteWriter;

    fn open_read(&self, id: u64, kind: ObjectKind) -> Result<Self::Read, BackendError> {
        let uri = self.object_uri(id, kind);
        let resp = self
            .agent
            .get(&uri)
            .call()
            .map_err(|e| Self::map_ureq_error(e, id, &uri))?;
        let mut buf = Vec::new();
        resp.into_reader()
            .read_to_end(&mut buf)
            .map_err(BackendError::Io)?;
        Ok(Cursor::new(buf))
    }

    fn open_write(&self, id: u64, kind: ObjectKind) -> Result<Self::Write, BackendError> {
        Ok(RemoteWriter {
            uri: self.object_uri(id, kind),
            agent: self.agent.clone(),
            buf: Vec::new(),
            id,
        })
    }

    fn exists(&self, id: u64, kind: ObjectKind) -> Result<bool, BackendError> {
        let uri = self.object_uri(id, kind);
        match self.agent.head(&uri).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(404, _)) => Ok(false),
            Err(e) => Err(Self::map_ureq_error(e, id, &uri)),
        }
    }

    fn revision_id(&self, id: u64, kind: ObjectKind) -> Result<i64, BackendError> {
        let uri = self.object_uri(id, kind);
        let resp = self
            .agent
            .head(&uri)
            .call()
            .map_err(|e| Self::map_ureq_error(e, id, &uri))?;
        let etag = resp
            .header("ETag")
            .ok_or(BackendError::MissingEtagHeader)?;
        Self::parse_etag(etag)
    }
}

/// Buffers written bytes and issues a single PUT when dropped. Any failure
/// during that final request is logged, since `Drop` cannot return it —
/// callers that need to observe PUT failures should call [`RemoteWriter::finish`]
/// explicitly instead of letting the value drop.
pub struct RemoteWriter {
    uri: String,
    agent: ureq::Agent,
    buf: Vec<u8>,
    id: u64,
}

impl RemoteWriter {
    /// Flush the buffered bytes as a single PUT request, consuming the
    /// writer so the destructor has nothing left to do.
    pub fn finish(mut self) -> Result<(), BackendError> {
        self.send()
    }

    fn send(&mut self) -> Result<(), BackendError> {
        if self.buf.is_empty() && self.uri.is_empty() {
            return Ok(());
        }
        let body = std::mem::take(&mut self.buf);
        let uri = self.uri.clone();
        self.agent
            .put(&self.uri)
            .send_bytes(&body)
            .map_err(|e| RemoteStore::map_ureq_error(e, self.id, &uri))?;
        // Mark as sent so a subsequent Drop is a no-op.
        self.uri.clear();
        Ok(())
    }
}

impl Write for RemoteWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for RemoteWriter {
    fn drop(&mut self) {
        if !self.uri.is_empty() {
            if let Err(e) = self.send() {
                log::warn!("RemoteWriter dropped without finish(): PUT failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_uri_matches_segmentation() {
        let store = RemoteStore::new("/backup/".to_string());
        let uri = store.object_uri(0x0102, ObjectKind::File);
        assert_eq!(uri, "/backup/01/0000000000000102.file");
    }

    #[test]
    fn object_uri_multi_segment_is_least_significant_first() {
        let store = RemoteStore::new("/backup/".to_string());
        // id = 0x010203 -> segments peeled low byte first: 02, then 01.
        let uri = store.object_uri(0x0102_03, ObjectKind::File);
        assert_eq!(uri, "/backup/02/01/0000000000010203.file");
    }

    #[test]
    fn object_uri_small_id_has_no_segments() {
        let store = RemoteStore::new("/backup/".to_string());
        let uri = store.object_uri(5, ObjectKind::Directory);
        assert_eq!(uri, "/backup/0000000000000005.dir");
    }

    #[test]
    fn parse_etag_strips_quote_and_parses_hex() {
        let rev = RemoteStore::parse_etag("\"00000000000003e7extra\"").unwrap();
        assert_eq!(rev, 0x3e7);
    }

    #[test]
    fn parse_etag_without_quote() {
        let rev = RemoteStore::parse_etag("00000000000003e7").unwrap();
        assert_eq!(rev, 0x3e7);
    }

    #[test]
    fn parse_etag_too_short_is_invalid() {
        let err = RemoteStore::parse_etag("\"abc\"").unwrap_err();
        assert!(matches!(err, BackendError::InvalidEtagHeader(_)));
    }
}
