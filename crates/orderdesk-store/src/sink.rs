//! Snapshot sinks: where encoded snapshots are written to and read from.
//!
//! [`FileSink`] is the production backend. Every write goes to a sibling
//! `.tmp` file, is fsynced, then renamed over the target, so a reader sees
//! either the previous snapshot or the new one, never a torn file.
//!
//! [`WriterLock`] keeps two processes from writing the same snapshot.
//!
//! [`MemorySink`] (behind `test-helpers`) keeps the last blob in memory and
//! can be told to fail writes.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Byte-level snapshot backend.
pub trait SnapshotSink: Send + Sync {
    /// Durably replace the stored snapshot with `blob`.
    fn write(&self, blob: &[u8]) -> io::Result<()>;

    /// The stored snapshot, or `None` if nothing was ever written.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Snapshot file on local disk, replaced atomically.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SnapshotSink for FileSink {
    fn write(&self, blob: &[u8]) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let tmp = self.tmp_path();
        let staged = File::create(&tmp).and_then(|mut file| {
            file.write_all(blob)?;
            file.sync_all()
        });
        if let Err(e) = staged.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        sync_directory(&parent)
    }

    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// WriterLock
// ---------------------------------------------------------------------------

/// Marks a snapshot file as owned by one writer process.
///
/// Taken by creating `<snapshot>.lock` exclusively; dropping the lock removes
/// the file. A crashed writer leaves the file behind, and it must then be
/// deleted by hand.
#[derive(Debug)]
pub struct WriterLock {
    path: PathBuf,
    _file: File,
}

impl WriterLock {
    /// Claim the snapshot at `snapshot_path` for this process.
    ///
    /// # Errors
    /// [`io::ErrorKind::AlreadyExists`] if another writer holds it, or any
    /// error from creating the lock file.
    pub fn acquire(snapshot_path: impl AsRef<Path>) -> io::Result<Self> {
        let mut name: OsString = snapshot_path.as_ref().as_os_str().to_owned();
        name.push(".lock");
        let path = PathBuf::from(name);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    io::Error::new(
                        e.kind(),
                        format!("{} exists; another writer holds the snapshot", path.display()),
                    )
                } else {
                    e
                }
            })?;
        Ok(Self { path, _file: file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-helpers"))]
pub use memory::MemorySink;

#[cfg(any(test, feature = "test-helpers"))]
mod memory {
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::SnapshotSink;

    #[derive(Debug, Default)]
    struct Inner {
        blob: Mutex<Option<Vec<u8>>>,
        fail_writes: AtomicBool,
        writes: AtomicUsize,
    }

    /// In-memory sink. Clones share the same storage, so a test can keep a
    /// handle after moving one into the engine.
    #[derive(Debug, Clone, Default)]
    pub struct MemorySink {
        inner: Arc<Inner>,
    }

    impl MemorySink {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A sink that already holds `blob`.
        #[must_use]
        pub fn with_blob(blob: Vec<u8>) -> Self {
            let sink = Self::default();
            *sink.inner.blob.lock() = Some(blob);
            sink
        }

        /// Make subsequent writes fail (or succeed again).
        pub fn fail_writes(&self, fail: bool) {
            self.inner.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Successful writes so far.
        #[must_use]
        pub fn writes(&self) -> usize {
            self.inner.writes.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn blob(&self) -> Option<Vec<u8>> {
            self.inner.blob.lock().clone()
        }
    }

    impl SnapshotSink for MemorySink {
        fn write(&self, blob: &[u8]) -> io::Result<()> {
            if self.inner.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::other("injected write failure"));
            }
            *self.inner.blob.lock() = Some(blob.to_vec());
            self.inner.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn read(&self) -> io::Result<Option<Vec<u8>>> {
            Ok(self.inner.blob.lock().clone())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("snap.json"));
        assert!(sink.read().unwrap().is_none());
    }

    #[test]
    fn file_sink_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("nested/snap.json"));
        sink.write(b"first").unwrap();
        sink.write(b"second").unwrap();
        assert_eq!(sink.read().unwrap().as_deref(), Some(&b"second"[..]));
        assert!(!sink.tmp_path().exists(), "temp file must be renamed away");
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // The target is a non-empty directory, so the rename fails.
        let target = dir.path().join("snap.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let sink = FileSink::new(&target);
        assert!(sink.write(b"blob").is_err());
        assert!(!sink.tmp_path().exists());
    }

    #[test]
    fn writer_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("snap.json");

        let held = WriterLock::acquire(&snapshot).unwrap();
        assert!(held.path().exists());
        let err = WriterLock::acquire(&snapshot).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        let lock_path = held.path().to_path_buf();
        drop(held);
        assert!(!lock_path.exists());
        WriterLock::acquire(&snapshot).unwrap();
    }

    #[test]
    fn memory_sink_failure_injection() {
        let sink = MemorySink::new();
        sink.write(b"ok").unwrap();
        sink.fail_writes(true);
        assert!(sink.write(b"lost").is_err());
        assert_eq!(sink.blob().as_deref(), Some(&b"ok"[..]));
        assert_eq!(sink.writes(), 1);
    }

    #[test]
    fn memory_sink_clones_share_storage() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.write(b"shared").unwrap();
        assert_eq!(handle.read().unwrap().as_deref(), Some(&b"shared"[..]));
    }
}
