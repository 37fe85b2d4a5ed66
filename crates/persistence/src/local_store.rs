//! Local append-only JSON store.
//!
//! One file per record kind, each holding a pretty-printed JSON array. Every
//! read-modify-write of a file happens under that file's mutex, so
//! concurrent appends never lose updates. Writes go to a sibling temp file
//! that is then renamed over the original.
//!
//! [`LocalStore::lock`] hands out the file lock itself, so a caller can build
//! a record and append it without another append slipping in between.

use chrono::Utc;
use domain::models::{Record, RecordKind};
use serde_json::Value;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

use crate::metrics::StoreTimer;

/// Errors from the local store. Any of these is fatal for a submission.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store file {0} does not contain a JSON array")]
    Corrupt(PathBuf),
}

impl LocalStoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LocalStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A single JSON array file and the lock guarding it.
#[derive(Debug)]
struct StoreFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl StoreFile {
    fn new(data_dir: &Path, kind: RecordKind) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", kind.table())),
            lock: Mutex::new(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// File-backed store holding a complete local mirror of every record.
#[derive(Debug)]
pub struct LocalStore {
    data_dir: PathBuf,
    bookings: StoreFile,
    enquiries: StoreFile,
    payments: StoreFile,
}

impl LocalStore {
    /// Opens the store, creating the data directory and empty files as needed.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| LocalStoreError::io(&data_dir, e))?;

        let store = Self {
            bookings: StoreFile::new(&data_dir, RecordKind::Booking),
            enquiries: StoreFile::new(&data_dir, RecordKind::Enquiry),
            payments: StoreFile::new(&data_dir, RecordKind::Payment),
            data_dir,
        };

        for kind in RecordKind::ALL {
            let path = &store.file(kind).path;
            match tokio::fs::metadata(path).await {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tokio::fs::write(path, b"[]")
                        .await
                        .map_err(|e| LocalStoreError::io(path, e))?;
                }
                Err(e) => return Err(LocalStoreError::io(path, e)),
            }
        }

        debug!(data_dir = %store.data_dir.display(), "Local store opened");
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file backing a record kind.
    pub fn path(&self, kind: RecordKind) -> &Path {
        &self.file(kind).path
    }

    fn file(&self, kind: RecordKind) -> &StoreFile {
        match kind {
            RecordKind::Booking => &self.bookings,
            RecordKind::Enquiry => &self.enquiries,
            RecordKind::Payment => &self.payments,
        }
    }

    /// Locks the file backing `R` until the guard is dropped.
    pub async fn lock<R: Record>(&self) -> StoreFileGuard<'_, R> {
        let file = self.file(R::KIND);
        StoreFileGuard {
            file,
            _lock: file.lock.lock().await,
            _record: PhantomData,
        }
    }

    /// Appends a record and returns the number of rows now stored.
    pub async fn append<R: Record>(&self, record: &R) -> Result<usize, LocalStoreError> {
        self.lock::<R>().await.append(record).await
    }

    /// Reads every row of a kind in insertion order.
    pub async fn read_all(&self, kind: RecordKind) -> Result<Vec<Value>, LocalStoreError> {
        let file = self.file(kind);
        let timer = StoreTimer::new("read_all", kind.table());
        let _guard = file.lock.lock().await;
        let rows = read_rows(&file.path).await;
        timer.record();
        rows
    }

    /// Reads the newest rows of a kind first, keeping at most `limit`.
    ///
    /// Relies on file order being creation order, which holds as long as
    /// records are stamped while their file is locked.
    pub async fn read_newest(
        &self,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<Value>, LocalStoreError> {
        let mut rows = self.read_all(kind).await?;
        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    }

    /// Number of rows stored for a kind.
    pub async fn count(&self, kind: RecordKind) -> Result<usize, LocalStoreError> {
        Ok(self.read_all(kind).await?.len())
    }
}

/// Exclusive access to the store file of one record type.
pub struct StoreFileGuard<'a, R> {
    file: &'a StoreFile,
    _lock: MutexGuard<'a, ()>,
    _record: PhantomData<fn(&R)>,
}

impl<R: Record> StoreFileGuard<'_, R> {
    /// Appends a record and returns the number of rows now stored.
    ///
    /// A file whose content is not a JSON array is moved aside before the
    /// append so no existing bytes are lost.
    pub async fn append(&mut self, record: &R) -> Result<usize, LocalStoreError> {
        let value = serde_json::to_value(record)?;
        let timer = StoreTimer::new("append", R::KIND.table());

        let mut rows = match read_rows(&self.file.path).await {
            Ok(rows) => rows,
            Err(LocalStoreError::Corrupt(path)) => {
                quarantine(&path).await?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        rows.push(value);
        write_rows(self.file, &rows).await?;
        timer.record();

        Ok(rows.len())
    }
}

async fn read_rows(path: &Path) -> Result<Vec<Value>, LocalStoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LocalStoreError::io(path, e)),
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(rows)) => Ok(rows),
        _ => Err(LocalStoreError::Corrupt(path.to_path_buf())),
    }
}

async fn write_rows(file: &StoreFile, rows: &[Value]) -> Result<(), LocalStoreError> {
    let bytes = serde_json::to_vec_pretty(rows)?;
    let temp = file.temp_path();

    tokio::fs::write(&temp, &bytes)
        .await
        .map_err(|e| LocalStoreError::io(&temp, e))?;
    tokio::fs::rename(&temp, &file.path)
        .await
        .map_err(|e| LocalStoreError::io(&file.path, e))
}

/// Moves an unreadable store file aside, keeping its bytes for inspection.
async fn quarantine(path: &Path) -> Result<(), LocalStoreError> {
    let mut target = path.as_os_str().to_owned();
    target.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
    let target = PathBuf::from(target);

    error!(
        path = %path.display(),
        moved_to = %target.display(),
        "Local store file is not a JSON array, moving it aside"
    );

    tokio::fs::rename(path, &target)
        .await
        .map_err(|e| LocalStoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{Enquiry, RecordStamp};
    use std::sync::Arc;

    fn enquiry(n: usize) -> Enquiry {
        let stamp = RecordStamp {
            id: format!("enq_{n:04}"),
            created_at: Utc::now(),
        };
        Enquiry {
            id: stamp.id,
            created_at: stamp.created_at,
            name: format!("Visitor {n}"),
            phone: String::new(),
            email: String::new(),
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn test_open_creates_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("data")).await.unwrap();

        for kind in RecordKind::ALL {
            let raw = tokio::fs::read_to_string(store.path(kind)).await.unwrap();
            assert_eq!(raw, "[]");
        }
        assert!(store.path(RecordKind::Enquiry).ends_with("enquiries.json"));
    }

    #[tokio::test]
    async fn test_open_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("bookings.json"), r#"[{"id":"bk_old"}]"#)
            .await
            .unwrap();

        let store = LocalStore::open(dir.path()).await.unwrap();
        let rows = store.read_all(RecordKind::Booking).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "bk_old");
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        assert_eq!(store.append(&enquiry(1)).await.unwrap(), 1);
        assert_eq!(store.append(&enquiry(2)).await.unwrap(), 2);

        let rows = store.read_all(RecordKind::Enquiry).await.unwrap();
        assert_eq!(rows[0]["id"], "enq_0001");
        assert_eq!(rows[1]["name"], "Visitor 2");
        assert_eq!(store.count(RecordKind::Booking).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_newest_orders_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        for n in 1..=3 {
            store.append(&enquiry(n)).await.unwrap();
        }

        let rows = store.read_newest(RecordKind::Enquiry, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "enq_0003");
        assert_eq!(rows[1]["id"], "enq_0002");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).await.unwrap());

        let handles: Vec<_> = (0..40)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.append(&enquiry(n)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count(RecordKind::Enquiry).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_lock_holds_back_other_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).await.unwrap());
        let path = store.path(RecordKind::Enquiry).to_path_buf();

        let mut guard = store.lock::<Enquiry>().await;
        let waiting = {
            let store = store.clone();
            tokio::spawn(async move { store.append(&enquiry(2)).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "[]");

        assert_eq!(guard.append(&enquiry(1)).await.unwrap(), 1);
        drop(guard);
        assert_eq!(waiting.await.unwrap().unwrap(), 2);

        let rows = store.read_all(RecordKind::Enquiry).await.unwrap();
        assert_eq!(rows[0]["id"], "enq_0001");
        assert_eq!(rows[1]["id"], "enq_0002");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        tokio::fs::write(store.path(RecordKind::Enquiry), "{not json")
            .await
            .unwrap();

        assert!(matches!(
            store.read_all(RecordKind::Enquiry).await,
            Err(LocalStoreError::Corrupt(_))
        ));

        assert_eq!(store.append(&enquiry(1)).await.unwrap(), 1);

        let mut quarantined = 0;
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().contains(".corrupt-") {
                let raw = tokio::fs::read_to_string(entry.path()).await.unwrap();
                assert_eq!(raw, "{not json");
                quarantined += 1;
            }
        }
        assert_eq!(quarantined, 1);
    }

    #[tokio::test]
    async fn test_append_fails_when_file_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let path = store.path(RecordKind::Enquiry).to_path_buf();
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();

        let err = store.append(&enquiry(1)).await.unwrap_err();
        assert!(matches!(err, LocalStoreError::Io { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        tokio::fs::write(store.path(RecordKind::Payment), "  \n")
            .await
            .unwrap();
        assert!(store.read_all(RecordKind::Payment).await.unwrap().is_empty());
    }
}
