//! # File-backed Estimate Storage
//!
//! Keeps the whole [`Ledger`] in one JSON file, with the same safety
//! features a shared network drive needs:
//! - **Atomic saves**: write to `.tmp`, fsync, rename over the original
//! - **File locking**: a `.lock` file with holder metadata plus an OS-level
//!   exclusive lock, held for each read-modify-write cycle
//! - **Version validation**: ledgers from a newer schema are refused
//!
//! A missing ledger file is an empty ledger; the file is created on the
//! first write.
//!
//! ## Example
//!
//! ```rust,no_run
//! use estimate_core::settings::EstimateSettings;
//! use estimate_core::store::file::{load_ledger, FileLock, FileStore};
//! use std::path::Path;
//!
//! let path = Path::new("estimates.json");
//! let store = FileStore::new(path, &EstimateSettings::default());
//!
//! // Locks are taken per operation; this shows the lower-level API
//! let lock = FileLock::acquire(path, "office-pc").unwrap();
//! let ledger = load_ledger(path).unwrap();
//! println!("{} estimates", ledger.len());
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{EstimateError, EstimateResult};
use crate::estimate::{EstimatePayload, PersistedEstimate};
use crate::settings::EstimateSettings;

use super::ledger::{Ledger, SCHEMA_VERSION};
use super::EstimateStore;

/// Lock file metadata stored in `<ledger>.lock`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Who holds the lock (user name or workstation label)
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a ledger file, released on drop.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock for `path`.
    ///
    /// Fails with [`EstimateError::FileLocked`] while another live process
    /// holds it. Locks older than a day, or held by a dead process on this
    /// machine, are taken over.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> EstimateResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(existing) = FileLock::check(path) {
            return Err(EstimateError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| EstimateError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            EstimateError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(EstimateError::serialization)?;
        lock_file
            .write_all(lock_json.as_bytes())
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| EstimateError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        debug!(path = %lock_path.display(), "acquired ledger lock");
        Ok(FileLock {
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Who holds the lock on `path`, if anyone (stale locks count as free).
    pub fn check(path: &Path) -> Option<LockInfo> {
        let info = read_lock_info(&lock_path_for(path)).ok()?;
        if is_lock_stale(&info) {
            None
        } else {
            Some(info)
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "lock")
}

fn tmp_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

/// `estimates.json` -> `estimates.json.<suffix>`
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut sibling = path.to_path_buf();
    let extension = sibling
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    sibling.set_extension(extension);
    sibling
}

fn read_lock_info(lock_path: &Path) -> EstimateResult<LockInfo> {
    let contents = fs::read_to_string(lock_path)
        .map_err(|e| EstimateError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&contents).map_err(EstimateError::serialization)
}

fn is_lock_stale(info: &LockInfo) -> bool {
    if hostname().is_some_and(|ours| ours == info.machine) {
        #[cfg(windows)]
        {
            use std::process::Command;
            let output = Command::new("tasklist")
                .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                .output();
            if let Ok(output) = output {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                    return true;
                }
            }
        }
        #[cfg(unix)]
        {
            if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                return true;
            }
        }
    }

    (Utc::now() - info.locked_at).num_hours() > 24
}

/// Write a ledger with atomic-rename semantics.
pub fn save_ledger(ledger: &Ledger, path: &Path) -> EstimateResult<()> {
    let json = serde_json::to_string_pretty(ledger).map_err(EstimateError::serialization)?;
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| EstimateError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| EstimateError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .sync_all()
        .map_err(|e| EstimateError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        EstimateError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Read a ledger; a missing file is an empty ledger.
pub fn load_ledger(path: &Path) -> EstimateResult<Ledger> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Ledger::new()),
        Err(e) => return Err(EstimateError::file_error("open", path.display().to_string(), e.to_string())),
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| EstimateError::file_error("read", path.display().to_string(), e.to_string()))?;

    let ledger: Ledger = serde_json::from_str(&contents).map_err(|e| EstimateError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;

    validate_version(&ledger.version)?;
    Ok(ledger)
}

/// Major versions must match; within 0.x a newer minor is refused too.
fn validate_version(file_version: &str) -> EstimateResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let file_parts = parse(file_version);
    let current_parts = parse(SCHEMA_VERSION);

    let mismatch = || EstimateError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let (Some(&file_major), Some(&current_major)) = (file_parts.first(), current_parts.first()) else {
        return Err(mismatch());
    };
    if file_major != current_major {
        return Err(mismatch());
    }
    if current_major == 0 {
        if let (Some(file_minor), Some(current_minor)) = (file_parts.get(1), current_parts.get(1)) {
            if file_minor > current_minor {
                return Err(mismatch());
            }
        }
    }
    Ok(())
}

/// Estimate storage in a single JSON ledger file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    user_id: String,
    number_prefix: String,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, settings: &EstimateSettings) -> Self {
        FileStore {
            path: path.into(),
            user_id: default_user_id(),
            number_prefix: settings.number_prefix.clone(),
        }
    }

    /// Name recorded in the lock file while this store writes.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> EstimateResult<Ledger> {
        load_ledger(&self.path)
    }

    /// Lock, load, mutate, save, unlock.
    fn modify<T>(&self, change: impl FnOnce(&mut Ledger) -> EstimateResult<T>) -> EstimateResult<T> {
        let _lock = FileLock::acquire(&self.path, self.user_id.clone())?;
        let mut ledger = load_ledger(&self.path)?;
        let result = change(&mut ledger)?;
        save_ledger(&ledger, &self.path)?;
        Ok(result)
    }
}

fn default_user_id() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "estimate".to_string())
}

impl EstimateStore for FileStore {
    async fn list(&self) -> EstimateResult<Vec<PersistedEstimate>> {
        Ok(self.read()?.list())
    }

    async fn get(&self, id: &str) -> EstimateResult<PersistedEstimate> {
        self.read()?.get(id).cloned()
    }

    async fn create(&self, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        let created = self.modify(|ledger| Ok(ledger.create(payload, &self.number_prefix, Utc::now())))?;
        info!(id = %created.id, number = %created.draft.estimate_number, path = %self.path.display(), "created estimate");
        Ok(created)
    }

    async fn update(&self, id: &str, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        let updated = self.modify(|ledger| ledger.update(id, payload, Utc::now()))?;
        info!(id, path = %self.path.display(), "updated estimate");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> EstimateResult<()> {
        self.modify(|ledger| ledger.delete(id))?;
        info!(id, path = %self.path.display(), "deleted estimate");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::EstimateDraft;
    use crate::line_item::LineItem;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    fn payload(client: &str) -> EstimatePayload {
        let mut draft = EstimateDraft::new(NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(), Decimal::from(18));
        draft.client_name = client.to_string();
        draft.push_line_item(LineItem::count("Handles", Decimal::from(10), Decimal::from(150)));
        draft.to_payload()
    }

    #[test]
    fn test_sibling_paths() {
        let path = Path::new("/data/estimates.json");
        assert_eq!(lock_path_for(path), Path::new("/data/estimates.json.lock"));
        assert_eq!(tmp_path_for(path), Path::new("/data/estimates.json.tmp"));
        assert_eq!(lock_path_for(Path::new("ledger")), Path::new("ledger.lock"));
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempdir().unwrap();
        let ledger = load_ledger(&dir.path().join("absent.json")).unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load_roundtrip_leaves_no_tmp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");

        let mut ledger = Ledger::new();
        ledger.create(payload("Asha"), "HCE", Utc::now());
        save_ledger(&ledger, &path).unwrap();

        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists());
        // item keys are per-load, so compare the stored shape
        let loaded = load_ledger(&path).unwrap();
        assert_eq!(serde_json::to_value(&loaded).unwrap(), serde_json::to_value(&ledger).unwrap());
    }

    #[test]
    fn test_garbage_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_ledger(&path).unwrap_err().error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");

        let lock = FileLock::acquire(&path, "front-desk").unwrap();
        assert_eq!(lock.info.user_id, "front-desk");
        assert!(lock_path_for(&path).exists());

        drop(lock);
        assert!(!lock_path_for(&path).exists());
        assert!(FileLock::check(&path).is_none());
    }

    #[test]
    fn test_old_foreign_lock_is_stale() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");
        let info = LockInfo {
            user_id: "someone".into(),
            machine: "elsewhere-pc".into(),
            pid: 1,
            locked_at: Utc::now() - chrono::Duration::hours(48),
        };
        fs::write(lock_path_for(&path), serde_json::to_string(&info).unwrap()).unwrap();

        assert!(FileLock::check(&path).is_none());
        let lock = FileLock::acquire(&path, "front-desk").unwrap();
        assert_eq!(lock.info.user_id, "front-desk");
    }

    #[test]
    fn test_fresh_foreign_lock_blocks_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");
        let info = LockInfo {
            user_id: "someone".into(),
            machine: "elsewhere-pc".into(),
            pid: 1,
            locked_at: Utc::now(),
        };
        fs::write(lock_path_for(&path), serde_json::to_string(&info).unwrap()).unwrap();

        let err = FileLock::acquire(&path, "front-desk").unwrap_err();
        assert_eq!(err.error_code(), "FILE_LOCKED");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.9").is_ok());
        assert!(validate_version("0.0.3").is_ok());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("latest").is_err());
    }

    #[test]
    fn test_newer_ledger_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");
        fs::write(&path, r#"{"version": "0.9.0", "estimates": []}"#).unwrap();
        assert_eq!(load_ledger(&path).unwrap_err().error_code(), "VERSION_MISMATCH");
    }

    #[tokio::test]
    async fn test_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");
        let settings = EstimateSettings::default();

        let store = FileStore::new(&path, &settings).with_user_id("tester");
        let first = store.create(payload("Asha")).await.unwrap();
        let second = store.create(payload("Ravi")).await.unwrap();
        assert_eq!(first.draft.estimate_number, "HCE-0001");
        assert_eq!(second.draft.estimate_number, "HCE-0002");
        assert!(!lock_path_for(&path).exists());

        let reopened = FileStore::new(&path, &settings);
        assert_eq!(reopened.list().await.unwrap().len(), 2);
        assert_eq!(reopened.get(&first.id).await.unwrap().draft.client_name, "Asha");

        reopened.delete(&first.id).await.unwrap();
        assert_eq!(store.get(&first.id).await.unwrap_err().error_code(), "NOT_FOUND");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("estimates.json");
        let store = FileStore::new(&path, &EstimateSettings::default());
        store.create(payload("Asha")).await.unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(store.update("missing", payload("Nobody")).await.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(!lock_path_for(&path).exists());
    }
}
