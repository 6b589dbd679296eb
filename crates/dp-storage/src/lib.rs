//! Partitioned local storage for the host shell and embedded frames.

mod preference;

pub use preference::ColorModePreference;

use dp_core::PortalError;
use dp_core::PortalResult;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// Partition used by the portal shell itself.
pub const HOST_PARTITION: &str = "host";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    pub ephemeral_mode: bool,
}

type Partition = BTreeMap<String, String>;

/// Entry point for all storage partitions.
///
/// Persistent mode keeps one JSON object per partition in
/// `{root}/partitions/{name}.json`. Ephemeral mode keeps partitions in memory
/// for the lifetime of the manager and its clones.
#[derive(Debug, Clone)]
pub struct StorageManager {
    config: StorageConfig,
    persistent_root: Option<PathBuf>,
    memory: Arc<Mutex<BTreeMap<String, Partition>>>,
}

impl StorageManager {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            persistent_root: None,
            memory: Arc::default(),
        }
    }

    pub fn ephemeral() -> Self {
        Self::new(StorageConfig {
            ephemeral_mode: true,
        })
    }

    pub fn with_persistent_root(mut self, root: PathBuf) -> Self {
        self.persistent_root = Some(root);
        self
    }

    pub fn persistent_root(&self) -> Option<&Path> {
        self.persistent_root.as_deref()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.config.ephemeral_mode
    }

    /// Handle scoped to one partition, e.g. a frame origin or [`HOST_PARTITION`].
    pub fn local_storage(&self, partition: &str) -> LocalStorage {
        LocalStorage {
            manager: self.clone(),
            partition: partition_name(partition),
        }
    }

    fn partition_file(&self, partition: &str) -> PortalResult<PathBuf> {
        let root = self.persistent_root.as_ref().ok_or_else(|| {
            PortalError::storage(
                "storage.persistence_unconfigured",
                "persistent storage root is not configured",
            )
        })?;
        Ok(root.join("partitions").join(format!("{partition}.json")))
    }
}

/// `localStorage`-like view of a single partition.
///
/// Every call reads the partition afresh, so handles created from clones of
/// one manager observe each other's writes.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    manager: StorageManager,
    partition: String,
}

impl LocalStorage {
    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn get_item(&self, key: &str) -> PortalResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> PortalResult<()> {
        let mut items = self.load()?;
        if items.get(key).is_some_and(|current| current == value) {
            return Ok(());
        }
        items.insert(key.to_owned(), value.to_owned());
        tracing::trace!(partition = %self.partition, key, "storage write");
        self.save(&items)
    }

    pub fn remove_item(&self, key: &str) -> PortalResult<()> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> PortalResult<()> {
        self.save(&Partition::new())
    }

    pub fn len(&self) -> PortalResult<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> PortalResult<bool> {
        Ok(self.len()? == 0)
    }

    fn load(&self) -> PortalResult<Partition> {
        if self.manager.is_ephemeral() {
            return Ok(self
                .memory()?
                .get(&self.partition)
                .cloned()
                .unwrap_or_default());
        }

        let path = self.manager.partition_file(&self.partition)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Partition::new()),
            Err(error) => return Err(file_error("storage.partition_read_failed", &path, error)),
        };
        serde_json::from_slice(&raw).map_err(|error| {
            PortalError::storage(
                "storage.partition_format_invalid",
                format!("partition file `{}` is not a string map: {error}", path.display()),
            )
        })
    }

    /// Empty partitions are dropped rather than stored.
    fn save(&self, items: &Partition) -> PortalResult<()> {
        if self.manager.is_ephemeral() {
            let mut memory = self.memory()?;
            if items.is_empty() {
                memory.remove(&self.partition);
            } else {
                memory.insert(self.partition.clone(), items.clone());
            }
            return Ok(());
        }

        let path = self.manager.partition_file(&self.partition)?;
        if items.is_empty() {
            return match fs::remove_file(&path) {
                Err(error) if error.kind() != io::ErrorKind::NotFound => {
                    Err(file_error("storage.partition_remove_failed", &path, error))
                }
                _ => Ok(()),
            };
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|error| file_error("storage.partition_dir_create_failed", dir, error))?;
        }
        let encoded = serde_json::to_vec_pretty(items).map_err(|error| {
            PortalError::storage("storage.partition_encode_failed", error.to_string())
        })?;
        // Readers see either the previous file or the new one.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, encoded)
            .map_err(|error| file_error("storage.partition_write_failed", &staging, error))?;
        fs::rename(&staging, &path)
            .map_err(|error| file_error("storage.partition_write_failed", &path, error))
    }

    fn memory(&self) -> PortalResult<MutexGuard<'_, BTreeMap<String, Partition>>> {
        self.manager.memory.lock().map_err(|_| {
            PortalError::storage("storage.memory_poisoned", "in-memory storage lock poisoned")
        })
    }
}

/// Maps an origin or label onto a file-safe partition name.
fn partition_name(input: &str) -> String {
    let name: String = input
        .trim()
        .chars()
        .map(|ch| match ch.to_ascii_lowercase() {
            ch @ ('a'..='z' | '0'..='9' | '.' | '-' | '_') => ch,
            _ => '_',
        })
        .collect();
    if name.is_empty() { "unknown".to_owned() } else { name }
}

fn file_error(code: &'static str, path: &Path, error: io::Error) -> PortalError {
    PortalError::storage(code, format!("`{}`: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::StorageConfig;
    use super::StorageManager;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::SystemTime;
    use std::time::UNIX_EPOCH;

    static NEXT_ROOT: AtomicUsize = AtomicUsize::new(0);

    fn temp_storage_root() -> std::path::PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|value| value.as_nanos())
            .unwrap_or_default();
        let seq = NEXT_ROOT.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("docportal-storage-test-{stamp}-{seq}"))
    }

    #[test]
    fn persistent_partition_roundtrip() {
        let root = temp_storage_root();
        let manager =
            StorageManager::new(StorageConfig::default()).with_persistent_root(root.clone());
        let storage = manager.local_storage("http://localhost:8080");
        assert_eq!(storage.partition(), "http___localhost_8080");

        assert!(storage.set_item("darkMode", "dark").is_ok());
        let reopened = StorageManager::new(StorageConfig::default())
            .with_persistent_root(root.clone())
            .local_storage("http://localhost:8080");
        assert_eq!(reopened.get_item("darkMode"), Ok(Some("dark".to_owned())));

        assert!(reopened.remove_item("darkMode").is_ok());
        assert_eq!(reopened.is_empty(), Ok(true));
        assert!(!root.join("partitions/http___localhost_8080.json").exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn ephemeral_partitions_are_isolated_and_shared_across_clones() {
        let manager = StorageManager::ephemeral();
        let host = manager.local_storage("host");
        let frame = manager.clone().local_storage("frame");

        assert!(host.set_item("darkMode", "light").is_ok());
        assert!(frame.set_item("darkMode", "dark").is_ok());
        assert_eq!(
            manager.local_storage("host").get_item("darkMode"),
            Ok(Some("light".to_owned()))
        );
        assert_eq!(frame.get_item("darkMode"), Ok(Some("dark".to_owned())));

        assert!(frame.clear().is_ok());
        assert_eq!(frame.len(), Ok(0));
        assert_eq!(host.len(), Ok(1));
    }

    #[test]
    fn persistent_mode_without_root_reports_code() {
        let storage = StorageManager::new(StorageConfig::default()).local_storage("host");
        match storage.set_item("k", "v") {
            Err(error) => assert_eq!(error.code(), "storage.persistence_unconfigured"),
            Ok(()) => panic!("expected failure"),
        }
    }

    #[test]
    fn partition_files_are_plain_json_and_survive_unicode() {
        let root = temp_storage_root();
        let storage = StorageManager::new(StorageConfig::default())
            .with_persistent_root(root.clone())
            .local_storage("Host");
        assert!(storage.set_item("darkMode", "dark \u{1F319}").is_ok());
        assert!(storage.set_item("tab\tkey", "line\nbreak").is_ok());

        let path = root.join("partitions/host.json");
        let raw = match std::fs::read_to_string(&path) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let parsed: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(parsed["darkMode"], "dark \u{1F319}");
        assert_eq!(storage.get_item("tab\tkey"), Ok(Some("line\nbreak".to_owned())));
        assert!(!root.join("partitions/host.json.tmp").exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn corrupt_partition_file_reports_code() {
        let root = temp_storage_root();
        let dir = root.join("partitions");
        assert!(std::fs::create_dir_all(&dir).is_ok());
        assert!(std::fs::write(dir.join("host.json"), "[1, 2]").is_ok());

        let storage = StorageManager::new(StorageConfig::default())
            .with_persistent_root(root.clone())
            .local_storage("host");
        match storage.get_item("darkMode") {
            Err(error) => assert_eq!(error.code(), "storage.partition_format_invalid"),
            Ok(value) => panic!("unexpected {value:?}"),
        }

        let _ = std::fs::remove_dir_all(root);
    }
}
