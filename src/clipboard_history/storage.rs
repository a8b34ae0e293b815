//! JSON file persistence for clipboard history
//!
//! The whole history is written as one pretty-printed JSON array. Writes go to
//! a sibling `*.json.tmp` file which is flushed and renamed over the target, so
//! a crash mid-write leaves the previous file intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::types::{remove_expired, ClipboardEntry, ContentType, EntryKind};
use crate::error::{ResultExt, StorageError};
use crate::logging;

/// File name of the history store inside the app data directory
pub const HISTORY_FILE_NAME: &str = "clipboard_history.json";

/// Durable backing for the history list.
pub trait HistoryStorage: Send {
    fn save(&self, entries: &[ClipboardEntry]) -> Result<(), StorageError>;

    /// Never fails: a missing or unreadable store yields an empty history.
    fn load(&self) -> Vec<ClipboardEntry>;

    /// Forget everything stored.
    fn clear(&self) -> Result<(), StorageError> {
        self.save(&[])
    }
}

/// On-disk record. Binary payloads are base64 strings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    id: String,
    content: String,
    #[serde(rename = "type")]
    content_type: ContentType,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    is_pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    image_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    rtf_data: Option<Vec<u8>>,
}

impl From<&ClipboardEntry> for StoredEntry {
    fn from(entry: &ClipboardEntry) -> Self {
        let (image_data, rtf_data) = match &entry.kind {
            EntryKind::Image(bytes) => (Some(bytes.clone()), None),
            EntryKind::RichText(bytes) => (None, Some(bytes.clone())),
            EntryKind::Text | EntryKind::Code => (None, None),
        };
        Self {
            id: entry.id.clone(),
            content: entry.content.clone(),
            content_type: entry.content_type(),
            timestamp: entry.timestamp,
            is_pinned: entry.pinned,
            image_data,
            rtf_data,
        }
    }
}

impl StoredEntry {
    /// Rebuild the in-memory entry. Records whose payload does not match their
    /// type are repaired where possible and dropped otherwise.
    fn into_entry(self) -> Option<ClipboardEntry> {
        let kind = match self.content_type {
            ContentType::Text => EntryKind::Text,
            ContentType::Code => EntryKind::Code,
            ContentType::RichText => match self.rtf_data {
                Some(bytes) => EntryKind::RichText(bytes),
                None => {
                    debug!(id = %self.id, "Rich text record without markup, keeping as text");
                    EntryKind::Text
                }
            },
            ContentType::Image => match self.image_data {
                Some(bytes) => EntryKind::Image(bytes),
                None => {
                    warn!(id = %self.id, "Image record without image data, dropping");
                    return None;
                }
            },
        };

        Some(ClipboardEntry {
            id: self.id,
            content: self.content,
            kind,
            timestamp: self.timestamp,
            pinned: self.is_pinned,
        })
    }
}

mod base64_opt {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// History persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    retention: Duration,
    read_only: bool,
}

/// Records read from disk plus how many had to be discarded
struct LoadedRecords {
    entries: Vec<ClipboardEntry>,
    dropped: usize,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            path: path.into(),
            retention,
            read_only: false,
        }
    }

    /// Storage for inspecting a history file another process owns. Loads apply
    /// retention in memory only; saves and clears leave the file untouched.
    pub fn read_only(path: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            read_only: true,
            ..Self::new(path, retention)
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// `<data_dir>/clipkeep/clipboard_history.json`
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clipkeep")
            .join(HISTORY_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the history file. A missing file is not an error.
    pub fn delete_file(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Deleted clipboard history file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Size of the history file in bytes, 0 when it does not exist.
    pub fn file_size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Load, applying the retention sweep relative to `now`. The file is
    /// rewritten when unreadable records were dropped or entries expired.
    pub fn load_at(&self, now: DateTime<Utc>) -> Vec<ClipboardEntry> {
        let LoadedRecords {
            mut entries,
            dropped,
        } = match self.read_file() {
            Ok(loaded) => loaded,
            Err(e) => {
                logging::log_storage_error("load", &e);
                return Vec::new();
            }
        };

        let expired = remove_expired(&mut entries, now, self.retention);
        if expired > 0 {
            info!(expired, "Dropped expired clipboard entries on load");
        }
        if (dropped > 0 || expired > 0) && !self.read_only {
            self.save(&entries).log_err();
        }

        entries
    }

    fn read_file(&self) -> Result<LoadedRecords, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No clipboard history file yet");
                return Ok(LoadedRecords {
                    entries: Vec::new(),
                    dropped: 0,
                });
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        // Decode per record so one bad payload does not cost the whole history
        let records: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let total = records.len();
        let entries: Vec<ClipboardEntry> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                match serde_json::from_value::<StoredEntry>(record) {
                    Ok(stored) => stored.into_entry(),
                    Err(e) => {
                        warn!(index, error = %e, "Unreadable clipboard history record, dropping");
                        None
                    }
                }
            })
            .collect();

        let dropped = total - entries.len();
        if dropped > 0 {
            warn!(dropped, path = %self.path.display(), "Dropped clipboard history records");
        }
        Ok(LoadedRecords { entries, dropped })
    }

    fn io_err(&self, path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
        let path = path.to_path_buf();
        move |source| StorageError::Io { path, source }
    }
}

impl HistoryStorage for JsonFileStorage {
    #[instrument(name = "history_save", skip(self, entries), fields(count = entries.len()))]
    fn save(&self, entries: &[ClipboardEntry]) -> Result<(), StorageError> {
        if self.read_only {
            debug!("Read-only history, not saving");
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(self.io_err(parent))?;
        }

        let records: Vec<StoredEntry> = entries.iter().map(StoredEntry::from).collect();
        let json = serde_json::to_vec_pretty(&records).map_err(StorageError::Serialize)?;

        let temp_path = self.path.with_extension("json.tmp");
        let write_result = (|| {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()
        })();
        if let Err(source) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::Io {
                path: temp_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::Io {
                path: self.path.clone(),
                source,
            });
        }

        debug!(
            path = %self.path.display(),
            bytes = json.len(),
            "Saved clipboard history (atomic)"
        );
        Ok(())
    }

    #[instrument(name = "history_load", skip(self))]
    fn load(&self) -> Vec<ClipboardEntry> {
        self.load_at(Utc::now())
    }

    /// Deletes the file rather than writing an empty array.
    fn clear(&self) -> Result<(), StorageError> {
        if self.read_only {
            debug!("Read-only history, not clearing");
            return Ok(());
        }
        self.delete_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard_history::types::CapturedContent;
    use tempfile::tempdir;

    fn storage_in(dir: &Path) -> JsonFileStorage {
        JsonFileStorage::new(dir.join(HISTORY_FILE_NAME), Duration::hours(48))
    }

    fn entry(content: &str, kind: EntryKind, age: Duration, pinned: bool) -> ClipboardEntry {
        let mut entry = ClipboardEntry::new(CapturedContent::new(content, kind), Utc::now() - age);
        entry.pinned = pinned;
        entry
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        assert!(storage.load().is_empty());
        assert_eq!(storage.file_size(), 0);
    }

    #[test]
    fn test_save_then_load_preserves_entries() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let entries = vec![
            entry("pinned", EntryKind::Text, Duration::hours(1), true),
            entry("fn main() {}", EntryKind::Code, Duration::minutes(5), false),
            entry("Bold", EntryKind::RichText(b"{\\rtf1 Bold}".to_vec()), Duration::minutes(10), false),
            entry("Image", EntryKind::Image(vec![0x89, 0x50, 0x4e, 0x47]), Duration::minutes(20), false),
        ];

        storage.save(&entries).unwrap();
        let loaded = storage.load();

        assert_eq!(loaded, entries);
        assert!(storage.file_size() > 0);
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_format_uses_camel_case_and_base64() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let image = entry("Image", EntryKind::Image(vec![1, 2, 3]), Duration::zero(), true);

        storage.save(std::slice::from_ref(&image)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();

        let record = &raw[0];
        assert_eq!(record["id"], image.id.as_str());
        assert_eq!(record["type"], "image");
        assert_eq!(record["isPinned"], true);
        assert_eq!(record["imageData"], "AQID");
        assert!(record.get("rtfData").is_none());
        assert!(record["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_corrupt_file_loads_empty_and_next_save_recovers() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        fs::write(storage.path(), "{ not json at all").unwrap();

        assert!(storage.load().is_empty());

        let entries = vec![entry("fresh", EntryKind::Text, Duration::zero(), false)];
        storage.save(&entries).unwrap();
        assert_eq!(storage.load(), entries);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let now = Utc::now().to_rfc3339();
        let json = format!(
            r#"[{{"id":"a","content":"hi","type":"text","timestamp":"{now}","isPinned":false,"ocrText":"x"}}]"#
        );
        fs::write(storage.path(), json).unwrap();

        let loaded = storage.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "a");
        assert_eq!(loaded[0].kind, EntryKind::Text);
    }

    #[test]
    fn test_inconsistent_records_are_repaired_or_dropped() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let now = Utc::now().to_rfc3339();
        let json = format!(
            r#"[
                {{"id":"r","content":"styled","type":"richText","timestamp":"{now}","isPinned":false}},
                {{"id":"i","content":"Image","type":"image","timestamp":"{now}","isPinned":false}}
            ]"#
        );
        fs::write(storage.path(), json).unwrap();

        let loaded = storage.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "r");
        assert_eq!(loaded[0].kind, EntryKind::Text);
    }

    #[test]
    fn test_load_sweeps_expired_and_repersists() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let entries = vec![
            entry("pinned old", EntryKind::Text, Duration::hours(200), true),
            entry("recent", EntryKind::Text, Duration::hours(2), false),
            entry("stale", EntryKind::Text, Duration::hours(72), false),
        ];
        storage.save(&entries).unwrap();

        let loaded = storage.load();
        let contents: Vec<_> = loaded.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["pinned old", "recent"]);

        let on_disk = fs::read_to_string(storage.path()).unwrap();
        assert!(!on_disk.contains("stale"));
    }

    #[test]
    fn test_delete_file() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        storage.save(&[entry("x", EntryKind::Text, Duration::zero(), false)]).unwrap();
        assert!(storage.path().exists());

        storage.delete_file().unwrap();
        assert!(!storage.path().exists());
        // Second delete is a no-op
        storage.delete_file().unwrap();
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(
            dir.path().join("nested").join("deeper").join(HISTORY_FILE_NAME),
            Duration::hours(48),
        );
        storage.save(&[]).unwrap();
        assert_eq!(fs::read_to_string(storage.path()).unwrap().trim(), "[]");
    }

    #[test]
    fn test_bad_record_is_dropped_without_losing_the_rest() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let now = Utc::now().to_rfc3339();
        let json = format!(
            r#"[
                {{"id":"keep","content":"pinned note","type":"text","timestamp":"{now}","isPinned":true}},
                {{"id":"bad","content":"Image","type":"image","timestamp":"{now}","isPinned":false,"imageData":"%%%not-base64"}}
            ]"#
        );
        fs::write(storage.path(), json).unwrap();

        let loaded = storage.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "keep");
        assert!(loaded[0].pinned);

        let on_disk = fs::read_to_string(storage.path()).unwrap();
        assert!(on_disk.contains("keep"));
        assert!(!on_disk.contains("not-base64"));
    }

    #[test]
    fn test_dropped_image_without_data_is_removed_from_disk() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let now = Utc::now().to_rfc3339();
        let json = format!(
            r#"[{{"id":"ghost","content":"Image","type":"image","timestamp":"{now}","isPinned":false}}]"#
        );
        fs::write(storage.path(), json).unwrap();

        assert!(storage.load().is_empty());
        assert!(!fs::read_to_string(storage.path()).unwrap().contains("ghost"));
    }

    #[test]
    fn test_read_only_storage_never_writes() {
        let dir = tempdir().unwrap();
        let writer = storage_in(dir.path());
        writer
            .save(&[
                entry("recent", EntryKind::Text, Duration::hours(1), false),
                entry("stale", EntryKind::Text, Duration::hours(72), false),
            ])
            .unwrap();
        let before = fs::read_to_string(writer.path()).unwrap();

        let reader = JsonFileStorage::read_only(writer.path(), Duration::hours(48));
        assert!(reader.is_read_only());
        let loaded = reader.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "recent");

        reader.save(&[]).unwrap();
        reader.clear().unwrap();
        assert_eq!(fs::read_to_string(writer.path()).unwrap(), before);
    }

    #[test]
    fn test_clear_removes_the_file() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        storage.save(&[entry("x", EntryKind::Text, Duration::zero(), true)]).unwrap();

        storage.clear().unwrap();
        assert!(!storage.path().exists());
        assert_eq!(storage.file_size(), 0);
        assert!(storage.load().is_empty());
    }
}

/// In-memory storage for tests of the layers above persistence.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    pub struct MemoryStorage {
        pub saved: Arc<Mutex<Vec<ClipboardEntry>>>,
        pub save_count: Arc<Mutex<usize>>,
        pub fail_saves: bool,
    }

    impl MemoryStorage {
        pub fn with_entries(entries: Vec<ClipboardEntry>) -> Self {
            Self {
                saved: Arc::new(Mutex::new(entries)),
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail_saves: true,
                ..Self::default()
            }
        }

        pub fn saves(&self) -> usize {
            *self.save_count.lock()
        }
    }

    impl HistoryStorage for MemoryStorage {
        fn save(&self, entries: &[ClipboardEntry]) -> Result<(), StorageError> {
            if self.fail_saves {
                return Err(StorageError::Io {
                    path: PathBuf::from("/unwritable/clipboard_history.json"),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            *self.saved.lock() = entries.to_vec();
            *self.save_count.lock() += 1;
            Ok(())
        }

        fn load(&self) -> Vec<ClipboardEntry> {
            self.saved.lock().clone()
        }
    }
}
