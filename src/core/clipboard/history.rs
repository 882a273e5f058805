use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, warn};

use super::storage::{InMemoryStorage, Mutation, PersistedState, RedbStorage, Storage, UndoEntry};
use crate::shared::errors::{StoreError, StoreResult};
use crate::shared::settings::HistorySettings;
use crate::shared::types::{ExportRecord, HistoryItem, ItemId};

/// File name of the history database inside the data directory
pub const DATABASE_FILE: &str = "history.redb";
/// File name used by `export_json` callers when no path is given
pub const DEFAULT_EXPORT_FILE: &str = "clipboard_history.json";

/// Explicit configuration for a history store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    /// 0 disables the cap
    pub max_items: usize,
    pub slot_count: u8,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>, settings: &HistorySettings) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_items: settings.max_items,
            slot_count: settings.slot_count,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn default_export_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_EXPORT_FILE)
    }
}

struct StoreState {
    persisted: PersistedState,
    /// Ids in the order handed out by the last `read_history`
    view: Option<Vec<ItemId>>,
}

/// Clipboard history with write-through persistence.
///
/// The log is ordered oldest first: index 0 is the oldest item. Every
/// mutation is committed to storage before the in-memory copy changes, so a
/// failed write leaves both exactly as they were.
pub struct ClipboardHistory {
    storage: Arc<dyn Storage>,
    state: Arc<Mutex<StoreState>>,
    max_items: usize,
    slot_count: u8,
}

impl ClipboardHistory {
    /// Open (or create) the durable history in `config.data_dir`
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let storage = RedbStorage::open(&config.database_path())?;
        Self::with_storage(Arc::new(storage), config.max_items, config.slot_count)
    }

    /// History that lives only as long as the process
    pub fn in_memory(settings: &HistorySettings) -> Self {
        let persisted = PersistedState::default();
        Self::from_parts(
            Arc::new(InMemoryStorage::new()),
            persisted,
            settings.max_items,
            settings.slot_count,
        )
    }

    pub fn with_storage(
        storage: Arc<dyn Storage>,
        max_items: usize,
        slot_count: u8,
    ) -> StoreResult<Self> {
        let persisted = storage.load()?;
        debug!(
            items = persisted.items.len(),
            slots = persisted.slots.len(),
            "loaded clipboard history"
        );
        Ok(Self::from_parts(storage, persisted, max_items, slot_count))
    }

    fn from_parts(
        storage: Arc<dyn Storage>,
        persisted: PersistedState,
        max_items: usize,
        slot_count: u8,
    ) -> Self {
        Self {
            storage,
            state: Arc::new(Mutex::new(StoreState {
                persisted,
                view: None,
            })),
            max_items,
            slot_count,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("history mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Commit to storage first, then mirror in memory
    fn commit(&self, state: &mut StoreState, mutation: Mutation<'_>) -> StoreResult<()> {
        self.storage.apply(&mutation)?;
        state.persisted.apply(&mutation);
        Ok(())
    }

    /// Resolve a user-facing index against the last view handed out
    fn resolve(state: &StoreState, index: usize) -> StoreResult<usize> {
        let position = match &state.view {
            Some(view) => view
                .get(index)
                .and_then(|id| state.persisted.position(*id)),
            None => (index < state.persisted.items.len()).then_some(index),
        };
        position.ok_or(StoreError::NotFound(index))
    }

    fn check_slot(&self, slot: usize) -> StoreResult<u8> {
        if slot < self.slot_count as usize {
            Ok(slot as u8)
        } else {
            Err(StoreError::InvalidSlot {
                slot,
                count: self.slot_count,
            })
        }
    }

    /// Report a failed operation and flatten it to `false`
    fn report(op: &str, result: StoreResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e @ (StoreError::NotFound(_) | StoreError::InvalidSlot { .. } | StoreError::NothingToUndo)) => {
                debug!("{} rejected: {}", op, e);
                false
            }
            Err(e) => {
                error!("{} failed: {}", op, e);
                false
            }
        }
    }

    /// All items, oldest first. Indices into this list address items for
    /// the index-based operations until the next call.
    pub fn read_history(&self) -> Vec<HistoryItem> {
        let mut state = self.lock_state();
        let items = state.persisted.items.clone();
        state.view = Some(items.iter().map(|item| item.id).collect());
        items
    }

    /// Item at `index` of the current view
    pub fn item(&self, index: usize) -> Option<HistoryItem> {
        let state = self.lock_state();
        Self::resolve(&state, index)
            .ok()
            .map(|pos| state.persisted.items[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.lock_state().persisted.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `content` as a new unpinned item
    pub fn add_item(&self, content: &str) -> bool {
        Self::report("add_item", self.try_add_item(content, None))
    }

    /// Store `content` in `slot` and append it to the log, in one write.
    /// On failure neither the slot nor the log changes.
    pub fn add_item_to_slot(&self, slot: usize, content: &str) -> bool {
        let result = self
            .check_slot(slot)
            .and_then(|slot| self.try_add_item(content, Some(slot)));
        Self::report("add_item_to_slot", result)
    }

    fn try_add_item(&self, content: &str, slot: Option<u8>) -> StoreResult<()> {
        let mut state = self.lock_state();
        let persisted = &state.persisted;

        let id = ItemId(persisted.next_id);
        let timestamp = next_timestamp(persisted.items.last().map(|item| item.timestamp));
        let item = HistoryItem::new_text(id, content.to_string(), timestamp);

        let evicted = self.evictions(persisted);
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicting oldest unpinned items");
        }

        self.commit(
            &mut state,
            Mutation::Append {
                item: &item,
                evicted: &evicted,
                slot,
            },
        )?;
        debug!(id = %item.id, "added history item");
        Ok(())
    }

    /// Oldest unpinned items to drop so one more item fits under the cap
    fn evictions(&self, persisted: &PersistedState) -> Vec<ItemId> {
        if self.max_items == 0 {
            return Vec::new();
        }
        let excess = (persisted.items.len() + 1).saturating_sub(self.max_items);
        persisted
            .items
            .iter()
            .filter(|item| !item.pinned)
            .take(excess)
            .map(|item| item.id)
            .collect()
    }

    /// Items whose content contains `query`, in log order. An empty query
    /// matches nothing.
    pub fn search(&self, query: &str) -> Vec<HistoryItem> {
        if query.is_empty() {
            return Vec::new();
        }
        self.lock_state()
            .persisted
            .items
            .iter()
            .filter(|item| item.content.contains(query))
            .cloned()
            .collect()
    }

    pub fn pin_item(&self, index: usize) -> bool {
        Self::report("pin_item", self.set_pinned(index, true))
    }

    pub fn unpin_item(&self, index: usize) -> bool {
        Self::report("unpin_item", self.set_pinned(index, false))
    }

    fn set_pinned(&self, index: usize, pinned: bool) -> StoreResult<()> {
        let mut state = self.lock_state();
        let pos = Self::resolve(&state, index)?;
        let mut item = state.persisted.items[pos].clone();
        if item.pinned == pinned {
            return Ok(());
        }
        item.pinned = pinned;
        self.commit(&mut state, Mutation::Update(&item))
    }

    /// Remove the item at `index`, keeping it as the single undo entry
    pub fn delete_item(&self, index: usize) -> bool {
        Self::report("delete_item", self.try_delete_item(index))
    }

    fn try_delete_item(&self, index: usize) -> StoreResult<()> {
        let mut state = self.lock_state();
        let position = Self::resolve(&state, index)?;
        let entry = UndoEntry {
            item: state.persisted.items[position].clone(),
            position,
        };
        self.commit(&mut state, Mutation::Delete(&entry))?;
        debug!(id = %entry.item.id, position, "deleted history item");
        Ok(())
    }

    /// Put the last deleted item back at the index it was deleted from,
    /// or at the end when the log is now shorter than that
    pub fn undo_delete(&self) -> bool {
        Self::report("undo_delete", self.try_undo_delete())
    }

    fn try_undo_delete(&self) -> StoreResult<()> {
        let mut state = self.lock_state();
        let entry = state.persisted.undo.clone().ok_or(StoreError::NothingToUndo)?;
        let position = entry.position.min(state.persisted.items.len());
        let after: Vec<ItemId> = state.persisted.items[position..]
            .iter()
            .map(|item| item.id)
            .collect();
        self.commit(&mut state, Mutation::Restore { entry: &entry, after: &after })?;
        debug!(id = %entry.item.id, position, "restored history item");
        Ok(())
    }

    /// Drop every item (or every unpinned item); also empties the undo buffer
    pub fn clear(&self, keep_pinned: bool) -> bool {
        Self::report("clear", self.try_clear(keep_pinned))
    }

    fn try_clear(&self, keep_pinned: bool) -> StoreResult<()> {
        let mut state = self.lock_state();
        let removed: Vec<ItemId> = state
            .persisted
            .items
            .iter()
            .filter(|item| !(keep_pinned && item.pinned))
            .map(|item| item.id)
            .collect();
        self.commit(&mut state, Mutation::Clear { removed: &removed })
    }

    pub fn set_slot(&self, slot: usize, content: &str) -> bool {
        Self::report("set_slot", self.try_set_slot(slot, content))
    }

    fn try_set_slot(&self, slot: usize, content: &str) -> StoreResult<()> {
        let slot = self.check_slot(slot)?;
        let mut state = self.lock_state();
        self.commit(&mut state, Mutation::SetSlot { slot, content })
    }

    /// Slot content. `None` means never set (or no such slot); a slot
    /// explicitly set to "" returns `Some("")`.
    pub fn get_slot(&self, slot: usize) -> Option<String> {
        let slot = self.check_slot(slot).ok()?;
        self.lock_state().persisted.slots.get(&slot).cloned()
    }

    /// Write the whole log as a JSON array, replacing `path` atomically
    pub fn export_json(&self, path: &Path) -> bool {
        Self::report("export_json", self.try_export_json(path))
    }

    fn try_export_json(&self, path: &Path) -> StoreResult<()> {
        let records: Vec<ExportRecord> = self
            .lock_state()
            .persisted
            .items
            .iter()
            .map(ExportRecord::from)
            .collect();
        let json = serde_json::to_string_pretty(&records)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        std::io::Write::write_all(&mut tmp, json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;

        debug!(path = %path.display(), records = records.len(), "exported history");
        Ok(())
    }

    /// Get a clone of the Arc for sharing across threads
    pub fn clone_arc(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            state: Arc::clone(&self.state),
            max_items: self.max_items,
            slot_count: self.slot_count,
        }
    }
}

/// Current time, never earlier than the newest existing timestamp
fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn settings() -> HistorySettings {
        HistorySettings {
            max_items: 0,
            slot_count: 10,
        }
    }

    fn contents(items: &[HistoryItem]) -> Vec<&str> {
        items.iter().map(|item| item.content.as_str()).collect()
    }

    /// Storage that can be told to fail every write, or only appends
    struct FlakyStorage {
        inner: InMemoryStorage,
        fail: AtomicBool,
        fail_appends: AtomicBool,
    }

    impl Storage for FlakyStorage {
        fn load(&self) -> StoreResult<PersistedState> {
            self.inner.load()
        }

        fn apply(&self, mutation: &Mutation<'_>) -> StoreResult<()> {
            let append = matches!(mutation, Mutation::Append { .. });
            if self.fail.load(Ordering::SeqCst) || (append && self.fail_appends.load(Ordering::SeqCst)) {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.inner.apply(mutation)
        }
    }

    fn flaky() -> (Arc<FlakyStorage>, ClipboardHistory) {
        let storage = Arc::new(FlakyStorage {
            inner: InMemoryStorage::new(),
            fail: AtomicBool::new(false),
            fail_appends: AtomicBool::new(false),
        });
        let history = ClipboardHistory::with_storage(storage.clone(), 0, 10).unwrap();
        (storage, history)
    }

    #[test]
    fn test_add_preserves_append_order() {
        let history = ClipboardHistory::in_memory(&settings());
        for text in ["one", "two", "three"] {
            assert!(history.add_item(text));
        }

        let items = history.read_history();
        assert_eq!(contents(&items), vec!["one", "two", "three"]);
        assert!(items.iter().all(|item| !item.pinned));
        assert!(items.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_store_keeps_consecutive_duplicates() {
        let history = ClipboardHistory::in_memory(&settings());
        history.add_item("same");
        history.add_item("same");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_pin_then_unpin() {
        let history = ClipboardHistory::in_memory(&settings());
        history.add_item("a");
        history.add_item("b");
        let before = history.read_history();

        assert!(history.pin_item(1));
        let pinned = history.read_history();
        assert!(pinned[1].pinned);
        assert_eq!(contents(&pinned), contents(&before));

        assert!(history.unpin_item(1));
        assert_eq!(history.read_history(), before);
    }

    #[test]
    fn test_pin_out_of_range_mutates_nothing() {
        let history = ClipboardHistory::in_memory(&settings());
        history.add_item("a");
        let before = history.read_history();

        assert!(!history.pin_item(5));
        assert!(!history.unpin_item(1));
        assert_eq!(history.read_history(), before);
    }

    #[test]
    fn test_delete_then_undo_restores_order() {
        let history = ClipboardHistory::in_memory(&settings());
        for text in ["a", "b", "c"] {
            history.add_item(text);
        }
        let before = history.read_history();

        assert!(history.delete_item(1));
        assert_eq!(contents(&history.read_history()), vec!["a", "c"]);

        assert!(history.undo_delete());
        assert_eq!(history.read_history(), before);

        assert!(!history.undo_delete());
        assert_eq!(history.read_history(), before);
    }

    #[test]
    fn test_undo_after_later_appends() {
        let history = ClipboardHistory::in_memory(&settings());
        for text in ["a", "b", "c"] {
            history.add_item(text);
        }
        history.read_history();
        history.delete_item(1);
        history.add_item("d");

        assert!(history.undo_delete());
        assert_eq!(contents(&history.read_history()), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_undo_returns_to_index_after_eviction() {
        let limited = HistorySettings {
            max_items: 4,
            slot_count: 10,
        };
        let history = ClipboardHistory::in_memory(&limited);
        for text in ["a", "b", "c", "d"] {
            history.add_item(text);
        }
        history.read_history();
        assert!(history.delete_item(2));

        history.add_item("e");
        history.add_item("f");
        assert_eq!(contents(&history.read_history()), vec!["b", "d", "e", "f"]);

        assert!(history.undo_delete());
        assert_eq!(contents(&history.read_history()), vec!["b", "d", "c", "e", "f"]);
    }

    #[test]
    fn test_undo_index_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let limited = HistorySettings {
            max_items: 4,
            slot_count: 10,
        };
        let config = StoreConfig::new(dir.path(), &limited);

        {
            let history = ClipboardHistory::open(&config).unwrap();
            for text in ["a", "b", "c", "d"] {
                history.add_item(text);
            }
            history.delete_item(2);
            history.add_item("e");
            history.add_item("f");
            assert!(history.undo_delete());
        }

        let history = ClipboardHistory::open(&config).unwrap();
        assert_eq!(contents(&history.read_history()), vec!["b", "d", "c", "e", "f"]);
    }

    #[test]
    fn test_second_delete_overwrites_undo() {
        let history = ClipboardHistory::in_memory(&settings());
        for text in ["a", "b", "c"] {
            history.add_item(text);
        }
        history.read_history();
        history.delete_item(0);
        history.read_history();
        history.delete_item(1);

        assert!(history.undo_delete());
        assert_eq!(contents(&history.read_history()), vec!["b", "c"]);
        assert!(!history.undo_delete());
    }

    #[test]
    fn test_delete_out_of_range_fails() {
        let history = ClipboardHistory::in_memory(&settings());
        history.add_item("a");
        assert!(!history.delete_item(1));
        assert!(!history.undo_delete());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_index_resolves_against_last_read() {
        let history = ClipboardHistory::in_memory(&settings());
        history.add_item("a");
        history.add_item("b");
        history.read_history();

        // Index 1 was "b" in the view; deleting "a" must not shift it.
        history.delete_item(0);
        assert!(history.pin_item(1));
        let items = history.read_history();
        assert_eq!(items[0].content, "b");
        assert!(items[0].pinned);
    }

    #[test]
    fn test_stale_view_entry_fails() {
        let history = ClipboardHistory::in_memory(&settings());
        history.add_item("a");
        history.add_item("b");
        history.read_history();

        assert!(history.delete_item(0));
        assert!(!history.pin_item(0));
        assert!(history.item(0).is_none());
        assert_eq!(history.item(1).map(|i| i.content), Some("b".to_string()));
    }

    #[test]
    fn test_slots() {
        let history = ClipboardHistory::in_memory(&settings());
        assert_eq!(history.get_slot(2), None);

        assert!(history.set_slot(2, "first"));
        assert_eq!(history.get_slot(2).as_deref(), Some("first"));

        assert!(history.set_slot(2, "second"));
        assert_eq!(history.get_slot(2).as_deref(), Some("second"));

        assert!(history.set_slot(3, ""));
        assert_eq!(history.get_slot(3).as_deref(), Some(""));

        assert!(history.is_empty());
    }

    #[test]
    fn test_invalid_slot() {
        let history = ClipboardHistory::in_memory(&settings());
        assert!(!history.set_slot(10, "x"));
        assert_eq!(history.get_slot(10), None);
        assert!(!history.add_item_to_slot(10, "x"));
        assert!(history.is_empty());
    }

    #[test]
    fn test_add_item_to_slot() {
        let history = ClipboardHistory::in_memory(&settings());
        assert!(history.add_item_to_slot(3, "both"));
        assert_eq!(history.get_slot(3).as_deref(), Some("both"));
        assert_eq!(contents(&history.read_history()), vec!["both"]);
    }

    #[test]
    fn test_failed_append_keeps_slot() {
        let (storage, history) = flaky();
        history.set_slot(0, "old");

        storage.fail_appends.store(true, Ordering::SeqCst);
        assert!(!history.add_item_to_slot(0, "new"));
        assert_eq!(history.get_slot(0).as_deref(), Some("old"));
        assert!(history.is_empty());

        let reloaded = ClipboardHistory::with_storage(storage.clone(), 0, 10).unwrap();
        assert_eq!(reloaded.get_slot(0).as_deref(), Some("old"));
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_search() {
        let history = ClipboardHistory::in_memory(&settings());
        for text in ["apple pie", "banana", "pineapple", "cherry"] {
            history.add_item(text);
        }

        assert_eq!(contents(&history.search("apple")), vec!["apple pie", "pineapple"]);
        assert!(history.search("kiwi").is_empty());
        assert!(history.search("").is_empty());
    }

    #[test]
    fn test_eviction_spares_pinned_items() {
        let limited = HistorySettings {
            max_items: 3,
            slot_count: 10,
        };
        let history = ClipboardHistory::in_memory(&limited);
        for text in ["a", "b", "c"] {
            history.add_item(text);
        }
        history.read_history();
        history.pin_item(0);

        history.add_item("d");
        history.add_item("e");

        let items = history.read_history();
        assert_eq!(contents(&items), vec!["a", "d", "e"]);
        assert!(items[0].pinned);
    }

    #[test]
    fn test_clear_keep_pinned() {
        let history = ClipboardHistory::in_memory(&settings());
        for text in ["a", "b", "c"] {
            history.add_item(text);
        }
        history.read_history();
        history.pin_item(1);
        history.delete_item(2);

        assert!(history.clear(true));
        assert_eq!(contents(&history.read_history()), vec!["b"]);
        assert!(!history.undo_delete());

        assert!(history.clear(false));
        assert!(history.is_empty());
    }

    #[test]
    fn test_failed_write_leaves_state_untouched() {
        let (storage, history) = flaky();
        history.add_item("a");
        history.set_slot(1, "slot");
        let before = history.read_history();

        storage.fail.store(true, Ordering::SeqCst);
        assert!(!history.add_item("b"));
        assert!(!history.set_slot(1, "changed"));
        assert!(!history.pin_item(0));
        assert!(!history.delete_item(0));

        assert_eq!(history.read_history(), before);
        assert_eq!(history.get_slot(1).as_deref(), Some("slot"));

        // Nothing reached storage either
        let reloaded = ClipboardHistory::with_storage(storage.clone(), 0, 10).unwrap();
        storage.fail.store(false, Ordering::SeqCst);
        assert_eq!(reloaded.read_history(), before);
    }

    #[test]
    fn test_durable_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path(), &settings());

        let before = {
            let history = ClipboardHistory::open(&config).unwrap();
            history.add_item("first");
            history.add_item("second\nline");
            history.read_history();
            history.pin_item(0);
            history.set_slot(0, "zero");
            history.set_slot(9, "nine");
            history.read_history()
        };

        let history = ClipboardHistory::open(&config).unwrap();
        assert_eq!(history.read_history(), before);
        assert_eq!(history.get_slot(0).as_deref(), Some("zero"));
        assert_eq!(history.get_slot(9).as_deref(), Some("nine"));
        assert_eq!(history.get_slot(5), None);
    }

    #[test]
    fn test_undo_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path(), &settings());

        {
            let history = ClipboardHistory::open(&config).unwrap();
            history.add_item("a");
            history.add_item("b");
            history.delete_item(0);
        }

        let history = ClipboardHistory::open(&config).unwrap();
        assert!(history.undo_delete());
        assert_eq!(contents(&history.read_history()), vec!["a", "b"]);

        history.add_item("c");
        let ids: Vec<_> = history.read_history().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![ItemId(0), ItemId(1), ItemId(2)]);
    }

    #[test]
    fn test_export_json_reparses() {
        let dir = tempfile::tempdir().unwrap();
        let history = ClipboardHistory::in_memory(&settings());
        history.add_item("one");
        history.add_item("two \"quoted\"");
        history.read_history();
        history.pin_item(1);

        let path = dir.path().join("out").join("export.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale").unwrap();

        let items = history.read_history();
        assert!(history.export_json(&path));

        let raw = std::fs::read_to_string(&path).unwrap();
        let records: Vec<ExportRecord> = serde_json::from_str(&raw).unwrap();
        let expected: Vec<ExportRecord> = items.iter().map(ExportRecord::from).collect();
        assert_eq!(records, expected);
    }

    #[test]
    fn test_export_to_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let history = ClipboardHistory::in_memory(&settings());
        let path = dir.path().join("a").join("b.json");
        assert!(history.export_json(&path));
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_clone_arc_shares_state() {
        let history = ClipboardHistory::in_memory(&settings());
        let shared = history.clone_arc();

        let handle = std::thread::spawn(move || {
            for i in 0..50 {
                shared.add_item(&format!("t{}", i));
            }
        });
        for i in 0..50 {
            history.add_item(&format!("m{}", i));
        }
        handle.join().unwrap();

        let items = history.read_history();
        assert_eq!(items.len(), 100);
        assert!(items.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_next_timestamp_never_goes_back() {
        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(next_timestamp(Some(future)), future);
        assert!(next_timestamp(None) <= Utc::now());
    }
}
