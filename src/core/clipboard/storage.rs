//! Durable backends for the clipboard history
//!
//! Every change to the history is expressed as one [`Mutation`]. A backend
//! applies a mutation atomically; the in-memory mirror applies the very same
//! mutation afterwards through [`PersistedState::apply`].

use redb::{Database, ReadableTable, Table, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::shared::errors::StoreResult;
use crate::shared::types::{HistoryItem, ItemId};

/// Key: item id, Value: serialized StoredItem
const HISTORY_TABLE: TableDefinition<u64, &str> = TableDefinition::new("history");
/// Key: slot index, Value: slot content
const SLOT_TABLE: TableDefinition<u8, &str> = TableDefinition::new("slots");
/// Single entry under UNDO_KEY holding the last deleted item
const UNDO_TABLE: TableDefinition<&str, &str> = TableDefinition::new("undo");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const UNDO_KEY: &str = "last_deleted";
const NEXT_ID_KEY: &str = "next_id";
const NEXT_RANK_KEY: &str = "next_rank";

/// History row on disk. Rows load sorted by `rank`, which is the log order;
/// it differs from id order once an undone delete goes back to its index.
#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    rank: u64,
    #[serde(flatten)]
    item: HistoryItem,
}

/// The last deleted item and the log index it was deleted from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub item: HistoryItem,
    pub position: usize,
}

/// Everything the history keeps on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Log order, oldest first
    pub items: Vec<HistoryItem>,
    pub slots: BTreeMap<u8, String>,
    pub undo: Option<UndoEntry>,
    pub next_id: u64,
}

/// A single all-or-nothing change to the persisted state
#[derive(Debug)]
pub enum Mutation<'a> {
    /// Append a new item, dropping `evicted` in the same write. With `slot`
    /// set, the item's content is also stored in that slot.
    Append {
        item: &'a HistoryItem,
        evicted: &'a [ItemId],
        slot: Option<u8>,
    },
    /// Replace an existing item (pin state)
    Update(&'a HistoryItem),
    /// Remove an item and keep it as the undo entry
    Delete(&'a UndoEntry),
    /// Put the undo entry back in front of `after` (the ids from its
    /// clamped position to the end of the log) and clear the buffer
    Restore {
        entry: &'a UndoEntry,
        after: &'a [ItemId],
    },
    SetSlot { slot: u8, content: &'a str },
    /// Remove the listed items and clear the undo buffer
    Clear { removed: &'a [ItemId] },
}

impl PersistedState {
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn apply(&mut self, mutation: &Mutation<'_>) {
        match mutation {
            Mutation::Append { item, evicted, slot } => {
                self.items.retain(|existing| !evicted.contains(&existing.id));
                self.items.push((*item).clone());
                self.next_id = self.next_id.max(item.id.0 + 1);
                if let Some(slot) = slot {
                    self.slots.insert(*slot, item.content.clone());
                }
            }
            Mutation::Update(item) => {
                if let Some(pos) = self.position(item.id) {
                    self.items[pos] = (*item).clone();
                }
            }
            Mutation::Delete(entry) => {
                if let Some(pos) = self.position(entry.item.id) {
                    self.items.remove(pos);
                }
                self.undo = Some((*entry).clone());
            }
            Mutation::Restore { entry, .. } => {
                if self.position(entry.item.id).is_none() {
                    let pos = entry.position.min(self.items.len());
                    self.items.insert(pos, entry.item.clone());
                }
                self.undo = None;
            }
            Mutation::SetSlot { slot, content } => {
                self.slots.insert(*slot, (*content).to_string());
            }
            Mutation::Clear { removed } => {
                self.items.retain(|existing| !removed.contains(&existing.id));
                self.undo = None;
            }
        }
    }
}

/// Storage trait for clipboard history persistence
pub trait Storage: Send + Sync {
    fn load(&self) -> StoreResult<PersistedState>;
    /// Persist `mutation` atomically; on error nothing is persisted
    fn apply(&self, mutation: &Mutation<'_>) -> StoreResult<()>;
}

/// Redb-based storage implementation
pub struct RedbStorage {
    db: Database,
}

impl RedbStorage {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        // Initialize tables so read transactions can always open them
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(HISTORY_TABLE)?;
            write_txn.open_table(SLOT_TABLE)?;
            write_txn.open_table(UNDO_TABLE)?;
            write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;

        debug!(path = %path.display(), "opened history database");
        Ok(Self { db })
    }
}

type HistoryRows<'txn> = Table<'txn, u64, &'static str>;
type MetaRows<'txn> = Table<'txn, &'static str, u64>;

fn read_row(history: &HistoryRows<'_>, id: ItemId) -> StoreResult<Option<StoredItem>> {
    match history.get(id.0)? {
        Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
        None => Ok(None),
    }
}

fn write_row(history: &mut HistoryRows<'_>, row: &StoredItem) -> StoreResult<()> {
    let serialized = serde_json::to_string(row)?;
    history.insert(row.item.id.0, serialized.as_str())?;
    Ok(())
}

fn meta_value(meta: &MetaRows<'_>, key: &str) -> StoreResult<u64> {
    Ok(meta.get(key)?.map(|v| v.value()).unwrap_or(0))
}

/// Hand out the rank after every existing row
fn take_rank(meta: &mut MetaRows<'_>) -> StoreResult<u64> {
    let rank = meta_value(meta, NEXT_RANK_KEY)?;
    meta.insert(NEXT_RANK_KEY, rank + 1)?;
    Ok(rank)
}

impl Storage for RedbStorage {
    fn load(&self) -> StoreResult<PersistedState> {
        let read_txn = self.db.begin_read()?;
        let mut state = PersistedState::default();

        let history = read_txn.open_table(HISTORY_TABLE)?;
        let mut rows = Vec::new();
        for entry in history.iter()? {
            let (_, value) = entry?;
            let row: StoredItem = serde_json::from_str(value.value())?;
            rows.push(row);
        }
        rows.sort_by_key(|row| (row.rank, row.item.id));
        state.items = rows.into_iter().map(|row| row.item).collect();

        let slots = read_txn.open_table(SLOT_TABLE)?;
        for entry in slots.iter()? {
            let (key, value) = entry?;
            state.slots.insert(key.value(), value.value().to_string());
        }

        let undo = read_txn.open_table(UNDO_TABLE)?;
        if let Some(value) = undo.get(UNDO_KEY)? {
            state.undo = Some(serde_json::from_str(value.value())?);
        }

        let meta = read_txn.open_table(META_TABLE)?;
        let stored_next = meta.get(NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(0);
        let seen_max = state
            .items
            .iter()
            .chain(state.undo.iter().map(|entry| &entry.item))
            .map(|item| item.id.0 + 1)
            .max()
            .unwrap_or(0);
        state.next_id = stored_next.max(seen_max);

        Ok(state)
    }

    fn apply(&self, mutation: &Mutation<'_>) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut history = write_txn.open_table(HISTORY_TABLE)?;
            let mut undo = write_txn.open_table(UNDO_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;

            match mutation {
                Mutation::Append { item, evicted, slot } => {
                    for id in evicted.iter() {
                        history.remove(id.0)?;
                    }
                    let rank = take_rank(&mut meta)?;
                    write_row(&mut history, &StoredItem { rank, item: (*item).clone() })?;
                    meta.insert(NEXT_ID_KEY, item.id.0 + 1)?;

                    if let Some(slot) = slot {
                        let mut slots = write_txn.open_table(SLOT_TABLE)?;
                        slots.insert(*slot, item.content.as_str())?;
                    }
                }
                Mutation::Update(item) => {
                    let rank = match read_row(&history, item.id)? {
                        Some(row) => row.rank,
                        None => take_rank(&mut meta)?,
                    };
                    write_row(&mut history, &StoredItem { rank, item: (*item).clone() })?;
                }
                Mutation::Delete(entry) => {
                    history.remove(entry.item.id.0)?;
                    let serialized = serde_json::to_string(entry)?;
                    undo.insert(UNDO_KEY, serialized.as_str())?;
                }
                Mutation::Restore { entry, after } => {
                    // Take the rank of the first follower and push every
                    // follower one rank down; ranks stay strictly increasing.
                    let mut rank = None;
                    for id in after.iter() {
                        if let Some(mut row) = read_row(&history, *id)? {
                            rank.get_or_insert(row.rank);
                            row.rank += 1;
                            let next_rank = meta_value(&meta, NEXT_RANK_KEY)?.max(row.rank + 1);
                            meta.insert(NEXT_RANK_KEY, next_rank)?;
                            write_row(&mut history, &row)?;
                        }
                    }
                    let rank = match rank {
                        Some(rank) => rank,
                        None => take_rank(&mut meta)?,
                    };
                    write_row(&mut history, &StoredItem { rank, item: entry.item.clone() })?;
                    undo.remove(UNDO_KEY)?;
                }
                Mutation::SetSlot { slot, content } => {
                    let mut slots = write_txn.open_table(SLOT_TABLE)?;
                    slots.insert(*slot, *content)?;
                }
                Mutation::Clear { removed } => {
                    for id in removed.iter() {
                        history.remove(id.0)?;
                    }
                    undo.remove(UNDO_KEY)?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// In-memory storage, for tests and throwaway stores
#[derive(Default)]
pub struct InMemoryStorage {
    state: Mutex<PersistedState>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn load(&self) -> StoreResult<PersistedState> {
        let state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(state.clone())
    }

    fn apply(&self, mutation: &Mutation<'_>) -> StoreResult<()> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.apply(mutation);
        Ok(())
    }
}
