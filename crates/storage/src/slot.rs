use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::error::{HistoryError, HistoryResult};

/// Named key-value slots holding serialized text.
pub trait SlotStore: Send + Sync {
    /// Returns `None` when the slot does not exist.
    fn read(&self, key: &str) -> HistoryResult<Option<String>>;
    /// Replaces the whole slot value.
    fn write(&self, key: &str, value: &str) -> HistoryResult<()>;
    /// Removing an absent slot succeeds.
    fn remove(&self, key: &str) -> HistoryResult<()>;
}

impl<T> SlotStore for Arc<T>
where
    T: SlotStore + ?Sized,
{
    fn read(&self, key: &str) -> HistoryResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> HistoryResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        (**self).remove(key)
    }
}

/// Process-local slots. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots
            .lock()
            .map(|slots| slots.contains_key(key))
            .unwrap_or(false)
    }
}

impl SlotStore for MemorySlotStore {
    fn read(&self, key: &str) -> HistoryResult<Option<String>> {
        let slots = self.slots.lock().map_err(|_| HistoryError::SlotLockPoisoned {
            stage: "memory-slot-read",
        })?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> HistoryResult<()> {
        let mut slots = self.slots.lock().map_err(|_| HistoryError::SlotLockPoisoned {
            stage: "memory-slot-write",
        })?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        let mut slots = self.slots.lock().map_err(|_| HistoryError::SlotLockPoisoned {
            stage: "memory-slot-remove",
        })?;
        slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_slots() {
        let store = MemorySlotStore::new();
        let alias = store.clone();

        store.write("k", "v").unwrap();
        assert_eq!(alias.read("k").unwrap().as_deref(), Some("v"));

        alias.remove("k").unwrap();
        assert!(!store.contains("k"));
        alias.remove("k").unwrap();
    }
}
