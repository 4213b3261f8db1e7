use snafu::ResultExt;

use super::error::{DecodeHistorySnafu, EncodeHistorySnafu, HistoryResult};
use super::slot::SlotStore;
use super::types::{DEFAULT_HISTORY_KEY, Message};

/// Mirrors a message sequence into one named slot.
///
/// Every write replaces the whole sequence, so the slot always holds a complete list in
/// production order. Reads fail soft: a missing, unreadable, or malformed slot loads as an
/// empty history.
#[derive(Debug, Clone)]
pub struct HistoryStore<S> {
    slots: S,
    key: String,
}

impl<S> HistoryStore<S>
where
    S: SlotStore,
{
    pub fn new(slots: S, key: impl Into<String>) -> Self {
        Self {
            slots,
            key: key.into(),
        }
    }

    pub fn with_default_key(slots: S) -> Self {
        Self::new(slots, DEFAULT_HISTORY_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn slots(&self) -> &S {
        &self.slots
    }

    /// Returns the stored sequence, or an empty one when nothing usable is stored.
    pub fn load(&self) -> Vec<Message> {
        match self.try_load() {
            Ok(Some(messages)) => messages,
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!(
                    key = %self.key,
                    error = %error,
                    "discarding unreadable conversation history"
                );
                Vec::new()
            }
        }
    }

    /// Strict variant of [`HistoryStore::load`] that reports why a slot was unusable.
    pub fn try_load(&self) -> HistoryResult<Option<Vec<Message>>> {
        let Some(serialized) = self.slots.read(&self.key)? else {
            return Ok(None);
        };

        let messages = serde_json::from_str::<Vec<Message>>(&serialized).context(
            DecodeHistorySnafu {
                stage: "decode-history",
                key: self.key.clone(),
            },
        )?;
        Ok(Some(messages))
    }

    /// Overwrites the slot with the full sequence.
    pub fn save(&self, messages: &[Message]) -> HistoryResult<()> {
        let serialized = serde_json::to_string(messages).context(EncodeHistorySnafu {
            stage: "encode-history",
            key: self.key.clone(),
        })?;

        self.slots.write(&self.key, &serialized)?;
        tracing::debug!(
            key = %self.key,
            message_count = messages.len(),
            "saved conversation history"
        );
        Ok(())
    }

    /// Removes the slot. Clearing an absent slot is a no-op.
    pub fn clear(&self) -> HistoryResult<()> {
        self.slots.remove(&self.key)?;
        tracing::debug!(key = %self.key, "cleared conversation history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::file::FileSlotStore;
    use crate::ids::MessageId;
    use crate::slot::MemorySlotStore;
    use crate::types::Role;

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::new(MessageId::new("1"), Role::User, "hi"),
            Message::new(
                MessageId::new("2"),
                Role::Assistant,
                "line one\n\n    indented line\ttab",
            ),
            Message::new(MessageId::new("3"), Role::User, "  padded  "),
        ]
    }

    #[test]
    fn load_without_prior_save_is_empty() {
        let store = HistoryStore::with_default_key(MemorySlotStore::new());
        assert!(store.load().is_empty());
        assert_eq!(store.key(), DEFAULT_HISTORY_KEY);
    }

    #[test]
    fn save_then_load_returns_same_sequence() {
        let store = HistoryStore::new(MemorySlotStore::new(), "session-a");
        let messages = sample_messages();

        store.save(&messages).unwrap();
        assert_eq!(store.load(), messages);
    }

    #[test]
    fn save_overwrites_instead_of_appending() {
        let store = HistoryStore::new(MemorySlotStore::new(), "session-a");
        let messages = sample_messages();

        store.save(&messages).unwrap();
        store.save(&messages[..1]).unwrap();
        assert_eq!(store.load(), messages[..1].to_vec());
    }

    #[test]
    fn malformed_slot_loads_as_empty() {
        let slots = MemorySlotStore::new();
        let store = HistoryStore::new(slots.clone(), "session-a");

        for garbage in [
            "not json",
            "{\"id\":\"1\"}",
            "[{\"id\":\"1\",\"role\":\"user\"}]",
            "[{\"id\":1,\"role\":\"user\",\"content\":\"x\"}]",
            "",
            "null",
        ] {
            slots.write("session-a", garbage).unwrap();
            assert!(store.load().is_empty(), "payload {garbage:?} should load empty");
        }

        slots.write("session-a", "not json").unwrap();
        assert!(matches!(
            store.try_load(),
            Err(HistoryError::DecodeHistory { .. })
        ));
    }

    #[test]
    fn clear_removes_prior_content() {
        let slots = MemorySlotStore::new();
        let store = HistoryStore::new(slots.clone(), "session-a");

        store.save(&sample_messages()).unwrap();
        store.clear().unwrap();

        assert!(store.load().is_empty());
        assert!(!slots.contains("session-a"));
    }

    #[test]
    fn clear_on_absent_slot_is_a_no_op() {
        let slots = MemorySlotStore::new();
        let store = HistoryStore::new(slots.clone(), "session-a");

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!slots.contains("session-a"));
    }

    #[test]
    fn separate_keys_are_independent_histories() {
        let slots = MemorySlotStore::new();
        let first = HistoryStore::new(slots.clone(), "first");
        let second = HistoryStore::new(slots, "second");

        first.save(&sample_messages()).unwrap();
        assert!(second.load().is_empty());

        second.save(&sample_messages()[..1]).unwrap();
        first.clear().unwrap();
        assert_eq!(second.load().len(), 1);
    }

    #[test]
    fn file_backed_history_survives_a_new_store_instance() {
        let tmp = tempfile::tempdir().unwrap();
        let messages = sample_messages();

        HistoryStore::with_default_key(FileSlotStore::new(tmp.path()))
            .save(&messages)
            .unwrap();

        let reopened = HistoryStore::with_default_key(FileSlotStore::new(tmp.path()));
        assert_eq!(reopened.load(), messages);

        reopened.clear().unwrap();
        assert!(reopened.load().is_empty());
    }

    #[test]
    fn foreign_records_round_trip_unchanged() {
        let slots = MemorySlotStore::new();
        let store = HistoryStore::new(slots.clone(), "session-a");
        let raw = r#"[{"id":"aX1","role":"user","content":"hi","createdAt":"2024-01-01T00:00:00Z"},{"id":"aX2","role":"data","content":"{}"}]"#;
        slots.write("session-a", raw).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].role, Role::Other("data".to_string()));

        store.save(&loaded).unwrap();
        assert_eq!(store.load(), loaded);
        let rewritten: serde_json::Value =
            serde_json::from_str(&slots.read("session-a").unwrap().unwrap()).unwrap();
        assert_eq!(rewritten[0]["createdAt"], "2024-01-01T00:00:00Z");
    }
}
