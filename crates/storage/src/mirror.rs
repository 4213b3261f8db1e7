use super::error::HistoryResult;
use super::history::HistoryStore;
use super::slot::SlotStore;
use super::types::Message;

/// What to do when the observed sequence becomes empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyHistoryPolicy {
    /// Leave the slot untouched. Only an explicit clear removes stored history.
    #[default]
    Skip,
    /// Write `[]` so the slot always matches the live sequence.
    Persist,
}

impl EmptyHistoryPolicy {
    pub fn from_persist_flag(persist_empty: bool) -> Self {
        if persist_empty {
            Self::Persist
        } else {
            Self::Skip
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Saved,
    Unchanged,
    SkippedEmpty,
    Failed,
}

/// Observer that writes a sequence back to its store once per distinct value.
#[derive(Debug)]
pub struct HistoryMirror<S> {
    store: HistoryStore<S>,
    policy: EmptyHistoryPolicy,
    persisted: Vec<Message>,
}

impl<S> HistoryMirror<S>
where
    S: SlotStore,
{
    pub fn new(store: HistoryStore<S>, policy: EmptyHistoryPolicy) -> Self {
        Self {
            store,
            policy,
            persisted: Vec::new(),
        }
    }

    pub fn store(&self) -> &HistoryStore<S> {
        &self.store
    }

    pub fn policy(&self) -> EmptyHistoryPolicy {
        self.policy
    }

    /// Last sequence known to be in the slot.
    pub fn persisted(&self) -> &[Message] {
        &self.persisted
    }

    /// Loads the stored history and treats it as already persisted.
    pub fn load_initial(&mut self) -> Vec<Message> {
        let messages = self.store.load();
        self.seed(&messages);
        messages
    }

    pub fn seed(&mut self, messages: &[Message]) {
        self.persisted = messages.to_vec();
    }

    pub fn observe(&mut self, messages: &[Message]) -> MirrorOutcome {
        if messages == self.persisted.as_slice() {
            return MirrorOutcome::Unchanged;
        }

        if messages.is_empty() && self.policy == EmptyHistoryPolicy::Skip {
            return MirrorOutcome::SkippedEmpty;
        }

        match self.store.save(messages) {
            Ok(()) => {
                self.persisted = messages.to_vec();
                MirrorOutcome::Saved
            }
            Err(error) => {
                // The snapshot is left stale so the next distinct change retries the write.
                tracing::warn!(
                    key = %self.store.key(),
                    message_count = messages.len(),
                    error = %error,
                    "failed to mirror conversation history"
                );
                MirrorOutcome::Failed
            }
        }
    }

    pub fn clear(&mut self) -> HistoryResult<()> {
        self.store.clear()?;
        self.persisted.clear();
        Ok(())
    }
}
