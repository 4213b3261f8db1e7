use sidechat_storage::{HistoryMirror, HistoryResult, Message, MirrorOutcome, SlotStore};

use crate::exchange::{ExchangeEvent, ExchangeRequest};
use crate::keys::{KeyIntent, KeyPress, classify};
use crate::state::ChatState;

/// Result of routing one key press through the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Submitted(ExchangeRequest),
    /// Submit key pressed but the chat state declined (blank input or reply in flight).
    NothingToSubmit,
    NewlineInserted,
    Ignored,
}

/// Chat state glued to its persisted history.
///
/// History is loaded once to seed the chat state. After every operation that can change
/// state the current sequence is handed to the mirror, which writes it only when it
/// differs from what was last persisted.
pub struct ChatSurface<C, S> {
    chat: C,
    mirror: HistoryMirror<S>,
    last_mirror_outcome: Option<MirrorOutcome>,
}

impl<C, S> ChatSurface<C, S>
where
    C: ChatState,
    S: SlotStore,
{
    pub fn open(mut mirror: HistoryMirror<S>, make_chat: impl FnOnce(Vec<Message>) -> C) -> Self {
        let initial_messages = mirror.load_initial();
        tracing::info!(
            key = %mirror.store().key(),
            message_count = initial_messages.len(),
            "restored conversation history"
        );

        Self {
            chat: make_chat(initial_messages),
            mirror,
            last_mirror_outcome: None,
        }
    }

    pub fn chat(&self) -> &C {
        &self.chat
    }

    pub fn mirror(&self) -> &HistoryMirror<S> {
        &self.mirror
    }

    pub fn messages(&self) -> &[Message] {
        self.chat.messages()
    }

    pub fn input(&self) -> &str {
        self.chat.input()
    }

    pub fn last_mirror_outcome(&self) -> Option<MirrorOutcome> {
        self.last_mirror_outcome
    }

    pub fn on_input_change(&mut self, value: impl Into<String>) {
        self.chat.on_input_change(value.into());
        self.sync_history();
    }

    pub fn handle_key(&mut self, press: &KeyPress) -> KeyOutcome {
        match classify(press) {
            KeyIntent::Submit => match self.submit() {
                Some(request) => KeyOutcome::Submitted(request),
                None => KeyOutcome::NothingToSubmit,
            },
            KeyIntent::InsertNewline => {
                let mut value = self.chat.input().to_string();
                value.push('\n');
                self.on_input_change(value);
                KeyOutcome::NewlineInserted
            }
            KeyIntent::Ignore => KeyOutcome::Ignored,
        }
    }

    pub fn submit(&mut self) -> Option<ExchangeRequest> {
        let request = self.chat.submit();
        self.sync_history();
        request
    }

    pub fn apply_exchange_event(&mut self, event: ExchangeEvent) {
        self.chat.apply(event);
        self.sync_history();
    }

    /// Removes stored history, then empties the chat state.
    ///
    /// When the slot cannot be removed the chat state is left alone so the transcript
    /// keeps matching what a reload would show.
    pub fn clear_history(&mut self) -> HistoryResult<()> {
        self.mirror.clear()?;
        self.chat.set_messages(Vec::new());
        self.sync_history();
        Ok(())
    }

    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.chat.set_messages(messages);
        self.sync_history();
    }

    fn sync_history(&mut self) {
        let outcome = self.mirror.observe(self.chat.messages());
        if outcome == MirrorOutcome::Saved {
            tracing::debug!(
                message_count = self.chat.messages().len(),
                "mirrored conversation history"
            );
        }
        self.last_mirror_outcome = Some(outcome);
    }
}
