use sidechat_storage::Message;

use crate::exchange::{ExchangeEvent, ExchangeId, ExchangeRequest};

/// Live conversation state consumed by [`crate::ChatSurface`].
///
/// Implementations own the message sequence and the input buffer. `submit` records the
/// user turn and hands back what the backend needs; the exchange itself runs elsewhere
/// and reports back through `apply`.
pub trait ChatState {
    fn messages(&self) -> &[Message];
    fn input(&self) -> &str;
    fn on_input_change(&mut self, value: String);
    fn submit(&mut self) -> Option<ExchangeRequest>;
    fn set_messages(&mut self, messages: Vec<Message>);
    fn apply(&mut self, event: ExchangeEvent);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveExchange {
    id: ExchangeId,
    draft: String,
}

/// Chat state for a streaming backend, one exchange at a time.
///
/// The reply being streamed is kept as a draft outside the message sequence and appended
/// only when the backend reports completion, so every message in the sequence is final.
#[derive(Debug, Clone, Default)]
pub struct StreamingChatState {
    messages: Vec<Message>,
    input: String,
    active: Option<ActiveExchange>,
    next_exchange_id: u64,
    last_error: Option<String>,
    revision: u64,
}

impl StreamingChatState {
    pub fn new(initial_messages: Vec<Message>) -> Self {
        Self {
            messages: initial_messages,
            next_exchange_id: 1,
            ..Self::default()
        }
    }

    pub fn is_responding(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_exchange(&self) -> Option<ExchangeId> {
        self.active.as_ref().map(|active| active.id)
    }

    /// Partial reply of the in-flight exchange.
    pub fn draft(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.draft.as_str())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Bumped on every change to the message sequence.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn alloc_exchange_id(&mut self) -> ExchangeId {
        let id = ExchangeId::new(self.next_exchange_id);
        self.next_exchange_id = self.next_exchange_id.saturating_add(1);
        id
    }

    fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.revision = self.revision.wrapping_add(1);
    }

    fn take_active_for(&mut self, exchange: ExchangeId) -> Option<ActiveExchange> {
        if self.active_exchange() != Some(exchange) {
            tracing::debug!(
                exchange = ?exchange,
                active = ?self.active_exchange(),
                "ignoring event for an inactive exchange"
            );
            return None;
        }

        self.active.take()
    }
}

impl ChatState for StreamingChatState {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn input(&self) -> &str {
        &self.input
    }

    fn on_input_change(&mut self, value: String) {
        self.input = value;
    }

    fn submit(&mut self) -> Option<ExchangeRequest> {
        if let Some(active) = &self.active {
            tracing::debug!(exchange = ?active.id, "submit ignored while a reply is in flight");
            return None;
        }

        if self.input.trim().is_empty() {
            return None;
        }

        let content = std::mem::take(&mut self.input);
        self.push_message(Message::user(content));
        self.last_error = None;

        let exchange = self.alloc_exchange_id();
        self.active = Some(ActiveExchange {
            id: exchange,
            draft: String::new(),
        });

        Some(ExchangeRequest {
            exchange,
            messages: self.messages.clone(),
        })
    }

    fn set_messages(&mut self, messages: Vec<Message>) {
        if let Some(active) = self.active.take() {
            tracing::debug!(exchange = ?active.id, "abandoning in-flight exchange");
        }

        self.messages = messages;
        self.last_error = None;
        self.revision = self.revision.wrapping_add(1);
    }

    fn apply(&mut self, event: ExchangeEvent) {
        match event {
            ExchangeEvent::Delta { exchange, text } => {
                match self.active.as_mut() {
                    Some(active) if active.id == exchange => active.draft.push_str(&text),
                    _ => tracing::debug!(exchange = ?exchange, "dropping stale reply chunk"),
                }
            }
            ExchangeEvent::Done { exchange } => {
                let Some(finished) = self.take_active_for(exchange) else {
                    return;
                };

                if finished.draft.trim().is_empty() {
                    tracing::warn!(exchange = ?exchange, "backend finished with an empty reply");
                    return;
                }

                self.push_message(Message::assistant(finished.draft));
            }
            ExchangeEvent::Failed { exchange, message } => {
                if self.take_active_for(exchange).is_none() {
                    return;
                }

                tracing::warn!(exchange = ?exchange, error = %message, "exchange failed");
                self.last_error = Some(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidechat_storage::Role;

    fn submitted(state: &mut StreamingChatState, text: &str) -> ExchangeRequest {
        state.on_input_change(text.to_string());
        state.submit().unwrap()
    }

    #[test]
    fn submit_appends_user_turn_and_clears_input() {
        let mut state = StreamingChatState::new(Vec::new());
        let request = submitted(&mut state, "hi\nthere");

        assert_eq!(state.input(), "");
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].role, Role::User);
        assert_eq!(state.messages()[0].content, "hi\nthere");
        assert_eq!(request.messages, state.messages().to_vec());
        assert_eq!(state.active_exchange(), Some(request.exchange));
    }

    #[test]
    fn blank_input_does_not_submit() {
        let mut state = StreamingChatState::new(Vec::new());
        state.on_input_change(" \n\t".to_string());

        assert!(state.submit().is_none());
        assert!(state.messages().is_empty());
        assert_eq!(state.input(), " \n\t");
    }

    #[test]
    fn draft_stays_out_of_the_sequence_until_done() {
        let mut state = StreamingChatState::new(Vec::new());
        let request = submitted(&mut state, "hi");
        let revision = state.revision();

        state.apply(ExchangeEvent::Delta {
            exchange: request.exchange,
            text: "hel".to_string(),
        });
        state.apply(ExchangeEvent::Delta {
            exchange: request.exchange,
            text: "lo".to_string(),
        });

        assert_eq!(state.draft(), Some("hello"));
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.revision(), revision);

        state.apply(ExchangeEvent::Done {
            exchange: request.exchange,
        });

        assert!(!state.is_responding());
        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.messages()[1].role, Role::Assistant);
        assert_eq!(state.messages()[1].content, "hello");
        assert!(state.revision() > revision);
    }

    #[test]
    fn submit_is_ignored_while_responding() {
        let mut state = StreamingChatState::new(Vec::new());
        submitted(&mut state, "first");
        state.on_input_change("second".to_string());

        assert!(state.submit().is_none());
        assert_eq!(state.input(), "second");
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn failure_discards_draft_and_records_error() {
        let mut state = StreamingChatState::new(Vec::new());
        let request = submitted(&mut state, "hi");

        state.apply(ExchangeEvent::Delta {
            exchange: request.exchange,
            text: "partial".to_string(),
        });
        state.apply(ExchangeEvent::Failed {
            exchange: request.exchange,
            message: "rate limited".to_string(),
        });

        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.draft(), None);
        assert_eq!(state.last_error(), Some("rate limited"));

        let retry = submitted(&mut state, "again");
        assert_ne!(retry.exchange, request.exchange);
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn events_for_abandoned_exchanges_are_dropped() {
        let mut state = StreamingChatState::new(Vec::new());
        let request = submitted(&mut state, "hi");

        state.set_messages(Vec::new());
        state.apply(ExchangeEvent::Delta {
            exchange: request.exchange,
            text: "late".to_string(),
        });
        state.apply(ExchangeEvent::Done {
            exchange: request.exchange,
        });

        assert!(state.messages().is_empty());
        assert!(!state.is_responding());
    }

    #[test]
    fn empty_reply_is_not_recorded() {
        let mut state = StreamingChatState::new(Vec::new());
        let request = submitted(&mut state, "hi");

        state.apply(ExchangeEvent::Done {
            exchange: request.exchange,
        });

        assert_eq!(state.messages().len(), 1);
        assert!(!state.is_responding());
    }

    #[test]
    fn initial_messages_seed_the_sequence() {
        let initial = vec![Message::user("a"), Message::assistant("b")];
        let state = StreamingChatState::new(initial.clone());

        assert_eq!(state.messages(), initial.as_slice());
        assert_eq!(state.revision(), 0);
    }
}
