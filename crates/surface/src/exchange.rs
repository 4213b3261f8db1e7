use sidechat_storage::Message;

/// Identifier for one submit/reply round-trip.
///
/// A new id is minted on every submit so late events from an abandoned exchange can be
/// recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Handed to the backend after a submit: the full transcript ending in the new user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub exchange: ExchangeId,
    pub messages: Vec<Message>,
}

/// Backend progress for one exchange, already mapped out of provider types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    Delta { exchange: ExchangeId, text: String },
    Done { exchange: ExchangeId },
    Failed { exchange: ExchangeId, message: String },
}

impl ExchangeEvent {
    pub fn exchange(&self) -> ExchangeId {
        match self {
            Self::Delta { exchange, .. }
            | Self::Done { exchange }
            | Self::Failed { exchange, .. } => *exchange,
        }
    }
}
