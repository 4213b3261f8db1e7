//! Chat surface logic independent of any UI toolkit.
pub mod exchange;
pub mod keys;
pub mod state;
pub mod surface;

pub use exchange::{ExchangeEvent, ExchangeId, ExchangeRequest};
pub use keys::{ENTER_KEY, KeyIntent, KeyPress, classify};
pub use state::{ChatState, StreamingChatState};
pub use surface::{ChatSurface, KeyOutcome};
