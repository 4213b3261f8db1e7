/// Events emitted by the composer.
pub mod events;
pub mod message_input;
pub mod message_list;
pub mod view;

pub use events::{ClearHistoryClicked, EnterPressed, InputChanged, SendClicked};
pub use message_input::MessageInput;
pub use message_list::{MessageList, TranscriptRow, transcript_rows};
pub use view::{ChatView, HistorySurface};
