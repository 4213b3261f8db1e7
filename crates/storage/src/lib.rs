pub mod error;
pub mod file;
pub mod history;
pub mod ids;
pub mod mirror;
pub mod slot;
pub mod types;

pub use error::{HistoryError, HistoryResult};
pub use file::FileSlotStore;
pub use history::HistoryStore;
pub use ids::MessageId;
pub use mirror::{EmptyHistoryPolicy, HistoryMirror, MirrorOutcome};
pub use slot::{MemorySlotStore, SlotStore};
pub use types::{DEFAULT_HISTORY_KEY, Message, Role};
