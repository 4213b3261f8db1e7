use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HistoryError {
    #[snafu(display("history slot key '{key}' is invalid: {details}"))]
    InvalidSlotKey {
        stage: &'static str,
        key: String,
        details: &'static str,
    },
    #[snafu(display("failed to create history directory at {path}"))]
    CreateSlotDirectory {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to read history slot from {path}"))]
    ReadSlot {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to write history slot to {path}"))]
    WriteSlot {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to replace history slot {to} with {from}"))]
    ReplaceSlot {
        stage: &'static str,
        from: String,
        to: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to remove history slot at {path}"))]
    RemoveSlot {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to encode history for slot '{key}'"))]
    EncodeHistory {
        stage: &'static str,
        key: String,
        source: serde_json::Error,
    },
    #[snafu(display("failed to decode history from slot '{key}'"))]
    DecodeHistory {
        stage: &'static str,
        key: String,
        source: serde_json::Error,
    },
    #[snafu(display("history slot store lock was poisoned at {stage}"))]
    SlotLockPoisoned { stage: &'static str },
}

pub type HistoryResult<T> = Result<T, HistoryError>;
