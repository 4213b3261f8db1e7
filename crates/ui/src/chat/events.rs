/// Emitted whenever the composer text changes, including programmatic updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputChanged {
    pub value: String,
}

/// Emitted for a plain Enter in the composer, after the latest [`InputChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnterPressed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendClicked;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearHistoryClicked;
