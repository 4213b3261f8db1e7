#![deny(unsafe_code)]

/// Two-pane window shell.
pub mod app;
/// Chat surface views wired to the persisted history.
pub mod chat;
pub mod settings;
