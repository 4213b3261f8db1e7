pub mod state;

pub use state::{
    DEFAULT_ENDPOINT, DEFAULT_PROVIDER_ID, Settings, SettingsError, SettingsStore,
    default_history_directory,
};
