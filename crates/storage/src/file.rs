use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};

use super::error::{
    CreateSlotDirectorySnafu, HistoryResult, InvalidSlotKeySnafu, ReadSlotSnafu,
    RemoveSlotSnafu, ReplaceSlotSnafu, WriteSlotSnafu,
};
use super::slot::SlotStore;

const SLOT_FILE_EXTENSION: &str = "json";
const TEMP_FILE_EXTENSION: &str = "json.tmp";

/// One `<key>.json` file per slot inside a data directory.
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    directory: PathBuf,
}

impl FileSlotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn slot_path(&self, key: &str) -> HistoryResult<PathBuf> {
        validate_key(key)?;
        Ok(self.directory.join(format!("{key}.{SLOT_FILE_EXTENSION}")))
    }

    fn ensure_directory(&self) -> HistoryResult<()> {
        if self.directory.as_os_str().is_empty() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.directory).context(CreateSlotDirectorySnafu {
            stage: "create-slot-directory",
            path: display_path(&self.directory),
        })
    }
}

impl SlotStore for FileSlotStore {
    fn read(&self, key: &str) -> HistoryResult<Option<String>> {
        let path = self.slot_path(key)?;

        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error).context(ReadSlotSnafu {
                stage: "read-slot",
                path: display_path(&path),
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> HistoryResult<()> {
        let path = self.slot_path(key)?;
        self.ensure_directory()?;

        // Readers only ever observe the old or the new file, never a partial write.
        let temp_path = path.with_extension(TEMP_FILE_EXTENSION);
        std::fs::write(&temp_path, value).context(WriteSlotSnafu {
            stage: "write-temporary-slot-file",
            path: display_path(&temp_path),
        })?;

        std::fs::rename(&temp_path, &path).context(ReplaceSlotSnafu {
            stage: "rename-temporary-slot-file",
            from: display_path(&temp_path),
            to: display_path(&path),
        })
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        let path = self.slot_path(key)?;

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).context(RemoveSlotSnafu {
                stage: "remove-slot",
                path: display_path(&path),
            }),
        }
    }
}

fn validate_key(key: &str) -> HistoryResult<()> {
    ensure!(
        !key.is_empty(),
        InvalidSlotKeySnafu {
            stage: "validate-slot-key",
            key,
            details: "key is empty",
        }
    );
    ensure!(
        !key.starts_with('.'),
        InvalidSlotKeySnafu {
            stage: "validate-slot-key",
            key,
            details: "key starts with '.'",
        }
    );
    ensure!(
        key.chars()
            .all(|character| character.is_ascii_alphanumeric() || "-_.".contains(character)),
        InvalidSlotKeySnafu {
            stage: "validate-slot-key",
            key,
            details: "key contains characters outside [A-Za-z0-9._-]",
        }
    );

    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
