use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::StateStore;
use crate::errors::CoreError;

/// File-backed state store: one JSON file per logical key under a directory.
/// The directory is shared by every context on the same profile, which is the
/// system's actual concurrency hazard — writes are last-writer-wins.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "state file unreadable, treating as absent");
                None
            }
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), CoreError> {
        // write-then-rename: readers never observe a partial file
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.save("hireforce_auth", r#"{"id":"x"}"#).unwrap();
        assert_eq!(store.load("hireforce_auth").as_deref(), Some(r#"{"id":"x"}"#));
        store.remove("hireforce_auth").unwrap();
        assert_eq!(store.load("hireforce_auth"), None);
    }

    #[test]
    fn missing_key_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.load("nope"), None);
        store.remove("nope").unwrap();
    }
}
