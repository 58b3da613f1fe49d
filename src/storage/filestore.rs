//! Artifact file store
//!
//! Reads and writes the flat files that cross the air gap: transaction
//! artifacts, pubkey export files, and address export files. File names
//! carry the protocol state, so writes are atomic (temp file + rename)
//! to keep a half-written artifact from ever being picked up.

use crate::storage::StorageError;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Flat-file store rooted at one data directory
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// Write a file atomically
    pub fn write(&self, file_name: &str, body: &str) -> Result<PathBuf, StorageError> {
        let path = self.path_for(file_name);
        let temp_path = self.data_dir.join(format!("{}.tmp", file_name));

        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(body.as_bytes())?;
        writer.flush()?;

        fs::rename(&temp_path, &path)?;
        log::debug!("wrote {}", path.display());
        Ok(path)
    }

    pub fn read(&self, path: &Path) -> Result<String, StorageError> {
        Ok(fs::read_to_string(path)?)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.path_for(file_name).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let path = store.write("payment_1_unsigned_0", "00ff,aGk=").unwrap();
        assert!(store.exists("payment_1_unsigned_0"));
        assert_eq!(store.read(&path).unwrap(), "00ff,aGk=");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.write("deposit_3_signed", "00ff").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["deposit_3_signed".to_string()]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let err = store.read(&store.path_for("nope")).unwrap_err();
        assert!(matches!(err, StorageError::IoError(_)));
    }
}
