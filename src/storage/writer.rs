//! Durable byte sink
//!
//! Appends raw bytes to per-table files under the data directory. Handlers
//! switch the target with `set_write_table` and then append; a write reports
//! success as a boolean and logs the underlying cause on failure.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::error::Result;

/// Append-only sink for table files
pub trait BinaryWriter: Send {
    /// Flush and close the current target, then open (creating if needed) `table`
    fn set_write_table(&mut self, table: &str) -> Result<()>;

    /// Append and flush `bytes` to the current target
    fn write(&mut self, bytes: &[u8]) -> bool;

    /// Flush and release the current target
    fn dispose(&mut self);
}

/// File-backed [`BinaryWriter`]
#[derive(Debug)]
pub struct DiskWriter {
    data_dir: PathBuf,
    target: Option<(String, File)>,
}

impl DiskWriter {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            target: None,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Name of the table currently written to
    pub fn current_table(&self) -> Option<&str> {
        self.target.as_ref().map(|(name, _)| name.as_str())
    }
}

impl BinaryWriter for DiskWriter {
    fn set_write_table(&mut self, table: &str) -> Result<()> {
        self.dispose();

        let path = self.data_dir.join(table);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        trace!(path = %path.display(), "write target opened");

        self.target = Some((table.to_string(), file));
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> bool {
        let Some((table, file)) = self.target.as_mut() else {
            warn!("write with no target table");
            return false;
        };

        match file.write_all(bytes).and_then(|_| file.flush()) {
            Ok(()) => true,
            Err(e) => {
                warn!(table = %table, error = %e, "write failed");
                false
            }
        }
    }

    fn dispose(&mut self) {
        if let Some((table, mut file)) = self.target.take() {
            if let Err(e) = file.flush() {
                warn!(table = %table, error = %e, "flush on close failed");
            }
        }
    }
}

impl Drop for DiskWriter {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_appends() {
        let dir = tempdir().unwrap();
        let mut writer = DiskWriter::new(dir.path());

        writer.set_write_table("Foo").unwrap();
        assert!(writer.write(b"ab"));
        assert!(writer.write(b"cd"));
        assert_eq!(writer.current_table(), Some("Foo"));

        assert_eq!(std::fs::read(dir.path().join("Foo")).unwrap(), b"abcd");
    }

    #[test]
    fn test_empty_write_creates_file() {
        let dir = tempdir().unwrap();
        let mut writer = DiskWriter::new(dir.path());

        writer.set_write_table("Empty").unwrap();
        assert!(writer.write(&[]));

        let meta = std::fs::metadata(dir.path().join("Empty")).unwrap();
        assert_eq!(meta.len(), 0);
    }

    #[test]
    fn test_write_without_target_fails() {
        let dir = tempdir().unwrap();
        let mut writer = DiskWriter::new(dir.path());
        assert!(!writer.write(b"x"));

        writer.set_write_table("t").unwrap();
        writer.dispose();
        assert!(writer.current_table().is_none());
        assert!(!writer.write(b"x"));
    }

    #[test]
    fn test_switching_targets() {
        let dir = tempdir().unwrap();
        let mut writer = DiskWriter::new(dir.path());

        writer.set_write_table("a").unwrap();
        writer.write(b"1");
        writer.set_write_table("b").unwrap();
        writer.write(b"2");
        writer.set_write_table("a").unwrap();
        writer.write(b"3");

        assert_eq!(std::fs::read(dir.path().join("a")).unwrap(), b"13");
        assert_eq!(std::fs::read(dir.path().join("b")).unwrap(), b"2");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let mut writer = DiskWriter::new(dir.path().join("nope"));
        assert!(writer.set_write_table("t").is_err());
    }
}
