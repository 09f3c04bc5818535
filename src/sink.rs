use std::fs::{self, OpenOptions};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::TallyError;

/// Write-behind text buffer in front of an append-only file.
#[derive(Debug)]
pub struct BufferedSink {
    path: Utf8PathBuf,
    capacity: usize,
    data: String,
    writes: usize,
}

impl BufferedSink {
    pub const DEFAULT_CAPACITY: usize = 16 * 1024;

    /// Appends to whatever `path` already holds.
    pub fn open(path: impl Into<Utf8PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            data: String::new(),
            writes: 0,
        }
    }

    /// Truncates `path` (creating parent directories) so an unwritable output fails early.
    pub fn create(path: impl Into<Utf8PathBuf>, capacity: usize) -> Result<Self, TallyError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| TallyError::Filesystem(format!("create {parent}: {err}")))?;
        }
        fs::File::create(path.as_std_path())
            .map_err(|err| TallyError::Filesystem(format!("create {path}: {err}")))?;
        Ok(Self::open(path, capacity))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently held in memory.
    pub fn buffered(&self) -> usize {
        self.data.len()
    }

    /// Number of appends issued against the backing file so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn write(&mut self, text: &str) -> Result<(), TallyError> {
        self.data.push_str(text);
        if self.data.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Appends the buffer to the file. Once the append has started the buffer is released
    /// even if it fails, so a retry never writes the same rows twice.
    pub fn flush(&mut self) -> Result<(), TallyError> {
        if self.data.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())
            .map_err(|err| TallyError::Filesystem(format!("open {}: {err}", self.path)))?;
        let data = std::mem::take(&mut self.data);
        self.writes += 1;
        file.write_all(data.as_bytes())
            .map_err(|err| TallyError::Filesystem(format!("append {}: {err}", self.path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(temp: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().join("out.tsv")).unwrap()
    }

    #[test]
    fn small_writes_stay_in_memory() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp_path(&temp);
        let mut sink = BufferedSink::open(path.clone(), 64);
        sink.write("header\n").unwrap();
        assert_eq!(sink.writes(), 0);
        assert!(!path.as_std_path().exists());

        sink.flush().unwrap();
        assert_eq!(sink.writes(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "header\n");
    }

    #[test]
    fn empty_flush_is_noop() {
        let temp = tempfile::tempdir().unwrap();
        let mut sink = BufferedSink::open(temp_path(&temp), 64);
        sink.flush().unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.writes(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_append_releases_buffer() {
        let mut sink = BufferedSink::open("/dev/full", 64);
        sink.write("row\n").unwrap();
        assert!(sink.flush().is_err());
        assert_eq!(sink.buffered(), 0);
        sink.flush().unwrap();
        assert_eq!(sink.writes(), 1);
    }

    #[test]
    fn create_truncates_previous_output() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp_path(&temp);
        fs::write(&path, "stale\n").unwrap();
        let sink = BufferedSink::create(path.clone(), 64).unwrap();
        assert_eq!(sink.buffered(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
