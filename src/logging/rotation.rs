//! Size-based log file rotation.
//!
//! # Layout
//! ```text
//! <dir>/<name>      active file
//! <dir>/<name>.1    most recently rotated-out generation
//! <dir>/<name>.N    oldest generation (N = max_files), deleted on next rotation
//! ```
//!
//! # Design Decisions
//! - Size is checked when the file is opened and before every write
//! - A write that would push a non-empty active file past the limit rotates first
//! - A single record larger than the limit still lands in a fresh file

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only file that rotates itself once it grows past `max_size`.
#[derive(Debug)]
pub struct RotatingFile {
    dir: PathBuf,
    name: String,
    max_size: u64,
    max_files: usize,
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    /// Open (creating the directory if needed) and rotate an oversized
    /// leftover from a previous run.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        max_size: u64,
        max_files: usize,
    ) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut rotating = Self {
            dir,
            name: name.to_string(),
            max_size,
            max_files,
            file: None,
            size: 0,
        };

        rotating.size = fs::metadata(rotating.active_path())
            .map(|m| m.len())
            .unwrap_or(0);
        if rotating.size > rotating.max_size {
            rotating.rotate()?;
        }
        rotating.reopen()?;
        Ok(rotating)
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn generation_path(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("{}.{}", self.name, generation))
    }

    /// Bytes currently in the active file.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append one line (a newline is added).
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let incoming = line.len() as u64 + 1;
        if self.size > 0 && self.size + incoming > self.max_size {
            self.rotate()?;
        }
        if self.file.is_none() {
            self.reopen()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file not open"))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        self.size += incoming;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }

    /// Shift generations up by one and move the active file to `.1`.
    ///
    /// Leaves no file open; the next write reopens a fresh active file.
    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;

        let active = self.active_path();
        if self.max_files == 0 {
            remove_if_exists(&active)?;
            self.size = 0;
            return Ok(());
        }

        remove_if_exists(&self.generation_path(self.max_files))?;
        for generation in (1..self.max_files).rev() {
            let from = self.generation_path(generation);
            if from.exists() {
                fs::rename(&from, self.generation_path(generation + 1))?;
            }
        }
        if active.exists() {
            fs::rename(&active, self.generation_path(1))?;
        }

        self.size = 0;
        tracing::debug!(path = ?active, "Rotated log file");
        Ok(())
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.active_path())?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
