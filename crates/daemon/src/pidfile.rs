//! Pidfile management (§4.15, `server/server.cpp`'s pid write/remove).

use std::path::{Path, PathBuf};

/// A pidfile written at start-up and removed on clean exit.
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Writes the current process id to `path`.
    ///
    /// # Errors
    ///
    /// Returns any [`std::io::Error`] from writing the file.
    pub fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        std::fs::write(&path, format!("{}\n", std::process::id()))?;
        Ok(Self { path })
    }

    /// The pidfile's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), %error, "failed to remove pidfile");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_removes_pidfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        {
            let pidfile = PidFile::create(&path).unwrap();
            let contents = std::fs::read_to_string(pidfile.path()).unwrap();
            assert_eq!(contents.trim(), std::process::id().to_string());
        }
        assert!(!path.exists());
    }
}
