//! File-based kill switch.

use paperlab_core::engine::KillSwitch;
use std::path::{Path, PathBuf};

/// Engaged while the flag file exists.
///
/// The check is advisory and idempotent: an operator touches the file to
/// stop trading, removes it and clears the halt to resume. No locking is
/// needed for concurrent reads.
#[derive(Debug, Clone)]
pub struct FileKillSwitch {
    path: PathBuf,
}

impl FileKillSwitch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KillSwitch for FileKillSwitch {
    fn engaged(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engaged_tracks_file_existence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("KILL");
        let switch = FileKillSwitch::new(&path);
        assert!(!switch.engaged());

        std::fs::write(&path, b"stop").unwrap();
        assert!(switch.engaged());

        std::fs::remove_file(&path).unwrap();
        assert!(!switch.engaged());
    }
}
