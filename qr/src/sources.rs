//! Frame sources and clipboards that do not need a GUI.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::decode::{Frame, load_frame};
use crate::error::ScanError;
use crate::scanner::{Clipboard, FrameSource};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays the images in a directory, in file-name order, one per poll.
///
/// Stands in for a camera on kiosks where frames are dropped into a spool directory by a
/// capture daemon, and in tests.
pub struct DirectoryFrameSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    live: bool,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pending: VecDeque::new(),
            live: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    fn is_frame(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    async fn start(&mut self) -> Result<(), ScanError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ScanError::Camera(format!("{}: {e}", self.dir.display())))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScanError::Camera(e.to_string()))?
        {
            let path = entry.path();
            if Self::is_frame(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        tracing::info!(dir = %self.dir.display(), frames = paths.len(), "Frame directory opened");
        self.pending = paths.into();
        self.live = true;
        Ok(())
    }

    async fn latest_frame(&mut self) -> Result<Option<Frame>, ScanError> {
        if !self.live {
            return Ok(None);
        }
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ScanError::Camera(format!("{}: {e}", path.display())))?;
        match load_frame(&bytes) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable frame");
                Ok(None)
            }
        }
    }

    fn stop(&mut self) {
        self.live = false;
        self.pending.clear();
    }
}

/// Reads one line from standard input.
pub struct StdinClipboard;

#[async_trait]
impl Clipboard for StdinClipboard {
    async fn read_text(&mut self) -> Result<Option<String>, ScanError> {
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await
        .map_err(|e| ScanError::Clipboard(e.to_string()))?
        .map_err(|e| ScanError::Clipboard(e.to_string()))?;

        Ok(Some(line).filter(|l| !l.trim().is_empty()))
    }
}
