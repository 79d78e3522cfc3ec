//! File-backed storage for alert and feed documents.

use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
};

use tracing::info;

use crate::atom::{self, Feed};
use crate::error::{Error, Result};

/// Filename of the canonical published feed.
pub const FEED_FILE: &str = "atom_feed.xml";

/// Document classes the store keeps, each in its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Alerts,
    Feeds,
}

impl Kind {
    fn dir_name(self) -> &'static str {
        match self {
            Kind::Alerts => "alerts",
            Kind::Feeds => "feeds",
        }
    }
}

/// Persistent store for alert and feed documents rooted at `root`.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Create a store rooted at `root`. The directories themselves are
    /// created by [`Store::init`].
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(Error::invalid_argument("store root must be specified"));
        }
        Ok(Self { root })
    }

    /// Ensure the on-disk directory structure exists. Called once at
    /// startup; individual writes assume the directories are present.
    pub fn init(&self) -> Result<()> {
        for kind in [Kind::Alerts, Kind::Feeds] {
            fs::create_dir_all(self.dir(kind))?;
        }
        Ok(())
    }

    /// Directory holding documents of `kind`.
    pub fn dir(&self, kind: Kind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Write a document, silently overwriting any existing file of the same
    /// name. Returns the number of bytes written.
    pub fn store(&self, kind: Kind, filename: &str, data: &[u8]) -> Result<usize> {
        let path = self.document_path(kind, filename)?;
        fs::write(&path, data)?;
        Ok(data.len())
    }

    /// Read a stored document back.
    pub fn retrieve(&self, kind: Kind, filename: &str) -> Result<Vec<u8>> {
        let path = self.document_path(kind, filename)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound { path }),
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize `feed` and replace the canonical feed file. The previous
    /// file is removed first; a missing previous file is not an error.
    pub fn publish_feed(&self, feed: &Feed) -> Result<usize> {
        let data = atom::to_xml(feed)?;
        let path = self.document_path(Kind::Feeds, FEED_FILE)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::write(&path, data.as_bytes())?;
        info!(path = %path.display(), bytes = data.len(), "published feed");
        Ok(data.len())
    }

    /// Resolve a document path, rejecting names that would escape the store.
    fn document_path(&self, kind: Kind, filename: &str) -> Result<PathBuf> {
        if filename.is_empty() {
            return Err(Error::invalid_argument("filename must not be empty"));
        }
        if filename.contains('/') || filename.contains('\\') || filename == ".." {
            return Err(Error::invalid_argument(format!(
                "invalid filename {filename:?}"
            )));
        }
        Ok(self.dir(kind).join(filename))
    }
}
