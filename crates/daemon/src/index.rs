//! Index hot-swap (§4.9): a process-wide, lock-guarded active index slot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use romanizer::Dictionary;
use thiserror::Error;
use tokio::sync::RwLock;
use trie::Reader;

/// One immutable snapshot of the trie plus the dictionary used to romanize
/// queries against it. Swapped as a whole on reload (§9 "atomic swap of a
/// pointer to an immutable epoch object").
pub struct IndexEpoch {
    reader: Reader,
    dictionary: Dictionary,
    index_path: PathBuf,
}

impl IndexEpoch {
    pub(crate) fn load(dictionary_path: &Path, index_path: &Path) -> Result<Self, ReloadError> {
        let dictionary = Dictionary::load(dictionary_path).map_err(|source| ReloadError::Io {
            path: dictionary_path.to_owned(),
            source,
        })?;
        Self::load_with_dictionary(dictionary, index_path)
    }

    fn load_with_dictionary(dictionary: Dictionary, index_path: &Path) -> Result<Self, ReloadError> {
        let reader = Reader::open_mmap(index_path).map_err(|source| ReloadError::Trie {
            path: index_path.to_owned(),
            source,
        })?;
        Ok(Self {
            reader,
            dictionary,
            index_path: index_path.to_owned(),
        })
    }

    /// The attached trie reader.
    #[must_use]
    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    /// The dictionary used to romanize queries against this epoch.
    #[must_use]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// The index file path this epoch was loaded from.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}

/// Errors from a reload attempt.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// A reload is already in progress (§7 `ReloadBusy`).
    #[error("a reload is already in progress")]
    Busy,
    /// Loading the dictionary failed.
    #[error("failed to load dictionary {path}: {source}")]
    Io {
        /// The path that failed to load.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening or validating the trie blob failed.
    #[error("failed to open trie blob {path}: {source}")]
    Trie {
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying trie error.
        #[source]
        source: trie::TrieError,
    },
}

impl ReloadError {
    /// Classifies this error per §7's severity taxonomy.
    ///
    /// A busy reload is informational (the admin HTTP surface replies 409,
    /// `signals::run` just logs); a genuinely failed reload is reported back
    /// as the request's own failure (503) rather than closing anything,
    /// since the previous epoch stays active either way.
    #[must_use]
    pub fn severity(&self) -> core::error::Severity {
        match self {
            ReloadError::Busy => core::error::Severity::Informational,
            ReloadError::Io { .. } | ReloadError::Trie { .. } => core::error::Severity::RespondWithError,
        }
    }
}

/// The process-wide active index slot.
///
/// `active` is guarded by a [`tokio::sync::RwLock`]; queries take a read
/// guard only long enough to clone the `Arc`, then release it (§5 "The
/// index hot-swap"), so a pending reload's write-lock acquisition is never
/// blocked behind a slow query's filter/sort phase.
pub struct IndexSlot {
    active: RwLock<Arc<IndexEpoch>>,
    reloading: AtomicBool,
}

impl IndexSlot {
    /// Loads the initial index, failing if it cannot be loaded (this is a
    /// startup-time `ConfigError`/`IOError`, not a reload).
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError`] if the dictionary or trie blob cannot be
    /// loaded.
    pub fn load(dictionary_path: &Path, index_path: &Path) -> Result<Self, ReloadError> {
        let epoch = IndexEpoch::load(dictionary_path, index_path)?;
        Ok(Self {
            active: RwLock::new(Arc::new(epoch)),
            reloading: AtomicBool::new(false),
        })
    }

    /// Clones a handle to the currently active epoch.
    pub async fn current(&self) -> Arc<IndexEpoch> {
        Arc::clone(&*self.active.read().await)
    }

    /// Reloads the index from `index_path`, keeping the same dictionary
    /// file the current epoch was loaded with.
    ///
    /// Refuses concurrently with another in-flight reload (§4.9). Builds
    /// the new epoch *before* taking the write lock, so the write lock is
    /// only ever held for the instant of the pointer swap.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Busy`] if a reload is already running, or
    /// whatever [`ReloadError`] the new epoch failed to load with.
    pub async fn reload(&self, index_path: &Path) -> Result<(), ReloadError> {
        if self.reloading.swap(true, Ordering::AcqRel) {
            return Err(ReloadError::Busy);
        }

        let dictionary = {
            let current = self.active.read().await;
            // The dictionary itself is not reloaded; reload replaces only
            // the trie blob, matching the original's `reload` (§4.9) which
            // only re-mmaps the index file.
            current.dictionary.clone()
        };

        let result = IndexEpoch::load_with_dictionary(dictionary, index_path);
        match result {
            Ok(new_epoch) => {
                let mut guard = self.active.write().await;
                *guard = Arc::new(new_epoch);
                drop(guard);
                self.reloading.store(false, Ordering::Release);
                tracing::info!(path = %index_path.display(), "reloaded index");
                Ok(())
            }
            Err(err) => {
                self.reloading.store(false, Ordering::Release);
                tracing::error!(error = %err, "index reload failed");
                Err(err)
            }
        }
    }
}
