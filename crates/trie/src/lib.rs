#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The trie blob format, an offline [`Builder`] (§4.2), and an online
//! mmap-backed [`Reader`] (§4.3) exposing both `find(key)` for exact lookups
//! and `get_children(prefix)` for prefix enumeration. Everything above this
//! crate (`indexer`, `daemon`) only ever sees these two types; the blob
//! layout itself is private (see [`format`]).
//!
//! # Design
//!
//! Rather than a double-array trie with tail compression, this crate
//! realizes the builder/reader contract as a flat array of records kept in
//! ascending key order, with a binary-searchable offset table. `assign` is
//! the cost of validating a fixed header; `get_children` binary-searches
//! for the start of a prefix's range and then linearly scans forward only
//! as far as keys keep matching, so cost is proportional to the number of
//! matches, not to the size of the blob. This keeps the reader simple and
//! branch-light without needing an unsafe double-array implementation to
//! get right without a compiler to check it against.
//!
//! # Invariants
//!
//! - Builder input must be strictly ascending and unique in key order
//!   (§4.2 "Contract"); violating this is a build-time error, not silently
//!   corrected.
//! - `get_children`'s `max_depth` bounds the number of distinct keys
//!   visited in one call (Open Question O-2), not the number of
//!   [`core::item::NodeItem`] entries returned (a single key's value may
//!   hold many entries).
//! - An absent prefix is not an error: `get_children` simply leaves `out`
//!   unchanged (§4.3 "Failure").

mod builder;
mod format;
mod reader;

pub use builder::Builder;
pub use reader::Reader;

/// Errors raised while building or reading a trie blob.
#[derive(Debug, thiserror::Error)]
pub enum TrieError {
    /// The blob's header is missing, truncated, or carries the wrong magic.
    #[error("corrupt or truncated trie blob header")]
    CorruptHeader,
    /// The blob's format version is not one this reader understands.
    #[error("unsupported trie blob version {found}")]
    UnsupportedVersion {
        /// The version found in the blob's header.
        found: u32,
    },
    /// The builder was given a key that did not sort strictly after the
    /// previously appended key.
    #[error("key {key:?} is out of order or duplicates the previous key")]
    OutOfOrder {
        /// The offending key.
        key: String,
    },
    /// The builder was given more records than fit in a `u32` count field.
    #[error("{count} records exceeds the maximum a trie blob can address")]
    TooManyRecords {
        /// The number of records that was attempted.
        count: usize,
    },
    /// Opening or mapping the blob file failed.
    #[error("trie blob I/O error")]
    Io(#[from] std::io::Error),
}
