#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `core` holds the types shared by every other crate in the workspace: the
//! stored `(name, rank)` record ([`item::NodeItem`]) and its on-disk
//! string-array encoding ([`item::StringArray`]), the cross-cutting error
//! taxonomy ([`error`]), and the version banner used by both binaries
//! ([`version`]).
//!
//! # Design
//!
//! Nothing in this crate touches I/O beyond the buffer-level encode/decode of
//! [`item::StringArray`]. Higher crates (`trie`, `romanizer`, `indexer`,
//! `daemon`) depend on `core` for these primitives so that the wire format
//! and the trie's leaf format cannot drift apart.
//!
//! # Invariants
//!
//! - [`item::StringArray`] encode/decode round-trips bit-exactly (§3 of the
//!   specification this crate implements): little-endian `u32` counts and
//!   lengths, little-endian `f32` ranks, regardless of host endianness.
//! - [`item::NodeItem`] has two independent total orders: `name`
//!   (byte-lexicographic, used for deduplication) and `rank` (used for
//!   output ordering). Neither is derived from the other.

/// Cross-cutting error severity classification (§7), shared by crates that
/// each define their own richer `thiserror` enum.
pub mod error;
/// The stored record type and its wire/blob encoding.
pub mod item;
/// Version banner shared by the `prefix-indexer` and `prefix-matchd` binaries.
pub mod version;
