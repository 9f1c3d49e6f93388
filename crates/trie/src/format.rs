//! The on-disk/on-mmap layout of a trie blob.
//!
//! ```text
//! +------------------+
//! | magic   (4 bytes) |  b"PMT1"
//! | version (u32 LE)  |  1
//! | count   (u32 LE)  |  number of records
//! | reserved(u32 LE)  |  0, for future use
//! +------------------+
//! | offsets: (count+1) * u64 LE |  byte offsets into the records section,
//! |                              |  relative to the start of that section
//! +------------------+
//! | records: count entries, each |
//! |   key_len (u32 LE)            |
//! |   key bytes (UTF-8)           |
//! |   value (core::item::StringArray encoding) |
//! +------------------+
//! ```
//!
//! Records are written in strictly ascending key order by the builder
//! (§4.2), which lets the reader binary-search for a prefix's range without
//! ever decoding a record it does not need.

pub(crate) const MAGIC: [u8; 4] = *b"PMT1";
pub(crate) const VERSION: u32 = 1;
pub(crate) const HEADER_LEN: usize = 16;
