//! Offline trie blob construction (§4.2).

use core::item::StringArray;

use crate::format::{HEADER_LEN, MAGIC, VERSION};
use crate::TrieError;

/// Builds a trie blob from records in strictly ascending, unique key order.
///
/// The caller (the indexer pipeline, §4.4) is responsible for producing
/// records in that order; an out-of-order or duplicate key is a build
/// error rather than something the builder silently corrects, since
/// silently re-sorting would hide a bug in the caller's bucketing step.
#[derive(Debug, Default)]
pub struct Builder {
    records: Vec<(String, StringArray)>,
}

impl Builder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record. Returns an error immediately if `key` does not
    /// sort strictly after the previously appended key.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::OutOfOrder`] if `key` is not strictly greater
    /// than the last appended key.
    pub fn push(&mut self, key: String, value: StringArray) -> Result<(), TrieError> {
        if let Some((last, _)) = self.records.last() {
            if key.as_bytes() <= last.as_bytes() {
                return Err(TrieError::OutOfOrder { key });
            }
        }
        self.records.push((key, value));
        Ok(())
    }

    /// Number of records appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serializes the accumulated records into a self-contained blob.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::TooManyRecords`] if the record count overflows
    /// `u32`.
    pub fn build(self) -> Result<Vec<u8>, TrieError> {
        let count =
            u32::try_from(self.records.len()).map_err(|_| TrieError::TooManyRecords { count: self.records.len() })?;

        let mut records_section = Vec::new();
        let mut offsets = Vec::with_capacity(self.records.len() + 1);
        offsets.push(0u64);
        for (key, value) in &self.records {
            let key_bytes = key.as_bytes();
            let key_len = u32::try_from(key_bytes.len()).expect("key longer than u32::MAX bytes");
            records_section.extend_from_slice(&key_len.to_le_bytes());
            records_section.extend_from_slice(key_bytes);
            value.encode(&mut records_section);
            offsets.push(records_section.len() as u64);
        }

        let mut blob = Vec::with_capacity(HEADER_LEN + offsets.len() * 8 + records_section.len());
        blob.extend_from_slice(&MAGIC);
        blob.extend_from_slice(&VERSION.to_le_bytes());
        blob.extend_from_slice(&count.to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        for offset in &offsets {
            blob.extend_from_slice(&offset.to_le_bytes());
        }
        blob.extend_from_slice(&records_section);

        tracing::info!(record_count = self.records.len(), blob_bytes = blob.len(), "built trie blob");
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::item::NodeItem;

    #[test]
    fn rejects_out_of_order_keys() {
        let mut builder = Builder::new();
        builder.push("b".to_owned(), StringArray::new()).unwrap();
        let err = builder.push("a".to_owned(), StringArray::new()).unwrap_err();
        assert!(matches!(err, TrieError::OutOfOrder { .. }));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let mut builder = Builder::new();
        builder.push("a".to_owned(), StringArray::new()).unwrap();
        let err = builder.push("a".to_owned(), StringArray::new()).unwrap_err();
        assert!(matches!(err, TrieError::OutOfOrder { .. }));
    }

    #[test]
    fn builds_nonempty_blob_for_empty_record_set() {
        let blob = Builder::new().build().unwrap();
        assert!(!blob.is_empty());
    }

    #[test]
    fn builds_blob_with_expected_record_count() {
        let mut builder = Builder::new();
        let mut array = StringArray::new();
        array.push(NodeItem::new("北京", 1.0));
        builder.push("bj".to_owned(), array).unwrap();
        assert_eq!(builder.len(), 1);
        let blob = builder.build().unwrap();
        assert!(blob.len() > HEADER_LEN);
    }
}
