//! Fixture builders shared by the workspace's test suites: a dictionary file
//! and a trie blob are the two pieces of on-disk state every crate above
//! `trie` needs to construct before it can test anything, so the boilerplate
//! for building them lives here once instead of being copy-pasted per crate.

use std::path::{Path, PathBuf};

use core::item::{NodeItem, StringArray};

/// Writes `text` verbatim to `name` under `dir`, returning the path. Used for
/// Han→Pinyin dictionary fixtures (`"甲 jia\n"`-style lines).
pub fn write_dictionary(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write dictionary fixture");
    path
}

/// Builds a trie blob from `records` (romanization key, value name, rank)
/// and writes it to `name` under `dir`, returning the path.
///
/// Records sharing a key are grouped into a single [`StringArray`], matching
/// how [`trie::Builder`] expects entries to be pushed.
pub fn write_trie_blob(dir: &Path, name: &str, records: &[(&str, &str, f32)]) -> PathBuf {
    let mut grouped: Vec<(String, StringArray)> = Vec::new();
    for (key, value_name, rank) in records {
        match grouped.iter_mut().find(|(existing_key, _)| existing_key == key) {
            Some((_, array)) => array.push(NodeItem::new((*value_name).to_owned(), *rank)),
            None => {
                let mut array = StringArray::new();
                array.push(NodeItem::new((*value_name).to_owned(), *rank));
                grouped.push(((*key).to_owned(), array));
            }
        }
    }
    grouped.sort_by(|a, b| a.0.cmp(&b.0));

    let mut builder = trie::Builder::new();
    for (key, array) in grouped {
        builder.push(key, array).expect("fixture keys are pre-sorted and deduplicated");
    }
    let blob = builder.build().expect("fixture trie blob always builds");

    let path = dir.join(name);
    std::fs::write(&path, blob).expect("write trie blob fixture");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_trie_blob_groups_records_sharing_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_trie_blob(dir.path(), "index.bin", &[("al", "alpha", 0.5), ("al", "albert", 0.1)]);

        let reader = trie::Reader::from_bytes(std::fs::read(&path).unwrap()).unwrap();
        let mut hits = Vec::new();
        reader.get_children("al", &mut hits, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.0.len(), 2);
    }

    #[test]
    fn write_dictionary_round_trips_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dictionary(dir.path(), "dict.txt", "甲 jia\n");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "甲 jia\n");
    }
}
