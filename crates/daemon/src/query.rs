//! Query handling (§4.8): the completion of `nread` for opcode GET.

use std::collections::BTreeMap;

use crate::index::IndexEpoch;

/// Runs one query against `epoch`, returning the ranked, deduplicated,
/// truncated list of names.
///
/// `number == 0` defaults to 10 (§4.8). `max_depth` bounds `get_children`'s
/// own descent (Open Question O-2); the final truncation to `number` is a
/// separate step applied after ranking.
#[must_use]
pub fn query(epoch: &IndexEpoch, text: &str, number: u32, max_depth: usize) -> Vec<String> {
    let number = if number == 0 { 10 } else { number as usize };

    let filter_rule: Vec<String> = text.chars().filter(|c| !c.is_ascii()).map(String::from).collect();

    let letters = romanizer::expand(text, epoch.dictionary());
    if letters.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for letter in &letters {
        epoch.reader().get_children(letter, &mut hits, max_depth).ok();
    }

    let mut candidates = Vec::new();
    for (_, value) in hits {
        candidates.extend(value.0);
    }

    let mut survivors: BTreeMap<String, f32> = BTreeMap::new();
    for candidate in candidates {
        if filter_rule.iter().all(|rule| candidate.name.contains(rule.as_str())) {
            survivors
                .entry(candidate.name)
                .and_modify(|rank| {
                    if candidate.rank < *rank {
                        *rank = candidate.rank;
                    }
                })
                .or_insert(candidate.rank);
        }
    }

    let mut ranked: Vec<(String, f32)> = survivors.into_iter().collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let truncate_at = number.min(ranked.len());
    ranked.into_iter().take(truncate_at).map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::item::{NodeItem, StringArray};
    use std::path::PathBuf;

    fn build_epoch(dir: &tempfile::TempDir, dict_text: &str, records: &[(&str, &[(&str, f32)])]) -> (PathBuf, PathBuf) {
        let dict_path = dir.path().join("dict.txt");
        std::fs::write(&dict_path, dict_text).unwrap();

        let mut builder = trie::Builder::new();
        for (key, items) in records {
            let mut array = StringArray::new();
            for (name, rank) in *items {
                array.push(NodeItem::new((*name).to_owned(), *rank));
            }
            builder.push((*key).to_owned(), array).unwrap();
        }
        let index_path = dir.path().join("index.bin");
        std::fs::write(&index_path, builder.build().unwrap()).unwrap();
        (dict_path, index_path)
    }

    #[test]
    fn pure_ascii_query_returns_exact_match() {
        let dir = tempfile::tempdir().unwrap();
        let (dict_path, index_path) = build_epoch(&dir, "", &[("beij", &[("beij", 0.5)])]);
        let epoch = crate::index::IndexEpoch::load(&dict_path, &index_path).unwrap();
        let result = query(&epoch, "beij", 5, 1024);
        assert_eq!(result, vec!["beij".to_owned()]);
    }

    #[test]
    fn ranking_orders_by_ascending_rank() {
        let dir = tempfile::tempdir().unwrap();
        let (dict_path, index_path) = build_epoch(&dir, "甲 yi\n乙 yi\n", &[("yi", &[("甲", 0.9), ("乙", 0.1)])]);
        let epoch = crate::index::IndexEpoch::load(&dict_path, &index_path).unwrap();
        let result = query(&epoch, "y", 10, 1024);
        assert_eq!(result, vec!["乙".to_owned(), "甲".to_owned()]);
    }

    #[test]
    fn zero_max_number_defaults_to_ten() {
        let dir = tempfile::tempdir().unwrap();
        let items: Vec<(&str, f32)> = (0..15).map(|_| ("x", 1.0)).collect();
        let (dict_path, index_path) = build_epoch(&dir, "", &[("x", &items)]);
        let epoch = crate::index::IndexEpoch::load(&dict_path, &index_path).unwrap();
        let result = query(&epoch, "x", 0, 1024);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn out_of_dictionary_query_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let (dict_path, index_path) = build_epoch(&dir, "", &[]);
        let epoch = crate::index::IndexEpoch::load(&dict_path, &index_path).unwrap();
        let result = query(&epoch, "未知字", 5, 1024);
        assert!(result.is_empty());
    }
}
