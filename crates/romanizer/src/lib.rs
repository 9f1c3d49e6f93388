#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Expands a Han/Latin string into its pinyin romanizations, the way
//! `convert_to_letters` does in the original indexer and query path (§4.1 of
//! the specification this crate implements). The indexer calls
//! [`expand`] once per record's `name` field (never its rank, per Open
//! Question O-1); the daemon calls it once per incoming query string.
//!
//! # Design
//!
//! - A string made entirely of ASCII bytes is returned unchanged, as a
//!   single-element result: Latin input needs no romanization.
//! - Otherwise, each character is looked up in the [`Dictionary`]; unmapped
//!   characters (ASCII mixed into otherwise-Han text, or Han characters
//!   absent from the dictionary) contribute no reading and are dropped from
//!   the expansion, matching the original's behavior of only pushing a
//!   `vecAll` entry for characters found in `hz2pyTable`.
//! - The per-character reading lists are combined with a full Cartesian
//!   product, producing every full-pinyin spelling of the input.
//! - When every character in the input resolved to at least one reading
//!   *and* none of them were ASCII (the original's `all_chinese_flag`), an
//!   additional "initials" expansion is appended: the Cartesian product of
//!   each character's first-letter set, giving the common pinyin-initials
//!   abbreviation (e.g. "北京" also expands to "bj").

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::Path;

/// A loaded Han-to-pinyin reading table.
///
/// Keyed by a single Unicode scalar (as a `String`, since Han characters are
/// multi-byte in UTF-8), mapping to the list of romanizations a character
/// can take (multiple readings are common for polyphonic characters).
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    readings: HashMap<String, Vec<String>>,
}

impl Dictionary {
    /// Loads a dictionary from the `chinese_map_file` format: one character
    /// per line, whitespace-separated, `<char> <reading1> <reading2> ...`.
    /// Blank lines and lines with fewer than two fields are skipped.
    ///
    /// # Errors
    ///
    /// Returns any [`std::io::Error`] encountered opening or reading the
    /// file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = io::BufReader::new(file);
        let mut readings = HashMap::new();
        let mut line_count = 0usize;
        for line in reader.lines() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(character) = fields.next() else {
                continue;
            };
            let values: Vec<String> = fields.map(str::to_owned).collect();
            if values.is_empty() {
                continue;
            }
            readings.insert(character.to_owned(), values);
            line_count += 1;
        }
        tracing::info!(line_count, "loaded han-to-pinyin dictionary");
        Ok(Self { readings })
    }

    /// Looks up the readings for a single character.
    #[must_use]
    pub fn get(&self, character: &str) -> Option<&[String]> {
        self.readings.get(character).map(Vec::as_slice)
    }

    /// Number of characters with at least one reading.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the dictionary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Whether every byte of `input` is ASCII (the original's `all_english_char`).
#[must_use]
pub fn is_all_ascii(input: &str) -> bool {
    input.is_ascii()
}

/// Expands `input` into its romanizations using `dict`.
///
/// Returns `[input]` unchanged when `input` is entirely ASCII. Otherwise
/// returns every full-pinyin spelling, followed by the initials
/// abbreviation (if every character resolved and none were ASCII). The
/// result may be empty if no character in `input` has a dictionary entry.
#[must_use]
pub fn expand(input: &str, dict: &Dictionary) -> Vec<String> {
    if is_all_ascii(input) {
        return vec![input.to_owned()];
    }

    let mut per_char_readings: Vec<Vec<String>> = Vec::new();
    let mut per_char_initials: Vec<Vec<String>> = Vec::new();
    let mut all_chinese = true;

    for ch in input.chars() {
        if ch.is_ascii() {
            all_chinese = false;
        }
        let key = ch.to_string();
        if let Some(readings) = dict.get(&key) {
            per_char_initials.push(
                readings
                    .iter()
                    .map(|reading| reading.chars().next().map_or_else(String::new, |c| c.to_string()))
                    .collect(),
            );
            per_char_readings.push(readings.to_vec());
        }
    }

    let mut out = cartesian_product(&per_char_readings);
    if all_chinese && !per_char_readings.is_empty() {
        out.extend(cartesian_product(&per_char_initials));
    }
    out
}

/// Concatenating Cartesian product, matching `get_all_results`: given one
/// candidate list per position, returns every string formed by picking one
/// candidate from each position in order.
fn cartesian_product(lists: &[Vec<String>]) -> Vec<String> {
    let mut out = vec![String::new()];
    for list in lists {
        let mut next = Vec::with_capacity(out.len() * list.len().max(1));
        for piece in list {
            for prefix in &out {
                next.push(format!("{prefix}{piece}"));
            }
        }
        out = next;
    }
    if lists.is_empty() {
        Vec::new()
    } else {
        out
    }
}
