#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The offline indexer pipeline (§4.4): load the Han→Pinyin dictionary,
//! stream `name\trank` records, romanize each record's `name` field only
//! (Open Question O-1), bucket the resulting `NodeItem`s by romanization
//! key into an ordered map, and hand the map to [`trie::Builder`].
//!
//! # Design
//!
//! The binary (`prefix-indexer`) is a thin wrapper: argument parsing and
//! exit-code translation live in [`run`] and [`exit_code_from`], following
//! the same split as the daemon's CLI, so both binaries and their tests
//! share one shape.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{BufRead, Write as _};
use std::path::{Path, PathBuf};

use clap::Parser;
use core::item::{NodeItem, StringArray};
use romanizer::Dictionary;
use thiserror::Error;
use trie::Builder;

/// Errors raised while building an index.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The Han→Pinyin dictionary file could not be read.
    #[error("failed to read dictionary file {path}: {source}")]
    Dictionary {
        /// The path that failed to load.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The ranked-names input file could not be opened.
    #[error("failed to open input file {path}: {source}")]
    Input {
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Building the trie blob failed.
    #[error("failed to build trie: {0}")]
    Trie(#[from] trie::TrieError),
    /// Writing the output blob failed.
    #[error("failed to write output file {path}: {source}")]
    Output {
        /// The path that failed to write.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Builds a trie blob from a ranked-names file and the dictionary at
/// `dictionary_path`, writing the result to `output_path`.
///
/// Lines of `input` whose tab-split arity is not exactly 2 are skipped with
/// a warning (§4.4 step 2); only each record's `name` field is ever passed
/// to the romanizer (Open Question O-1).
///
/// # Errors
///
/// Returns [`IndexerError`] if the dictionary or input cannot be read, or
/// the trie cannot be built or written.
pub fn build_index(dictionary_path: &Path, input_path: &Path, output_path: &Path) -> Result<(), IndexerError> {
    let dictionary = Dictionary::load(dictionary_path).map_err(|source| IndexerError::Dictionary {
        path: dictionary_path.to_owned(),
        source,
    })?;

    let file = std::fs::File::open(input_path).map_err(|source| IndexerError::Input {
        path: input_path.to_owned(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);

    let mut buckets: BTreeMap<String, StringArray> = BTreeMap::new();
    let mut accepted = 0usize;
    let mut skipped = 0usize;

    for line in reader.lines() {
        let line = line.map_err(|source| IndexerError::Input {
            path: input_path.to_owned(),
            source,
        })?;
        let mut fields = line.splitn(2, '\t');
        let (Some(name), Some(rank_text)) = (fields.next(), fields.next()) else {
            skipped += 1;
            continue;
        };
        let Ok(rank) = rank_text.trim_end_matches('\r').parse::<f32>() else {
            skipped += 1;
            continue;
        };

        let romanizations = romanizer::expand(name, &dictionary);
        if romanizations.is_empty() {
            skipped += 1;
            continue;
        }
        let item = NodeItem::new(name, rank);
        for key in romanizations {
            buckets.entry(key).or_default().push(item.clone());
        }
        accepted += 1;
    }

    tracing::info!(accepted, skipped, buckets = buckets.len(), "indexed ranked-names file");

    let mut builder = Builder::new();
    for (key, value) in buckets {
        builder.push(key, value)?;
    }
    let blob = builder.build()?;

    std::fs::write(output_path, blob).map_err(|source| IndexerError::Output {
        path: output_path.to_owned(),
        source,
    })?;

    Ok(())
}

/// Command-line arguments for `prefix-indexer`, matching the original
/// flags `-C -I -O -h` (§6 "Indexer CLI").
#[derive(Debug, Parser)]
#[command(name = "prefix-indexer", version = core::version::VERSION, about = "Builds a prefix-match trie index from a ranked-names file")]
struct Args {
    /// Han→Pinyin conversion file.
    #[arg(short = 'C', long = "chinese-map", value_name = "FILE")]
    chinese_map: PathBuf,
    /// Input ranked-names file (`name\trank` per line).
    #[arg(short = 'I', long = "input", value_name = "FILE")]
    input: PathBuf,
    /// Output trie blob path.
    #[arg(short = 'O', long = "output", value_name = "FILE")]
    output: PathBuf,
}

/// Runs the `prefix-indexer` CLI against `arguments`, writing diagnostics to
/// `stderr`. Returns a process exit code: `0` on success, non-zero on any
/// error (§6 "Exit codes").
pub fn run<I, S, Err>(arguments: I, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Err: Write,
{
    let args = match Args::try_parse_from(arguments) {
        Ok(args) => args,
        Err(clap_error) => {
            let _ = write!(stderr, "{clap_error}");
            return if clap_error.exit_code() == 0 { 0 } else { -1 };
        }
    };

    for (flag, path) in [("-C", &args.chinese_map), ("-I", &args.input)] {
        if !path.exists() {
            let _ = writeln!(stderr, "{flag} file does not exist: {}", path.display());
            return -1;
        }
    }

    match build_index(&args.chinese_map, &args.input, &args.output) {
        Ok(()) => 0,
        Err(err) => {
            let _ = writeln!(stderr, "{err}");
            -1
        }
    }
}

/// Clamps a process status code into a valid [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.rem_euclid(256);
    std::process::ExitCode::from(clamped as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn builds_index_for_pure_ascii_input() {
        let dir = tempfile::tempdir().unwrap();
        let dict = write_file(&dir, "dict.txt", "");
        let input = write_file(&dir, "input.txt", "beij\t0.5\n");
        let output = dir.path().join("out.bin");

        build_index(&dict, &input, &output).unwrap();

        let reader = trie::Reader::open_mmap(&output).unwrap();
        let mut hits = Vec::new();
        reader.get_children("beij", &mut hits, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.len(), 1);
        assert_eq!(hits[0].1 .0[0].name, "beij");
    }

    #[test]
    fn skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let dict = write_file(&dir, "dict.txt", "");
        let input = write_file(&dir, "input.txt", "no-tab-here\nbeij\t0.5\nbad\trank\n");
        let output = dir.path().join("out.bin");

        build_index(&dict, &input, &output).unwrap();

        let reader = trie::Reader::open_mmap(&output).unwrap();
        assert_eq!(reader.record_count(), 1);
    }

    #[test]
    fn ideograph_with_single_reading_builds_expected_key() {
        let dir = tempfile::tempdir().unwrap();
        let dict = write_file(&dir, "dict.txt", "北 bei\n");
        let input = write_file(&dir, "input.txt", "北京\t0.1\n");
        let output = dir.path().join("out.bin");

        build_index(&dict, &input, &output).unwrap();

        let reader = trie::Reader::open_mmap(&output).unwrap();
        let mut hits = Vec::new();
        reader.get_children("bei", &mut hits, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "bei");
        assert_eq!(hits[0].1 .0[0].name, "北京");
    }

    #[test]
    fn missing_required_file_reports_nonzero_exit() {
        let mut stderr = Vec::new();
        let status = run(["prefix-indexer", "-C", "/no/such/file", "-I", "/no/such/file", "-O", "/tmp/out.bin"], &mut stderr);
        assert_eq!(status, -1);
        assert!(!stderr.is_empty());
    }
}
