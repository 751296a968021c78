//! Bilingual corpus handling: dataset resolution, line parsing, capping, and rendering.
//!
//! The corpus is a UTF-8 file of tab-separated sentence pairs. Parsing is lenient on purpose:
//! a line that does not split into exactly two fields is counted and dropped, never reported
//! as an error.

mod fetch;

pub use fetch::{DatasetResolver, locate_corpus_file};

use crate::translation::language::LanguagePair;
use reqwest::StatusCode;
use std::io::BufRead;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while locating, downloading, or reading the corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Dataset identifier was not in `owner/dataset` form.
    #[error("Invalid dataset identifier '{0}'; expected 'owner/dataset'")]
    InvalidDataset(String),
    /// Dataset directory does not exist.
    #[error("Dataset directory not found: {}", .0.display())]
    DatasetNotFound(PathBuf),
    /// Dataset directory exists but does not contain the corpus file.
    #[error("Corpus file '{file}' not found in {}", .dir.display())]
    FileNotFound {
        /// File name that was searched for.
        file: String,
        /// Directory that was searched recursively.
        dir: PathBuf,
    },
    /// HTTP layer failed before the download completed.
    #[error("Corpus download failed: {0}")]
    Download(#[from] reqwest::Error),
    /// Download endpoint answered with a non-success status.
    #[error("Corpus download from {url} returned {status}")]
    DownloadStatus {
        /// Requested URL.
        url: String,
        /// HTTP status returned by the endpoint.
        status: StatusCode,
    },
    /// Downloaded zip archive could not be read or extracted.
    #[error("Corpus archive from {url} could not be extracted: {source}")]
    Archive {
        /// Requested URL.
        url: String,
        /// Underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },
    /// Filesystem failure while reading or writing corpus files.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// No cache directory could be determined for downloads.
    #[error("Unable to determine a cache directory for dataset downloads")]
    NoCacheDir,
}

/// One reference translation: a source-language sentence and its target-language rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPair {
    /// Sentence in the source language.
    pub source: String,
    /// Sentence in the target language.
    pub target: String,
}

/// Column layout of the tab-separated corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrder {
    /// `target<TAB>source`, the layout of `TR2EN.txt`.
    TargetFirst,
    /// `source<TAB>target`.
    SourceFirst,
}

impl FromStr for ColumnOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "target-first" | "target_first" => Ok(Self::TargetFirst),
            "source-first" | "source_first" => Ok(Self::SourceFirst),
            _ => Err(()),
        }
    }
}

/// Pairs recovered from a corpus plus the number of lines that were dropped.
#[derive(Debug, Default)]
pub struct ParsedCorpus {
    /// Pairs in file order.
    pub pairs: Vec<TranslationPair>,
    /// Lines that did not split into exactly two fields.
    pub skipped_lines: usize,
}

/// Split a single corpus line into a pair, or `None` when it does not have exactly two fields.
pub fn parse_line(line: &str, order: ColumnOrder) -> Option<TranslationPair> {
    let mut fields = line.trim().split('\t');
    let first = fields.next()?;
    let second = fields.next()?;
    if fields.next().is_some() {
        return None;
    }

    let (source, target) = match order {
        ColumnOrder::TargetFirst => (second, first),
        ColumnOrder::SourceFirst => (first, second),
    };
    Some(TranslationPair {
        source: source.to_string(),
        target: target.to_string(),
    })
}

/// Parse every line of a corpus reader.
///
/// Only I/O and UTF-8 decoding failures are errors; malformed lines are skipped and counted.
pub fn parse_corpus<R: BufRead>(reader: R, order: ColumnOrder) -> std::io::Result<ParsedCorpus> {
    let mut parsed = ParsedCorpus::default();
    for line in reader.lines() {
        let line = line?;
        match parse_line(&line, order) {
            Some(pair) => parsed.pairs.push(pair),
            None => parsed.skipped_lines += 1,
        }
    }
    Ok(parsed)
}

/// Truncate `pairs` to `max_pairs` (a cap of `0` means unlimited) and return how many were dropped.
pub fn cap_pairs(pairs: &mut Vec<TranslationPair>, max_pairs: usize) -> usize {
    if max_pairs == 0 || pairs.len() <= max_pairs {
        return 0;
    }

    let available = pairs.len();
    pairs.truncate(max_pairs);
    let dropped = available - max_pairs;
    tracing::warn!(
        available,
        kept = max_pairs,
        dropped,
        "Corpus truncated to the configured pair cap (CORPUS_MAX_PAIRS)"
    );
    dropped
}

/// Render a pair with the canonical bilingual template, target language first.
pub fn render_pair(pair: &TranslationPair, languages: &LanguagePair) -> String {
    format!(
        "{}: {}\n{}: {}",
        languages.target_name, pair.target, languages.source_name, pair.source
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_field_lines_become_pairs() {
        let pair = parse_line("good\tiyi", ColumnOrder::TargetFirst).expect("pair");
        assert_eq!(pair.source, "iyi");
        assert_eq!(pair.target, "good");

        let pair = parse_line("iyi\tgood", ColumnOrder::SourceFirst).expect("pair");
        assert_eq!(pair.source, "iyi");
        assert_eq!(pair.target, "good");
    }

    #[test]
    fn lines_with_other_field_counts_are_dropped() {
        assert!(parse_line("only one field", ColumnOrder::TargetFirst).is_none());
        assert!(parse_line("a\tb\tc", ColumnOrder::TargetFirst).is_none());
        assert!(parse_line("", ColumnOrder::TargetFirst).is_none());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_splitting() {
        let pair = parse_line("  Hello.\tMerhaba.\t\n", ColumnOrder::TargetFirst).expect("pair");
        assert_eq!(pair.target, "Hello.");
        assert_eq!(pair.source, "Merhaba.");
    }

    #[test]
    fn parse_corpus_counts_skipped_lines() {
        let input = "Go.\tGit.\nbroken line\nHi.\tMerhaba.\nx\ty\tz\n";
        let parsed = parse_corpus(input.as_bytes(), ColumnOrder::TargetFirst).unwrap();
        assert_eq!(parsed.pairs.len(), 2);
        assert_eq!(parsed.skipped_lines, 2);
        assert_eq!(parsed.pairs[1].source, "Merhaba.");
    }

    #[test]
    fn cap_pairs_truncates_and_reports() {
        let mut pairs: Vec<_> = (0..12)
            .map(|idx| TranslationPair {
                source: format!("kaynak {idx}"),
                target: format!("target {idx}"),
            })
            .collect();
        assert_eq!(cap_pairs(&mut pairs, 10), 2);
        assert_eq!(pairs.len(), 10);
        assert_eq!(pairs[9].target, "target 9");

        assert_eq!(cap_pairs(&mut pairs, 0), 0);
        assert_eq!(cap_pairs(&mut pairs, 50), 0);
        assert_eq!(pairs.len(), 10);
    }

    #[test]
    fn render_pair_uses_language_names() {
        let pair = TranslationPair {
            source: "iyi".into(),
            target: "good".into(),
        };
        let rendered = render_pair(&pair, &LanguagePair::default());
        assert_eq!(rendered, "English: good\nTurkish: iyi");
    }

    #[test]
    fn column_order_parses_from_env_values() {
        assert_eq!("target-first".parse(), Ok(ColumnOrder::TargetFirst));
        assert_eq!("SOURCE_FIRST".parse(), Ok(ColumnOrder::SourceFirst));
        assert!("sideways".parse::<ColumnOrder>().is_err());
    }
}
