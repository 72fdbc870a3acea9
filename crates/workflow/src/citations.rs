//! Citation extraction from generated answers.
//!
//! Markers are bracketed decimal positions (`[3]`) into the evidence set the
//! generator was shown. Extraction never fails: a marker that points outside
//! the set yields a placeholder entry instead of an error.

use lexrag_retrieval::EvidenceSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

static MARKER_RE: OnceLock<Option<Regex>> = OnceLock::new();

const MARKER_PATTERN: &str = r"\[(\d+)\]";

fn marker_pattern() -> Option<&'static Regex> {
    MARKER_RE
        .get_or_init(|| match Regex::new(MARKER_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("Citation marker pattern failed to compile: {}", e);
                None
            }
        })
        .as_ref()
}

/// One resolved citation marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// 1-based evidence position as written in the answer, saturated at
    /// `usize::MAX` for markers too long to represent
    pub index: usize,
    pub title: String,
    pub excerpt: String,
}

impl Citation {
    fn placeholder(marker: &Marker, evidence_len: usize) -> Self {
        let label = marker.label();
        Self {
            index: marker.position(),
            title: format!("Document {} (not in evidence set)", label),
            excerpt: format!(
                "The answer cites [{}] but only {} evidence item(s) were provided.",
                label, evidence_len
            ),
        }
    }
}

/// A `[n]` marker as written in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    Position(usize),
    /// Digits that overflow `usize`, without leading zeros
    Oversized(String),
}

impl Marker {
    fn parse(digits: &str) -> Self {
        match digits.parse::<usize>() {
            Ok(n) => Marker::Position(n),
            Err(_) => Marker::Oversized(digits.trim_start_matches('0').to_string()),
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Marker::Position(n) => *n,
            Marker::Oversized(_) => usize::MAX,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Marker::Position(n) => n.to_string(),
            Marker::Oversized(digits) => digits.clone(),
        }
    }
}

/// Distinct markers in order of first appearance.
pub fn markers(text: &str) -> Vec<Marker> {
    let Some(pattern) = marker_pattern() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| Marker::parse(m.as_str())))
        .filter(|marker| seen.insert(marker.clone()))
        .collect()
}

/// Resolve every distinct `[n]` marker in `text` against `evidence`.
pub fn extract_citations(text: &str, evidence: &EvidenceSet, excerpt_chars: usize) -> Vec<Citation> {
    markers(text)
        .iter()
        .map(|marker| match marker {
            Marker::Position(n) => match evidence.cited(*n) {
                Some(item) => Citation {
                    index: *n,
                    title: item.title().to_string(),
                    excerpt: excerpt(&item.content, excerpt_chars),
                },
                None => Citation::placeholder(marker, evidence.len()),
            },
            Marker::Oversized(_) => Citation::placeholder(marker, evidence.len()),
        })
        .collect()
}

/// First `max_chars` characters of `content`, with `...` when cut.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_end, _)) => format!("{}...", &content[..byte_end]),
        None => content.to_string(),
    }
}
