//! Evidence model.
//!
//! Evidence order is retrieval rank and drives citation numbering, so every
//! collection here preserves insertion order.

use serde::{Deserialize, Serialize};

/// Which configured index a retrieval run reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelector {
    /// Local semantic index
    Primary,
    /// Remote index selected by topic
    Secondary,
}

impl SourceSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSelector::Primary => "primary",
            SourceSelector::Secondary => "secondary",
        }
    }

    /// Origin tag for evidence read through this selector.
    pub fn origin(&self) -> Origin {
        match self {
            SourceSelector::Primary => Origin::PrimaryIndex,
            SourceSelector::Secondary => Origin::SecondaryIndex,
        }
    }
}

/// Provenance of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    PrimaryIndex,
    SecondaryIndex,
    WebFallback,
}

/// Raw hit returned by a source backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHit {
    pub content: String,
    pub source_id: String,
    #[serde(default)]
    pub score: Option<f32>,
}

impl SourceHit {
    pub fn new(content: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// A retrieved text unit with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub content: String,
    pub source_id: String,
    pub origin: Origin,
    pub score: Option<f32>,
}

impl Evidence {
    /// Tag a backend hit with the origin it was read from.
    pub fn from_hit(hit: SourceHit, origin: Origin) -> Self {
        Self {
            content: hit.content,
            source_id: hit.source_id,
            origin,
            score: hit.score,
        }
    }

    /// Title shown in citations.
    pub fn title(&self) -> &str {
        &self.source_id
    }
}

/// Working evidence collection for one run.
///
/// Graded-out items leave the set but are still counted in `discarded`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSet {
    items: Vec<Evidence>,
    discarded: usize,
}

impl EvidenceSet {
    pub fn new(items: Vec<Evidence>) -> Self {
        Self {
            items,
            discarded: 0,
        }
    }

    /// Build a set from backend hits, tagging each with `origin`.
    pub fn from_hits(hits: Vec<SourceHit>, origin: Origin) -> Self {
        Self::new(
            hits.into_iter()
                .map(|hit| Evidence::from_hit(hit, origin))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Evidence] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Evidence> {
        self.items.iter()
    }

    /// Item at a 1-based citation position.
    pub fn cited(&self, n: usize) -> Option<&Evidence> {
        n.checked_sub(1).and_then(|i| self.items.get(i))
    }

    /// Items removed by relevance grading.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Keep only the items whose verdict is `true`.
    ///
    /// `verdicts` is positional; items past its end are kept.
    pub fn retain_relevant(&mut self, verdicts: &[bool]) {
        let before = self.items.len();
        let mut position = 0;
        self.items.retain(|_| {
            let keep = verdicts.get(position).copied().unwrap_or(true);
            position += 1;
            keep
        });
        self.discarded += before - self.items.len();
    }

    /// Append fallback evidence after the surviving items.
    pub fn append(&mut self, more: Vec<Evidence>) {
        self.items.extend(more);
    }

    /// Count of items by origin.
    pub fn count_origin(&self, origin: Origin) -> usize {
        self.items.iter().filter(|e| e.origin == origin).count()
    }
}

impl<'a> IntoIterator for &'a EvidenceSet {
    type Item = &'a Evidence;
    type IntoIter = std::slice::Iter<'a, Evidence>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
