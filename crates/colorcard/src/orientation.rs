//! Orientation resolution for sampled cards.
//!
//! A card found upside-down still matches the edge template (the patch grid
//! is symmetric at edge level), so orientation is decided from colors: a few
//! high-contrast patch pairs flip their brightness relation when the card is
//! physically rotated 180 degrees. Each cue states the relation observed on a
//! *reversed* card; enough agreeing cues reverse the sample order.

use crate::sampler::ColorSamples;

/// Channel-sum relation between two patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SumRelation {
    /// Left-hand patch sum strictly greater than right-hand.
    Greater,
    /// Left-hand patch sum strictly less than right-hand.
    Less,
}

/// One patch-pair comparison voting on card reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrientationCue {
    /// Canonical index of the first compared patch.
    pub lhs: usize,
    /// Canonical index of the second compared patch.
    pub rhs: usize,
    /// Relation between the two channel sums that indicates a reversed card.
    pub reversed_when: SumRelation,
}

impl OrientationCue {
    fn votes_reversed(&self, samples: &ColorSamples) -> bool {
        let lhs: f64 = samples.colors[self.lhs].iter().sum();
        let rhs: f64 = samples.colors[self.rhs].iter().sum();
        match self.reversed_when {
            SumRelation::Greater => lhs > rhs,
            SumRelation::Less => lhs < rhs,
        }
    }
}

/// Detect a 180-degree rotated card and restore canonical patch order.
///
/// Returns `true` (and reverses `samples` in place, dispersions included)
/// when at least `min_votes` cues see their reversed-card relation.
pub fn resolve_orientation(
    samples: &mut ColorSamples,
    cues: &[OrientationCue],
    min_votes: usize,
) -> bool {
    let votes = cues
        .iter()
        .filter(|cue| cue.votes_reversed(samples))
        .count();
    let rotated = votes >= min_votes;
    if rotated {
        samples.reverse();
        tracing::debug!(votes, cues = cues.len(), "card appears rotated; reversing patch order");
    }
    rotated
}
