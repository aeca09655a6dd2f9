//! Reconciliation of overlapping candidate lists.

use crate::progress::{ListProgress, ProgressCallback};
use crate::{CandidateEntry, UninstallerKind};

/// Scores how likely two entries describe the same application.
///
/// A score of 1 or more marks a candidate match; higher is better.
pub trait RelatednessScorer: Send + Sync {
    fn score(&self, a: &CandidateEntry, b: &CandidateEntry) -> u32;
}

impl<F> RelatednessScorer for F
where
    F: Fn(&CandidateEntry, &CandidateEntry) -> u32 + Send + Sync,
{
    fn score(&self, a: &CandidateEntry, b: &CandidateEntry) -> u32 {
        self(a, b)
    }
}

/// Merges `incoming` into `base`.
///
/// Each incoming entry is scored against the base entries as passed in.
/// The best match (highest score, earliest in `base` on ties) absorbs the
/// incoming entry's data into its empty fields and the incoming entry is
/// dropped. Unmatched entries are appended in their incoming order.
pub fn merge_results(
    base: Vec<CandidateEntry>,
    incoming: Vec<CandidateEntry>,
    scorer: &dyn RelatednessScorer,
    mut progress: Option<&mut ProgressCallback<'_>>,
) -> Vec<CandidateEntry> {
    let base_len = base.len();
    let total = incoming.len();
    let mut results = base;

    for (index, mut entry) in incoming.into_iter().enumerate() {
        if let Some(progress) = progress.as_deref_mut() {
            progress(&ListProgress::new(index, Some(total), ""));
        }

        match best_match(&results[..base_len], &entry, scorer) {
            Some(matched) => {
                let target = &mut results[matched];
                // A weaker duplicate must not change how the entry is uninstalled
                if target.uninstall_possible() {
                    entry.kind = UninstallerKind::Unknown;
                }
                target.fill_missing_from(&entry);
            }
            None => results.push(entry),
        }
    }

    results
}

fn best_match(
    candidates: &[CandidateEntry],
    entry: &CandidateEntry,
    scorer: &dyn RelatednessScorer,
) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = scorer.score(candidate, entry);
        if score < 1 {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}
