//! Overlap suppression for dense template hits.

use crate::result::MatchResult;

/// Reduces candidates to one box per disjoint matched region.
///
/// Candidates are visited in order. A candidate that overlaps no kept box is
/// kept. A candidate overlapping one or more kept boxes replaces all of them
/// only when its similarity is strictly greater than each of theirs; it takes
/// the slot of the first box it replaces. Otherwise it is discarded.
pub fn keep_best_boxes<I>(candidates: I) -> Vec<MatchResult>
where
    I: IntoIterator<Item = MatchResult>,
{
    let mut best: Vec<MatchResult> = Vec::new();

    for candidate in candidates {
        let mut first_overlap = None;
        let mut beats_all = true;
        for (idx, kept) in best.iter().enumerate() {
            if kept.overlaps(&candidate) {
                first_overlap.get_or_insert(idx);
                if candidate.similarity <= kept.similarity {
                    beats_all = false;
                    break;
                }
            }
        }

        match first_overlap {
            None => best.push(candidate),
            Some(slot) if beats_all => {
                best[slot] = candidate;
                let mut idx = 0usize;
                best.retain(|kept| {
                    let keep = idx == slot || !kept.overlaps(&candidate);
                    idx += 1;
                    keep
                });
            }
            Some(_) => {}
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::keep_best_boxes;
    use crate::result::{MatchMethod, MatchResult};

    fn hit(x: i64, y: i64, similarity: f32) -> MatchResult {
        MatchResult::new(x, y, 10, 10, similarity, MatchMethod::CcoeffNormed)
    }

    #[test]
    fn higher_similarity_replaces_overlapping_box() {
        let out = keep_best_boxes([hit(0, 0, 0.91), hit(2, 1, 0.97)]);
        assert_eq!(out, vec![hit(2, 1, 0.97)]);
    }

    #[test]
    fn lower_similarity_overlap_is_discarded() {
        let out = keep_best_boxes([hit(2, 1, 0.97), hit(0, 0, 0.91)]);
        assert_eq!(out, vec![hit(2, 1, 0.97)]);
    }

    #[test]
    fn equal_similarity_does_not_replace() {
        let out = keep_best_boxes([hit(0, 0, 0.95), hit(1, 1, 0.95)]);
        assert_eq!(out, vec![hit(0, 0, 0.95)]);
    }

    #[test]
    fn disjoint_boxes_are_all_kept() {
        let out = keep_best_boxes([hit(0, 0, 0.9), hit(20, 0, 0.92), hit(0, 30, 0.93)]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn bridging_candidate_replaces_every_box_it_beats() {
        let out = keep_best_boxes([hit(0, 0, 0.90), hit(12, 0, 0.91), hit(6, 0, 0.99)]);
        assert_eq!(out, vec![hit(6, 0, 0.99)]);
    }

    #[test]
    fn bridging_candidate_loses_to_any_stronger_box() {
        let out = keep_best_boxes([hit(0, 0, 0.90), hit(12, 0, 0.995), hit(6, 0, 0.99)]);
        assert_eq!(out, vec![hit(0, 0, 0.90), hit(12, 0, 0.995)]);
    }
}
