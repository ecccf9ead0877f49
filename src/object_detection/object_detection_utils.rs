use crate::annotations::detection::DetectionCandidate;
use itertools::Itertools;

/// Non maxmimum suppression is a way of removing duplicate detections.
///
/// Candidates are visited from most to least confident (equal confidences keep their original
/// order). Each candidate that is still alive suppresses every later candidate whose box has an
/// IoU of at least `iou_threshold` with its own. Returns the indices of the survivors, most
/// confident first.
///
/// All candidates are assumed to be of the same class.
pub fn non_maximum_suppression(
    candidates: &[DetectionCandidate],
    iou_threshold: f32,
) -> Vec<usize> {
    let order: Vec<usize> = (0..candidates.len())
        .sorted_by(|&a, &b| {
            candidates[b]
                .confidence
                .total_cmp(&candidates[a].confidence)
        })
        .collect();
    let mut suppressed: Vec<bool> = vec![false; order.len()];
    let mut keep: Vec<usize> = Vec::new();
    for (current_rank, &current_index) in order.iter().enumerate() {
        if suppressed[current_rank] {
            continue;
        }
        keep.push(current_index);
        let current_rect = &candidates[current_index].rect;
        for (other_rank, &other_index) in order.iter().enumerate().skip(current_rank + 1) {
            if suppressed[other_rank] {
                continue;
            }
            let iou = current_rect.intersection_over_union(&candidates[other_index].rect);
            if iou >= iou_threshold {
                suppressed[other_rank] = true;
            }
        }
    }
    keep
}

/// Returns the index of the most confident candidate among `indices`.
///
/// The first index seen wins ties: only a strictly greater confidence replaces the current
/// best.
pub fn select_most_confident(
    indices: &[usize],
    candidates: &[DetectionCandidate],
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for &index in indices {
        let confidence = candidates[index].confidence;
        match best {
            Some((_, best_confidence)) if confidence <= best_confidence => {}
            _ => best = Some((index, confidence)),
        }
    }
    best.map(|(index, _)| index)
}

/// Suppresses duplicate candidates and picks the single best survivor.
///
/// `None` means the target was not found in the image.
pub fn suppress_and_select(
    candidates: &[DetectionCandidate],
    nms_threshold: f32,
) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let indices = non_maximum_suppression(candidates, nms_threshold);
    select_most_confident(&indices, candidates)
}
