//! Scored-block layer: maximum-sum contiguous run of pages.

use serde_json::json;
use tracing::debug;

use super::features::PageFeatures;
use crate::config::Thresholds;
use crate::models::{SpanMethod, SpanResult};

pub(super) fn detect(features: &[PageFeatures], thresholds: &Thresholds) -> Option<SpanResult> {
    let mut best: Option<(i32, usize, usize)> = None;
    let mut run: Option<(usize, i32)> = None;
    let mut streak = 0;

    for (i, f) in features.iter().enumerate() {
        if f.has_signal() {
            streak = 0;
        } else {
            streak += 1;
            if streak >= thresholds.low_signal_streak {
                run = None;
                continue;
            }
        }

        let score = f.block_score();
        run = match run {
            None if score > 0 => Some((i, score)),
            None => None,
            Some((start, sum)) if sum + score > 0 => Some((start, sum + score)),
            Some(_) => None,
        };

        if let Some((start, sum)) = run {
            if best.map_or(true, |(b, _, _)| sum > b) {
                best = Some((sum, start, i));
            }
        }
    }

    let (total, start, end) = best?;
    if total < thresholds.min_block_total {
        debug!("Best block {}..={} sums to {} only", start, end, total);
        return None;
    }

    Some(SpanResult {
        start,
        end,
        method: SpanMethod::ScoredBlock,
        confidence_meta: json!({ "blockTotal": total }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(cue: usize, follow: usize) -> PageFeatures {
        PageFeatures {
            cue_hits: cue,
            follow_hits: follow,
            ..Default::default()
        }
    }

    #[test]
    fn test_picks_densest_block() {
        let mut features = vec![PageFeatures::default(); 4];
        features.extend([page(1, 2), page(0, 3), page(0, 3), page(1, 1)]);
        features.extend(vec![PageFeatures::default(); 5]);
        features.extend([page(1, 0)]);
        let span = detect(&features, &Thresholds::default()).unwrap();
        assert_eq!((span.start, span.end), (4, 7));
        assert_eq!(span.confidence_meta["blockTotal"], 13);
    }

    #[test]
    fn test_below_minimum_total() {
        let features = vec![page(1, 1), page(0, 2), PageFeatures::default()];
        assert!(detect(&features, &Thresholds::default()).is_none());
    }

    #[test]
    fn test_terminator_penalty_splits_blocks() {
        let terminator = PageFeatures {
            strong_terminator: true,
            soft_terminator: true,
            attachments_index: true,
            ..Default::default()
        };
        let features = vec![page(2, 3), terminator, page(2, 4), page(2, 4)];
        let span = detect(&features, &Thresholds::default()).unwrap();
        assert_eq!((span.start, span.end), (2, 3));
    }
}
