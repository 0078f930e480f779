//! Anchor layer: strict title start, TOC gating, forward extension.

use serde_json::json;
use tracing::debug;

use super::features::PageFeatures;
use crate::config::Thresholds;
use crate::models::{SpanMethod, SpanResult};

/// Ranking bonus for a candidate carrying a strict title.
const STRICT_TITLE_BONUS: usize = 10;

/// Forward keyword density from `start` over the lookahead window. Vendor
/// template pages count once each.
fn forward_density(features: &[PageFeatures], start: usize, lookahead: usize) -> usize {
    features
        .iter()
        .skip(start)
        .take(lookahead)
        .map(|f| f.cue_hits + f.follow_hits + usize::from(f.vendor_boilerplate))
        .sum()
}

/// Extend a span from `start` until a terminator or a low-signal streak.
///
/// Returns the inclusive end index.
pub(super) fn extend_forward(features: &[PageFeatures], start: usize, streak_limit: usize) -> usize {
    let mut end = start;
    let mut streak = 0;
    for (i, f) in features.iter().enumerate().skip(start + 1) {
        if f.ends_report() {
            debug!("Span ends before page {} (terminator)", i);
            return i - 1;
        }
        if f.has_signal() {
            streak = 0;
        } else {
            streak += 1;
            if streak >= streak_limit {
                debug!("Span ends at low-signal streak before page {}", i + 1 - streak);
                return i - streak;
            }
        }
        end = i;
    }
    end
}

pub(super) fn detect(
    features: &[PageFeatures],
    toc_index: Option<usize>,
    thresholds: &Thresholds,
) -> Option<SpanResult> {
    let mut candidates: Vec<usize> = features
        .iter()
        .enumerate()
        .filter(|(_, f)| f.strict_title)
        .map(|(i, _)| i)
        .collect();
    if let Some(gate) = toc_index {
        candidates.retain(|&i| i >= gate);
        if !candidates.contains(&gate) {
            candidates.push(gate);
        }
    }

    let (start, rank) = candidates
        .iter()
        .map(|&i| {
            let bonus = if features[i].strict_title {
                STRICT_TITLE_BONUS
            } else {
                0
            };
            (i, forward_density(features, i, thresholds.anchor_lookahead) + bonus)
        })
        // Highest rank wins; ties go to the earliest page
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;

    let end = extend_forward(features, start, thresholds.low_signal_streak);
    let pages = end + 1 - start;
    if pages < thresholds.min_span_pages {
        debug!(
            "Anchor span {}..={} too short ({} pages)",
            start, end, pages
        );
        return None;
    }

    Some(SpanResult {
        start,
        end,
        method: SpanMethod::Anchor,
        confidence_meta: json!({
            "candidates": candidates,
            "rank": rank,
            "tocGate": toc_index,
            "strictTitle": features[start].strict_title,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> PageFeatures {
        PageFeatures {
            follow_hits: 2,
            ..Default::default()
        }
    }

    fn title() -> PageFeatures {
        PageFeatures {
            cue_hits: 2,
            strict_title: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_low_signal_streak_backs_off() {
        let mut features = vec![title(), signal(), signal(), signal(), signal()];
        features.extend(std::iter::repeat(PageFeatures::default()).take(5));
        assert_eq!(extend_forward(&features, 0, 4), 4);
    }

    #[test]
    fn test_streak_shorter_than_limit_is_bridged() {
        let mut features = vec![title(), signal(), PageFeatures::default(), signal()];
        features.extend(std::iter::repeat(PageFeatures::default()).take(4));
        assert_eq!(extend_forward(&features, 0, 4), 3);
    }

    #[test]
    fn test_toc_gate_excludes_earlier_titles() {
        let mut features = vec![title(), signal(), signal(), signal()];
        features.push(PageFeatures::default());
        features.extend([title(), signal(), signal(), signal(), signal()]);
        let thresholds = Thresholds::default();

        let ungated = detect(&features, None, &thresholds).unwrap();
        assert_eq!(ungated.start, 0);

        let gated = detect(&features, Some(5), &thresholds).unwrap();
        assert_eq!((gated.start, gated.end), (5, 9));
    }

    #[test]
    fn test_too_short_is_rejected() {
        let features = vec![title(), signal(), PageFeatures {
            strong_terminator: true,
            ..Default::default()
        }];
        assert!(detect(&features, None, &Thresholds::default()).is_none());
    }
}
