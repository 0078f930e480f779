//! Aggressive keyword layer: densest start page up to the first hard stop.

use serde_json::json;
use tracing::debug;

use super::features::PageFeatures;
use crate::config::Thresholds;
use crate::models::{SpanMethod, SpanResult};

/// Weight of a strong (direct report vocabulary) hit against a soft one.
const STRONG_WEIGHT: i32 = 3;

pub(super) fn detect(features: &[PageFeatures], thresholds: &Thresholds) -> Option<SpanResult> {
    let (start, score) = features
        .iter()
        .enumerate()
        .map(|(i, f)| (i, f.start_score(STRONG_WEIGHT)))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;

    if score < thresholds.aggressive_start_score {
        debug!(
            "Aggressive start score {} on page {} below {}",
            score, start, thresholds.aggressive_start_score
        );
        return None;
    }

    // Only legally distinct documents stop the scan, never report vocabulary
    let hard_stop = features
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, f)| f.hard_stop())
        .map(|(i, _)| i);
    let end = match hard_stop {
        Some(stop) => stop - 1,
        None => features.len() - 1,
    };

    let pages = end + 1 - start;
    if pages < thresholds.min_span_pages || pages > thresholds.max_aggressive_window {
        debug!("Aggressive window {}..={} out of bounds ({} pages)", start, end, pages);
        return None;
    }

    Some(SpanResult {
        start,
        end,
        method: SpanMethod::AggressiveKeyword,
        confidence_meta: json!({
            "startScore": score,
            "hardStop": hard_stop,
        }),
    })
}
