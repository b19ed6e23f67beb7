//! Interpretation of gauge ranges against the latest observation.
//!
//! Documents describe runnability as a ladder of flow breakpoints, each
//! tagged with an index key (`R0`..`R9`) placing it on a ten-step scale.
//! How finely contributors fill that ladder varies per reach, so the stage
//! label is stratified by how many breakpoints exist and whether they sit
//! mostly low or high on the scale.

use itertools::Itertools;

/// One entry of the source's gauge-summary ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaugeRange {
    pub index_min: Option<String>,
    pub value_min: Option<f64>,
    pub index_max: Option<String>,
    pub value_max: Option<f64>,
}

/// One deduplicated flow breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub index: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBias {
    Low,
    Balanced,
    High,
}

/// Unique finite breakpoint values across all ranges, sorted ascending.
pub fn breakpoints(ranges: &[GaugeRange]) -> Vec<Breakpoint> {
    ranges
        .iter()
        .flat_map(|range| {
            [
                (range.index_min.clone(), range.value_min),
                (range.index_max.clone(), range.value_max),
            ]
        })
        .filter_map(|(index, value)| {
            let value = value.filter(|v| v.is_finite())?;
            Some(Breakpoint { index, value })
        })
        .sorted_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        })
        .dedup()
        .collect()
}

/// Whether the filled breakpoints sit mostly below or above the middle of
/// the ten-step index scale.
pub fn bias(breakpoints: &[Breakpoint]) -> RangeBias {
    let indices = breakpoints
        .iter()
        .filter_map(|bp| bp.index.as_deref())
        .filter_map(|key| key.trim_start_matches('R').parse::<u8>().ok());
    let (low, high) = indices.fold((0usize, 0usize), |(low, high), index| {
        if index <= 4 {
            (low + 1, high)
        } else {
            (low, high + 1)
        }
    });
    match low.cmp(&high) {
        std::cmp::Ordering::Greater => RangeBias::Low,
        std::cmp::Ordering::Less => RangeBias::High,
        std::cmp::Ordering::Equal => RangeBias::Balanced,
    }
}

/// Whether an observation falls in the runnable span of the ladder.
///
/// With two or more breakpoints the runnable span is the open interval
/// between the lowest and highest. A lone breakpoint is a floor when the
/// ladder is low-biased and a ceiling when it is high-biased.
pub fn runnable(ranges: &[GaugeRange], observation: f64) -> bool {
    let breakpoints = breakpoints(ranges);
    match breakpoints.as_slice() {
        [] => false,
        [only] => match bias(&breakpoints) {
            RangeBias::Low => observation > only.value,
            RangeBias::High => observation < only.value,
            RangeBias::Balanced => false,
        },
        [first, .., last] => first.value < observation && observation < last.value,
    }
}

/// Human-readable stage for the observation, or `None` when the ladder has
/// no interval for it (including an observation sitting exactly on a
/// breakpoint).
pub fn stage(ranges: &[GaugeRange], observation: Option<f64>) -> Option<&'static str> {
    let Some(observation) = observation else {
        return Some("no gauge reading");
    };
    let breakpoints = breakpoints(ranges);
    let (first, last) = match (breakpoints.first(), breakpoints.last()) {
        (Some(first), Some(last)) => (first.value, last.value),
        _ => return None,
    };
    let bias = bias(&breakpoints);

    if breakpoints.len() == 1 {
        let runnable = match bias {
            RangeBias::Low => observation > first,
            RangeBias::High => observation < first,
            RangeBias::Balanced => false,
        };
        if runnable {
            return Some("runnable");
        }
    }
    if observation < first {
        return Some("too low");
    }
    if observation > last {
        return Some("too high");
    }

    let labels = stage_labels(breakpoints.len(), bias)?;
    breakpoints
        .windows(2)
        .zip(labels)
        .find(|(window, _)| window[0].value < observation && observation < window[1].value)
        .map(|(_, label)| *label)
}

/// Interval labels for a ladder of `count` breakpoints. Odd counts read
/// differently depending on which end carries the extra detail; ladders the
/// contributors never produce have no labels.
fn stage_labels(count: usize, bias: RangeBias) -> Option<&'static [&'static str]> {
    use RangeBias::{High, Low};
    let labels: &'static [&'static str] = match (count, bias) {
        (2, _) => &["runnable"],
        (3, _) => &["lower runnable", "higher runnable"],
        (4, _) => &["low", "medium", "high"],
        (5, Low) => &["very low", "medium low", "medium", "high"],
        (5, High) => &["low", "medium", "medium high", "very high"],
        (6, _) => &["low", "medium low", "medium", "high medium", "high"],
        (7, Low) => &["very low", "low", "medium low", "medium", "high medium", "high"],
        (7, High) => &["low", "medium low", "medium", "high medium", "high", "very high"],
        (8, _) => &[
            "very low",
            "low",
            "medium low",
            "medium",
            "medium high",
            "high",
            "very high",
        ],
        (9, Low) => &[
            "extremely low",
            "very low",
            "low",
            "medium low",
            "medium",
            "medium high",
            "high",
            "very high",
        ],
        (9, High) => &[
            "very low",
            "low",
            "medium low",
            "medium",
            "medium high",
            "high",
            "very high",
            "extremely high",
        ],
        (10, _) => &[
            "extremely low",
            "very low",
            "low",
            "medium low",
            "medium",
            "medium high",
            "high",
            "very high",
            "extremely high",
        ],
        _ => return None,
    };
    Some(labels)
}
