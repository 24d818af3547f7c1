use crate::game::judgment::Judgment;
use crate::game::replay::ReplayEvent;

/// Offset statistics in milliseconds over judged (non-miss) events.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TimingStats {
    pub mean_abs_ms: f64,
    pub mean_ms: f64,
    pub stddev_ms: f64,
    pub max_abs_ms: f64,
    pub count: usize,
}

#[inline(always)]
fn counts_toward_timing(e: &ReplayEvent) -> bool {
    !matches!(e.judgment, Judgment::Miss | Judgment::Unknown)
}

pub fn compute_timing_stats(events: &[ReplayEvent]) -> TimingStats {
    // First pass: sums and maxima
    let mut sum_abs = 0.0_f64;
    let mut sum_signed = 0.0_f64;
    let mut max_abs = 0.0_f64;
    let mut count: usize = 0;

    for e in events.iter().filter(|e| counts_toward_timing(e)) {
        let ms = e.accuracy * 1000.0;
        let a = ms.abs();
        sum_abs += a;
        sum_signed += ms;
        if a > max_abs {
            max_abs = a;
        }
        count += 1;
    }

    if count == 0 {
        return TimingStats::default();
    }

    let mean_ms = sum_signed / count as f64;
    let mean_abs_ms = sum_abs / count as f64;

    // Second pass: sample standard deviation of signed offsets
    let stddev_ms = if count > 1 {
        let sum_diff_sq: f64 = events
            .iter()
            .filter(|e| counts_toward_timing(e))
            .map(|e| {
                let d = e.accuracy * 1000.0 - mean_ms;
                d * d
            })
            .sum();
        (sum_diff_sq / (count as f64 - 1.0)).sqrt()
    } else {
        0.0
    };

    TimingStats {
        mean_abs_ms,
        mean_ms,
        stddev_ms,
        max_abs_ms: max_abs,
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(judgment: Judgment, accuracy: f64) -> ReplayEvent {
        ReplayEvent {
            index: 0,
            time: 0.0,
            judgment,
            accuracy,
        }
    }

    #[test]
    fn misses_are_excluded() {
        let events = [
            ev(Judgment::Perfect, 0.010),
            ev(Judgment::Great, -0.030),
            ev(Judgment::Miss, 0.140),
            ev(Judgment::Unknown, 0.5),
        ];
        let stats = compute_timing_stats(&events);
        assert_eq!(stats.count, 2);
        assert!((stats.mean_ms - -10.0).abs() < 1e-9);
        assert!((stats.mean_abs_ms - 20.0).abs() < 1e-9);
        assert!((stats.max_abs_ms - 30.0).abs() < 1e-9);
        // Sample stddev of [10, -30]: sqrt((20^2 + 20^2) / 1)
        assert!((stats.stddev_ms - 800.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn empty_input_is_default() {
        assert_eq!(compute_timing_stats(&[]), TimingStats::default());
        let one = compute_timing_stats(&[ev(Judgment::Good, 0.1)]);
        assert_eq!(one.count, 1);
        assert_eq!(one.stddev_ms, 0.0);
    }
}
