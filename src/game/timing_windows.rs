// Accuracy windows drawn as the background bands of the accuracy bar.

use crate::game::judgment::Judgment;

// All windows are absolute offsets in seconds.
pub const PERFECT_WINDOW_S: f64 = 0.043;
pub const GREAT_WINDOW_S: f64 = 0.083;
pub const GOOD_WINDOW_S: f64 = 0.128;
pub const MISS_WINDOW_S: f64 = 0.130;

/// Default half-width of the accuracy bar (offsets beyond are clamped).
pub const ACCURACY_RANGE_S: f64 = 0.15;

#[inline(always)]
pub const fn windows_s() -> [(Judgment, f64); 4] {
    [
        (Judgment::Perfect, PERFECT_WINDOW_S),
        (Judgment::Great, GREAT_WINDOW_S),
        (Judgment::Good, GOOD_WINDOW_S),
        (Judgment::Miss, MISS_WINDOW_S),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_widen_outward() {
        let w = windows_s();
        assert_eq!(w[0], (Judgment::Perfect, 0.043));
        assert_eq!(w[3].0, Judgment::Miss);
        assert!(w.windows(2).all(|p| p[0].1 < p[1].1));
        assert!(MISS_WINDOW_S < ACCURACY_RANGE_S);
    }
}
