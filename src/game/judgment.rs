/// Judgment recorded for a single replay input.
///
/// Codes on the wire are `0=Miss, 1=Perfect, 2=Great, 3=Good`; anything else
/// is carried through as `Unknown` rather than being coerced into a grade.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Judgment {
    Miss,
    Perfect,
    Great,
    Good,
    Unknown,
}

impl Judgment {
    pub const ALL_KNOWN: [Self; 4] = [Self::Perfect, Self::Great, Self::Good, Self::Miss];

    #[inline(always)]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Miss,
            1 => Self::Perfect,
            2 => Self::Great,
            3 => Self::Good,
            _ => Self::Unknown,
        }
    }

    pub const fn code(self) -> Option<i64> {
        match self {
            Self::Miss => Some(0),
            Self::Perfect => Some(1),
            Self::Great => Some(2),
            Self::Good => Some(3),
            Self::Unknown => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Miss => "Miss",
            Self::Perfect => "Perfect",
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct JudgmentCounts {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
}

impl JudgmentCounts {
    pub const fn get(&self, judgment: Judgment) -> u32 {
        match judgment {
            Judgment::Perfect => self.perfect,
            Judgment::Great => self.great,
            Judgment::Good => self.good,
            Judgment::Miss => self.miss,
            Judgment::Unknown => 0,
        }
    }

    pub const fn total(&self) -> u32 {
        self.perfect + self.great + self.good + self.miss
    }
}

/// Running combo and per-judgment counters for one playback run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct JudgmentState {
    pub combo: u32,
    pub max_combo: u32,
    pub counts: JudgmentCounts,
}

/// Applies one judgment to the running state.
///
/// Perfect and Great extend the combo. Miss and Good both reset it: this
/// ruleset treats Good as a combo break, unlike ITG-style scoring where the
/// third window keeps the combo alive. Unknown codes leave the state as is.
pub fn apply_judgment(state: &mut JudgmentState, judgment: Judgment) {
    match judgment {
        Judgment::Miss => {
            state.combo = 0;
            state.counts.miss = state.counts.miss.saturating_add(1);
        }
        Judgment::Perfect => {
            state.combo = state.combo.saturating_add(1);
            state.counts.perfect = state.counts.perfect.saturating_add(1);
        }
        Judgment::Great => {
            state.combo = state.combo.saturating_add(1);
            state.counts.great = state.counts.great.saturating_add(1);
        }
        Judgment::Good => {
            state.combo = 0;
            state.counts.good = state.counts.good.saturating_add(1);
        }
        Judgment::Unknown => {}
    }
    state.max_combo = state.max_combo.max(state.combo);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combo_trace_follows_transition_table() {
        let mut state = JudgmentState::default();
        let mut trace = Vec::new();
        for j in [
            Judgment::Perfect,
            Judgment::Perfect,
            Judgment::Miss,
            Judgment::Great,
        ] {
            apply_judgment(&mut state, j);
            trace.push(state.combo);
        }
        assert_eq!(trace, vec![1, 2, 0, 1]);
        assert_eq!(state.max_combo, 2);
        assert_eq!(
            state.counts,
            JudgmentCounts {
                perfect: 2,
                great: 1,
                good: 0,
                miss: 1,
            }
        );
    }

    #[test]
    fn good_breaks_combo() {
        let mut state = JudgmentState::default();
        apply_judgment(&mut state, Judgment::Great);
        apply_judgment(&mut state, Judgment::Great);
        apply_judgment(&mut state, Judgment::Good);
        assert_eq!(state.combo, 0);
        assert_eq!(state.max_combo, 2);
        assert_eq!(state.counts.good, 1);
    }

    #[test]
    fn unknown_judgment_changes_nothing() {
        let mut state = JudgmentState::default();
        apply_judgment(&mut state, Judgment::Perfect);
        let before = state;
        apply_judgment(&mut state, Judgment::Unknown);
        assert_eq!(state, before);
        assert_eq!(state.counts.total(), 1);
    }

    #[test]
    fn codes_map_to_kinds() {
        assert_eq!(Judgment::from_code(0), Judgment::Miss);
        assert_eq!(Judgment::from_code(1), Judgment::Perfect);
        assert_eq!(Judgment::from_code(2), Judgment::Great);
        assert_eq!(Judgment::from_code(3), Judgment::Good);
        assert_eq!(Judgment::from_code(4), Judgment::Unknown);
        assert_eq!(Judgment::from_code(-1), Judgment::Unknown);
        for j in Judgment::ALL_KNOWN {
            assert_eq!(j.code().map(Judgment::from_code), Some(j));
        }
        assert_eq!(Judgment::Unknown.code(), None);
    }
}
