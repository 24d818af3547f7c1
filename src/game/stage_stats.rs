use crate::game::judgment::{Judgment, JudgmentState};
use crate::game::replay::RecordedResult;
use crate::game::timing_stats::TimingStats;

/// End-of-run report produced when playback reaches `Finished`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSummary {
    pub title: Option<String>,
    pub judgments: JudgmentState,
    pub timing: TimingStats,
    pub events_dispatched: usize,
    pub total_events: usize,
    pub replay_time_s: f64,
    pub recorded: Option<RecordedResult>,
}

/// One counter where the live replay disagrees with the stored result.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CountMismatch {
    pub label: &'static str,
    pub live: u32,
    pub recorded: u32,
}

impl PlaybackSummary {
    /// Compares live counters with the recorded result block, if any.
    /// An empty list means the replay reproduced the stored result.
    pub fn mismatches(&self) -> Vec<CountMismatch> {
        let Some(rec) = self.recorded.as_ref() else {
            return Vec::new();
        };
        let counts = &self.judgments.counts;
        let pairs = [
            (Judgment::Perfect.label(), counts.get(Judgment::Perfect), rec.perfect),
            (Judgment::Great.label(), counts.get(Judgment::Great), rec.great),
            (Judgment::Good.label(), counts.get(Judgment::Good), rec.good),
            (Judgment::Miss.label(), counts.get(Judgment::Miss), rec.miss),
            ("Max Combo", self.judgments.max_combo, rec.combo),
        ];
        pairs
            .into_iter()
            .filter(|(_, live, recorded)| live != recorded)
            .map(|(label, live, recorded)| CountMismatch {
                label,
                live,
                recorded,
            })
            .collect()
    }
}
