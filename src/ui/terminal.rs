use crate::game::judgment::Judgment;
use crate::game::playback::{DispatchRecord, Frame};
use crate::game::replay::ReplaySession;
use crate::game::stage_stats::PlaybackSummary;
use crate::ui::accuracy_bar::{MARKER_BASE_ALPHA, background_bands, marker_style};
use crate::ui::color::{self, BAR_BACKGROUND_RGBA, CENTER_LINE_RGBA, Rgba, blend_over, to_rgb8};
use std::fmt::Write as _;

const RESET: &str = "\x1b[0m";

pub const DISPATCH_HEADER: &str =
    "Idx | Time    | Judg Value | Judgment | Accuracy | Combo Before | Combo After | Max Combo";
pub const DISPATCH_RULE: &str =
    "----|---------|------------|----------|----------|--------------|-------------|-----------";

#[derive(Copy, Clone, Debug)]
struct Cell {
    glyph: char,
    fg: Rgba,
    bg: Rgba,
}

#[inline(always)]
fn column_of(x: f64, canvas_width: f64, columns: usize) -> usize {
    if canvas_width <= 0.0 || columns == 0 {
        return 0;
    }
    let col = (x / canvas_width * columns as f64).floor();
    (col.max(0.0) as usize).min(columns - 1)
}

const fn plain_band_glyph(judgment: Judgment) -> char {
    match judgment {
        Judgment::Perfect => '=',
        Judgment::Great => '-',
        Judgment::Good => '.',
        Judgment::Miss | Judgment::Unknown => ' ',
    }
}

const fn plain_marker_glyph(judgment: Judgment) -> char {
    match judgment {
        Judgment::Perfect => 'P',
        Judgment::Great => 'G',
        Judgment::Good => 'o',
        Judgment::Miss => 'X',
        Judgment::Unknown => '?',
    }
}

fn marker_glyph(judgment: Judgment) -> char {
    let style = marker_style(judgment);
    if style.glow > 0.0 {
        '┃'
    } else if style.line_width < 2.0 {
        '╎'
    } else {
        '│'
    }
}

fn bar_cells(frame: &Frame<'_>, columns: usize, color: bool) -> Vec<Cell> {
    if columns == 0 {
        return Vec::new();
    }
    let bands = background_bands(frame.canvas_width, frame.accuracy_range_s);
    let mut cells: Vec<Cell> = (0..columns)
        .map(|col| {
            let x = (col as f64 + 0.5) / columns as f64 * frame.canvas_width;
            let mut bg = BAR_BACKGROUND_RGBA;
            let mut glyph = ' ';
            for band in &bands {
                if x >= band.x0 && x <= band.x1 {
                    bg = blend_over(band.color, bg);
                    glyph = plain_band_glyph(band.judgment);
                }
            }
            Cell {
                glyph: if color { ' ' } else { glyph },
                fg: bg,
                bg,
            }
        })
        .collect();

    let center = &mut cells[columns / 2];
    center.glyph = '|';
    center.fg = blend_over(CENTER_LINE_RGBA, center.bg);

    // Oldest first, so the newest marker in a cell wins.
    for m in frame.markers {
        let col = column_of(m.screen_x, frame.canvas_width, columns);
        let cell = &mut cells[col];
        let mut c = m.color;
        c[3] = (m.opacity * MARKER_BASE_ALPHA) as f32;
        cell.fg = blend_over(c, cell.bg);
        cell.glyph = if color {
            marker_glyph(m.judgment)
        } else {
            plain_marker_glyph(m.judgment)
        };
    }
    cells
}

/// One line showing the accuracy bar followed by the playback clock and combo.
pub fn render_frame_line(frame: &Frame<'_>, columns: usize, color: bool) -> String {
    let cells = bar_cells(frame, columns, color);
    let mut out = String::with_capacity(columns * 24 + 64);
    out.push('[');
    for cell in &cells {
        if color {
            let (fr, fg, fb) = to_rgb8(cell.fg);
            let (br, bgc, bb) = to_rgb8(cell.bg);
            let _ = write!(
                out,
                "\x1b[38;2;{fr};{fg};{fb}m\x1b[48;2;{br};{bgc};{bb}m{}",
                cell.glyph
            );
        } else {
            out.push(cell.glyph);
        }
    }
    if color {
        out.push_str(RESET);
    }
    let _ = write!(
        out,
        "] {:>7.2}s / {:.2}s  Combo {:>4}  Max {:>4}  {}/{}",
        frame.replay_time_s,
        frame.duration_s,
        frame.judgments.combo,
        frame.judgments.max_combo,
        frame.next_event_index,
        frame.total_events
    );
    out
}

pub fn format_dispatch_row(rec: &DispatchRecord) -> String {
    let code = rec
        .event
        .judgment
        .code()
        .map_or_else(|| "-".to_string(), |c| c.to_string());
    format!(
        "{:<3} | {:<7.3} | {:<10} | {:<8} | {:+8.4} | {:<12} | {:<11} | {:<9}",
        rec.event.index,
        rec.event.time,
        code,
        rec.event.judgment.label(),
        rec.event.accuracy,
        rec.combo_before,
        rec.combo_after,
        rec.max_combo
    )
}

pub fn format_header(session: &ReplaySession) -> String {
    let mut out = String::new();
    if let Some(meta) = session.metadata.as_ref() {
        let _ = writeln!(
            out,
            "{} [{}] Lv.{}  Mods: {}",
            meta.title.as_deref().unwrap_or("Untitled"),
            meta.difficulty.as_deref().unwrap_or("?"),
            meta.display_rating(),
            meta.display_mods()
        );
    }
    if let Some(at) = session.recorded_at {
        let _ = writeln!(out, "Recorded: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    let _ = write!(
        out,
        "--- Replay (Duration: {:.2}s, {} events) ---",
        session.duration_s,
        session.events.len()
    );
    out
}

pub fn format_summary(summary: &PlaybackSummary, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Replay Finished ---");
    for j in Judgment::ALL_KNOWN {
        let label = if color {
            let (r, g, b) = to_rgb8(color::color_for(j));
            format!("\x1b[38;2;{r};{g};{b}m{:<8}{RESET}", j.label())
        } else {
            format!("{:<8}", j.label())
        };
        let _ = writeln!(out, "{label} {:>5}", summary.judgments.counts.get(j));
    }
    let _ = writeln!(out, "Max Combo (Live Calc): {}", summary.judgments.max_combo);
    let _ = writeln!(
        out,
        "Events: {}/{}  Judged: {}  Replay Time: {:.2}s",
        summary.events_dispatched,
        summary.total_events,
        summary.judgments.counts.total(),
        summary.replay_time_s
    );
    let t = &summary.timing;
    if t.count > 0 {
        let _ = writeln!(
            out,
            "Timing: mean {:+.1}ms  mean |err| {:.1}ms  stddev {:.1}ms  max |err| {:.1}ms",
            t.mean_ms, t.mean_abs_ms, t.stddev_ms, t.max_abs_ms
        );
    }
    match summary.recorded.as_ref() {
        None => {
            let _ = write!(out, "No final result block found in replay data.");
        }
        Some(rec) => {
            if !rec.grade.is_empty() {
                let _ = writeln!(
                    out,
                    "Recorded grade: {} ({:.2}%)",
                    rec.grade,
                    rec.accuracy_percent()
                );
            }
            let diffs = summary.mismatches();
            if diffs.is_empty() {
                let _ = write!(out, "Live counters match the recorded result.");
            } else {
                for (i, d) in diffs.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    let _ = write!(
                        out,
                        "Mismatch {}: live {} vs recorded {}",
                        d.label, d.live, d.recorded
                    );
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fade::MarkerView;
    use crate::game::judgment::JudgmentState;
    use crate::game::replay::{RecordedResult, ReplayEvent};
    use crate::game::timing_stats::TimingStats;

    fn frame<'a>(markers: &'a [MarkerView]) -> Frame<'a> {
        Frame {
            replay_time_s: 1.5,
            duration_s: 3.0,
            canvas_width: 40.0,
            accuracy_range_s: 0.15,
            markers,
            dispatched: &[],
            judgments: JudgmentState::default(),
            next_event_index: 2,
            total_events: 5,
        }
    }

    #[test]
    fn plain_bar_shows_center_and_markers() {
        let markers = [
            MarkerView {
                screen_x: 0.0,
                color: color::color_for(Judgment::Miss),
                judgment: Judgment::Miss,
                opacity: 1.0,
            },
            MarkerView {
                screen_x: 40.0,
                color: color::color_for(Judgment::Good),
                judgment: Judgment::Good,
                opacity: 0.3,
            },
        ];
        let line = render_frame_line(&frame(&markers), 20, false);
        let bar: Vec<char> = line.chars().skip(1).take(20).collect();
        assert_eq!(bar[0], 'X');
        assert_eq!(bar[19], 'o');
        assert_eq!(bar[10], '|');
        assert!(bar.contains(&'='));
        assert!(line.contains("1.50s / 3.00s"));
        assert!(line.ends_with("2/5"));
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn colored_bar_emits_truecolor_and_resets() {
        let line = render_frame_line(&frame(&[]), 10, true);
        assert!(line.contains("\x1b[48;2;"));
        assert!(line.contains(RESET));
    }

    #[test]
    fn zero_width_bar_still_renders_counters() {
        let markers = [MarkerView {
            screen_x: 12.0,
            color: color::color_for(Judgment::Perfect),
            judgment: Judgment::Perfect,
            opacity: 1.0,
        }];
        let line = render_frame_line(&frame(&markers), 0, true);
        assert!(line.starts_with("[\x1b[0m]"));
        assert!(line.ends_with("2/5"));
        assert!(render_frame_line(&frame(&markers), 0, false).starts_with("[]"));
    }

    #[test]
    fn recorded_accuracy_is_shown_as_percentage() {
        let summary = PlaybackSummary {
            title: None,
            judgments: JudgmentState::default(),
            timing: TimingStats::default(),
            events_dispatched: 0,
            total_events: 0,
            replay_time_s: 0.0,
            recorded: Some(RecordedResult {
                grade: "A".to_string(),
                accuracy: 985_432.0,
                ..Default::default()
            }),
        };
        let text = format_summary(&summary, false);
        assert!(text.contains("Recorded grade: A (98.54%)"), "{text}");
    }

    #[test]
    fn column_mapping_clamps_edges() {
        assert_eq!(column_of(0.0, 60.0, 30), 0);
        assert_eq!(column_of(60.0, 60.0, 30), 29);
        assert_eq!(column_of(30.0, 60.0, 30), 15);
        assert_eq!(column_of(10.0, 0.0, 30), 0);
    }

    #[test]
    fn dispatch_row_matches_table_layout() {
        let rec = DispatchRecord {
            event: ReplayEvent {
                index: 7,
                time: 1.25,
                judgment: Judgment::Great,
                accuracy: -0.0512,
            },
            combo_before: 3,
            combo_after: 4,
            max_combo: 9,
        };
        let row = format_dispatch_row(&rec);
        assert_eq!(
            row,
            "7   | 1.250   | 2          | Great    |  -0.0512 | 3            | 4           | 9        "
        );
    }

    #[test]
    fn summary_reports_mismatches() {
        let mut judgments = JudgmentState::default();
        judgments.counts.perfect = 2;
        judgments.max_combo = 2;
        let summary = PlaybackSummary {
            title: None,
            judgments,
            timing: TimingStats::default(),
            events_dispatched: 2,
            total_events: 2,
            replay_time_s: 3.1,
            recorded: Some(RecordedResult {
                perfect: 3,
                combo: 2,
                ..Default::default()
            }),
        };
        let text = format_summary(&summary, false);
        assert!(text.contains("Max Combo (Live Calc): 2"));
        assert!(text.contains("Mismatch Perfect: live 2 vs recorded 3"));
        assert!(!text.contains("Timing:"));
    }
}
