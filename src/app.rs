use crate::config;
use crate::core::clock::{Clock, SystemClock};
use crate::game::playback::{Frame, PlaybackPhase, ReplayEngine, Status};
use crate::game::replay;
use crate::game::stage_stats::PlaybackSummary;
use crate::ui::terminal;

use log::{info, warn};
use std::cell::RefCell;
use std::error::Error;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/* -------------------- runaway guard -------------------- */
/// Playback is abandoned once replay time is both past twice the duration
/// and more than this many seconds past it.
const RUNAWAY_SLACK_S: f64 = 10.0;

#[inline(always)]
fn is_runaway(replay_time_s: f64, duration_s: f64) -> bool {
    replay_time_s > duration_s * 2.0 && replay_time_s > duration_s + RUNAWAY_SLACK_S
}

/* -------------------- host-side status collection -------------------- */
#[derive(Default)]
struct HostState {
    warnings: usize,
    summary: Option<PlaybackSummary>,
    cancelled_at: Option<f64>,
    /// First failed write to the output; playback stops once set.
    write_error: Option<String>,
}

#[derive(Copy, Clone)]
struct FrameOutput {
    columns: usize,
    color: bool,
    show_event_log: bool,
}

fn write_frame(out: &mut impl Write, frame: &Frame<'_>, opts: FrameOutput) -> std::io::Result<()> {
    let clear = if opts.color { "\r\x1b[2K" } else { "\r" };
    if opts.show_event_log {
        for rec in frame.dispatched {
            writeln!(out, "{clear}{}", terminal::format_dispatch_row(rec))?;
        }
    }
    write!(
        out,
        "{clear}{}",
        terminal::render_frame_line(frame, opts.columns, opts.color)
    )?;
    out.flush()
}

/// Ticks until the run leaves `Running`, the runaway guard trips or the
/// output goes away.
fn drive<C: Clock>(
    engine: &mut ReplayEngine<C>,
    host: &RefCell<HostState>,
    duration_s: f64,
    interval: Duration,
) -> PlaybackPhase {
    while engine.wants_frame() {
        if engine.tick() != PlaybackPhase::Running {
            break;
        }
        let write_error = host.borrow().write_error.clone();
        if let Some(e) = write_error {
            warn!("Output closed ({e}), stopping playback");
            engine.cancel();
            break;
        }
        let t = engine.replay_time_s();
        if is_runaway(t, duration_s) {
            warn!(
                "Real time significantly exceeds replay duration ({t:.2}s) after {} events, stopping",
                engine.state().next_event_index
            );
            engine.cancel();
            break;
        }
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
    engine.phase()
}

pub fn run(path: &Path) -> Result<(), Box<dyn Error>> {
    let cfg = config::get();
    let payload = replay::read_payload(path)?;

    let host = Rc::new(RefCell::new(HostState::default()));
    let mut engine = ReplayEngine::new(SystemClock::new(), cfg.playback_config());
    {
        let host = Rc::clone(&host);
        engine.on_status(move |status| {
            let mut h = host.borrow_mut();
            match status {
                Status::Diagnostic(_) => h.warnings += 1,
                Status::Finished(summary) => h.summary = Some(summary.clone()),
                Status::Cancelled { replay_time_s } => h.cancelled_at = Some(*replay_time_s),
                Status::Loaded { .. } | Status::Started { .. } => {}
            }
        });
    }

    let session = engine.load_session(&payload)?;
    println!("{}", terminal::format_header(&session));
    let warnings = host.borrow().warnings;
    if warnings > 0 {
        println!("Loaded with {warnings} warning(s); see the log for details.");
    }
    if cfg.show_event_log {
        println!("{}", terminal::DISPATCH_HEADER);
        println!("{}", terminal::DISPATCH_RULE);
    }

    let opts = FrameOutput {
        columns: usize::from(cfg.canvas_width),
        color: cfg.color,
        show_event_log: cfg.show_event_log,
    };
    {
        let host = Rc::clone(&host);
        engine.on_frame(move |frame| {
            if host.borrow().write_error.is_some() {
                return;
            }
            if let Err(e) = write_frame(&mut std::io::stdout().lock(), frame, opts) {
                host.borrow_mut().write_error = Some(e.to_string());
            }
        });
    }

    let duration_s = session.duration_s;
    engine.start(session)?;
    let interval = cfg.frame_interval();
    info!(
        "Driving playback at {} fps from '{}'",
        cfg.frame_rate,
        path.display()
    );

    let mut plays_left = cfg.repeat;
    loop {
        let phase = drive(&mut engine, &host, duration_s, interval);
        if host.borrow().write_error.is_some() {
            break;
        }
        println!();

        let mut h = host.borrow_mut();
        if let Some(summary) = h.summary.take() {
            println!("{}", terminal::format_summary(&summary, opts.color));
        } else if let Some(at) = h.cancelled_at.take() {
            println!("--- Playback stopped at {at:.2}s ---");
        }
        drop(h);

        if phase != PlaybackPhase::Finished || plays_left == 0 {
            break;
        }
        plays_left -= 1;
        let title = engine.session().and_then(|s| s.title()).unwrap_or("untitled");
        println!("--- Repeating \"{title}\" ({plays_left} left) ---");
        engine.restart()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::game::judgment::Judgment;
    use crate::game::playback::PlaybackConfig;
    use serde_json::json;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    const PLAIN: FrameOutput = FrameOutput {
        columns: 20,
        color: false,
        show_event_log: true,
    };

    fn loaded_engine(clock: &ManualClock) -> ReplayEngine<ManualClock> {
        let mut engine = ReplayEngine::new(clock.clone(), PlaybackConfig::default());
        let session = engine
            .load_session(&json!({
                "duration": 60.0,
                "inputs": { "time": [0.0, 30.0], "judgment": [1, 2], "accuracy": [0.0, 0.01] }
            }))
            .unwrap();
        engine.start(session).unwrap();
        engine
    }

    #[test]
    fn runaway_needs_both_conditions() {
        assert!(!is_runaway(5.0, 3.0));
        assert!(is_runaway(13.5, 3.0));
        assert!(!is_runaway(45.0, 40.0));
        assert!(is_runaway(81.0, 40.0));
        assert!(is_runaway(10.5, 0.0));
    }

    #[test]
    fn frame_writes_rows_then_bar() {
        let clock = ManualClock::new();
        let mut engine = loaded_engine(&clock);
        let written = Rc::new(RefCell::new(Vec::<u8>::new()));
        let sink = Rc::clone(&written);
        engine.on_frame(move |frame| {
            write_frame(&mut *sink.borrow_mut(), frame, PLAIN).unwrap();
        });
        engine.tick();

        let text = String::from_utf8(written.borrow().clone()).unwrap();
        let rows: Vec<&str> = text.split('\n').collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains(Judgment::Perfect.label()));
        assert!(rows[1].starts_with("\r["));
        assert!(text.ends_with("1/2"));
    }

    #[test]
    fn closed_output_cancels_playback() {
        let clock = ManualClock::new();
        let mut engine = loaded_engine(&clock);
        let host = Rc::new(RefCell::new(HostState::default()));
        {
            let host = Rc::clone(&host);
            engine.on_status(move |status| {
                if let Status::Cancelled { replay_time_s } = status {
                    host.borrow_mut().cancelled_at = Some(*replay_time_s);
                }
            });
        }
        {
            let host = Rc::clone(&host);
            engine.on_frame(move |frame| {
                if let Err(e) = write_frame(&mut ClosedPipe, frame, PLAIN) {
                    host.borrow_mut().write_error.get_or_insert(e.to_string());
                }
            });
        }

        let phase = drive(&mut engine, &host, 60.0, Duration::ZERO);
        assert_eq!(phase, PlaybackPhase::Idle);
        assert!(!engine.wants_frame());
        let h = host.borrow();
        assert!(h.write_error.is_some());
        assert_eq!(h.cancelled_at, Some(0.0));
    }

    #[test]
    fn finished_run_restarts_from_the_top() {
        let clock = ManualClock::new();
        let mut engine = loaded_engine(&clock);
        let host = RefCell::new(HostState::default());
        clock.set_ms(60_500.0);
        assert_eq!(
            drive(&mut engine, &host, 60.0, Duration::ZERO),
            PlaybackPhase::Finished
        );
        assert_eq!(engine.state().judgments.max_combo, 2);

        engine.restart().unwrap();
        assert_eq!(engine.phase(), PlaybackPhase::Running);
        assert_eq!(engine.state().next_event_index, 0);
        assert_eq!(engine.session().and_then(|s| s.title()), None);
    }
}
