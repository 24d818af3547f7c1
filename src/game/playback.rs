use log::{debug, info, warn};
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;

use crate::core::clock::Clock;
use crate::game::fade::{ActiveMarker, DEFAULT_FADE_WINDOW_MS, FadeBuffer, MarkerView};
use crate::game::judgment::{JudgmentState, apply_judgment};
use crate::game::replay::{self, Diagnostic, LoadError, ReplayEvent, ReplaySession};
use crate::game::stage_stats::PlaybackSummary;
use crate::game::timing_stats::compute_timing_stats;
use crate::game::timing_windows::ACCURACY_RANGE_S;
use crate::ui::accuracy_bar::accuracy_to_position;
use crate::ui::color::color_for;

pub const DEFAULT_COMPLETION_BUFFER_S: f64 = 0.1;
pub const DEFAULT_CANVAS_WIDTH: f64 = 600.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    pub fade_window_ms: f64,
    pub accuracy_range_s: f64,
    pub completion_buffer_s: f64,
    pub canvas_width: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fade_window_ms: DEFAULT_FADE_WINDOW_MS,
            accuracy_range_s: ACCURACY_RANGE_S,
            completion_buffer_s: DEFAULT_COMPLETION_BUFFER_S,
            canvas_width: DEFAULT_CANVAS_WIDTH,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Running,
    /// Terminal until the next `start`.
    Finished,
}

/// Mutable state of one playback run. Reset on every start.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlaybackState {
    pub next_event_index: usize,
    pub judgments: JudgmentState,
    pub running: bool,
    pub wall_clock_start_ms: f64,
}

/// An event consumed during a tick, with the combo around it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DispatchRecord {
    pub event: ReplayEvent,
    pub combo_before: u32,
    pub combo_after: u32,
    pub max_combo: u32,
}

/// Everything the render callback needs for one frame.
#[derive(Debug)]
pub struct Frame<'a> {
    pub replay_time_s: f64,
    pub duration_s: f64,
    pub canvas_width: f64,
    pub accuracy_range_s: f64,
    pub markers: &'a [MarkerView],
    pub dispatched: &'a [DispatchRecord],
    pub judgments: JudgmentState,
    pub next_event_index: usize,
    pub total_events: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    Diagnostic(Diagnostic),
    Loaded { events: usize, duration_s: f64 },
    Started { events: usize },
    Finished(PlaybackSummary),
    Cancelled { replay_time_s: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    AlreadyRunning,
    EmptyReplay,
    NoSession,
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "Playback is already running"),
            Self::EmptyReplay => write!(f, "Replay has no events to play"),
            Self::NoSession => write!(f, "No replay loaded"),
        }
    }
}

impl std::error::Error for PlaybackError {}

pub type RenderFn = Box<dyn FnMut(&Frame<'_>)>;
pub type StatusFn = Box<dyn FnMut(&Status)>;

/// Frame-driven replay scheduler.
///
/// The host calls `tick` once per display refresh while `wants_frame` is
/// true. Nothing here blocks or spawns threads; cancellation is observed at
/// the next tick boundary because every call takes `&mut self`.
pub struct ReplayEngine<C: Clock> {
    clock: C,
    config: PlaybackConfig,
    phase: PlaybackPhase,
    session: Option<ReplaySession>,
    state: PlaybackState,
    fade: FadeBuffer,
    last_heartbeat_s: i64,
    render: Option<RenderFn>,
    status: Option<StatusFn>,
}

impl<C: Clock> ReplayEngine<C> {
    pub fn new(clock: C, config: PlaybackConfig) -> Self {
        Self {
            clock,
            config,
            phase: PlaybackPhase::Idle,
            session: None,
            state: PlaybackState::default(),
            fade: FadeBuffer::new(config.fade_window_ms),
            last_heartbeat_s: -1,
            render: None,
            status: None,
        }
    }

    pub fn on_frame(&mut self, render: impl FnMut(&Frame<'_>) + 'static) {
        self.render = Some(Box::new(render));
    }

    pub fn on_status(&mut self, status: impl FnMut(&Status) + 'static) {
        self.status = Some(Box::new(status));
    }

    pub const fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub const fn session(&self) -> Option<&ReplaySession> {
        self.session.as_ref()
    }

    /// Whether the host should schedule another tick.
    pub fn wants_frame(&self) -> bool {
        self.phase == PlaybackPhase::Running
    }

    fn emit(&mut self, status: Status) {
        if let Some(cb) = self.status.as_mut() {
            cb(&status);
        }
    }

    /// Replay time in seconds for the current run (0 when not running).
    pub fn replay_time_s(&self) -> f64 {
        if !self.state.running {
            return 0.0;
        }
        (self.clock.now_ms() - self.state.wall_clock_start_ms) / 1000.0
    }

    /// Parses a payload into a session. Any in-flight run is cancelled and
    /// the previous session dropped first, so a failed load leaves the
    /// engine `Idle` with nothing to start.
    pub fn load_session(&mut self, payload: &Value) -> Result<ReplaySession, LoadError> {
        self.cancel();
        self.session = None;
        self.phase = PlaybackPhase::Idle;

        let status = &mut self.status;
        let loaded = replay::load_session(payload, &mut |diag| {
            if let Some(cb) = status.as_mut() {
                cb(&Status::Diagnostic(diag));
            }
        });
        match loaded {
            Ok(session) => {
                self.emit(Status::Loaded {
                    events: session.events.len(),
                    duration_s: session.duration_s,
                });
                Ok(session)
            }
            Err(e) => {
                warn!("Replay load failed: {e}");
                Err(e)
            }
        }
    }

    /// Starts playback of `session` from event 0 and replay time 0.
    pub fn start(&mut self, session: ReplaySession) -> Result<(), PlaybackError> {
        if self.phase == PlaybackPhase::Running {
            return Err(PlaybackError::AlreadyRunning);
        }
        if session.events.is_empty() {
            return Err(PlaybackError::EmptyReplay);
        }
        let events = session.events.len();
        info!(
            "Starting playback of \"{}\" ({events} events, {:.2}s)",
            session.title().unwrap_or("untitled"),
            session.duration_s
        );
        self.session = Some(session);
        self.begin_run();
        self.emit(Status::Started { events });
        Ok(())
    }

    /// Cancels any in-flight run and plays the loaded session again from the top.
    pub fn restart(&mut self) -> Result<(), PlaybackError> {
        self.cancel();
        let Some(session) = self.session.take() else {
            return Err(PlaybackError::NoSession);
        };
        self.start(session)
    }

    fn begin_run(&mut self) {
        self.state = PlaybackState {
            running: true,
            wall_clock_start_ms: self.clock.now_ms(),
            ..PlaybackState::default()
        };
        self.fade = FadeBuffer::new(self.config.fade_window_ms);
        self.last_heartbeat_s = -1;
        self.phase = PlaybackPhase::Running;
    }

    /// Stops a running playback. In-flight state is discarded; a later
    /// `start` begins again at event 0. Returns false when not running.
    pub fn cancel(&mut self) -> bool {
        if self.phase != PlaybackPhase::Running {
            return false;
        }
        let replay_time_s = self.replay_time_s();
        self.phase = PlaybackPhase::Idle;
        self.state = PlaybackState::default();
        self.fade.clear();
        info!("Playback cancelled at {replay_time_s:.3}s");
        self.emit(Status::Cancelled { replay_time_s });
        true
    }

    /// Advances one frame: dispatches every due event in time order, prunes
    /// and renders the markers, then checks for completion.
    pub fn tick(&mut self) -> PlaybackPhase {
        if self.phase != PlaybackPhase::Running {
            return self.phase;
        }
        let Some(session) = self.session.as_ref() else {
            warn!("Tick while running without a session; returning to idle");
            self.phase = PlaybackPhase::Idle;
            self.state.running = false;
            return self.phase;
        };

        let now_ms = self.clock.now_ms();
        let replay_time_s = (now_ms - self.state.wall_clock_start_ms) / 1000.0;
        let cfg = self.config;

        let mut dispatched: SmallVec<[DispatchRecord; 8]> = SmallVec::new();
        while let Some(event) = session.events.get(self.state.next_event_index) {
            if event.time > replay_time_s {
                break;
            }
            let combo_before = self.state.judgments.combo;
            apply_judgment(&mut self.state.judgments, event.judgment);
            self.fade.insert(ActiveMarker {
                screen_x: accuracy_to_position(
                    event.accuracy,
                    cfg.canvas_width,
                    cfg.accuracy_range_s,
                ),
                color: color_for(event.judgment),
                spawn_ms: now_ms,
                judgment: event.judgment,
            });
            dispatched.push(DispatchRecord {
                event: *event,
                combo_before,
                combo_after: self.state.judgments.combo,
                max_combo: self.state.judgments.max_combo,
            });
            self.state.next_event_index += 1;
        }

        if !self.fade.is_empty() {
            self.fade.prune(now_ms);
        }
        let markers = self.fade.views(now_ms);
        let total_events = session.events.len();
        if let Some(render) = self.render.as_mut() {
            render(&Frame {
                replay_time_s,
                duration_s: session.duration_s,
                canvas_width: cfg.canvas_width,
                accuracy_range_s: cfg.accuracy_range_s,
                markers: &markers,
                dispatched: &dispatched,
                judgments: self.state.judgments,
                next_event_index: self.state.next_event_index,
                total_events,
            });
        }

        let whole_second = replay_time_s.floor() as i64;
        if whole_second > self.last_heartbeat_s {
            self.last_heartbeat_s = whole_second;
            debug!(
                "Time: {:.2}, Combo: {}, Dispatched: {}/{}, Markers: {}",
                replay_time_s,
                self.state.judgments.combo,
                self.state.next_event_index,
                total_events,
                self.fade.len()
            );
        }

        let all_dispatched = self.state.next_event_index >= total_events;
        if all_dispatched && replay_time_s >= session.duration_s + cfg.completion_buffer_s {
            let summary = PlaybackSummary {
                title: session.title().map(str::to_owned),
                judgments: self.state.judgments,
                timing: compute_timing_stats(&session.events[..self.state.next_event_index]),
                events_dispatched: self.state.next_event_index,
                total_events,
                replay_time_s,
                recorded: session.recorded_result.clone(),
            };
            self.phase = PlaybackPhase::Finished;
            self.state.running = false;
            info!(
                "Playback finished for \"{}\". Max Combo: {}.",
                summary.title.as_deref().unwrap_or("untitled"),
                summary.judgments.max_combo
            );
            self.emit(Status::Finished(summary));
        }
        self.phase
    }
}
