use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::game::delta::{decode_delta, json_kind, value_as_f64};
use crate::game::judgment::Judgment;

/// One judged input, immutable once built. `index` is the position in the
/// recorded arrays before sorting.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReplayEvent {
    pub index: usize,
    pub time: f64,
    pub judgment: Judgment,
    pub accuracy: f64,
}

/// A loaded replay, ready to hand to the scheduler. Replaced wholesale on
/// every load; events are sorted by time (stable).
#[derive(Clone, Debug)]
pub struct ReplaySession {
    pub events: Vec<ReplayEvent>,
    pub duration_s: f64,
    pub metadata: Option<ReplayMetadata>,
    pub recorded_result: Option<RecordedResult>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl ReplaySession {
    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title.as_deref())
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ReplayMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "mod")]
    mods: Option<ModList>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum ModList {
    Many(Vec<String>),
    One(String),
}

impl ReplayMetadata {
    pub fn mods(&self) -> Vec<&str> {
        match &self.mods {
            Some(ModList::Many(v)) => v.iter().map(String::as_str).collect(),
            Some(ModList::One(s)) if !s.is_empty() => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn display_mods(&self) -> String {
        let mods = self.mods();
        if mods.is_empty() {
            "NO-MOD".to_string()
        } else {
            mods.join(", ")
        }
    }

    pub fn display_rating(&self) -> String {
        match &self.rating {
            None | Some(Value::Null) => "N/A".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
        }
    }
}

/// Result block stored alongside the recording by the game client.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordedResult {
    pub grade: String,
    pub accuracy: f64,
    pub combo: u32,
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
    pub total_count: u32,
}

/// Full score for the stored `accuracy` field.
pub const ACCURACY_SCORE_MAX: f64 = 1_000_000.0;

impl RecordedResult {
    /// Stored accuracy is a score out of 1,000,000; this is the percentage.
    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy / ACCURACY_SCORE_MAX * 100.0
    }
}

/// Non-fatal problems found while loading. Processing continues with
/// best-effort data after each of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    SkippedDelta {
        index: usize,
        raw: String,
    },
    LengthMismatch {
        times: usize,
        judgments: usize,
        accuracies: usize,
    },
    UnknownJudgment {
        index: usize,
        raw: String,
    },
    InvalidAccuracy {
        index: usize,
        raw: String,
    },
    NegativeDuration {
        raw: f64,
    },
    MultipleReplays {
        count: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkippedDelta { index, raw } => {
                write!(f, "Skipping non-numeric delta {raw} at index {index}")
            }
            Self::LengthMismatch {
                times,
                judgments,
                accuracies,
            } => {
                let n = (*times).min(*judgments).min(*accuracies);
                write!(
                    f,
                    "Data array length mismatch! T:{times}, J:{judgments}, A:{accuracies}. Truncating to {n}."
                )
            }
            Self::UnknownJudgment { index, raw } => {
                write!(f, "Unknown judgment code {raw} at index {index}")
            }
            Self::InvalidAccuracy { index, raw } => {
                write!(f, "Non-numeric accuracy {raw} at index {index}; using 0")
            }
            Self::NegativeDuration { raw } => {
                write!(f, "Negative duration {raw}; clamping to 0")
            }
            Self::MultipleReplays { count } => {
                write!(f, "{count} replay objects found; using the first one")
            }
        }
    }
}

/// Fatal load failures. Loading stops and no session is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// A field that must be an array (or the payload itself) has the wrong shape.
    InvalidFormat(&'static str),
    /// No events survive decoding and truncation.
    EmptyReplay,
    MissingField(&'static str),
    MissingDuration,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(field) => write!(f, "Invalid format for '{field}' in replay"),
            Self::EmptyReplay => write!(f, "No consistent event data in replay"),
            Self::MissingField(field) => write!(f, "Replay is missing '{field}'"),
            Self::MissingDuration => write!(f, "Replay is missing 'duration'"),
        }
    }
}

impl std::error::Error for ReplayError {}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Replay(ReplayError),
    Io(String),
    Json(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replay(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "Failed to read replay file: {e}"),
            Self::Json(e) => write!(f, "Failed to parse replay JSON: {e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Replay(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReplayError> for LoadError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

#[inline(always)]
fn emit(report: &mut dyn FnMut(Diagnostic), diag: Diagnostic) {
    warn!("{diag}");
    report(diag);
}

/// Reconciles the three parallel arrays into one time-sorted event list.
///
/// Unequal lengths are truncated to the shortest (lowest index wins) and
/// reported once. Ties in time keep their input order.
pub fn normalize(
    times: &[f64],
    judgments: &[Judgment],
    accuracies: &[f64],
    report: &mut dyn FnMut(Diagnostic),
) -> Result<Vec<ReplayEvent>, ReplayError> {
    let n = times.len().min(judgments.len()).min(accuracies.len());
    if times.len() != judgments.len() || times.len() != accuracies.len() {
        emit(
            report,
            Diagnostic::LengthMismatch {
                times: times.len(),
                judgments: judgments.len(),
                accuracies: accuracies.len(),
            },
        );
    }
    if n == 0 {
        return Err(ReplayError::EmptyReplay);
    }

    let mut events: Vec<ReplayEvent> = (0..n)
        .map(|i| ReplayEvent {
            index: i,
            time: times[i],
            judgment: judgments[i],
            accuracy: accuracies[i],
        })
        .collect();
    // Stable: equal timestamps keep recorded order.
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(events)
}

fn required_array<'a>(
    inputs: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ReplayError> {
    match inputs.get(field) {
        None | Some(Value::Null) => Err(ReplayError::MissingField(field)),
        Some(v) => Ok(v),
    }
}

fn parse_judgments(
    raw: &Value,
    report: &mut dyn FnMut(Diagnostic),
) -> Result<Vec<Judgment>, ReplayError> {
    let entries = raw
        .as_array()
        .ok_or(ReplayError::InvalidFormat("judgment"))?;
    let mut out = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let code = match entry {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let judgment = code.map_or(Judgment::Unknown, Judgment::from_code);
        if judgment == Judgment::Unknown {
            emit(
                report,
                Diagnostic::UnknownJudgment {
                    index,
                    raw: entry.to_string(),
                },
            );
        }
        out.push(judgment);
    }
    Ok(out)
}

fn parse_accuracies(
    raw: &Value,
    report: &mut dyn FnMut(Diagnostic),
) -> Result<Vec<f64>, ReplayError> {
    let entries = raw
        .as_array()
        .ok_or(ReplayError::InvalidFormat("accuracy"))?;
    let mut out = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let accuracy = value_as_f64(entry).unwrap_or_else(|| {
            emit(
                report,
                Diagnostic::InvalidAccuracy {
                    index,
                    raw: entry.to_string(),
                },
            );
            0.0
        });
        out.push(accuracy);
    }
    Ok(out)
}

fn parse_duration(
    replay: &serde_json::Map<String, Value>,
    report: &mut dyn FnMut(Diagnostic),
) -> Result<f64, ReplayError> {
    let duration = replay
        .get("duration")
        .and_then(value_as_f64)
        .ok_or(ReplayError::MissingDuration)?;
    if duration < 0.0 {
        emit(report, Diagnostic::NegativeDuration { raw: duration });
        return Ok(0.0);
    }
    Ok(duration)
}

fn parse_recorded_at(replay: &serde_json::Map<String, Value>) -> Option<DateTime<Utc>> {
    ["saveTime", "startTime"]
        .iter()
        .filter_map(|k| replay.get(*k).and_then(Value::as_i64))
        .find_map(DateTime::from_timestamp_millis)
}

fn parse_optional<T: for<'de> Deserialize<'de>>(value: Option<&Value>, what: &str) -> Option<T> {
    let value = value.filter(|v| !v.is_null())?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring malformed {what}: {e}");
            None
        }
    }
}

/// Builds a session from a replay payload.
///
/// Accepts the bare `{duration, inputs}` object, a wrapped
/// `{metadata, replay, result}` record, or a list of either (first wins).
pub fn load_session(
    payload: &Value,
    report: &mut dyn FnMut(Diagnostic),
) -> Result<ReplaySession, LoadError> {
    let root = match payload {
        Value::Array(items) => {
            if items.len() > 1 {
                emit(report, Diagnostic::MultipleReplays { count: items.len() });
            }
            items.first().ok_or(ReplayError::EmptyReplay)?
        }
        other => other,
    };
    let Some(root_obj) = root.as_object() else {
        warn!("Replay payload must be an object, got {}", json_kind(root));
        return Err(ReplayError::InvalidFormat("replay").into());
    };

    let (replay, metadata_value, result_value) = match root_obj.get("replay") {
        Some(Value::Object(inner)) => (
            inner,
            root_obj.get("metadata"),
            root_obj.get("result").or_else(|| inner.get("result")),
        ),
        _ => (root_obj, root_obj.get("metadata"), root_obj.get("result")),
    };

    let inputs = match replay.get("inputs") {
        Some(Value::Object(inputs)) => inputs,
        None | Some(Value::Null) => return Err(ReplayError::MissingField("inputs").into()),
        Some(_) => return Err(ReplayError::InvalidFormat("inputs").into()),
    };
    let raw_time = required_array(inputs, "time")?;
    let raw_judgment = required_array(inputs, "judgment")?;
    let raw_accuracy = required_array(inputs, "accuracy")?;
    let duration_s = parse_duration(replay, report)?;

    let times = decode_delta(raw_time, report)?;
    let judgments = parse_judgments(raw_judgment, report)?;
    let accuracies = parse_accuracies(raw_accuracy, report)?;
    let events = normalize(&times, &judgments, &accuracies, report)?;

    let session = ReplaySession {
        events,
        duration_s,
        metadata: parse_optional(metadata_value, "metadata"),
        recorded_result: parse_optional(result_value, "result"),
        recorded_at: parse_recorded_at(replay),
    };
    info!(
        "Loaded replay \"{}\": {} events, {:.2}s",
        session.title().unwrap_or("untitled"),
        session.events.len(),
        session.duration_s
    );
    Ok(session)
}

/// Reads a replay JSON file from disk. Shape checks happen in `load_session`.
pub fn read_payload(path: &Path) -> Result<Value, LoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| LoadError::Json(format!("{}: {e}", path.display())))
}
