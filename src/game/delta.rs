use log::warn;
use serde_json::Value;

use crate::game::replay::{Diagnostic, ReplayError};

/// Reads a JSON number or a numeric string as a finite `f64`.
///
/// Strings are trimmed before parsing. Everything else (null, bool, objects,
/// NaN/inf spellings) yields `None`.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Turns a delta-encoded time array into absolute timestamps.
///
/// Entries that do not parse are skipped, not zero-filled, so the output can
/// be shorter than the input; callers align by resulting length. Each skipped
/// entry is reported through `report`. Fails with `InvalidFormat` only when
/// `raw` is not an array.
pub fn decode_delta(
    raw: &Value,
    report: &mut dyn FnMut(Diagnostic),
) -> Result<Vec<f64>, ReplayError> {
    let Some(entries) = raw.as_array() else {
        warn!("Invalid delta time format: expected an array, got {}", json_kind(raw));
        return Err(ReplayError::InvalidFormat("time"));
    };

    let mut decoded = Vec::with_capacity(entries.len());
    let mut current = 0.0_f64;
    for (index, entry) in entries.iter().enumerate() {
        let Some(delta) = value_as_f64(entry) else {
            let diag = Diagnostic::SkippedDelta {
                index,
                raw: entry.to_string(),
            };
            warn!("{diag}");
            report(diag);
            continue;
        };
        current += delta;
        decoded.push(current);
    }
    Ok(decoded)
}

pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(raw: Value) -> (Result<Vec<f64>, ReplayError>, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let out = decode_delta(&raw, &mut |d| diags.push(d));
        (out, diags)
    }

    #[test]
    fn running_sum_of_deltas() {
        let deltas = [0.5, 0.25, 0.0, 1.25, 0.125];
        let (out, diags) = decode(json!(deltas));
        let out = out.unwrap();
        assert!(diags.is_empty());
        let mut expected = 0.0;
        for (i, d) in deltas.iter().enumerate() {
            expected += d;
            assert_eq!(out[i], expected, "prefix sum mismatch at {i}");
        }
    }

    #[test]
    fn all_zero_input_stays_zero() {
        let (out, _) = decode(json!([0, 0, 0, 0]));
        assert_eq!(out.unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn invalid_entries_are_dropped_not_zero_filled() {
        let (out, diags) = decode(json!([1.0, "abc", "0.5", null, true, " 2 "]));
        assert_eq!(out.unwrap(), vec![1.0, 1.5, 3.5]);
        assert_eq!(diags.len(), 3);
        assert_eq!(
            diags[0],
            Diagnostic::SkippedDelta {
                index: 1,
                raw: "\"abc\"".to_string(),
            }
        );
        assert!(matches!(diags[1], Diagnostic::SkippedDelta { index: 3, .. }));
        assert!(matches!(diags[2], Diagnostic::SkippedDelta { index: 4, .. }));
    }

    #[test]
    fn non_finite_strings_are_skipped() {
        let (out, diags) = decode(json!(["NaN", "inf", 1]));
        assert_eq!(out.unwrap(), vec![1.0]);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn non_array_is_invalid_format() {
        let (out, _) = decode(json!({"0": 1.0}));
        assert_eq!(out, Err(ReplayError::InvalidFormat("time")));
        let (out, _) = decode(json!("0.5,0.5"));
        assert_eq!(out, Err(ReplayError::InvalidFormat("time")));
    }

    #[test]
    fn empty_array_decodes_to_empty() {
        let (out, diags) = decode(json!([]));
        assert_eq!(out.unwrap(), Vec::<f64>::new());
        assert!(diags.is_empty());
    }
}
