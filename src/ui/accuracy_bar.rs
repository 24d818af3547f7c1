use crate::game::judgment::Judgment;
use crate::game::timing_windows;
use crate::ui::color::{self, Rgba};

/// Maps a signed accuracy offset (seconds) onto `[0, canvas_width]`.
///
/// `-range` lands on 0, `0` on the center and `+range` on the right edge;
/// anything outside is clamped to the canvas. A non-positive range puts
/// every offset on the center line.
#[inline(always)]
pub fn accuracy_to_position(offset_s: f64, canvas_width: f64, range_s: f64) -> f64 {
    if range_s <= 0.0 || !offset_s.is_finite() {
        return canvas_width * 0.5;
    }
    let normalized = (offset_s + range_s) / (2.0 * range_s);
    normalized.clamp(0.0, 1.0) * canvas_width
}

/// A filled background band, `x0..x1` in canvas units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Band {
    pub judgment: Judgment,
    pub x0: f64,
    pub x1: f64,
    pub color: Rgba,
}

/// Background bands back to front: the outer Miss region spans the whole
/// visible range, then Good, Great and Perfect are layered inward.
pub fn background_bands(canvas_width: f64, range_s: f64) -> [Band; 4] {
    let band = |judgment: Judgment, half_s: f64| Band {
        judgment,
        x0: accuracy_to_position(-half_s, canvas_width, range_s),
        x1: accuracy_to_position(half_s, canvas_width, range_s),
        color: color::band_rgba(judgment),
    };
    let [perfect, great, good, miss] = timing_windows::windows_s();
    // The Miss band fills the whole visible range, not just its window.
    [
        band(miss.0, range_s),
        band(good.0, good.1),
        band(great.0, great.1),
        band(perfect.0, perfect.1),
    ]
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MarkerStyle {
    pub line_width: f32,
    pub glow: f32,
}

pub const MARKER_BASE_ALPHA: f64 = 0.8;

pub const fn marker_style(judgment: Judgment) -> MarkerStyle {
    match judgment {
        Judgment::Perfect => MarkerStyle {
            line_width: 2.5,
            glow: 6.0,
        },
        Judgment::Miss => MarkerStyle {
            line_width: 1.5,
            glow: 0.0,
        },
        _ => MarkerStyle {
            line_width: 2.0,
            glow: 0.0,
        },
    }
}
