use crate::game::judgment::Judgment;
use crate::ui::color::Rgba;

pub const DEFAULT_FADE_WINDOW_MS: f64 = 2000.0;

/// An accuracy marker spawned when an event is dispatched.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ActiveMarker {
    pub screen_x: f64,
    pub color: Rgba,
    pub spawn_ms: f64,
    pub judgment: Judgment,
}

/// A marker as handed to the render callback for one frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MarkerView {
    pub screen_x: f64,
    pub color: Rgba,
    pub judgment: Judgment,
    pub opacity: f64,
}

#[inline(always)]
pub fn opacity_at(age_ms: f64, window_ms: f64) -> f64 {
    if window_ms <= 0.0 {
        return 0.0;
    }
    (1.0 - age_ms / window_ms).clamp(0.0, 1.0)
}

/// Visible markers, retired once their age reaches the fade window.
#[derive(Clone, Debug)]
pub struct FadeBuffer {
    markers: Vec<ActiveMarker>,
    window_ms: f64,
}

impl FadeBuffer {
    pub fn new(window_ms: f64) -> Self {
        Self {
            markers: Vec::new(),
            window_ms,
        }
    }

    pub fn insert(&mut self, marker: ActiveMarker) {
        self.markers.push(marker);
    }

    /// Drops every marker with `age >= window`. Expired markers never return.
    pub fn prune(&mut self, now_ms: f64) {
        let window_ms = self.window_ms;
        self.markers.retain(|m| now_ms - m.spawn_ms < window_ms);
    }

    pub fn views(&self, now_ms: f64) -> Vec<MarkerView> {
        self.markers
            .iter()
            .map(|m| MarkerView {
                screen_x: m.screen_x,
                color: m.color,
                judgment: m.judgment,
                opacity: opacity_at(now_ms - m.spawn_ms, self.window_ms),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }
}

impl Default for FadeBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(spawn_ms: f64) -> ActiveMarker {
        ActiveMarker {
            screen_x: 10.0,
            color: [1.0; 4],
            spawn_ms,
            judgment: Judgment::Perfect,
        }
    }

    #[test]
    fn opacity_decays_linearly_then_marker_expires() {
        let t0 = 500.0;
        let mut buf = FadeBuffer::new(3000.0);
        buf.insert(marker(t0));

        assert_eq!(buf.views(t0)[0].opacity, 1.0);
        assert!((buf.views(t0 + 1500.0)[0].opacity - 0.5).abs() < 1e-9);

        buf.prune(t0 + 2999.0);
        assert_eq!(buf.len(), 1);
        buf.prune(t0 + 3001.0);
        assert!(buf.is_empty());
    }

    #[test]
    fn marker_is_retired_exactly_at_window() {
        let mut buf = FadeBuffer::new(2000.0);
        buf.insert(marker(0.0));
        buf.prune(2000.0);
        assert!(buf.is_empty());
    }

    #[test]
    fn prune_keeps_young_markers_only() {
        let mut buf = FadeBuffer::new(1000.0);
        buf.insert(marker(0.0));
        buf.insert(marker(600.0));
        buf.insert(marker(900.0));
        buf.prune(1500.0);
        let spawned: Vec<f64> = buf.views(1500.0).iter().map(|v| v.opacity).collect();
        assert_eq!(spawned.len(), 2);
        assert!((spawned[0] - 0.1).abs() < 1e-9);
        assert!((spawned[1] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn opacity_is_clamped() {
        assert_eq!(opacity_at(-50.0, 1000.0), 1.0);
        assert_eq!(opacity_at(5000.0, 1000.0), 0.0);
        assert_eq!(opacity_at(10.0, 0.0), 0.0);
    }
}
