use std::time::Instant;

/// Wall-clock source for the playback scheduler, in milliseconds from an
/// arbitrary epoch. Only differences between readings are meaningful.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Monotonic clock backed by `Instant`, anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline(always)]
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Synthetic clock for driving ticks with exact timestamps.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now_ms: std::rc::Rc<std::cell::Cell<f64>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, ms: f64) {
        self.now_ms.set(ms);
    }

    pub fn advance_ms(&self, delta_ms: f64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }
}
