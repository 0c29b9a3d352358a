//! Software debouncing for momentary push buttons.
//!
//! Mechanical switches bounce for a few milliseconds on every press and
//! release. [`DebounceFilter`] turns the raw, polled level into a single
//! clean [`Edge::Rising`] per press.
//!
//! The filter is sample-driven, not interrupt-driven: call
//! [`update`](DebounceFilter::update) from the main loop at a cadence faster
//! than the debounce window.
//!
//! ```rust
//! use rfid_warden::debounce::{DebounceFilter, Edge};
//!
//! let mut button = DebounceFilter::new(40, false, 0);
//!
//! // Bouncy press: the timer restarts on every raw change
//! assert_eq!(button.update(true, 0), Edge::None);
//! assert_eq!(button.update(false, 5), Edge::None);
//! assert_eq!(button.update(true, 10), Edge::None);
//!
//! // Stable for 40ms after the last bounce
//! assert_eq!(button.update(true, 50), Edge::Rising);
//! assert_eq!(button.update(true, 60), Edge::None);
//! ```

/// Output of a debounce step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// No stable transition this sample.
    None,
    /// Stable level went from low to high.
    Rising,
}

/// Debounced edge detector for one digital input.
#[derive(Clone, Debug)]
pub struct DebounceFilter {
    window_ms: u64,
    raw_last: bool,
    stable: bool,
    last_change_ms: u64,
}

impl DebounceFilter {
    /// Create a filter seeded with the level sampled at startup.
    ///
    /// Seeding with the current level means a button held down during boot
    /// does not produce a spurious rising edge.
    pub fn new(window_ms: u64, initial: bool, now_ms: u64) -> Self {
        Self {
            window_ms,
            raw_last: initial,
            stable: initial,
            last_change_ms: now_ms,
        }
    }

    /// Feed one raw sample.
    pub fn update(&mut self, raw: bool, now_ms: u64) -> Edge {
        if raw != self.raw_last {
            self.raw_last = raw;
            self.last_change_ms = now_ms;
        }

        let settled = now_ms.saturating_sub(self.last_change_ms) >= self.window_ms;
        if settled && self.stable != raw {
            let was = self.stable;
            self.stable = raw;
            if !was && raw {
                return Edge::Rising;
            }
        }

        Edge::None
    }

    /// Current debounced level.
    #[inline]
    pub fn stable(&self) -> bool {
        self.stable
    }

    /// Configured debounce window.
    #[inline]
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> DebounceFilter {
        DebounceFilter::new(40, false, 0)
    }

    #[test]
    fn clean_press_rises_after_window() {
        let mut f = filter();
        assert_eq!(f.update(true, 100), Edge::None);
        assert_eq!(f.update(true, 139), Edge::None);
        assert_eq!(f.update(true, 140), Edge::Rising);
        assert!(f.stable());
    }

    #[test]
    fn held_button_rises_once() {
        let mut f = filter();
        f.update(true, 0);
        assert_eq!(f.update(true, 40), Edge::Rising);
        for t in (50..1000).step_by(10) {
            assert_eq!(f.update(true, t), Edge::None);
        }
    }

    #[test]
    fn bounce_restarts_timer() {
        let mut f = filter();
        f.update(true, 0);
        f.update(false, 30);
        f.update(true, 35);
        // 40ms after first change, but only 5ms after the last one
        assert_eq!(f.update(true, 40), Edge::None);
        assert_eq!(f.update(true, 74), Edge::None);
        assert_eq!(f.update(true, 75), Edge::Rising);
    }

    #[test]
    fn short_glitch_is_ignored() {
        let mut f = filter();
        f.update(true, 0);
        f.update(false, 10);
        for t in (20..200).step_by(10) {
            assert_eq!(f.update(false, t), Edge::None);
        }
        assert!(!f.stable());
    }

    #[test]
    fn release_is_not_reported() {
        let mut f = filter();
        f.update(true, 0);
        assert_eq!(f.update(true, 40), Edge::Rising);
        f.update(false, 100);
        assert_eq!(f.update(false, 140), Edge::None);
        assert!(!f.stable());
    }

    #[test]
    fn second_press_needs_stable_low_between() {
        let mut f = filter();
        f.update(true, 0);
        assert_eq!(f.update(true, 40), Edge::Rising);

        // Brief dip shorter than the window: no new edge
        f.update(false, 100);
        f.update(true, 110);
        assert_eq!(f.update(true, 200), Edge::None);

        // Real release then press
        f.update(false, 300);
        f.update(false, 340);
        f.update(true, 400);
        assert_eq!(f.update(true, 440), Edge::Rising);
    }

    #[test]
    fn seeded_high_does_not_fire_at_boot() {
        let mut f = DebounceFilter::new(40, true, 0);
        assert_eq!(f.update(true, 100), Edge::None);
    }
}
