//! Navigation window over a dataset of known length.
//!
//! `0 <= offset <= max(0, len - size)` holds after every operation. Forward moves saturate
//! at the last page start and backward moves saturate at zero, so repeated presses at a
//! boundary are no-ops.

use serde::Serialize;
use std::ops::Range;

use crate::config::WindowConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavDirection {
    Forward,
    Backward,
}

/// A numeric input after clamping; `corrected` is set when the caller's value was changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamped<T> {
    pub value: T,
    pub corrected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimits {
    pub min_size: usize,
    pub max_size: usize,
    pub min_step: usize,
    pub max_step: usize,
}

impl WindowLimits {
    fn clamp(value: i64, min: usize, max: usize) -> Clamped<usize> {
        let clamped = value.clamp(min as i64, max.max(min) as i64) as usize;
        Clamped {
            value: clamped,
            corrected: clamped as i64 != value,
        }
    }

    pub fn clamp_size(&self, value: i64) -> Clamped<usize> {
        Self::clamp(value, self.min_size, self.max_size)
    }

    pub fn clamp_step(&self, value: i64) -> Clamped<usize> {
        Self::clamp(value, self.min_step, self.max_step)
    }
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self::from(&WindowConfig::default())
    }
}

impl From<&WindowConfig> for WindowLimits {
    fn from(config: &WindowConfig) -> Self {
        Self {
            min_size: config.min_size.max(1),
            max_size: config.max_size.max(config.min_size.max(1)),
            min_step: config.min_step.max(1),
            max_step: config.max_step.max(config.min_step.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationWindow {
    offset: usize,
    size: usize,
    step: usize,
    len: usize,
    limits: WindowLimits,
}

impl NavigationWindow {
    pub fn new(limits: WindowLimits, size: usize, step: usize) -> Self {
        Self {
            offset: 0,
            size: limits.clamp_size(size as i64).value,
            step: limits.clamp_step(step as i64).value,
            len: 0,
            limits,
        }
    }

    pub fn from_config(config: &WindowConfig) -> Self {
        Self::new(
            WindowLimits::from(config),
            config.default_size,
            config.default_step,
        )
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn limits(&self) -> WindowLimits {
        self.limits
    }

    /// Last valid offset: the start of the final full (or only partial) page.
    pub fn max_offset(&self) -> usize {
        self.len.saturating_sub(self.size)
    }

    /// New dataset length (primary load). Always returns to the first page.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.offset = 0;
    }

    /// Clamp into the configured range and go back to the first page.
    pub fn set_size(&mut self, size: i64) -> Clamped<usize> {
        let clamped = self.limits.clamp_size(size);
        self.size = clamped.value;
        self.offset = 0;
        tracing::debug!(size = self.size, corrected = clamped.corrected, "window size set");
        clamped
    }

    /// Clamp into the configured range. The offset is left alone.
    pub fn set_step(&mut self, step: i64) -> Clamped<usize> {
        let clamped = self.limits.clamp_step(step);
        self.step = clamped.value;
        clamped
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Advance by one step. Returns whether the offset changed.
    pub fn next(&mut self) -> bool {
        self.scroll(NavDirection::Forward, self.step)
    }

    /// Go back by one step. Returns whether the offset changed.
    pub fn prev(&mut self) -> bool {
        self.scroll(NavDirection::Backward, self.step)
    }

    /// Saturating move by a caller-supplied magnitude.
    pub fn scroll(&mut self, direction: NavDirection, speed: usize) -> bool {
        let before = self.offset;
        self.offset = match direction {
            NavDirection::Forward => self.max_offset().min(self.offset.saturating_add(speed)),
            NavDirection::Backward => self.offset.saturating_sub(speed),
        };
        before != self.offset
    }

    /// Magnitude used for wheel input: half a step, at least one row.
    pub fn wheel_speed(&self) -> usize {
        (self.step / 2).max(1)
    }

    pub fn first(&mut self) -> bool {
        let before = self.offset;
        self.offset = 0;
        before != self.offset
    }

    pub fn last(&mut self) -> bool {
        let before = self.offset;
        self.offset = self.max_offset();
        before != self.offset
    }

    /// Half-open range of visible rows. Empty dataset yields `0..0`.
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.offset.min(self.len);
        let end = self.offset.saturating_add(self.size).min(self.len);
        start..end
    }

    /// "{first} - {last} of {len}", one-based.
    pub fn position_label(&self) -> String {
        let range = self.visible_range();
        if range.is_empty() {
            return format!("0 - 0 of {}", self.len);
        }
        format!("{} - {} of {}", range.start + 1, range.end, self.len)
    }
}

impl Default for NavigationWindow {
    fn default() -> Self {
        Self::from_config(&WindowConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> WindowLimits {
        WindowLimits {
            min_size: 1,
            max_size: 50,
            min_step: 1,
            max_step: 20,
        }
    }

    fn window(len: usize, size: usize, step: usize) -> NavigationWindow {
        let mut w = NavigationWindow::new(limits(), size, step);
        w.set_len(len);
        w
    }

    #[test]
    fn test_next_prev_saturate() {
        let mut w = window(3, 2, 1);
        assert_eq!(w.visible_range(), 0..2);
        assert!(w.next());
        assert_eq!(w.visible_range(), 1..3);
        assert!(!w.next());
        assert_eq!(w.offset(), 1);
        assert!(w.prev());
        assert!(!w.prev());
        assert_eq!(w.visible_range(), 0..2);
    }

    #[test]
    fn test_page_down_up() {
        let mut w = window(100, 20, 20);
        w.next();
        assert_eq!(w.offset(), 20);
        w.next();
        assert_eq!(w.offset(), 40);
        w.prev();
        assert_eq!(w.offset(), 20);
        w.prev();
        assert_eq!(w.offset(), 0);
    }

    #[test]
    fn test_last_partial_page() {
        let mut w = window(45, 20, 20);
        w.next();
        w.next();
        assert_eq!(w.offset(), 25);
        assert_eq!(w.visible_range(), 25..45);
        assert!(w.first());
        assert!(w.last());
        assert_eq!(w.offset(), 25);
    }

    #[test]
    fn test_size_larger_than_dataset() {
        let mut w = window(3, 10, 5);
        assert_eq!(w.visible_range(), 0..3);
        assert!(!w.next());
        assert_eq!(w.position_label(), "1 - 3 of 3");
    }

    #[test]
    fn test_empty_dataset() {
        let mut w = window(0, 10, 5);
        assert_eq!(w.visible_range(), 0..0);
        assert!(!w.next());
        assert!(!w.prev());
        assert_eq!(w.position_label(), "0 - 0 of 0");
    }

    #[test]
    fn test_set_size_clamps_and_resets_offset() {
        let mut w = window(100, 10, 10);
        w.next();
        let c = w.set_size(500);
        assert_eq!(
            c,
            Clamped {
                value: 50,
                corrected: true
            }
        );
        assert_eq!(w.offset(), 0);
        let c = w.set_size(-4);
        assert_eq!(c.value, 1);
        assert!(c.corrected);
        let c = w.set_size(10);
        assert!(!c.corrected);
        assert_eq!(w.size(), 10);
    }

    #[test]
    fn test_set_step_keeps_offset() {
        let mut w = window(100, 10, 10);
        w.next();
        let c = w.set_step(0);
        assert_eq!(c.value, 1);
        assert_eq!(w.offset(), 10);
        assert_eq!(w.set_step(99).value, 20);
    }

    #[test]
    fn test_wheel_speed() {
        assert_eq!(window(10, 5, 1).wheel_speed(), 1);
        assert_eq!(window(10, 5, 9).wheel_speed(), 4);
        let mut w = window(100, 10, 9);
        w.scroll(NavDirection::Forward, w.wheel_speed());
        assert_eq!(w.offset(), 4);
        w.scroll(NavDirection::Backward, 100);
        assert_eq!(w.offset(), 0);
    }

    #[test]
    fn test_set_len_resets() {
        let mut w = window(100, 10, 10);
        w.last();
        w.set_len(5);
        assert_eq!(w.offset(), 0);
        assert_eq!(w.visible_range(), 0..5);
    }

    #[test]
    fn test_limits_from_config_are_sane() {
        let config = WindowConfig {
            min_size: 0,
            max_size: 0,
            ..WindowConfig::default()
        };
        let limits = WindowLimits::from(&config);
        assert_eq!(limits.min_size, 1);
        assert_eq!(limits.max_size, 1);
    }
}
