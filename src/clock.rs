//! Wrapping millisecond ticks.
//! 回绕安全的毫秒时钟刻度。

use std::time::Duration;

/// A monotonic timestamp in milliseconds that is allowed to wrap around.
///
/// Ordering between ticks is only meaningful through [`Tick::is_after`], which
/// compares by signed difference so a wrap of the underlying counter is not
/// mistaken for time going backwards.
///
/// 一个允许回绕的单调毫秒时间戳。只能通过 [`Tick::is_after`] 进行比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tick(pub u32);

impl Tick {
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Returns true if `self` is strictly later than `other`.
    /// 如果 `self` 严格晚于 `other` 则返回 true。
    pub fn is_after(self, other: Tick) -> bool {
        (other.0.wrapping_sub(self.0) as i32) < 0
    }

    /// Whether more than `interval` has passed between `since` and `self`.
    pub fn has_elapsed(self, since: Tick, interval: Duration) -> bool {
        self.is_after(since.advanced_by(interval))
    }

    /// Milliseconds from `earlier` to `self`, modulo wraparound.
    pub fn millis_since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    pub fn advanced_by(self, interval: Duration) -> Tick {
        Tick(self.0.wrapping_add(duration_millis(interval)))
    }
}

/// Converts a duration into whole milliseconds, saturating at `u32::MAX`.
pub(crate) fn duration_millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_after_plain() {
        assert!(Tick(10).is_after(Tick(5)));
        assert!(!Tick(5).is_after(Tick(10)));
        assert!(!Tick(5).is_after(Tick(5)));
    }

    #[test]
    fn test_is_after_across_wraparound() {
        let before_wrap = Tick(u32::MAX - 5);
        let after_wrap = Tick(4);
        assert!(after_wrap.is_after(before_wrap));
        assert!(!before_wrap.is_after(after_wrap));
        assert_eq!(after_wrap.millis_since(before_wrap), 10);
    }

    #[test]
    fn test_millis_conversion() {
        assert_eq!(Tick::from_millis(42).as_millis(), 42);
        assert_eq!(Tick::from_millis(3), Tick(3));
    }

    #[test]
    fn test_has_elapsed_wraps() {
        let start = Tick(u32::MAX - 50);
        let interval = Duration::from_millis(100);
        assert!(!Tick(40).has_elapsed(start, interval));
        assert!(!Tick(49).has_elapsed(start, interval));
        assert!(Tick(50).has_elapsed(start, interval));
    }
}
