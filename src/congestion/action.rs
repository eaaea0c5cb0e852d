//! Maps a chosen action onto the congestion window.
//! 将选定的动作映射为拥塞窗口的修改。

use crate::config::WindowConfig;
use tracing::trace;

const MAX_TIMES: u32 = 15;
const MAX_UP_TIER: usize = 7;

/// A window action.
///
/// 窗口动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Grow by the current tier's step divided by the window.
    /// 按当前等级的步长除以窗口大小增长。
    Grow,
    /// Grow by exactly one segment.
    /// 增长一个报文段。
    GrowOne,
    /// Shrink by the current tier's step, or halve past the last tier.
    /// 按当前等级的步长缩小，超过最后等级则减半。
    Shrink,
    /// Leave the window alone.
    /// 保持窗口不变。
    Hold,
}

/// Consecutive-action counters driving the step tiers.
///
/// 驱动步长等级的连续动作计数器。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hysteresis {
    pub up_times: u32,
    pub down_times: u32,
    pub up_n: usize,
}

impl Hysteresis {
    fn lower_tier(&mut self) {
        self.up_n = self.up_n.saturating_sub(1);
    }
}

/// Applies `action` to `cwnd` and returns the new window, which is always at
/// least one.
///
/// 将 `action` 作用于 `cwnd` 并返回新窗口，结果总是至少为1。
pub fn execute(action: Action, cwnd: u32, counters: &mut Hysteresis, config: &WindowConfig) -> u32 {
    let cwnd = cwnd.max(1);
    let next = match action {
        Action::Grow => {
            let tier = counters.up_n.min(config.up_steps.len().saturating_sub(1));
            let step = config
                .up_steps
                .get(tier)
                .map_or(0, |&s| s / cwnd)
                .max(config.min_up_step);
            note_increase(counters);
            let tier_cap = MAX_UP_TIER.min(config.up_steps.len().saturating_sub(1));
            if counters.up_times >= config.up_tier_after && counters.up_n < tier_cap {
                counters.up_n += 1;
            }
            cwnd.saturating_add(step)
        }
        Action::GrowOne => {
            note_increase(counters);
            cwnd.saturating_add(1)
        }
        Action::Shrink => {
            let next = match config.down_steps.get(counters.down_times as usize) {
                Some(&step) if cwnd > step => cwnd - step,
                Some(_) => cwnd,
                None if cwnd > 1 => cwnd - (cwnd >> 1),
                None => cwnd,
            };
            counters.down_times = (counters.down_times + 1).min(MAX_TIMES);
            counters.up_times = 0;
            counters.lower_tier();
            next
        }
        Action::Hold => {
            counters.lower_tier();
            cwnd
        }
    };
    trace!(
        ?action,
        cwnd,
        next,
        up_n = counters.up_n,
        down_times = counters.down_times,
        "Executed window action"
    );
    next.max(1)
}

fn note_increase(counters: &mut Hysteresis) {
    counters.up_times = (counters.up_times + 1).min(MAX_TIMES);
    counters.down_times = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn tiered() -> WindowConfig {
        Config::tiered().window
    }

    #[test]
    fn test_grow_first_tier() {
        let mut counters = Hysteresis::default();
        assert_eq!(execute(Action::Grow, 10, &mut counters, &tiered()), 13);
        assert_eq!(counters.up_times, 1);
        assert_eq!(counters.up_n, 0);
    }

    #[test]
    fn test_grow_minimum_step_is_one() {
        let mut counters = Hysteresis::default();
        assert_eq!(execute(Action::Grow, 100, &mut counters, &tiered()), 101);
    }

    #[test]
    fn test_grow_promotes_tier_after_three_increases() {
        let config = tiered();
        let mut counters = Hysteresis::default();
        let mut cwnd = 10;
        cwnd = execute(Action::Grow, cwnd, &mut counters, &config);
        cwnd = execute(Action::Grow, cwnd, &mut counters, &config);
        assert_eq!(counters.up_n, 0);
        cwnd = execute(Action::Grow, cwnd, &mut counters, &config);
        assert_eq!(counters.up_n, 1);
        // Tier 1 step is 150.
        let before = cwnd;
        cwnd = execute(Action::Grow, cwnd, &mut counters, &config);
        assert_eq!(cwnd, before + 150 / before);
        assert_eq!(counters.up_n, 2);
    }

    #[test]
    fn test_grow_tier_caps_at_seven() {
        let config = tiered();
        let mut counters = Hysteresis::default();
        let mut cwnd = 1;
        for _ in 0..40 {
            cwnd = execute(Action::Grow, cwnd, &mut counters, &config);
        }
        assert_eq!(counters.up_n, 7);
        assert_eq!(counters.up_times, 15);
    }

    #[test]
    fn test_shrink_first_tier() {
        let mut counters = Hysteresis::default();
        assert_eq!(execute(Action::Shrink, 10, &mut counters, &tiered()), 9);
        assert_eq!(counters.down_times, 1);
    }

    #[test]
    fn test_shrink_keeps_window_when_step_too_large() {
        let mut counters = Hysteresis {
            down_times: 3,
            ..Default::default()
        };
        // Tier 3 step is 9; a window of 9 would reach zero.
        assert_eq!(execute(Action::Shrink, 9, &mut counters, &tiered()), 9);
    }

    #[test]
    fn test_shrink_halves_past_last_tier() {
        let mut counters = Hysteresis {
            down_times: 8,
            ..Default::default()
        };
        assert_eq!(execute(Action::Shrink, 101, &mut counters, &tiered()), 51);
        assert_eq!(execute(Action::Shrink, 1, &mut counters, &tiered()), 1);
        assert_eq!(counters.down_times, 10);
    }

    #[test]
    fn test_shrink_resets_increase_counters() {
        let mut counters = Hysteresis {
            up_times: 5,
            up_n: 3,
            ..Default::default()
        };
        execute(Action::Shrink, 50, &mut counters, &tiered());
        assert_eq!(counters.up_times, 0);
        assert_eq!(counters.up_n, 2);
    }

    #[test]
    fn test_hold_lowers_tier_only() {
        let mut counters = Hysteresis {
            up_times: 2,
            down_times: 4,
            up_n: 1,
        };
        assert_eq!(execute(Action::Hold, 20, &mut counters, &tiered()), 20);
        assert_eq!(counters.up_n, 0);
        assert_eq!(counters.up_times, 2);
        assert_eq!(counters.down_times, 4);
        execute(Action::Hold, 20, &mut counters, &tiered());
        assert_eq!(counters.up_n, 0);
    }

    #[test]
    fn test_softsign_actions() {
        let config = Config::softsign().window;
        let mut counters = Hysteresis::default();
        assert_eq!(execute(Action::Grow, 10, &mut counters, &config), 13);
        // 30 / 40 rounds down to zero and there is no minimum step.
        assert_eq!(execute(Action::Grow, 40, &mut counters, &config), 40);
        assert_eq!(execute(Action::GrowOne, 40, &mut counters, &config), 41);
        assert_eq!(execute(Action::Shrink, 41, &mut counters, &config), 21);
        assert_eq!(counters.up_n, 0);
    }

    #[test]
    fn test_window_never_reaches_zero() {
        let actions = [Action::Grow, Action::GrowOne, Action::Shrink, Action::Hold];
        for config in [tiered(), Config::softsign().window] {
            for &action in &actions {
                for down_times in [0, 3, 7, 8, 15] {
                    for cwnd in [0, 1, 2, 3, 5, 9, 50, u32::MAX] {
                        let mut counters = Hysteresis {
                            down_times,
                            ..Default::default()
                        };
                        assert!(execute(action, cwnd, &mut counters, &config) >= 1);
                    }
                }
            }
        }
    }
}
