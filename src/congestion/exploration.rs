//! Epsilon-greedy action selection with an adaptively decaying exploration
//! rate.
//!
//! The exploration rate is `epsilon / (base * (1 + epsilon_step))`. Over
//! stable periods `epsilon_step` grows, narrowing exploration; a detected jump
//! in throughput or RTT resets it to zero.
//!
//! 带自适应衰减探索率的 epsilon-贪心动作选择。

use super::action::Action;
use crate::config::ExplorationConfig;
use crate::rng::RandomSource;
use tracing::trace;

/// The outcome of one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    /// Table column of the chosen action.
    pub column: usize,
    /// Whether the greedy pick was overridden by a random one.
    pub explored: bool,
}

/// Signals used to detect volatility after an action.
#[derive(Debug, Clone, Copy, Default)]
pub struct Volatility {
    /// Mean of the recent throughput window (each entry `throughput >> 5`).
    pub recent_mean: u32,
    pub smooth_throughput: u32,
    /// Zero if unknown.
    pub rtt_us: u32,
    pub min_rtt_us: u32,
}

/// Per-flow exploration counters.
///
/// 每个流的探索计数器。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Explorer {
    pub epsilon_step: u32,
    pub epsilon_count: u32,
}

/// Picks the column with the largest value.
///
/// Among equal maxima the last one scanned wins. Only when every value in
/// the row is equal is the column drawn uniformly at random.
///
/// 选取值最大的列。相等的最大值中取最后扫描到的；仅当整行完全相等时才随机选择。
pub fn greedy(row: &[i32], rng: &mut impl RandomSource) -> usize {
    let Some(&first) = row.first() else {
        return 0;
    };
    let mut best = first;
    let mut best_column = 0;
    let mut all_equal = true;
    for (column, &value) in row.iter().enumerate() {
        if value == best {
            best_column = column;
            continue;
        }
        all_equal = false;
        if value > best {
            best = value;
            best_column = column;
        }
    }
    if all_equal {
        return rng.below(row.len() as u32) as usize;
    }
    best_column
}

impl Explorer {
    /// The probability that a non-exempt greedy pick is overridden.
    pub fn override_probability(&self, config: &ExplorationConfig) -> f64 {
        let window = config.base.saturating_mul(1 + self.epsilon_step);
        if window == 0 {
            return 0.0;
        }
        f64::from(config.epsilon.min(window)) / f64::from(window)
    }

    /// Selects a column of `row`. `actions[i]` names column `i`.
    pub fn choose(
        &self,
        row: &[i32],
        actions: &[Action],
        config: &ExplorationConfig,
        rng: &mut impl RandomSource,
    ) -> Choice {
        let column = greedy(row, rng);
        if config.exempt.is_some() && actions.get(column).copied() == config.exempt {
            return Choice {
                column,
                explored: false,
            };
        }
        let window = config.base.saturating_mul(1 + self.epsilon_step);
        if rng.below(window) >= config.epsilon {
            return Choice {
                column,
                explored: false,
            };
        }
        let random = rng.below(row.len() as u32) as usize;
        trace!(
            greedy = column,
            random,
            epsilon_step = self.epsilon_step,
            "Exploration override"
        );
        Choice {
            column: random,
            explored: true,
        }
    }

    /// Advances the decay counters after an executed action, resetting the
    /// step when throughput or RTT moved significantly.
    ///
    /// 执行动作后推进衰减计数器；若吞吐量或RTT显著变化则重置。
    pub fn record(&mut self, signals: &Volatility, config: &ExplorationConfig) {
        if !config.adaptive {
            return;
        }
        if self.epsilon_count < config.evaluations_per_step {
            self.epsilon_count += 1;
        }
        if self.epsilon_count >= config.evaluations_per_step {
            if self.epsilon_step < config.max_step {
                self.epsilon_step += 1;
            }
            self.epsilon_count = 0;
        }

        let smooth = signals.smooth_throughput;
        let throughput_change = signals.recent_mean.abs_diff(smooth >> 5);
        let throughput_moved = throughput_change > smooth >> 8;
        let rtt_moved = signals.rtt_us != 0
            && (signals.rtt_us.abs_diff(signals.min_rtt_us) >> 10) > signals.min_rtt_us >> 13;
        if throughput_moved || rtt_moved {
            trace!(
                throughput_change,
                rtt_us = signals.rtt_us,
                min_rtt_us = signals.min_rtt_us,
                "Volatility detected, exploration widened"
            );
            self.epsilon_step = 0;
        }
    }
}
