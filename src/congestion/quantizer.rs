//! Maps raw measurements onto a discrete state.
//! 将原始测量值映射为离散状态。

use crate::config::{Config, Profile};
use crate::table::{STATE_DIMS, State};

/// The measurements a state is built from.
///
/// 构建状态所需的测量值。
#[derive(Debug, Clone, Copy, Default)]
pub struct Observation {
    /// Throughput over the last interval, in kbit/s.
    pub throughput: u32,
    /// Smoothed throughput, in kbit/s.
    pub smooth_throughput: u32,
    /// Current RTT sample in microseconds.
    pub rtt_us: u32,
    /// RTT of the previous sample in microseconds.
    pub previous_rtt_us: u32,
    /// Current min-RTT estimate in microseconds.
    pub min_rtt_us: u32,
}

/// Bounded normalisation `x * 10 / (|x| + k)`, truncated toward zero.
/// The result lies in `-9..=9` for any positive `k`.
///
/// 有界归一化 `x * 10 / (|x| + k)`，向零截断。
pub fn softsign(value: i64, k: i64) -> i64 {
    let denominator = value.abs() + k;
    if denominator == 0 {
        return 0;
    }
    value * 10 / denominator
}

/// `v * scale / (v + reference)` with `v` floored at one: how large the
/// current value is relative to a reference, in `0..=scale`.
pub fn relative(value: u32, reference: u32, scale: i64) -> i64 {
    let value = i64::from(value.max(1));
    value * scale / (value + i64::from(reference))
}

/// Signed `(rtt - min_rtt) >> 10`, roughly milliseconds of queueing delay.
pub fn queueing_delay_ms(rtt_us: u32, min_rtt_us: u32) -> i64 {
    (i64::from(rtt_us) - i64::from(min_rtt_us)) >> 10
}

fn delay_bucket(delay_ms: i64) -> i64 {
    match delay_ms {
        i64::MIN..=0 => 0,
        1..=5 => 1,
        6..=20 => 2,
        _ => 3,
    }
}

/// Quantizes `obs` for the configured profile. Every component is clamped
/// into `[0, bound - 1]`.
///
/// 按配置的策略量化 `obs`，每个分量都会被钳制到 `[0, bound - 1]`。
pub fn quantize(obs: &Observation, config: &Config) -> State {
    let raw: [i64; STATE_DIMS] = match config.profile {
        Profile::Tiered => [
            i64::from(obs.throughput >> 9),
            delay_bucket(queueing_delay_ms(obs.rtt_us, obs.min_rtt_us)),
            i64::from(obs.min_rtt_us >> 12),
        ],
        Profile::Softsign => [
            relative(obs.throughput, obs.smooth_throughput, 10),
            softsign(
                i64::from(obs.throughput) - i64::from(obs.smooth_throughput),
                1000,
            ) + 9,
            softsign(i64::from(obs.rtt_us) - i64::from(obs.previous_rtt_us), 1000) + 9,
        ],
    };
    let mut state = [0u16; STATE_DIMS];
    for ((slot, value), bound) in state.iter_mut().zip(raw).zip(config.state.bounds) {
        let max = i64::from(bound.saturating_sub(1));
        *slot = value.clamp(0, max) as u16;
    }
    State(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(throughput: u32, rtt_us: u32, min_rtt_us: u32) -> Observation {
        Observation {
            throughput,
            smooth_throughput: throughput,
            rtt_us,
            previous_rtt_us: rtt_us,
            min_rtt_us,
        }
    }

    #[test]
    fn test_softsign_range_and_sign() {
        assert_eq!(softsign(0, 1000), 0);
        assert_eq!(softsign(1000, 1000), 5);
        assert_eq!(softsign(-1000, 1000), -5);
        assert_eq!(softsign(i64::from(i32::MAX), 1000), 9);
        assert_eq!(softsign(i64::from(i32::MIN), 1000), -9);
        assert_eq!(softsign(0, 0), 0);
    }

    #[test]
    fn test_relative_floors_value_at_one() {
        assert_eq!(relative(0, 0, 100), 100);
        assert_eq!(relative(0, 99, 100), 1);
        assert_eq!(relative(50, 50, 100), 50);
    }

    #[test]
    fn test_tiered_buckets() {
        let config = Config::tiered();
        // 1 MB/s-ish: 600_000 >> 9 = 1171, capped to 199.
        let state = quantize(&obs(600_000, 40_000, 40_000), &config);
        assert_eq!(state, State([199, 0, 9]));

        let state = quantize(&obs(5120, 40_000 + 3 * 1024, 40_000), &config);
        assert_eq!(state, State([10, 1, 9]));

        let state = quantize(&obs(0, 40_000 + 10 * 1024, 40_000), &config);
        assert_eq!(state.0[1], 2);

        let state = quantize(&obs(0, 40_000 + 21 * 1024, 40_000), &config);
        assert_eq!(state.0[1], 3);

        // RTT below the min-RTT is no queueing.
        let state = quantize(&obs(0, 10_000, 40_000), &config);
        assert_eq!(state.0[1], 0);

        let state = quantize(&obs(0, 0, u32::MAX), &config);
        assert_eq!(state.0[2], 199);
    }

    #[test]
    fn test_softsign_buckets() {
        let config = Config::softsign();
        let stable = quantize(&obs(1000, 50_000, 40_000), &config);
        assert_eq!(stable, State([5, 9, 9]));

        let surge = Observation {
            throughput: 100_000,
            smooth_throughput: 0,
            rtt_us: 90_000,
            previous_rtt_us: 40_000,
            min_rtt_us: 40_000,
        };
        // Ratio 10 and delta 18 both clamp or sit at the top.
        assert_eq!(quantize(&surge, &config), State([9, 18, 18]));

        let drop = Observation {
            throughput: 0,
            smooth_throughput: 100_000,
            rtt_us: 10_000,
            previous_rtt_us: 90_000,
            min_rtt_us: 10_000,
        };
        assert_eq!(quantize(&drop, &config), State([0, 0, 0]));
    }

    #[test]
    fn test_quantize_always_within_bounds() {
        let samples = [0u32, 1, 7, 512, 4096, 65_535, 1 << 20, u32::MAX / 2, u32::MAX];
        for config in [Config::tiered(), Config::softsign()] {
            for &a in &samples {
                for &b in &samples {
                    for &c in &samples {
                        let obs = Observation {
                            throughput: a,
                            smooth_throughput: b,
                            rtt_us: c,
                            previous_rtt_us: a,
                            min_rtt_us: b,
                        };
                        let state = quantize(&obs, &config);
                        for (component, bound) in state.0.iter().zip(config.state.bounds) {
                            assert!(*component < bound, "{state:?} out of {bound}");
                        }
                    }
                }
            }
        }
    }
}
