//! The reward signal for the learning step.
//! 学习步骤使用的奖励信号。

use super::quantizer::{queueing_delay_ms, relative, softsign};
use crate::config::{Config, Profile};

/// Everything the reward is computed from.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardInputs {
    /// Throughput over the last interval, in kbit/s.
    pub throughput: u32,
    pub smooth_throughput: u32,
    /// Mean of the recent throughput window (each entry `throughput >> 5`).
    pub recent_mean: u32,
    pub rtt_us: u32,
    pub previous_rtt_us: u32,
    pub min_rtt_us: u32,
    /// Retransmissions scaled to one control interval.
    pub retransmits: u32,
}

/// Computes the reward for the configured profile.
///
/// Returns zero when the RTT sample is unknown or the retransmission
/// denominator degenerates, instead of dividing by it.
///
/// 按配置的策略计算奖励。当RTT采样未知或重传分母退化时返回0。
pub fn reward(inputs: &RewardInputs, config: &Config) -> i32 {
    let Some(retransmit_factor) = inputs.retransmits.checked_add(1) else {
        return 0;
    };
    if inputs.rtt_us == 0 {
        return 0;
    }
    let weights = &config.reward;
    let value = match config.profile {
        Profile::Tiered => {
            let goodness = relative(inputs.throughput >> 5, inputs.recent_mean, 100);
            let delay = queueing_delay_ms(inputs.rtt_us, inputs.min_rtt_us);
            let loss = if inputs.throughput > 0 {
                i64::from(retransmit_factor / inputs.throughput)
            } else {
                0
            };
            weights.throughput_weight * goodness
                - weights.delay_weight * delay
                - weights.loss_weight * 100 * loss
        }
        Profile::Softsign => {
            let throughput_delta = softsign(
                i64::from(inputs.throughput) - i64::from(inputs.smooth_throughput),
                2000,
            );
            let delay_delta = softsign(
                i64::from(inputs.rtt_us) - i64::from(inputs.previous_rtt_us),
                800,
            );
            let smooth_ratio = (inputs.smooth_throughput / inputs.throughput.max(1)).min(20);
            weights.throughput_weight * throughput_delta
                - weights.delay_weight * delay_delta
                - weights.loss_weight * i64::from(smooth_ratio)
        }
    };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
