//! Throughput and retransmission-rate derivation from transport counters.
//! 基于传输层计数器推导吞吐量与重传率。

use crate::sample::Transport;

const RECENT_SAMPLES: usize = 5;
const RECENT_CAP: u32 = 65_534;

/// Delivery statistics of one flow, refreshed once per control interval.
///
/// 单个流的交付统计，每个控制间隔刷新一次。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    last_segs_out: u32,
    last_total_retrans: u32,
    /// Throughput over the last interval, in kbit/s.
    pub throughput: u32,
    /// EWMA of `throughput` with gain 1/8.
    pub smooth_throughput: u32,
    /// The last five throughput estimates, each `throughput >> 5`.
    recent: [u16; RECENT_SAMPLES],
    /// Retransmissions over the last interval, scaled to one control interval.
    pub retransmits: u32,
}

impl DeliveryStats {
    /// Restarts counting from the transport's current counters.
    pub fn rebase(&mut self, transport: &dyn Transport) {
        self.last_segs_out = transport.segments_out();
        self.last_total_retrans = transport.total_retransmits();
    }

    /// Recomputes throughput and retransmission rate over `elapsed_ms`.
    ///
    /// 基于 `elapsed_ms` 重新计算吞吐量和重传率。
    pub fn measure(&mut self, transport: &dyn Transport, elapsed_ms: u32, interval_ms: u32) {
        let elapsed = u64::from(elapsed_ms.max(1));

        let segs_out = transport.segments_out();
        let sent_bytes =
            u64::from(segs_out.wrapping_sub(self.last_segs_out)) * u64::from(transport.mss());
        self.throughput = saturate(sent_bytes * 8 / elapsed);
        self.last_segs_out = segs_out;

        self.recent.rotate_left(1);
        self.recent[RECENT_SAMPLES - 1] = (self.throughput >> 5).min(RECENT_CAP) as u16;

        if self.smooth_throughput == 0 {
            self.smooth_throughput = self.throughput;
        }
        self.smooth_throughput =
            self.smooth_throughput - (self.smooth_throughput >> 3) + (self.throughput >> 3);

        let total_retrans = transport.total_retransmits();
        let retransmitted = u64::from(total_retrans.wrapping_sub(self.last_total_retrans));
        self.retransmits = saturate(retransmitted * u64::from(interval_ms) / elapsed);
        self.last_total_retrans = total_retrans;
    }

    /// Mean of the recent throughput window.
    pub fn recent_mean(&self) -> u32 {
        self.recent.iter().map(|&v| u32::from(v)).sum::<u32>() / RECENT_SAMPLES as u32
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
