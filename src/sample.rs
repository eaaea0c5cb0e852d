//! The sample and transport contracts the engine is driven through.
//! 驱动引擎的采样与传输层契约。

use crate::clock::Tick;

/// One delivery-rate sample handed over by the host transport.
///
/// 主机传输层提供的一次交付速率采样。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSample {
    /// When the sample was taken.
    /// 采样时间。
    pub now: Tick,
    /// Round-trip-time estimate in microseconds. Zero means unknown.
    /// 往返时间估计（微秒），0 表示未知。
    pub rtt_us: u32,
    /// Packets newly acknowledged or selectively acknowledged.
    /// 新确认（包括SACK）的包数量。
    pub acked_sacked: u32,
}

impl RateSample {
    pub fn new(now: Tick, rtt_us: u32, acked_sacked: u32) -> Self {
        Self {
            now,
            rtt_us,
            acked_sacked,
        }
    }
}

/// The transport-owned counters the engine reads and mutates.
///
/// The congestion window is owned by the transport and must stay strictly
/// positive; the engine never writes a zero window.
///
/// 由传输层拥有、引擎读取和修改的计数器。
pub trait Transport {
    /// Current congestion window in segments.
    fn congestion_window(&self) -> u32;

    /// Replaces the congestion window.
    fn set_congestion_window(&mut self, cwnd: u32);

    /// Total retransmissions since the connection started.
    fn total_retransmits(&self) -> u32;

    /// Total segments sent since the connection started.
    fn segments_out(&self) -> u32;

    /// Maximum segment size in bytes.
    fn mss(&self) -> u32;

    /// Whether the transport is currently in loss recovery.
    fn in_recovery(&self) -> bool;
}

/// A plain snapshot of transport counters.
///
/// 传输层计数器的简单快照实现。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportState {
    pub cwnd: u32,
    pub total_retrans: u32,
    pub segs_out: u32,
    pub mss: u32,
    pub in_recovery: bool,
}

impl TransportState {
    pub fn new(cwnd: u32, mss: u32) -> Self {
        Self {
            cwnd,
            total_retrans: 0,
            segs_out: 0,
            mss,
            in_recovery: false,
        }
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new(10, 1448)
    }
}

impl Transport for TransportState {
    fn congestion_window(&self) -> u32 {
        self.cwnd
    }

    fn set_congestion_window(&mut self, cwnd: u32) {
        self.cwnd = cwnd;
    }

    fn total_retransmits(&self) -> u32 {
        self.total_retrans
    }

    fn segments_out(&self) -> u32 {
        self.segs_out
    }

    fn mss(&self) -> u32 {
        self.mss
    }

    fn in_recovery(&self) -> bool {
        self.in_recovery
    }
}
