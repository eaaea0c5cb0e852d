//! Min-RTT tracking and the startup / probe mode machine.
//! 最小RTT跟踪以及启动/探测模式状态机。
//!
//! ```text
//! Startup ──(recovery or startup_duration)──▶ Idle ◀──(probe_duration)── ProbeRtt
//!                                              └──────(probe_interval)──────▶┘
//! ```

use crate::clock::Tick;
use crate::config::{ProbeWindow, TimingConfig};
use crate::sample::{RateSample, Transport};
use tracing::debug;

/// The mode of a flow.
///
/// 流所处的模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The window ramps up by the acknowledged count of every sample.
    /// 窗口按每次采样确认的包数增长。
    Startup,
    /// Trainable: the control-interval learning step runs.
    /// 可训练：控制间隔的学习步骤在此模式下运行。
    Idle,
    /// The window is held low so a fresh min-RTT can be measured.
    /// 窗口保持在较低水平以重新测量最小RTT。
    ProbeRtt,
}

/// RTT bookkeeping and mode of one flow.
///
/// 单个流的RTT记录与模式。
#[derive(Debug, Clone)]
pub struct RttTracker {
    mode: Mode,
    /// Running minimum, reset at the start of every probe.
    min_rtt_us: u32,
    /// Longer-horizon minimum, never reset.
    prop_rtt_us: u32,
    /// RTT of the previous sample that carried one.
    previous_rtt_us: u32,
    /// Window snapshot taken when a probe starts.
    prior_cwnd: u32,
    startup_stamp: Tick,
    probe_stamp: Tick,
}

impl RttTracker {
    /// Starts a tracker in [`Mode::Startup`]. An initial min-RTT of zero
    /// means none is known yet.
    pub fn new(initial_min_rtt_us: u32, now: Tick) -> Self {
        let min_rtt_us = if initial_min_rtt_us == 0 {
            u32::MAX
        } else {
            initial_min_rtt_us
        };
        Self {
            mode: Mode::Startup,
            min_rtt_us,
            prop_rtt_us: min_rtt_us,
            previous_rtt_us: initial_min_rtt_us,
            prior_cwnd: 0,
            startup_stamp: now,
            probe_stamp: now,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn min_rtt_us(&self) -> u32 {
        self.min_rtt_us
    }

    pub fn prop_rtt_us(&self) -> u32 {
        self.prop_rtt_us
    }

    pub fn previous_rtt_us(&self) -> u32 {
        self.previous_rtt_us
    }

    pub fn prior_cwnd(&self) -> u32 {
        self.prior_cwnd
    }

    /// Startup ramp: grow by the acknowledged count until the transport
    /// enters loss recovery or the startup duration runs out.
    ///
    /// 启动阶段：按确认数增长窗口，直到进入丢包恢复或启动时长耗尽。
    pub fn on_startup_sample(
        &mut self,
        sample: &RateSample,
        transport: &mut dyn Transport,
        timing: &TimingConfig,
    ) {
        if self.mode != Mode::Startup {
            return;
        }
        if transport.in_recovery() {
            self.mode = Mode::Idle;
            debug!(cwnd = transport.congestion_window(), "Startup ended by loss recovery");
            return;
        }
        let cwnd = transport
            .congestion_window()
            .saturating_add(sample.acked_sacked)
            .max(1);
        transport.set_congestion_window(cwnd);
        if sample.now.has_elapsed(self.startup_stamp, timing.startup_duration) {
            self.mode = Mode::Idle;
            debug!(cwnd, "Startup duration elapsed");
        }
    }

    /// Remembers the sample's RTT as the previous one for the next sample.
    pub fn record_previous(&mut self, sample: &RateSample) {
        if sample.rtt_us > 0 {
            self.previous_rtt_us = sample.rtt_us;
        }
    }

    /// Tracks the minimum RTT and drives the probe cycle.
    ///
    /// 跟踪最小RTT并驱动探测周期。
    pub fn on_sample(
        &mut self,
        sample: &RateSample,
        transport: &mut dyn Transport,
        timing: &TimingConfig,
        probe_window: ProbeWindow,
    ) {
        let now = sample.now;
        let probe_due = now.has_elapsed(self.probe_stamp, timing.probe_interval);

        if sample.rtt_us > 0 && sample.rtt_us < self.min_rtt_us {
            self.min_rtt_us = sample.rtt_us;
            if self.mode != Mode::ProbeRtt {
                self.probe_stamp = now;
            }
            self.prop_rtt_us = self.prop_rtt_us.min(self.min_rtt_us);
        }

        if probe_due && self.mode == Mode::Idle {
            self.mode = Mode::ProbeRtt;
            self.probe_stamp = now;
            self.prior_cwnd = transport.congestion_window();
            let cwnd = match probe_window {
                ProbeWindow::Quarter => 1 + (self.prior_cwnd >> 2),
                ProbeWindow::Fixed(limit) => self.prior_cwnd.min(limit),
            };
            transport.set_congestion_window(cwnd.max(1));
            if sample.rtt_us > 0 {
                self.min_rtt_us = sample.rtt_us;
            }
            debug!(
                prior_cwnd = self.prior_cwnd,
                cwnd = cwnd.max(1),
                "Entering min-RTT probe"
            );
        }

        if self.mode == Mode::ProbeRtt && now.has_elapsed(self.probe_stamp, timing.probe_duration) {
            self.mode = Mode::Idle;
            transport.set_congestion_window(self.prior_cwnd.max(1));
            debug!(
                cwnd = self.prior_cwnd,
                min_rtt_us = self.min_rtt_us,
                "Min-RTT probe finished"
            );
        }
    }

    /// `max(cwnd, prior_cwnd)`, used to roll back a spurious loss response.
    pub fn undo_window(&self, cwnd: u32) -> u32 {
        cwnd.max(self.prior_cwnd)
    }
}
