//! The per-flow Q-learning congestion controller.
//! 每个流的Q学习拥塞控制器。
//!
//! A [`FlowController`] is driven once per delivery-rate sample. While the
//! flow is idle it runs one learning step per control interval: measure,
//! quantize, reward, update the shared table, then pick and apply the next
//! window action. Startup and min-RTT probing run alongside and may override
//! the window.
//!
//! [`FlowController`] 在每次交付速率采样时被驱动。流空闲时，每个控制间隔运行一次学习步骤：
//! 测量、量化、计算奖励、更新共享表，然后选择并执行下一个窗口动作。

pub mod action;
pub mod exploration;
pub mod quantizer;
pub mod reward;
pub mod rtt;
pub mod stats;

pub use action::{Action, Hysteresis};
pub use exploration::{Choice, Explorer};
pub use rtt::{Mode, RttTracker};
pub use stats::DeliveryStats;

use crate::clock::{Tick, duration_millis};
use crate::config::{Config, ControlInterval, LearningConfig};
use crate::rng::RandomSource;
use crate::sample::{RateSample, Transport};
use crate::table::{QTable, State};
use exploration::Volatility;
use quantizer::Observation;
use reward::RewardInputs;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// The slow-start threshold reported to the host. The engine does not use
/// one.
/// 报告给主机的慢启动阈值。本引擎不使用慢启动阈值。
pub const INFINITE_SSTHRESH: u32 = 0x7fff_ffff;

/// A trait for congestion controllers driven by delivery-rate samples.
///
/// 由交付速率采样驱动的拥塞控制器 trait。
pub trait CongestionControl: Send {
    /// Called once per delivery-rate sample.
    ///
    /// 每次交付速率采样时调用。
    fn on_sample(&mut self, sample: &RateSample, transport: &mut dyn Transport);

    /// The slow-start threshold to report.
    fn ssthresh(&self) -> u32;

    /// The window to restore when a loss response is undone.
    ///
    /// 撤销丢包响应时恢复的窗口。
    fn undo_window(&self, cwnd: u32) -> u32;
}

/// The decision state of one connection.
///
/// 单个连接的决策状态。
#[derive(Debug)]
pub struct FlowController<R> {
    config: Arc<Config>,
    table: Arc<QTable>,
    rng: R,
    rtt: RttTracker,
    stats: DeliveryStats,
    explorer: Explorer,
    hysteresis: Hysteresis,
    prev_state: State,
    current_state: State,
    /// Column of the last chosen action; `None` until the first choice.
    action: Option<usize>,
    last_update: Tick,
    exited: bool,
}

impl<R: RandomSource> FlowController<R> {
    /// Creates the decision state of a new connection.
    ///
    /// 为新连接创建决策状态。
    pub fn new(
        config: Arc<Config>,
        table: Arc<QTable>,
        rng: R,
        initial_min_rtt_us: u32,
        now: Tick,
    ) -> Self {
        Self {
            config,
            table,
            rng,
            rtt: RttTracker::new(initial_min_rtt_us, now),
            stats: DeliveryStats::default(),
            explorer: Explorer::default(),
            hysteresis: Hysteresis::default(),
            prev_state: State::default(),
            current_state: State::default(),
            action: None,
            last_update: now,
            exited: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.rtt.mode()
    }

    pub fn rtt(&self) -> &RttTracker {
        &self.rtt
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.stats
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    pub fn hysteresis(&self) -> &Hysteresis {
        &self.hysteresis
    }

    pub fn current_state(&self) -> State {
        self.current_state
    }

    pub fn previous_state(&self) -> State {
        self.prev_state
    }

    /// The last chosen action, if any.
    pub fn last_action(&self) -> Option<Action> {
        self.action
            .and_then(|column| self.config.window.actions.get(column).copied())
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    pub fn table(&self) -> &Arc<QTable> {
        &self.table
    }

    /// Length of the current control interval.
    pub fn control_interval(&self) -> Duration {
        match self.config.timing.control_interval {
            ControlInterval::Fixed(interval) => interval,
            ControlInterval::MinRttMultiple(multiple) => Duration::from_millis(
                u64::from(multiple) * u64::from(self.rtt.min_rtt_us() >> 10),
            ),
        }
    }

    /// Runs the learning step if the control interval elapsed while idle.
    fn train(&mut self, sample: &RateSample, transport: &mut dyn Transport) {
        if self.rtt.mode() != Mode::Idle {
            return;
        }
        let interval = self.control_interval();
        if !sample.now.has_elapsed(self.last_update, interval) {
            return;
        }
        let elapsed_ms = sample.now.millis_since(self.last_update);

        match self.action {
            None => self.stats.rebase(transport),
            Some(column) => {
                self.stats
                    .measure(transport, elapsed_ms, duration_millis(interval));

                if self.exited {
                    self.exited = false;
                    let cwnd = self.config.window.initial_window.max(1);
                    transport.set_congestion_window(cwnd);
                    self.last_update = sample.now;
                    debug!(cwnd, "Window reset after a degenerate update");
                    return;
                }

                self.prev_state = self.current_state;
                self.current_state = quantizer::quantize(&self.observation(sample), &self.config);
                self.learn(column, sample);
            }
        }

        self.act(transport);
        self.last_update = sample.now;

        let signals = Volatility {
            recent_mean: self.stats.recent_mean(),
            smooth_throughput: self.stats.smooth_throughput,
            rtt_us: sample.rtt_us,
            min_rtt_us: self.rtt.min_rtt_us(),
        };
        self.explorer.record(&signals, &self.config.exploration);
    }

    fn observation(&self, sample: &RateSample) -> Observation {
        Observation {
            throughput: self.stats.throughput,
            smooth_throughput: self.stats.smooth_throughput,
            rtt_us: sample.rtt_us,
            previous_rtt_us: self.rtt.previous_rtt_us(),
            min_rtt_us: self.rtt.min_rtt_us(),
        }
    }

    /// One temporal-difference update of the previous state/action pair.
    ///
    /// 对上一个状态/动作对执行一次时序差分更新。
    fn learn(&mut self, column: usize, sample: &RateSample) {
        let inputs = RewardInputs {
            throughput: self.stats.throughput,
            smooth_throughput: self.stats.smooth_throughput,
            recent_mean: self.stats.recent_mean(),
            rtt_us: sample.rtt_us,
            previous_rtt_us: self.rtt.previous_rtt_us(),
            min_rtt_us: self.rtt.min_rtt_us(),
            retransmits: self.stats.retransmits,
        };
        let reward = reward::reward(&inputs, &self.config);
        let max_next = self
            .table
            .row(&self.current_state)
            .into_iter()
            .max()
            .unwrap_or(0);

        let learning = &self.config.learning;
        let mut collapsed = false;
        let written = self.table.update(&self.prev_state, column, |old| {
            let value = td_update(old, reward, max_next, learning);
            if value == 0 && learning.exit_on_zero_update {
                collapsed = true;
                return None;
            }
            collapsed = false;
            Some(value)
        });
        if collapsed {
            self.exited = true;
            debug!(state = ?self.prev_state, column, "Update collapsed to zero, flow exited");
        }
        trace!(
            reward,
            max_next,
            ?written,
            prev = ?self.prev_state,
            current = ?self.current_state,
            column,
            "Q-table updated"
        );
    }

    /// Picks the next action from the current row and applies it.
    fn act(&mut self, transport: &mut dyn Transport) {
        let row = self.table.row(&self.current_state);
        let window = &self.config.window;
        let choice = self
            .explorer
            .choose(&row, &window.actions, &self.config.exploration, &mut self.rng);
        let action = window
            .actions
            .get(choice.column)
            .copied()
            .unwrap_or(Action::Hold);
        let cwnd = action::execute(
            action,
            transport.congestion_window(),
            &mut self.hysteresis,
            window,
        );
        transport.set_congestion_window(cwnd);
        self.action = Some(choice.column);
        trace!(
            ?action,
            explored = choice.explored,
            cwnd,
            state = ?self.current_state,
            "Action executed"
        );
    }
}

impl<R: RandomSource> CongestionControl for FlowController<R> {
    fn on_sample(&mut self, sample: &RateSample, transport: &mut dyn Transport) {
        self.rtt
            .on_startup_sample(sample, transport, &self.config.timing);
        self.train(sample, transport);
        self.rtt.record_previous(sample);
        self.rtt.on_sample(
            sample,
            transport,
            &self.config.timing,
            self.config.window.probe_window,
        );
    }

    fn ssthresh(&self) -> u32 {
        INFINITE_SSTHRESH
    }

    fn undo_window(&self, cwnd: u32) -> u32 {
        self.rtt.undo_window(cwnd)
    }
}

/// Fixed-point one-step TD update:
/// `((scale - lr) * old + lr * (reward + (discount * max_next >> d))) >> s`.
///
/// Shifts are arithmetic, so negative intermediates round toward negative
/// infinity. The result saturates to the `i32` range.
///
/// 定点数单步时序差分更新。移位为算术移位，负数向负无穷取整。
pub fn td_update(old: i32, reward: i32, max_next: i32, learning: &LearningConfig) -> i32 {
    let scale = 1i64 << learning.scale_shift;
    let lr = learning.learning_rate;
    let future = (learning.discount_factor * i64::from(max_next)) >> learning.discount_shift;
    let value = ((scale - lr) * i64::from(old) + lr * (i64::from(reward) + future))
        >> learning.scale_shift;
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
