//! 定义了决策引擎的可配置参数。
//! Defines configurable parameters for the decision engine.

use crate::congestion::Action;
use crate::table::{STATE_DIMS, TableShape};
use std::time::Duration;

/// The two policy profiles the engine ships with.
///
/// 引擎提供的两种策略配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Bucketed throughput/delay/min-RTT state, three actions, tiered window
    /// steps and adaptive exploration.
    /// 分桶状态、三个动作、分级窗口步长和自适应探索。
    Tiered,
    /// Softsign-normalised state, four actions and a richer reward shape.
    /// 软符号归一化状态、四个动作和更丰富的奖励形式。
    Softsign,
}

impl Profile {
    /// Returns the full configuration of this profile.
    pub fn config(self) -> Config {
        match self {
            Profile::Tiered => Config::tiered(),
            Profile::Softsign => Config::softsign(),
        }
    }
}

/// A structure containing all configurable parameters of the engine.
///
/// 包含引擎所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct Config {
    /// Selects the quantizer and reward formulas.
    /// 选择量化器和奖励函数的形式。
    pub profile: Profile,

    /// Q-learning update parameters.
    /// Q学习更新参数。
    pub learning: LearningConfig,

    /// Control interval and mode machine timing.
    /// 控制间隔与模式状态机的时间参数。
    pub timing: TimingConfig,

    /// Epsilon-greedy parameters.
    /// epsilon-贪心参数。
    pub exploration: ExplorationConfig,

    /// Action table and window step tables.
    /// 动作表和窗口步长表。
    pub window: WindowConfig,

    /// Reward weights.
    /// 奖励权重。
    pub reward: RewardConfig,

    /// State bucket bounds.
    /// 状态分桶上界。
    pub state: StateConfig,

    /// Disable the shared table when the last flow is released.
    ///
    /// Off by default: the table is shared by every flow, so retiring it with
    /// one connection discards learning for all the others.
    ///
    /// 最后一个流释放时禁用共享表。默认关闭。
    pub erase_on_last_release: bool,
}

/// Q-learning update parameters, in fixed point.
///
/// `new = ((scale - lr) * old + lr * (reward + (discount * max_next) >> discount_shift)) >> scale_shift`
#[derive(Debug, Clone)]
pub struct LearningConfig {
    /// log2 of the fixed-point scale (1024).
    pub scale_shift: u32,
    /// Learning rate out of `1 << scale_shift`.
    pub learning_rate: i64,
    /// Discount factor out of `1 << discount_shift`.
    pub discount_factor: i64,
    pub discount_shift: u32,
    /// Mark the flow exited when an update collapses a value to zero.
    /// 当更新使Q值归零时将流标记为退出。
    pub exit_on_zero_update: bool,
}

/// How long a control interval lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlInterval {
    /// A multiple of the current min-RTT, taken in whole milliseconds.
    MinRttMultiple(u32),
    /// A fixed interval.
    Fixed(Duration),
}

/// Control interval and mode machine timing.
///
/// 控制间隔与模式状态机的时间参数。
#[derive(Debug, Clone)]
pub struct TimingConfig {
    pub control_interval: ControlInterval,
    /// How long the startup ramp may last before training begins.
    /// 启动阶段的最长持续时间。
    pub startup_duration: Duration,
    /// How often the min-RTT is re-probed.
    /// 重新探测最小RTT的周期。
    pub probe_interval: Duration,
    /// How long a probe holds the reduced window.
    /// 每次探测保持缩小窗口的时长。
    pub probe_duration: Duration,
}

/// Epsilon-greedy parameters.
///
/// An exploration override happens when `draw % (base * (1 + step)) < epsilon`.
#[derive(Debug, Clone)]
pub struct ExplorationConfig {
    pub epsilon: u32,
    pub base: u32,
    /// Whether `epsilon_step` decays over stable periods.
    pub adaptive: bool,
    /// Upper bound of `epsilon_step`.
    pub max_step: u32,
    /// Evaluations per `epsilon_step` increment.
    pub evaluations_per_step: u32,
    /// A greedy pick of this action is never overridden.
    pub exempt: Option<Action>,
}

/// How the window is cut when a min-RTT probe starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeWindow {
    /// `1 + cwnd / 4`.
    Quarter,
    /// `min(cwnd, n)`.
    Fixed(u32),
}

/// Action table and window step tables.
///
/// 动作表和窗口步长表。
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Table column `i` holds the value of `actions[i]`.
    /// 表的第 `i` 列对应 `actions[i]`。
    pub actions: Vec<Action>,
    /// Grow steps by tier, divided by the current window.
    pub up_steps: Vec<u32>,
    /// Smallest grow step after division.
    pub min_up_step: u32,
    /// Consecutive increases before the grow tier rises.
    pub up_tier_after: u32,
    /// Shrink steps by consecutive decreases; beyond the last the window halves.
    pub down_steps: Vec<u32>,
    /// Window the flow falls back to after a degenerate update.
    pub initial_window: u32,
    pub probe_window: ProbeWindow,
}

/// Reward weights.
#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub throughput_weight: i64,
    pub delay_weight: i64,
    pub loss_weight: i64,
}

/// State bucket bounds.
#[derive(Debug, Clone)]
pub struct StateConfig {
    pub bounds: [u16; STATE_DIMS],
}

impl Config {
    /// The bucketed, three-action profile.
    pub fn tiered() -> Self {
        Self {
            profile: Profile::Tiered,
            learning: LearningConfig::default(),
            timing: TimingConfig::default(),
            exploration: ExplorationConfig::default(),
            window: WindowConfig::default(),
            reward: RewardConfig::default(),
            state: StateConfig::default(),
            erase_on_last_release: false,
        }
    }

    /// The softsign, four-action profile.
    pub fn softsign() -> Self {
        Self {
            profile: Profile::Softsign,
            learning: LearningConfig {
                exit_on_zero_update: true,
                ..LearningConfig::default()
            },
            timing: TimingConfig {
                control_interval: ControlInterval::Fixed(Duration::from_millis(100)),
                ..TimingConfig::default()
            },
            exploration: ExplorationConfig {
                adaptive: false,
                exempt: Some(Action::Shrink),
                ..ExplorationConfig::default()
            },
            window: WindowConfig {
                actions: vec![Action::Grow, Action::GrowOne, Action::Shrink, Action::Hold],
                up_steps: vec![30],
                min_up_step: 0,
                down_steps: Vec::new(),
                probe_window: ProbeWindow::Fixed(4),
                ..WindowConfig::default()
            },
            reward: RewardConfig {
                throughput_weight: 3,
                delay_weight: 1,
                loss_weight: 1,
            },
            state: StateConfig {
                bounds: [10, 19, 19],
            },
            erase_on_last_release: false,
        }
    }

    /// The table shape implied by the state bounds and the action table.
    pub fn table_shape(&self) -> TableShape {
        TableShape::new(
            self.state.bounds,
            u8::try_from(self.window.actions.len()).unwrap_or(u8::MAX),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::tiered()
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            scale_shift: 10,
            learning_rate: 512,
            discount_factor: 12,
            discount_shift: 4,
            exit_on_zero_update: false,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            control_interval: ControlInterval::MinRttMultiple(2),
            startup_duration: Duration::from_millis(2000),
            probe_interval: Duration::from_secs(10),
            probe_duration: Duration::from_millis(200),
        }
    }
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            epsilon: 1,
            base: 10,
            adaptive: true,
            max_step: 64,
            evaluations_per_step: 15,
            exempt: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            actions: vec![Action::Grow, Action::Shrink, Action::Hold],
            up_steps: vec![30, 150, 750, 3750, 18750, 93750, 468750, 2343750],
            min_up_step: 1,
            up_tier_after: 3,
            down_steps: vec![1, 3, 5, 9, 15, 21, 33, 51],
            initial_window: 10,
            probe_window: ProbeWindow::Quarter,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            throughput_weight: 1,
            delay_weight: 1,
            loss_weight: 1,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            bounds: [200, 4, 200],
        }
    }
}
