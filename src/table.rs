//! The shared Q-table.
//! 共享的Q表。
//!
//! One dense table of `i32` action values is shared by every flow: a policy
//! learned on one connection is reused by the next. Each cell is an atomic so
//! concurrent flows can read and update it without a global lock.
//!
//! 所有流共享同一张稠密的 `i32` 动作价值表：在一个连接上学到的策略会被后续连接复用。
//! 每个单元都是原子变量，因此并发的流无需全局锁即可读取和更新。

mod codec;

use crate::error::{Error, Result};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, trace};

/// Number of components in a state tuple.
pub const STATE_DIMS: usize = 3;

/// Returned by reads on a disabled table or an out-of-range cell.
/// 在禁用的表或越界单元上读取时返回的哨兵值。
pub const UNAVAILABLE: i32 = -1;

/// A discrete state: one bucket per dimension.
///
/// 离散状态：每个维度一个分桶。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct State(pub [u16; STATE_DIMS]);

/// The dimensions of a table: three state bounds and the action count.
///
/// 表的维度：三个状态上界和动作数量。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableShape {
    pub bounds: [u16; STATE_DIMS],
    pub actions: u8,
}

impl TableShape {
    pub const fn new(bounds: [u16; STATE_DIMS], actions: u8) -> Self {
        Self { bounds, actions }
    }

    /// Total number of cells.
    pub fn cells(&self) -> usize {
        self.bounds.iter().map(|&b| b as usize).product::<usize>() * self.actions as usize
    }

    fn validate(self) -> Result<Self> {
        if self.actions == 0 || self.bounds.contains(&0) {
            return Err(Error::InvalidShape(self));
        }
        Ok(self)
    }

    /// Flattened index of `(state, action)`, or `None` if any component is
    /// out of range.
    pub fn index(&self, state: &State, action: usize) -> Option<usize> {
        if action >= self.actions as usize {
            return None;
        }
        if state.0.iter().zip(self.bounds).any(|(&s, b)| s >= b) {
            return None;
        }
        let [s0, s1, s2] = state.0.map(usize::from);
        let [_, b1, b2] = self.bounds.map(usize::from);
        Some(self.actions as usize * (s0 * b1 * b2 + s1 * b2 + s2) + action)
    }
}

/// A dense action-value table shaped `[s0][s1][s2][action]`.
///
/// 形状为 `[s0][s1][s2][action]` 的稠密动作价值表。
#[derive(Debug)]
pub struct QTable {
    shape: TableShape,
    cells: Box<[AtomicI32]>,
    enabled: AtomicBool,
}

impl QTable {
    /// Allocates a zero-initialized, enabled table.
    ///
    /// 分配一张零初始化并启用的表。
    pub fn create(shape: TableShape) -> Result<Self> {
        Ok(Self::zeroed(shape.validate()?))
    }

    fn zeroed(shape: TableShape) -> Self {
        let cells = (0..shape.cells()).map(|_| AtomicI32::new(0)).collect();
        Self {
            shape,
            cells,
            enabled: AtomicBool::new(true),
        }
    }

    fn from_cells(shape: TableShape, values: Vec<i32>) -> Self {
        Self {
            shape,
            cells: values.into_iter().map(AtomicI32::new).collect(),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn shape(&self) -> TableShape {
        self.shape
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Makes the table readable and writable again. Values are kept.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Retires the table: reads return [`UNAVAILABLE`] and writes are
    /// dropped until [`QTable::enable`] is called. Values are kept.
    ///
    /// 停用表：读取返回 [`UNAVAILABLE`]，写入被丢弃，数值保留。
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    fn cell(&self, state: &State, action: usize) -> Option<&AtomicI32> {
        if !self.is_enabled() {
            return None;
        }
        let index = self.shape.index(state, action);
        if index.is_none() {
            trace!(?state, action, "Rejected out-of-range table access");
        }
        index.and_then(|i| self.cells.get(i))
    }

    /// Reads one cell, or [`UNAVAILABLE`] if disabled or out of range.
    pub fn get(&self, state: &State, action: usize) -> i32 {
        self.cell(state, action)
            .map_or(UNAVAILABLE, |cell| cell.load(Ordering::Relaxed))
    }

    /// Writes one cell. A no-op if disabled or out of range.
    pub fn set(&self, state: &State, action: usize, value: i32) {
        if let Some(cell) = self.cell(state, action) {
            cell.store(value, Ordering::Relaxed);
        }
    }

    /// Atomically replaces one cell with `f(old)`.
    ///
    /// Returns the written value, or `None` if the cell is unavailable or `f`
    /// declined to write. `f` may run more than once under contention.
    ///
    /// 原子地将单元替换为 `f(old)`。
    pub fn update<F>(&self, state: &State, action: usize, mut f: F) -> Option<i32>
    where
        F: FnMut(i32) -> Option<i32>,
    {
        let cell = self.cell(state, action)?;
        let mut written = None;
        cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |old| {
            written = f(old);
            written
        })
        .ok()?;
        written
    }

    /// All action values of one state, in column order.
    pub fn row(&self, state: &State) -> Vec<i32> {
        (0..self.shape.actions as usize)
            .map(|action| self.get(state, action))
            .collect()
    }

    /// A copy of every cell in storage order.
    pub fn snapshot(&self) -> Vec<i32> {
        self.cells
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .collect()
    }

    /// Encodes the table into an opaque blob.
    ///
    /// 将表编码为不透明的字节块。
    pub fn save(&self) -> Bytes {
        codec::encode(self.shape, &self.snapshot())
    }

    /// Decodes a table previously produced by [`QTable::save`].
    ///
    /// 解码由 [`QTable::save`] 生成的表。
    pub fn load(blob: &[u8]) -> Result<Self> {
        let (shape, values) = codec::decode(blob)?;
        Ok(Self::from_cells(shape, values))
    }
}

/// The process-wide home of the shared table.
///
/// The table is created at most once; later requests hand out the same table
/// (re-enabling it if it was retired) and never zero it again.
///
/// Flows hold the table through [`TableSlot::acquire`] and
/// [`TableSlot::release`]. Both run under one lock together with the live
/// count, so retiring the table on the last release cannot interleave with a
/// new acquisition.
///
/// 共享表在进程内的唯一存放处。表最多创建一次，之后的请求返回同一张表，且不会再次清零。
#[derive(Debug, Default)]
pub struct TableSlot {
    slot: OnceLock<Arc<QTable>>,
    live: Mutex<usize>,
}

impl TableSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a table that was loaded from storage. If a table already
    /// lives in the slot, that one is kept and returned.
    pub fn install(&self, table: QTable) -> Arc<QTable> {
        let mut installed = false;
        let shared = self.slot.get_or_init(|| {
            installed = true;
            Arc::new(table)
        });
        if !installed {
            debug!("Shared table already present, ignoring loaded copy");
        }
        shared.clone()
    }

    /// Returns the shared table, creating a zeroed one on first use.
    ///
    /// 返回共享表，首次使用时创建一张零初始化的表。
    pub fn get_or_create(&self, shape: TableShape) -> Result<Arc<QTable>> {
        let shape = shape.validate()?;
        let table = self.slot.get_or_init(|| {
            debug!(?shape, cells = shape.cells(), "Creating shared table");
            Arc::new(QTable::zeroed(shape))
        });
        if table.shape() != shape {
            return Err(Error::ShapeMismatch {
                expected: shape,
                found: table.shape(),
            });
        }
        table.enable();
        Ok(table.clone())
    }

    pub fn get(&self) -> Option<&Arc<QTable>> {
        self.slot.get()
    }

    fn live(&self) -> MutexGuard<'_, usize> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hands the shared table to a new flow and counts it as live.
    ///
    /// 将共享表交给新流并将其计为存活。
    pub fn acquire(&self, shape: TableShape) -> Result<Arc<QTable>> {
        let mut live = self.live();
        let table = self.get_or_create(shape)?;
        *live += 1;
        Ok(table)
    }

    /// Counts one flow as gone. When `retire` is set and no flow is left, the
    /// table is disabled. Returns whether it was.
    ///
    /// 将一个流计为已结束。若 `retire` 为真且已无存活流，则禁用表。
    pub fn release(&self, retire: bool) -> bool {
        let mut live = self.live();
        *live = live.saturating_sub(1);
        if !retire || *live > 0 {
            return false;
        }
        match self.slot.get() {
            Some(table) => {
                table.disable();
                true
            }
            None => false,
        }
    }

    /// Number of flows currently holding the table.
    pub fn live_flows(&self) -> usize {
        *self.live()
    }
}
