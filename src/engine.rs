//! The host-facing engine: owns the shared table, the per-flow controllers and
//! table persistence.
//!
//! 面向主机的引擎：持有共享表、每个流的控制器以及表的持久化。

use crate::clock::Tick;
use crate::config::Config;
use crate::congestion::{CongestionControl, FlowController, INFINITE_SSTHRESH};
use crate::error::Result;
use crate::rng::flow_rng;
use crate::sample::{RateSample, Transport};
use crate::store::TableStore;
use crate::table::{QTable, TableSlot};
use dashmap::DashMap;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Identifies one connection.
pub type FlowId = u64;

/// The decision engine shared by every connection of a host.
///
/// Each connection gets its own [`FlowController`]; all of them learn into one
/// shared [`QTable`]. The table is loaded once in [`Engine::open`] and saved
/// once in [`Engine::close`], never on the sample path.
///
/// 主机所有连接共享的决策引擎。每个连接拥有自己的 [`FlowController`]，
/// 它们共同更新同一张 [`QTable`]。表只在 [`Engine::open`] 中加载一次，
/// 在 [`Engine::close`] 中保存一次。
#[derive(Debug)]
pub struct Engine<S> {
    config: Arc<Config>,
    slot: TableSlot,
    store: S,
    flows: DashMap<FlowId, FlowController<StdRng>>,
}

impl<S: TableStore> Engine<S> {
    /// Creates the engine and loads the persisted table, if any.
    ///
    /// A blob that cannot be read, cannot be decoded or does not match the
    /// configured shape is ignored; the engine then starts from a zero table.
    ///
    /// 创建引擎并加载已持久化的表。无法读取、解码或形状不匹配的数据会被忽略，
    /// 引擎将从全零表开始。
    pub async fn open(config: Config, store: S) -> Self {
        let engine = Self {
            config: Arc::new(config),
            slot: TableSlot::new(),
            store,
            flows: DashMap::new(),
        };
        engine.restore().await;
        engine
    }

    async fn restore(&self) {
        let blob = match self.store.load().await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("No persisted table, starting from zero");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted table, starting from zero");
                return;
            }
        };
        let table = match QTable::load(&blob) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, len = blob.len(), "Discarding undecodable table");
                return;
            }
        };
        let expected = self.config.table_shape();
        if table.shape() != expected {
            warn!(
                found = ?table.shape(),
                ?expected,
                "Discarding persisted table with a different shape"
            );
            return;
        }
        self.slot.install(table);
        info!(shape = ?expected, "Restored persisted table");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared table, once it exists.
    pub fn table(&self) -> Option<Arc<QTable>> {
        self.slot.get().cloned()
    }

    /// Number of live flows.
    pub fn active_flows(&self) -> usize {
        self.flows.len()
    }

    /// Sets up the decision state of a new connection, creating the shared
    /// table on first use. A flow already registered under `id` is replaced.
    ///
    /// 为新连接建立决策状态，首次使用时创建共享表。
    pub fn on_connection_start(
        &self,
        id: FlowId,
        initial_min_rtt_us: u32,
        now: Tick,
    ) -> Result<()> {
        let table = self.slot.acquire(self.config.table_shape())?;
        let flow = FlowController::new(
            self.config.clone(),
            table,
            flow_rng(),
            initial_min_rtt_us,
            now,
        );
        if self.flows.insert(id, flow).is_some() {
            // The replaced flow no longer holds the table.
            self.slot.release(false);
            debug!(flow = id, "Replaced an existing flow");
        }
        debug!(flow = id, initial_min_rtt_us, "Flow started");
        Ok(())
    }

    /// Drives flow `id` with one delivery-rate sample. Returns `false` if no
    /// such flow is registered.
    ///
    /// 用一次交付速率采样驱动流 `id`。若该流未注册则返回 `false`。
    pub fn on_sample(
        &self,
        id: FlowId,
        sample: &RateSample,
        transport: &mut dyn Transport,
    ) -> bool {
        let Some(mut flow) = self.flows.get_mut(&id) else {
            trace!(flow = id, "Sample for unknown flow ignored");
            return false;
        };
        flow.on_sample(sample, transport);
        true
    }

    /// The window to restore when flow `id` undoes a loss response.
    pub fn undo_window(&self, id: FlowId, cwnd: u32) -> Option<u32> {
        self.flows.get(&id).map(|flow| flow.undo_window(cwnd))
    }

    pub fn ssthresh(&self) -> u32 {
        INFINITE_SSTHRESH
    }

    /// Releases the decision state of flow `id` and returns it.
    ///
    /// The shared table outlives the flow. Only with
    /// [`Config::erase_on_last_release`] is it disabled once no flow is left.
    ///
    /// 释放流 `id` 的决策状态并将其返回。共享表的生命周期长于流。
    pub fn on_connection_end(&self, id: FlowId) -> Option<FlowController<StdRng>> {
        let (_, flow) = self.flows.remove(&id)?;
        debug!(flow = id, remaining = self.flows.len(), "Flow ended");
        if self.slot.release(self.config.erase_on_last_release) {
            debug!("Last flow released, shared table disabled");
        }
        Some(flow)
    }

    /// Persists the shared table and hands the store back. A failed save is
    /// logged and otherwise ignored.
    ///
    /// 持久化共享表并交还存储。保存失败只记录日志。
    pub async fn close(self) -> S {
        if !self.flows.is_empty() {
            debug!(active = self.flows.len(), "Closing with live flows");
        }
        match self.slot.get() {
            Some(table) => {
                let blob = table.save();
                let len = blob.len();
                match self.store.save(blob).await {
                    Ok(()) => info!(len, "Persisted shared table"),
                    Err(e) => warn!(error = %e, "Failed to persist shared table"),
                }
            }
            None => debug!("No shared table to persist"),
        }
        self.store
    }
}
