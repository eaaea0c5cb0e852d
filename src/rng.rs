//! Injected randomness for the exploration policy.
//! 探索策略使用的可注入随机源。

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// A source of uniformly distributed integers.
///
/// Every `rand` generator is a `RandomSource`. Tests can use a seeded
/// [`StdRng`] or a [`SequenceRandom`] to pin the exact draws.
///
/// 均匀分布整数的来源。所有 `rand` 生成器都实现了此 trait。
pub trait RandomSource: Send {
    /// Draws one uniformly distributed `u32`.
    fn draw(&mut self) -> u32;

    /// Draws a value in `[0, bound)` by reduction modulo `bound`.
    /// A `bound` of zero yields zero.
    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.draw() % bound
    }
}

impl<R: RngCore + Send> RandomSource for R {
    fn draw(&mut self) -> u32 {
        self.next_u32()
    }
}

/// The generator the engine gives each new flow.
pub fn flow_rng() -> StdRng {
    StdRng::from_os_rng()
}

/// A generator that replays a fixed, cyclic sequence of draws.
///
/// 按固定顺序循环回放的生成器，用于确定性测试。
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<u32>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl RngCore for SequenceRandom {
    fn next_u32(&mut self) -> u32 {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        let low = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
