//! tests/common/harness.rs
use qcong::{RateSample, Tick, TransportState};
use std::sync::Once;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "qcong=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A crude bottleneck link feeding one flow with delivery-rate samples.
///
/// Every step the link drains at most `capacity` segments. Anything the window
/// puts beyond that queues up and inflates the RTT; a long queue costs a
/// retransmission.
pub struct SimulatedLink {
    pub transport: TransportState,
    pub now: u32,
    step_ms: u32,
    base_rtt_us: u32,
    capacity: u32,
}

impl SimulatedLink {
    pub fn new(base_rtt_us: u32, capacity: u32) -> Self {
        Self {
            transport: TransportState::new(10, 1448),
            now: 0,
            step_ms: 10,
            base_rtt_us,
            capacity,
        }
    }

    /// Starts the clock at `now`, e.g. just before a wraparound.
    pub fn starting_at(mut self, now: u32) -> Self {
        self.now = now;
        self
    }

    /// Advances the link by one step and returns the resulting sample.
    pub fn next_sample(&mut self) -> RateSample {
        self.now = self.now.wrapping_add(self.step_ms);
        let cwnd = self.transport.cwnd;
        let delivered = cwnd.min(self.capacity);
        let queued = cwnd - delivered;
        self.transport.segs_out = self.transport.segs_out.wrapping_add(delivered);
        if queued > self.capacity.saturating_mul(4) {
            self.transport.total_retrans = self.transport.total_retrans.wrapping_add(1);
        }
        let rtt_us = self.base_rtt_us.saturating_add(queued.saturating_mul(100));
        RateSample::new(Tick(self.now), rtt_us, delivered)
    }
}
