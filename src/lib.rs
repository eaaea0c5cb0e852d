#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the Q-learning congestion-control library.
//! Q学习拥塞控制库的根。

pub mod clock;
pub mod config;
pub mod error;
pub mod rng;
pub mod sample;
pub mod store;
pub mod table;

pub mod congestion;
pub mod engine;

pub use clock::Tick;
pub use config::{Config, Profile};
pub use congestion::{Action, CongestionControl, FlowController};
pub use engine::{Engine, FlowId};
pub use error::{Error, Result};
pub use sample::{RateSample, Transport, TransportState};
