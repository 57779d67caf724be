//! RRC: the Radio Resource Control plane of a tactical MANET radio.
//!
//! Classifies and admits L7 traffic into priority queues, runs the TDMA
//! slot schedule and voice reservation FSM, tracks neighbor link quality,
//! and triggers L3 (OLSR-style) route recomputation on topology change.
//! See the module-level docs below for the responsibility each piece owns.

pub mod classifier;
pub mod config;
pub mod connection;
pub mod core;
pub mod error;
pub mod frame;
pub mod ipc;
pub mod message;
pub mod ncslot;
pub mod queue;
pub mod scheduler;
pub mod time;
pub mod topology;
pub mod voice;

pub use config::Config;
pub use core::RrcCore;
pub use error::{AdmissionError, Counters};
