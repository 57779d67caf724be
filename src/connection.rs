//! Per-destination `ConnectionContext` lifecycle (§4.6, optional QoS state).

use std::collections::HashMap;

use crate::message::PriorityClass;
use crate::time::{Duration, Instant};

/// FSM states for a per-destination connection context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ConnectionState {
    Null,
    Idle,
    Setup,
    Connected,
    Reconfig,
    Release,
}

/// Per-destination QoS/activity record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionContext {
    pub destination: u8,
    pub state: ConnectionState,
    pub qos_priority: PriorityClass,
    #[serde(skip)]
    pub last_activity: Instant,
    #[serde(skip)]
    pub setup_started: Option<Instant>,
    pub allocated_slots: Vec<u8>,
}

/// Owns all `ConnectionContext`s, keyed by destination node id.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    contexts: HashMap<u8, ConnectionContext>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, destination: u8) -> Option<&ConnectionContext> {
        self.contexts.get(&destination)
    }

    /// Creates a context on first accepted admission for `destination`, or
    /// returns the existing one (§4.6).
    pub fn on_admission(
        &mut self,
        destination: u8,
        qos_priority: PriorityClass,
        now: Instant,
    ) -> &mut ConnectionContext {
        self.contexts
            .entry(destination)
            .or_insert_with(|| ConnectionContext {
                destination,
                state: ConnectionState::Idle,
                qos_priority,
                last_activity: now,
                setup_started: None,
                allocated_slots: Vec::new(),
            });
        let ctx = self.contexts.get_mut(&destination).unwrap();
        if ctx.state == ConnectionState::Idle {
            ctx.state = ConnectionState::Setup;
            ctx.setup_started = Some(now);
        }
        ctx.last_activity = now;
        ctx
    }

    /// First successful transmission: Setup -> Connected.
    pub fn on_transmit_success(&mut self, destination: u8, now: Instant) {
        if let Some(ctx) = self.contexts.get_mut(&destination) {
            if ctx.state == ConnectionState::Setup {
                ctx.state = ConnectionState::Connected;
            }
            ctx.last_activity = now;
        }
    }

    /// Route change: Connected -> Reconfig.
    pub fn on_route_change(&mut self, destination: u8) {
        if let Some(ctx) = self.contexts.get_mut(&destination) {
            if ctx.state == ConnectionState::Connected {
                ctx.state = ConnectionState::Reconfig;
            }
        }
    }

    /// New route accepted: Reconfig -> Connected.
    pub fn on_route_accepted(&mut self, destination: u8) {
        if let Some(ctx) = self.contexts.get_mut(&destination) {
            if ctx.state == ConnectionState::Reconfig {
                ctx.state = ConnectionState::Connected;
            }
        }
    }

    pub fn teardown(&mut self, destination: u8) {
        if let Some(ctx) = self.contexts.get_mut(&destination) {
            ctx.state = ConnectionState::Release;
        }
    }

    /// Sweeps every context for `INACTIVITY_TIMEOUT`/`SETUP_TIMEOUT`
    /// expiry, transitioning expired ones to `Release` and returning their
    /// destinations.
    pub fn sweep_timeouts(
        &mut self,
        now: Instant,
        inactivity_timeout: Duration,
        setup_timeout: Duration,
    ) -> Vec<u8> {
        let mut released = Vec::new();
        for ctx in self.contexts.values_mut() {
            match ctx.state {
                ConnectionState::Connected
                    if now.duration_since(ctx.last_activity) >= inactivity_timeout =>
                {
                    ctx.state = ConnectionState::Release;
                    released.push(ctx.destination);
                }
                ConnectionState::Setup => {
                    if let Some(started) = ctx.setup_started {
                        if now.duration_since(started) >= setup_timeout {
                            ctx.state = ConnectionState::Release;
                            released.push(ctx.destination);
                        }
                    }
                }
                _ => {}
            }
        }
        self.contexts
            .retain(|_, ctx| ctx.state != ConnectionState::Release);
        released
    }
}
