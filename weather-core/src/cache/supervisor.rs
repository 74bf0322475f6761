use parking_lot::RwLock;
use std::fmt;

/// Reachability of the cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        })
    }
}

/// Tracks whether the cache backend can currently be used.
///
/// Backends report lifecycle events; the facade reads [`is_ready`](Self::is_ready)
/// before every operation. Retries are not scheduled here.
#[derive(Debug, Default)]
pub struct ConnectionSupervisor {
    state: RwLock<ConnectionState>,
}

impl ConnectionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn connect_started(&self) {
        self.transition(ConnectionState::Connecting);
    }

    pub fn connect_succeeded(&self) {
        self.transition(ConnectionState::Connected);
    }

    pub fn connect_failed(&self) {
        self.transition(ConnectionState::Disconnected);
    }

    /// The backend reported an error or the connection went away.
    pub fn connection_lost(&self) {
        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "Cache connection state changed");
        }
    }
}
