//! Lifecycle state of a framed client connection.

/// Connection lifecycle state.
///
/// `Disconnected → Connecting → Connected → Disconnecting → Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// No transport connection; the initial state.
    #[default]
    Disconnected,
    /// Transport open in progress.
    Connecting,
    /// Transport open and receive loop running.
    Connected,
    /// Shutdown in progress.
    Disconnecting,
}

impl ConnectionState {
    /// Check if a connection is up or being brought up or down.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    /// Check if sending data is allowed in this state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}
