use serde::{Deserialize, Serialize};

/// Connection state of the single printer session.
///
/// `Disconnected → Connecting → {Connected | Failed} → Disconnecting → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No transport handle held
    #[default]
    Disconnected,
    /// Transport connect and dialect handshake in flight
    Connecting,
    /// Handshake completed, print calls are accepted
    Connected,
    /// Connect, handshake or a write failed; the transport handle is released
    Failed,
    /// Tear-down in progress
    Disconnecting,
}

impl ConnectionState {
    /// Check if state allows a connection attempt
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }

    /// Transition to connecting state
    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected | Self::Failed => Ok(Self::Connecting),
            _ => Err("Can only connect from Disconnected or Failed state"),
        }
    }

    /// Transition to connected state
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting state"),
        }
    }

    /// Transition to failed state
    pub fn to_failed(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting | Self::Connected => Ok(Self::Failed),
            _ => Err("Can only fail from Connecting or Connected state"),
        }
    }

    /// Transition to disconnecting state
    pub fn to_disconnecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting | Self::Connected | Self::Failed => Ok(Self::Disconnecting),
            _ => Err("Can only disconnect from Connecting, Connected or Failed state"),
        }
    }

    /// Transition to disconnected state
    pub fn to_disconnected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnecting => Ok(Self::Disconnected),
            _ => Err("Can only finish disconnecting from Disconnecting state"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Failed => "Failed",
            Self::Disconnecting => "Disconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_disconnected() {
        let state = ConnectionState::default();
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(state.can_connect());
        assert!(!state.is_connected());
    }

    #[test]
    fn test_transition_disconnected_to_connecting() {
        let state = ConnectionState::Disconnected;
        let next = state.to_connecting().unwrap();
        assert_eq!(next, ConnectionState::Connecting);
        assert!(next.is_transitioning());
    }

    #[test]
    fn test_transition_connecting_to_connected() {
        let state = ConnectionState::Connecting;
        let next = state.to_connected().unwrap();
        assert_eq!(next, ConnectionState::Connected);
        assert!(next.is_connected());
    }

    #[test]
    fn test_cannot_connect_from_connected() {
        assert!(ConnectionState::Connected.to_connecting().is_err());
        assert!(ConnectionState::Connecting.to_connecting().is_err());
        assert!(ConnectionState::Disconnecting.to_connecting().is_err());
    }

    #[test]
    fn test_reconnect_after_failure() {
        let state = ConnectionState::Failed;
        assert!(state.can_connect());
        assert_eq!(state.to_connecting().unwrap(), ConnectionState::Connecting);
    }

    #[test]
    fn test_full_lifecycle() {
        let state = ConnectionState::Disconnected
            .to_connecting()
            .and_then(|s| s.to_connected())
            .and_then(|s| s.to_disconnecting())
            .and_then(|s| s.to_disconnected())
            .unwrap();
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_failure_path_reaches_disconnected() {
        let state = ConnectionState::Connecting
            .to_failed()
            .and_then(|s| s.to_disconnecting())
            .and_then(|s| s.to_disconnected())
            .unwrap();
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_cannot_skip_disconnecting() {
        assert!(ConnectionState::Connected.to_disconnected().is_err());
        assert!(ConnectionState::Failed.to_disconnected().is_err());
    }

    #[test]
    fn test_cannot_fail_when_idle() {
        assert!(ConnectionState::Disconnected.to_failed().is_err());
        assert!(ConnectionState::Disconnected.to_disconnecting().is_err());
    }

    #[test]
    fn test_can_connect_only_from_valid_states() {
        assert!(ConnectionState::Disconnected.can_connect());
        assert!(ConnectionState::Failed.can_connect());
        assert!(!ConnectionState::Connected.can_connect());
        assert!(!ConnectionState::Connecting.can_connect());
        assert!(!ConnectionState::Disconnecting.can_connect());
    }
}
