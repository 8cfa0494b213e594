//! Recording remote session for unit and integration testing.
//!
//! # Why a recording session?
//!
//! The real [`HqpSession`](super::HqpSession) needs a player listening on a
//! TCP port.  `RecordingSession` replaces the network with an in-memory log:
//! every call the controller makes is pushed onto a `Mutex<Vec<...>>` so a
//! test can assert exactly which commands were issued and in what order.
//!
//! ```ignore
//! let session = Arc::new(RecordingSession::new());
//! let mut controller = VolumeController::new(&settings, session.clone(), endpoint, delay);
//!
//! controller.handle_key(KnobKey::VolumeUp);
//!
//! assert_eq!(session.volumes(), vec![-19.0]);
//! ```

use std::sync::Mutex;

use crate::application::control_volume::RemoteSession;

/// One call made on a [`RecordingSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Connect { host: String, port: u16 },
    SetVolume(f64),
    QueryRange,
    QueryState,
}

/// A [`RemoteSession`] that records calls instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingSession {
    calls: Mutex<Vec<SessionCall>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded call, oldest first.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Returns the values of every `set_volume` call, oldest first.
    pub fn volumes(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SessionCall::SetVolume(db) => Some(db),
                _ => None,
            })
            .collect()
    }

    /// Returns how many connection attempts were made.
    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SessionCall::Connect { .. }))
            .count()
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().expect("lock poisoned").push(call);
    }
}

impl RemoteSession for RecordingSession {
    fn connect(&self, host: &str, port: u16) {
        self.record(SessionCall::Connect {
            host: host.to_string(),
            port,
        });
    }

    fn set_volume(&self, db: f64) {
        self.record(SessionCall::SetVolume(db));
    }

    fn query_range(&self) {
        self.record(SessionCall::QueryRange);
    }

    fn query_state(&self) {
        self.record(SessionCall::QueryState);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_session_keeps_call_order() {
        // Arrange
        let session = RecordingSession::new();

        // Act
        session.connect("player", 4321);
        session.query_range();
        session.set_volume(-12.0);

        // Assert
        assert_eq!(
            session.calls(),
            vec![
                SessionCall::Connect {
                    host: "player".to_string(),
                    port: 4321
                },
                SessionCall::QueryRange,
                SessionCall::SetVolume(-12.0),
            ]
        );
        assert_eq!(session.volumes(), vec![-12.0]);
        assert_eq!(session.connect_count(), 1);
    }
}
