//! VolumeController: reconciles knob presses with the player's reports.
//!
//! This use case is the heart of the daemon.  It owns the local
//! [`VolumeState`], applies knob presses to it, sends the resulting
//! `Volume` commands through a [`RemoteSession`], and applies the player's
//! own reports ([`SessionEvent`]) back onto the state.
//!
//! # Architecture
//!
//! The controller depends only on the [`RemoteSession`] trait and domain
//! types.  The TCP implementation is injected at construction time, so the
//! whole state machine is unit-testable without a player.
//!
//! The controller is never shared: the event loop owns it and calls it from
//! a single task, so key presses and player reports are applied one at a
//! time and `VolumeState` needs no lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use usbvol_core::{
    KnobKey, PlaybackState, TransitionKind, VolumeRange, VolumeSettings, VolumeState,
};

/// Default delay before retrying a failed control connection.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Commands the controller can issue to the playback engine.
///
/// Every method is fire-and-forget: implementations must queue the work and
/// return immediately.  Results come back asynchronously as
/// [`SessionEvent`]s.  Commands issued while disconnected are dropped.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteSession: Send + Sync {
    /// Opens (or re-opens) the control connection.
    fn connect(&self, host: &str, port: u16);

    /// Sets the player volume in dB.
    fn set_volume(&self, db: f64);

    /// Requests a [`SessionEvent::RangeResponse`].
    fn query_range(&self);

    /// Requests a [`SessionEvent::StateResponse`].
    fn query_state(&self);
}

/// Notifications delivered by a [`RemoteSession`] implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The control connection was established.
    Connected,
    /// Connecting failed, or an established connection broke.
    Error(String),
    /// The player reported its volume range.
    RangeResponse(VolumeRange),
    /// The player reported its full state.
    StateResponse(PlaybackState),
}

/// Where the playback engine's control port lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for RemoteEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4321,
        }
    }
}

/// The volume controller use case.
pub struct VolumeController {
    state: VolumeState,
    session: Arc<dyn RemoteSession>,
    endpoint: RemoteEndpoint,
    reconnect_delay: Duration,
    reconnect_at: Option<Instant>,
    awaiting_range: bool,
    awaiting_state: bool,
}

impl VolumeController {
    /// Creates a controller whose state starts from `settings`.
    pub fn new(
        settings: &VolumeSettings,
        session: Arc<dyn RemoteSession>,
        endpoint: RemoteEndpoint,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            state: VolumeState::new(settings),
            session,
            endpoint,
            reconnect_delay,
            reconnect_at: None,
            awaiting_range: true,
            awaiting_state: true,
        }
    }

    /// Returns the current local volume state.
    pub fn state(&self) -> &VolumeState {
        &self.state
    }

    /// Returns `true` once both a range and a state report have been
    /// applied since the last connect.
    pub fn is_synchronised(&self) -> bool {
        !self.awaiting_range && !self.awaiting_state
    }

    /// Returns when the pending reconnect attempt is due, if one is pending.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Starts the first connection attempt.
    pub fn connect(&mut self) {
        info!(
            "connecting to HQPlayer at {}:{}",
            self.endpoint.host, self.endpoint.port
        );
        self.session.connect(&self.endpoint.host, self.endpoint.port);
    }

    /// Fires the pending reconnect attempt.
    ///
    /// Called by the event loop once [`Self::reconnect_deadline`] has passed.
    pub fn reconnect_now(&mut self) {
        self.reconnect_at = None;
        info!("retrying connection to HQPlayer...");
        self.session.connect(&self.endpoint.host, self.endpoint.port);
    }

    /// Applies one knob press and sends the resulting command, if any.
    pub fn handle_key(&mut self, key: KnobKey) {
        if !self.is_synchronised() {
            debug!("{key:?} before HQPlayer reported its volume; using local state");
        }

        let Some(transition) = self.state.apply_key(key) else {
            debug!(
                "{key:?} ignored (muted: {}, volume {} dB)",
                self.state.is_muted(),
                self.state.current()
            );
            return;
        };

        self.session.set_volume(transition.volume);

        match transition.kind {
            TransitionKind::VolumeUp => info!(
                "volume up to {} dB (step size {})",
                transition.volume,
                self.state.step_size()
            ),
            TransitionKind::VolumeDown => info!(
                "volume down to {} dB (step size {})",
                transition.volume,
                self.state.step_size()
            ),
            TransitionKind::MuteOn => info!("mute on, set to {} dB", transition.volume),
            TransitionKind::MuteOff => {
                info!("mute off, restored volume to {} dB", transition.volume)
            }
        }
    }

    /// Applies a batch of knob presses strictly in order.
    pub fn handle_keys<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = KnobKey>,
    {
        for key in keys {
            self.handle_key(key);
        }
    }

    /// Applies one notification from the session.
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => self.on_connected(),
            SessionEvent::Error(message) => self.on_error(&message),
            SessionEvent::RangeResponse(range) => self.on_range(range),
            SessionEvent::StateResponse(state) => self.on_state(&state),
        }
    }

    fn on_connected(&mut self) {
        info!("connected to HQPlayer Embedded");
        self.reconnect_at = None;
        self.awaiting_range = true;
        self.awaiting_state = true;
        self.session.query_range();
        self.session.query_state();
    }

    fn on_error(&mut self, message: &str) {
        warn!("control connection error: {message}");
        if self.reconnect_at.is_some() {
            debug!("reconnect already scheduled");
            return;
        }
        self.reconnect_at = Some(Instant::now() + self.reconnect_delay);
        info!("reconnecting in {:?}", self.reconnect_delay);
    }

    fn on_range(&mut self, range: VolumeRange) {
        if range.min > range.max {
            warn!(
                "HQPlayer reported an inverted volume range ({} > {})",
                range.min, range.max
            );
        }
        self.state.apply_range(range.min, range.max);
        self.awaiting_range = false;
        info!(
            "volume range: {} to {} dB (enabled: {}, adaptive: {})",
            range.min, range.max, range.enabled, range.adaptive
        );

        let current = self.state.current();
        if current < range.min || current > range.max {
            debug!("current volume {current} dB is outside the new range until the next key press");
        }
    }

    fn on_state(&mut self, state: &PlaybackState) {
        self.state.apply_remote_volume(state.volume);
        self.awaiting_state = false;
        info!("current volume from HQPlayer: {} dB", state.volume);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
