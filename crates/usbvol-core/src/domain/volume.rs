//! Volume state machine.
//!
//! [`VolumeState`] is the authoritative local view of the player's volume:
//! the current level, the level saved when mute was engaged, the allowed
//! range, the step size, and whether mute is on.  It is mutated from two
//! directions:
//!
//! - **Knob presses** ([`VolumeState::apply_key`]) change the level locally
//!   and return a [`Transition`] describing the `Volume` command to send.
//! - **Player reports** ([`VolumeState::apply_range`] and
//!   [`VolumeState::apply_remote_volume`]) overwrite local values, because
//!   the player is the source of truth (another client may have changed the
//!   volume behind our back).
//!
//! # State diagram
//!
//! ```text
//!              Mute / send(min_volume), pre_mute = current
//!   ┌──────────┐ ─────────────────────────────────────────▶ ┌────────┐
//!   │ Unmuted  │                                            │ Muted  │
//!   └──────────┘ ◀───────────────────────────────────────── └────────┘
//!    │  ▲        Mute / send(pre_mute), current = pre_mute    │  ▲
//!    └──┘ Up/Down: clamp(current ± step), send if changed     └──┘ Up/Down: ignored
//! ```
//!
//! All values are decibels; more negative is quieter.

use crate::keymap::KnobKey;

/// Startup values for a [`VolumeState`].
///
/// These come from the configuration file and are only used until the
/// player reports its real range and volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSettings {
    /// Lower bound until the player reports a range.  Also the level sent
    /// while muted.
    pub min_volume: f64,
    /// Upper bound until the player reports a range.
    pub max_volume: f64,
    /// Initial current level.
    pub default_volume: f64,
    /// Initial pre-mute level.
    pub mute_volume: f64,
    /// Decibels added or removed per knob detent.
    pub step_size: f64,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            min_volume: -144.0,
            max_volume: 0.0,
            default_volume: -144.0,
            mute_volume: -144.0,
            step_size: 1.0,
        }
    }
}

/// Whether the knob's mute toggle is engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuteState {
    #[default]
    Unmuted,
    Muted,
}

/// Which knob action produced a [`Transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    VolumeUp,
    VolumeDown,
    MuteOn,
    MuteOff,
}

/// An accepted volume-affecting transition.
///
/// Exactly one `Volume` command carrying [`Transition::volume`] must be sent
/// to the player for every `Transition` returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    /// The level to send to the player, in dB.
    pub volume: f64,
}

/// Local volume state.  See the module docs for the transition rules.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeState {
    current: f64,
    pre_mute: f64,
    min_volume: f64,
    max_volume: f64,
    step_size: f64,
    mute: MuteState,
}

impl VolumeState {
    /// Creates the startup state from configured defaults.  Starts unmuted.
    pub fn new(settings: &VolumeSettings) -> Self {
        Self {
            current: settings.default_volume,
            pre_mute: settings.mute_volume,
            min_volume: settings.min_volume,
            max_volume: settings.max_volume,
            step_size: settings.step_size,
            mute: MuteState::Unmuted,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn pre_mute(&self) -> f64 {
        self.pre_mute
    }

    pub fn min_volume(&self) -> f64 {
        self.min_volume
    }

    pub fn max_volume(&self) -> f64 {
        self.max_volume
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn mute_state(&self) -> MuteState {
        self.mute
    }

    pub fn is_muted(&self) -> bool {
        self.mute == MuteState::Muted
    }

    /// Applies one knob press.
    ///
    /// Returns the command to send, or `None` when the press was suppressed
    /// (volume change while muted) or would not change the level (already
    /// at the boundary).
    pub fn apply_key(&mut self, key: KnobKey) -> Option<Transition> {
        match (key, self.mute) {
            (KnobKey::VolumeUp | KnobKey::VolumeDown, MuteState::Muted) => None,
            (KnobKey::VolumeUp, MuteState::Unmuted) => {
                self.step(self.step_size, TransitionKind::VolumeUp)
            }
            (KnobKey::VolumeDown, MuteState::Unmuted) => {
                self.step(-self.step_size, TransitionKind::VolumeDown)
            }
            (KnobKey::Mute, MuteState::Unmuted) => {
                self.pre_mute = self.current;
                self.mute = MuteState::Muted;
                Some(Transition {
                    kind: TransitionKind::MuteOn,
                    volume: self.min_volume,
                })
            }
            (KnobKey::Mute, MuteState::Muted) => {
                self.mute = MuteState::Unmuted;
                self.current = self.pre_mute;
                Some(Transition {
                    kind: TransitionKind::MuteOff,
                    volume: self.pre_mute,
                })
            }
        }
    }

    fn step(&mut self, delta: f64, kind: TransitionKind) -> Option<Transition> {
        let next = bound(self.min_volume, self.current + delta, self.max_volume);
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(Transition {
            kind,
            volume: next,
        })
    }

    /// Overwrites the allowed range with the one reported by the player.
    ///
    /// `current` is left as is, even when it now lies outside the range; the
    /// next volume key press clamps it.
    pub fn apply_range(&mut self, min: f64, max: f64) {
        self.min_volume = min;
        self.max_volume = max;
    }

    /// Overwrites `current` and `pre_mute` with the level reported by the
    /// player.  The mute toggle is not touched.
    pub fn apply_remote_volume(&mut self, volume: f64) {
        self.current = volume;
        self.pre_mute = volume;
    }
}

/// Clamps `value` into `[min, max]`.
///
/// Unlike [`f64::clamp`] this does not panic when the player reports an
/// inverted range; `min` wins in that case.
fn bound(min: f64, value: f64, max: f64) -> f64 {
    min.max(value.min(max))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
