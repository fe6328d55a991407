//! Audio capabilities driven by the handlers.
//!
//! The server never talks to audio hardware or a media player directly. It
//! goes through three narrow, synchronous traits:
//!
//! - [`VolumeControl`]: output volume and mute of the default device.
//! - [`MediaControl`]: transport commands and track metadata of a player.
//! - [`DeviceControl`]: device enumeration and default input/output switching.
//!
//! All three are `Send` because the router that owns them lives on the
//! dispatch worker. They are never shared: one handler runs at a time, so
//! implementations take `&mut self` for mutations and need no locking.
//!
//! [`memory`] provides in-memory implementations used by tests and the
//! binary's simulated mode.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub mod memory;

pub use memory::{MemoryDevices, MemoryMedia, MemoryVolume};

/// Failure reported by a capability.
///
/// These are logged by the handler boundary and never sent to clients.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("media player is not running")]
    NotRunning,

    #[error("no audio device matches {0}")]
    NoSuchDevice(DeviceSelector),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{operation} failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },
}

/// Convenience alias used by every capability method.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Volume and mute of the default output device.
///
/// Volume is a scalar in `0.0..=1.0`.
pub trait VolumeControl: Send {
    fn volume(&self) -> CapabilityResult<f32>;

    /// Implementations clamp out-of-range values.
    fn set_volume(&mut self, scalar: f32) -> CapabilityResult<()>;

    fn is_muted(&self) -> CapabilityResult<bool>;

    fn set_muted(&mut self, muted: bool) -> CapabilityResult<()>;

    /// Whether the device exposes a volume control at all.
    fn has_volume_control(&self) -> bool;

    /// Whether the device exposes a mute control at all.
    fn has_mute_control(&self) -> bool;
}

/// Transport control and metadata of a media player.
///
/// Commands fail with [`CapabilityError::NotRunning`] when the player process
/// is not running. Probes never fail: they report a stopped, empty player
/// instead.
pub trait MediaControl: Send {
    fn is_running(&self) -> bool;

    fn playback_state(&self) -> PlaybackState;

    /// Toggles between playing and paused.
    fn play_pause(&mut self) -> CapabilityResult<()>;

    fn play(&mut self) -> CapabilityResult<()>;

    fn pause(&mut self) -> CapabilityResult<()>;

    fn stop(&mut self) -> CapabilityResult<()>;

    fn next_track(&mut self) -> CapabilityResult<()>;

    fn previous_track(&mut self) -> CapabilityResult<()>;

    fn track_info(&self) -> TrackInfo;

    /// Moves the playhead to `position` seconds.
    fn seek(&mut self, position: u64) -> CapabilityResult<()>;

    fn toggle_shuffle(&mut self) -> CapabilityResult<()>;

    fn shuffle_enabled(&self) -> bool;

    /// Advances the repeat mode: off → all → one → off.
    fn toggle_repeat(&mut self) -> CapabilityResult<()>;

    fn repeat_mode(&self) -> RepeatMode;
}

/// Enumeration and default-device switching.
pub trait DeviceControl: Send {
    fn devices(&self) -> Vec<AudioDevice>;

    fn default_output(&self) -> Option<AudioDevice>;

    fn default_input(&self) -> Option<AudioDevice>;

    fn set_default_output(&mut self, selector: &DeviceSelector) -> CapabilityResult<()>;

    fn set_default_input(&mut self, selector: &DeviceSelector) -> CapabilityResult<()>;
}

/// The capability set handed to the router at construction.
///
/// `volume` is `None` when the volume capability failed to initialize; the
/// router then answers every request with `500`.
pub struct Capabilities {
    pub volume: Option<Box<dyn VolumeControl>>,
    pub media: Box<dyn MediaControl>,
    pub devices: Box<dyn DeviceControl>,
}

impl Capabilities {
    pub fn new(
        volume: Option<Box<dyn VolumeControl>>,
        media: Box<dyn MediaControl>,
        devices: Box<dyn DeviceControl>,
    ) -> Self {
        Self {
            volume,
            media,
            devices,
        }
    }

    /// All three capabilities backed by the in-memory implementations.
    pub fn in_memory() -> Self {
        Self::new(
            Some(Box::new(MemoryVolume::default())),
            Box::new(MemoryMedia::default()),
            Box::new(MemoryDevices::default()),
        )
    }
}

/// Player transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player repeat mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// The mode that follows `self` in the toggle cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

/// Metadata of the current track. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackInfo {
    pub state: PlaybackState,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: u64,
    pub position: u64,
}

impl TrackInfo {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

/// An audio device as reported by [`DeviceControl::devices`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioDevice {
    pub id: u32,
    pub name: String,
    pub uid: String,
    pub is_input: bool,
    pub is_output: bool,
}

/// How a client picks a device to switch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Exact device id.
    Id(u32),
    /// Case-insensitive substring of the device name.
    Name(String),
}

impl DeviceSelector {
    /// Returns `true` if `device` is selected by `self`.
    pub fn matches(&self, device: &AudioDevice) -> bool {
        match self {
            Self::Id(id) => device.id == *id,
            Self::Name(name) => device
                .name
                .to_lowercase()
                .contains(&name.to_lowercase()),
        }
    }

    /// Returns the first device in `devices` selected by `self`.
    pub fn find<'a, I>(&self, devices: I) -> Option<&'a AudioDevice>
    where
        I: IntoIterator<Item = &'a AudioDevice>,
    {
        devices.into_iter().find(|d| self.matches(d))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: u32, name: &str) -> AudioDevice {
        AudioDevice {
            id,
            name: name.to_owned(),
            uid: format!("uid-{id}"),
            is_input: false,
            is_output: true,
        }
    }

    #[test]
    fn repeat_cycles_through_all_modes() {
        assert_eq!(RepeatMode::Off.next(), RepeatMode::All);
        assert_eq!(RepeatMode::All.next(), RepeatMode::One);
        assert_eq!(RepeatMode::One.next(), RepeatMode::Off);
    }

    #[test]
    fn selector_by_name_is_case_insensitive_substring() {
        let devices = [device(1, "MacBook Pro Speakers"), device(2, "USB Headset")];
        let found = DeviceSelector::Name("headSET".into()).find(&devices);
        assert_eq!(found.map(|d| d.id), Some(2));
    }

    #[test]
    fn selector_by_name_picks_first_match() {
        let devices = [device(4, "Studio Display"), device(5, "Studio Monitor")];
        let found = DeviceSelector::Name("studio".into()).find(&devices);
        assert_eq!(found.map(|d| d.id), Some(4));
    }

    #[test]
    fn selector_by_id_is_exact() {
        let devices = [device(10, "A"), device(100, "B")];
        assert_eq!(DeviceSelector::Id(100).find(&devices).map(|d| d.id), Some(100));
        assert!(DeviceSelector::Id(1).find(&devices).is_none());
    }

    #[test]
    fn playback_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(PlaybackState::Paused).unwrap(),
            serde_json::json!("paused")
        );
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
    }
}
