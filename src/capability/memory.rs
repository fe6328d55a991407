//! In-memory capability implementations.
//!
//! These hold their state in plain fields and behave like a well-mannered
//! device and player: setters stick, toggles toggle, and commands fail when
//! the simulated player is not running.

use super::{
    AudioDevice, CapabilityError, CapabilityResult, DeviceControl, DeviceSelector, MediaControl,
    PlaybackState, RepeatMode, TrackInfo, VolumeControl,
};

/// Simulated default output device.
#[derive(Debug, Clone)]
pub struct MemoryVolume {
    volume: f32,
    muted: bool,
    volume_control: bool,
    mute_control: bool,
}

impl MemoryVolume {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            muted: false,
            volume_control: true,
            mute_control: true,
        }
    }

    /// Reports which controls the simulated device exposes.
    #[must_use]
    pub fn with_controls(mut self, volume: bool, mute: bool) -> Self {
        self.volume_control = volume;
        self.mute_control = mute;
        self
    }
}

impl Default for MemoryVolume {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl VolumeControl for MemoryVolume {
    fn volume(&self) -> CapabilityResult<f32> {
        Ok(self.volume)
    }

    fn set_volume(&mut self, scalar: f32) -> CapabilityResult<()> {
        self.volume = scalar.clamp(0.0, 1.0);
        Ok(())
    }

    fn is_muted(&self) -> CapabilityResult<bool> {
        Ok(self.muted)
    }

    fn set_muted(&mut self, muted: bool) -> CapabilityResult<()> {
        self.muted = muted;
        Ok(())
    }

    fn has_volume_control(&self) -> bool {
        self.volume_control
    }

    fn has_mute_control(&self) -> bool {
        self.mute_control
    }
}

/// Simulated media player with a fixed playlist.
#[derive(Debug, Clone)]
pub struct MemoryMedia {
    running: bool,
    state: PlaybackState,
    shuffle: bool,
    repeat: RepeatMode,
    position: u64,
    current: usize,
    playlist: Vec<Track>,
}

/// One playlist entry of [`MemoryMedia`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: u64,
}

impl Track {
    pub fn new(title: &str, artist: &str, album: &str, duration: u64) -> Self {
        Self {
            title: title.to_owned(),
            artist: artist.to_owned(),
            album: album.to_owned(),
            duration,
        }
    }
}

impl MemoryMedia {
    /// A running, stopped player over `playlist`.
    pub fn new(playlist: Vec<Track>) -> Self {
        Self {
            running: true,
            state: PlaybackState::Stopped,
            shuffle: false,
            repeat: RepeatMode::Off,
            position: 0,
            current: 0,
            playlist,
        }
    }

    /// A player whose process is not running.
    pub fn not_running() -> Self {
        Self {
            running: false,
            ..Self::new(Vec::new())
        }
    }

    fn ensure_running(&self) -> CapabilityResult<()> {
        if self.running {
            Ok(())
        } else {
            Err(CapabilityError::NotRunning)
        }
    }

    fn skip(&mut self, forward: bool) -> CapabilityResult<()> {
        self.ensure_running()?;
        let len = self.playlist.len();
        if len > 0 {
            self.current = if forward {
                (self.current + 1) % len
            } else {
                (self.current + len - 1) % len
            };
        }
        self.position = 0;
        Ok(())
    }
}

impl Default for MemoryMedia {
    fn default() -> Self {
        Self::new(vec![
            Track::new("Blue in Green", "Miles Davis", "Kind of Blue", 337),
            Track::new("So What", "Miles Davis", "Kind of Blue", 562),
            Track::new("Naima", "John Coltrane", "Giant Steps", 261),
        ])
    }
}

impl MediaControl for MemoryMedia {
    fn is_running(&self) -> bool {
        self.running
    }

    fn playback_state(&self) -> PlaybackState {
        if self.running {
            self.state
        } else {
            PlaybackState::Stopped
        }
    }

    fn play_pause(&mut self) -> CapabilityResult<()> {
        self.ensure_running()?;
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused | PlaybackState::Stopped => PlaybackState::Playing,
        };
        Ok(())
    }

    fn play(&mut self) -> CapabilityResult<()> {
        self.ensure_running()?;
        self.state = PlaybackState::Playing;
        Ok(())
    }

    fn pause(&mut self) -> CapabilityResult<()> {
        self.ensure_running()?;
        self.state = PlaybackState::Paused;
        Ok(())
    }

    fn stop(&mut self) -> CapabilityResult<()> {
        self.ensure_running()?;
        self.state = PlaybackState::Stopped;
        self.position = 0;
        Ok(())
    }

    fn next_track(&mut self) -> CapabilityResult<()> {
        self.skip(true)
    }

    fn previous_track(&mut self) -> CapabilityResult<()> {
        self.skip(false)
    }

    fn track_info(&self) -> TrackInfo {
        if !self.running || self.state == PlaybackState::Stopped {
            return TrackInfo::default();
        }
        match self.playlist.get(self.current) {
            Some(track) => TrackInfo {
                state: self.state,
                title: track.title.clone(),
                artist: track.artist.clone(),
                album: track.album.clone(),
                duration: track.duration,
                position: self.position,
            },
            None => TrackInfo {
                state: self.state,
                ..TrackInfo::default()
            },
        }
    }

    fn seek(&mut self, position: u64) -> CapabilityResult<()> {
        self.ensure_running()?;
        let duration = self.playlist.get(self.current).map_or(0, |t| t.duration);
        if position > duration {
            return Err(CapabilityError::InvalidParameter(format!(
                "position {position}s is past the end of a {duration}s track"
            )));
        }
        self.position = position;
        Ok(())
    }

    fn toggle_shuffle(&mut self) -> CapabilityResult<()> {
        self.ensure_running()?;
        self.shuffle = !self.shuffle;
        Ok(())
    }

    fn shuffle_enabled(&self) -> bool {
        self.running && self.shuffle
    }

    fn toggle_repeat(&mut self) -> CapabilityResult<()> {
        self.ensure_running()?;
        self.repeat = self.repeat.next();
        Ok(())
    }

    fn repeat_mode(&self) -> RepeatMode {
        if self.running {
            self.repeat
        } else {
            RepeatMode::Off
        }
    }
}

/// Simulated device registry.
#[derive(Debug, Clone)]
pub struct MemoryDevices {
    devices: Vec<AudioDevice>,
    output: Option<u32>,
    input: Option<u32>,
}

impl MemoryDevices {
    /// Uses the first output and first input in `devices` as the defaults.
    pub fn new(devices: Vec<AudioDevice>) -> Self {
        let output = devices.iter().find(|d| d.is_output).map(|d| d.id);
        let input = devices.iter().find(|d| d.is_input).map(|d| d.id);
        Self {
            devices,
            output,
            input,
        }
    }

    fn lookup(&self, id: Option<u32>) -> Option<AudioDevice> {
        let id = id?;
        self.devices.iter().find(|d| d.id == id).cloned()
    }
}

impl Default for MemoryDevices {
    fn default() -> Self {
        let device = |id: u32, name: &str, uid: &str, is_input: bool, is_output: bool| AudioDevice {
            id,
            name: name.to_owned(),
            uid: uid.to_owned(),
            is_input,
            is_output,
        };
        Self::new(vec![
            device(73, "Built-in Speakers", "BuiltInSpeakerDevice", false, true),
            device(81, "Built-in Microphone", "BuiltInMicrophoneDevice", true, false),
            device(96, "USB Audio Interface", "AppleUSBAudioEngine:1", true, true),
        ])
    }
}

impl DeviceControl for MemoryDevices {
    fn devices(&self) -> Vec<AudioDevice> {
        self.devices.clone()
    }

    fn default_output(&self) -> Option<AudioDevice> {
        self.lookup(self.output)
    }

    fn default_input(&self) -> Option<AudioDevice> {
        self.lookup(self.input)
    }

    fn set_default_output(&mut self, selector: &DeviceSelector) -> CapabilityResult<()> {
        let device = selector
            .find(self.devices.iter().filter(|d| d.is_output))
            .ok_or_else(|| CapabilityError::NoSuchDevice(selector.clone()))?;
        self.output = Some(device.id);
        Ok(())
    }

    fn set_default_input(&mut self, selector: &DeviceSelector) -> CapabilityResult<()> {
        let device = selector
            .find(self.devices.iter().filter(|d| d.is_input))
            .ok_or_else(|| CapabilityError::NoSuchDevice(selector.clone()))?;
        self.input = Some(device.id);
        Ok(())
    }
}
