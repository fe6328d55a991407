//! Status, volume and mute endpoints.

use serde_json::{Value, json};

use super::{ApiError, HandlerResult, failed, volume_control, whole_number};
use crate::capability::Capabilities;
use crate::http::{Request, Response};

/// Capability names advertised by `GET /api/status`.
const CAPABILITIES: [&str; 4] = [
    "volume_control",
    "mute_control",
    "media_playback",
    "audio_device_switching",
];

/// Converts a `0.0..=1.0` scalar to a whole percentage.
///
/// Rounds rather than truncates so that a percentage written through
/// [`set_volume`] reads back unchanged.
fn to_percent(scalar: f32) -> u8 {
    (scalar.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// `GET /api/status`
pub fn status(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    let (volume, muted, volume_available, mute_available) = {
        let control = volume_control(caps)?;
        (
            control
                .volume()
                .map_err(failed("Failed to read audio status"))?,
            control
                .is_muted()
                .map_err(failed("Failed to read audio status"))?,
            control.has_volume_control(),
            control.has_mute_control(),
        )
    };
    let playback_state = caps.media.track_info().state;

    Ok(Response::ok(json!({
        "volume": to_percent(volume),
        "muted": muted,
        "volume_control_available": volume_available,
        "mute_control_available": mute_available,
        "media_control_available": true,
        "audio_device_control_available": true,
        "music_app_running": caps.media.is_running(),
        "playback_state": playback_state,
        "capabilities": CAPABILITIES,
    })))
}

/// `GET /api/volume`
pub fn get_volume(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    let volume = volume_control(caps)?
        .volume()
        .map_err(failed("Failed to read volume"))?;
    Ok(Response::ok(json!({ "volume": to_percent(volume) })))
}

/// `POST /api/volume` with `{"volume": 0..=100}`
pub fn set_volume(caps: &mut Capabilities, request: &Request) -> HandlerResult {
    let volume = request
        .field("volume")
        .and_then(whole_number)
        .filter(|v| (0..=100).contains(v))
        .ok_or(ApiError::invalid("Invalid volume value", "volume (0-100)"))?;

    volume_control(caps)?
        .set_volume(volume as f32 / 100.0)
        .map_err(failed("Failed to set volume"))?;

    Ok(Response::ok(json!({
        "success": true,
        "volume": volume,
    })))
}

/// `GET /api/mute`
pub fn get_mute(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    let muted = volume_control(caps)?
        .is_muted()
        .map_err(failed("Failed to read mute state"))?;
    Ok(Response::ok(json!({ "muted": muted })))
}

/// `POST /api/mute` with `{"muted": bool}`
///
/// Sets the explicit value; this is not a toggle.
pub fn set_mute(caps: &mut Capabilities, request: &Request) -> HandlerResult {
    let muted = request
        .field("muted")
        .and_then(Value::as_bool)
        .ok_or(ApiError::invalid("Invalid mute value", "muted (boolean)"))?;

    volume_control(caps)?
        .set_muted(muted)
        .map_err(failed("Failed to set mute state"))?;

    Ok(Response::ok(json!({
        "success": true,
        "muted": muted,
    })))
}
