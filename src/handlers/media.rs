//! Media playback endpoints.
//!
//! `play_pause`, `shuffle` and `repeat` are toggles: calling them twice
//! undoes the first call (repeat cycles off → all → one).

use serde_json::json;

use super::{ApiError, HandlerResult, failed, whole_number};
use crate::capability::Capabilities;
use crate::http::{Request, Response};

fn succeeded() -> Response {
    Response::ok(json!({ "success": true }))
}

fn succeeded_with_state(state: &str) -> Response {
    Response::ok(json!({ "success": true, "state": state }))
}

/// `POST /api/media/play_pause`
pub fn play_pause(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media
        .play_pause()
        .map_err(failed("Failed to toggle playback"))?;
    let state = caps.media.playback_state();
    Ok(succeeded_with_state(state.as_str()))
}

/// `POST /api/media/play`
pub fn play(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media.play().map_err(failed("Failed to play"))?;
    Ok(succeeded_with_state("playing"))
}

/// `POST /api/media/pause`
pub fn pause(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media.pause().map_err(failed("Failed to pause"))?;
    Ok(succeeded_with_state("paused"))
}

/// `POST /api/media/stop`
pub fn stop(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media.stop().map_err(failed("Failed to stop"))?;
    Ok(succeeded_with_state("stopped"))
}

/// `POST /api/media/next`
pub fn next(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media
        .next_track()
        .map_err(failed("Failed to skip to next track"))?;
    Ok(succeeded())
}

/// `POST /api/media/previous`
pub fn previous(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media
        .previous_track()
        .map_err(failed("Failed to skip to previous track"))?;
    Ok(succeeded())
}

/// `GET /api/media/state`
pub fn state(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    Ok(Response::ok(json!({
        "state": caps.media.playback_state(),
        "is_running": caps.media.is_running(),
    })))
}

/// `GET /api/media/info`
pub fn info(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    let track = caps.media.track_info();
    Ok(Response::ok(json!({
        "is_playing": track.is_playing(),
        "state": track.state,
        "title": track.title,
        "artist": track.artist,
        "album": track.album,
        "duration": track.duration,
        "position": track.position,
    })))
}

/// `POST /api/media/seek` with `{"position": seconds}`
pub fn seek(caps: &mut Capabilities, request: &Request) -> HandlerResult {
    let position = request
        .field("position")
        .and_then(whole_number)
        .and_then(|position| u64::try_from(position).ok())
        .ok_or(ApiError::invalid(
            "Invalid position",
            "position (seconds, >= 0)",
        ))?;

    caps.media.seek(position).map_err(failed("Failed to seek"))?;

    Ok(Response::ok(json!({
        "success": true,
        "position": position,
    })))
}

/// `POST /api/media/shuffle`
pub fn shuffle(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media
        .toggle_shuffle()
        .map_err(failed("Failed to toggle shuffle"))?;
    Ok(Response::ok(json!({
        "success": true,
        "shuffle": caps.media.shuffle_enabled(),
    })))
}

/// `POST /api/media/repeat`
pub fn repeat(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    caps.media
        .toggle_repeat()
        .map_err(failed("Failed to toggle repeat"))?;
    Ok(Response::ok(json!({
        "success": true,
        "repeat": caps.media.repeat_mode(),
    })))
}
