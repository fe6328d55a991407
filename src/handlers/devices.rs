//! Audio device endpoints.

use serde_json::{Value, json};

use super::{ApiError, HandlerResult, failed, whole_number};
use crate::capability::{AudioDevice, Capabilities, DeviceSelector};
use crate::http::{Request, Response};

fn describe(device: &AudioDevice) -> Value {
    json!({
        "id": device.id,
        "name": device.name,
        "uid": device.uid,
    })
}

/// Reads `{"id": n}` or `{"name": "..."}`; `id` wins when both are present.
///
/// A number that does not fit a device id is ignored rather than rejected,
/// so a valid `name` alongside it still selects a device.
fn selector(request: &Request) -> Result<DeviceSelector, ApiError> {
    let body = request
        .body()
        .ok_or(ApiError::invalid("Missing body", "name or id"))?;

    let id = body
        .get("id")
        .and_then(whole_number)
        .and_then(|id| u32::try_from(id).ok());
    if let Some(id) = id {
        return Ok(DeviceSelector::Id(id));
    }
    if let Some(name) = body.get("name").and_then(Value::as_str) {
        return Ok(DeviceSelector::Name(name.to_owned()));
    }

    Err(ApiError::invalid(
        "Invalid parameters",
        "name (string) or id (number)",
    ))
}

fn switched(current: Option<AudioDevice>) -> Response {
    match current {
        Some(device) => Response::ok(json!({
            "success": true,
            "device": {
                "id": device.id,
                "name": device.name,
            },
        })),
        None => Response::ok(json!({ "success": true })),
    }
}

/// `GET /api/audio/devices`
pub fn list(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    let devices = caps.devices.devices();
    Ok(Response::ok(json!({
        "count": devices.len(),
        "devices": devices,
    })))
}

/// `GET /api/audio/output`
pub fn get_output(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    let device = caps.devices.default_output().ok_or(ApiError::Failed {
        message: "Failed to get output device",
    })?;
    Ok(Response::ok(describe(&device)))
}

/// `POST /api/audio/output`
pub fn set_output(caps: &mut Capabilities, request: &Request) -> HandlerResult {
    let selector = selector(request)?;
    caps.devices
        .set_default_output(&selector)
        .map_err(failed("Failed to set output device"))?;
    Ok(switched(caps.devices.default_output()))
}

/// `GET /api/audio/input`
pub fn get_input(caps: &mut Capabilities, _: &Request) -> HandlerResult {
    let device = caps.devices.default_input().ok_or(ApiError::Failed {
        message: "Failed to get input device",
    })?;
    Ok(Response::ok(describe(&device)))
}

/// `POST /api/audio/input`
pub fn set_input(caps: &mut Capabilities, request: &Request) -> HandlerResult {
    let selector = selector(request)?;
    caps.devices
        .set_default_input(&selector)
        .map_err(failed("Failed to set input device"))?;
    Ok(switched(caps.devices.default_input()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{MemoryDevices, MemoryMedia, MemoryVolume};
    use crate::http::{Method, StatusCode};

    fn post(path: &str, body: Value) -> Request {
        let Value::Object(map) = body else {
            panic!("test bodies are objects");
        };
        Request::new(Method::Post, path).with_body(map)
    }

    fn get(path: &str) -> Request {
        Request::new(Method::Get, path)
    }

    fn empty_registry() -> Capabilities {
        Capabilities::new(
            Some(Box::new(MemoryVolume::default())),
            Box::new(MemoryMedia::default()),
            Box::new(MemoryDevices::new(Vec::new())),
        )
    }

    #[test]
    fn list_includes_count_and_flags() {
        let mut caps = Capabilities::in_memory();
        let res = list(&mut caps, &get("/api/audio/devices")).unwrap();
        let body = res.body();
        assert_eq!(body["count"], 3);
        let devices = body["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 3);
        for key in ["id", "name", "uid", "is_input", "is_output"] {
            assert!(devices[0].get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn current_devices() {
        let mut caps = Capabilities::in_memory();
        let res = get_output(&mut caps, &get("/api/audio/output")).unwrap();
        assert_eq!(
            res.body(),
            &json!({ "id": 73, "name": "Built-in Speakers", "uid": "BuiltInSpeakerDevice" })
        );
        let res = get_input(&mut caps, &get("/api/audio/input")).unwrap();
        assert_eq!(res.body()["id"], 81);
    }

    #[test]
    fn missing_current_device_is_500() {
        let mut caps = empty_registry();
        let err = get_output(&mut caps, &get("/api/audio/output")).unwrap_err();
        assert_eq!(err.status(), StatusCode::InternalServerError);
        let err = get_input(&mut caps, &get("/api/audio/input")).unwrap_err();
        assert_eq!(err, ApiError::Failed { message: "Failed to get input device" });
    }

    #[test]
    fn switch_output_by_name() {
        let mut caps = Capabilities::in_memory();
        let res = set_output(&mut caps, &post("/api/audio/output", json!({ "name": "usb" }))).unwrap();
        assert_eq!(
            res.body(),
            &json!({ "success": true, "device": { "id": 96, "name": "USB Audio Interface" } })
        );
    }

    #[test]
    fn id_takes_precedence_over_name() {
        let mut caps = Capabilities::in_memory();
        let body = json!({ "id": 73, "name": "usb" });
        let res = set_output(&mut caps, &post("/api/audio/output", body)).unwrap();
        assert_eq!(res.body()["device"]["id"], 73);
    }

    #[test]
    fn integral_float_id_selects_device() {
        let mut caps = Capabilities::in_memory();
        let res = set_output(&mut caps, &post("/api/audio/output", json!({ "id": 96.0 }))).unwrap();
        assert_eq!(res.body()["device"]["id"], 96);
    }

    #[test]
    fn oversized_id_falls_back_to_name() {
        let mut caps = Capabilities::in_memory();
        let body = json!({ "id": 5_000_000_000_u64, "name": "usb" });
        let res = set_input(&mut caps, &post("/api/audio/input", body)).unwrap();
        assert_eq!(res.body()["device"]["id"], 96);
    }

    #[test]
    fn selector_validation() {
        let mut caps = Capabilities::in_memory();
        let err = set_output(&mut caps, &Request::new(Method::Post, "/api/audio/output")).unwrap_err();
        assert_eq!(err, ApiError::invalid("Missing body", "name or id"));

        let err = set_output(&mut caps, &post("/api/audio/output", json!({ "id": "73" }))).unwrap_err();
        assert_eq!(
            err,
            ApiError::invalid("Invalid parameters", "name (string) or id (number)")
        );
    }

    #[test]
    fn unknown_device_is_500() {
        let mut caps = Capabilities::in_memory();
        let err = set_output(&mut caps, &post("/api/audio/output", json!({ "name": "hdmi" }))).unwrap_err();
        assert_eq!(err, ApiError::Failed { message: "Failed to set output device" });
        let err = set_input(&mut caps, &post("/api/audio/input", json!({ "id": 73 }))).unwrap_err();
        assert_eq!(err, ApiError::Failed { message: "Failed to set input device" });
    }
}
