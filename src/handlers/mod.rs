//! Endpoint handlers.
//!
//! Every handler has the same shape: validate the request, call exactly one
//! capability operation, and turn the outcome into a [`Response`]. Handlers
//! are plain synchronous functions; the dispatch queue guarantees that at
//! most one of them runs at any time.
//!
//! Failures are expressed as [`ApiError`] and converted to a response by the
//! router, so handlers can use `?` throughout.

use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::capability::{Capabilities, CapabilityError, VolumeControl};
use crate::http::{Request, Response, StatusCode};

pub mod devices;
pub mod media;
pub mod volume;

/// Outcome of a handler.
pub type HandlerResult = Result<Response, ApiError>;

/// A route target.
pub type Handler = fn(&mut Capabilities, &Request) -> HandlerResult;

/// A handler failure, already reduced to what the client may see.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Input validation failed. `required` names the field and its constraint.
    #[error("{message} (required: {required})")]
    Invalid {
        message: &'static str,
        required: &'static str,
    },

    #[error("Audio system not available")]
    AudioUnavailable,

    /// A capability call failed; the cause has already been logged.
    #[error("{message}")]
    Failed { message: &'static str },
}

impl ApiError {
    pub fn invalid(message: &'static str, required: &'static str) -> Self {
        Self::Invalid { message, required }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid { .. } => StatusCode::BadRequest,
            Self::AudioUnavailable | Self::Failed { .. } => StatusCode::InternalServerError,
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        match err {
            ApiError::Invalid { message, required } => Response::new(
                status,
                json!({
                    "error": message,
                    "required": required,
                }),
            ),
            ApiError::AudioUnavailable => Response::error(status, "Audio system not available"),
            ApiError::Failed { message } => Response::error(status, message),
        }
    }
}

/// Maps a capability error to a fixed client message, logging the cause.
pub(crate) fn failed(message: &'static str) -> impl FnOnce(CapabilityError) -> ApiError {
    move |source| {
        warn!(error = %source, "{}", message);
        ApiError::Failed { message }
    }
}

/// Reads an integer, accepting floats with no fractional part such as `50.0`.
pub(crate) fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        let n = value.as_f64()?;
        let in_range = n >= i64::MIN as f64 && n < i64::MAX as f64;
        (n.fract() == 0.0 && in_range).then_some(n as i64)
    })
}

/// Borrows the volume capability, which the router has already checked.
pub(crate) fn volume_control(
    caps: &mut Capabilities,
) -> Result<&mut Box<dyn VolumeControl>, ApiError> {
    caps.volume.as_mut().ok_or(ApiError::AudioUnavailable)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_maps_to_400_with_required_field() {
        let response: Response = ApiError::invalid("Invalid mute value", "muted (boolean)").into();
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(response.body()["error"], "Invalid mute value");
        assert_eq!(response.body()["required"], "muted (boolean)");
    }

    #[test]
    fn failures_map_to_500_without_detail() {
        let err = failed("Failed to play")(CapabilityError::NotRunning);
        let response: Response = err.into();
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(response.body(), &json!({ "error": "Failed to play" }));
    }

    #[test]
    fn whole_number_accepts_integral_floats() {
        assert_eq!(whole_number(&json!(50)), Some(50));
        assert_eq!(whole_number(&json!(50.0)), Some(50));
        assert_eq!(whole_number(&json!(-3.0)), Some(-3));
        assert_eq!(whole_number(&json!(50.5)), None);
        assert_eq!(whole_number(&json!(1e300)), None);
        assert_eq!(whole_number(&json!("50")), None);
    }

    #[test]
    fn unavailable_message_is_fixed() {
        let response: Response = ApiError::AudioUnavailable.into();
        assert_eq!(
            response.body(),
            &json!({ "error": "Audio system not available" })
        );
    }
}
