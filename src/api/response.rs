use crate::api::error::Error;
use num_derive::FromPrimitive;
use serde_json::Value;

/// Vendor application-level outcome codes carried in the JSON `failCode`
/// field, independent of HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum FailCode {
    SessionExpired = 305,
    InvalidAccessToCurrentInterface = 306,
    AccessFrequencyIsTooHigh = 407,
}

/// Outcome of envelope inspection, before any typed parsing.
#[derive(Debug)]
pub(crate) enum Dispatch {
    /// `failCode` 0 or absent; the body carries the payload.
    Body(Value),
    /// Fail code 305: the cached session token is no longer valid and the
    /// request should be re-issued once with a fresh login.
    SessionExpired,
}

fn envelope_message(value: &Value) -> String {
    match value.get("data") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::from("(no error message received)"),
    }
}

/// Process a valid HTTP response body to identify a potential API-level
/// error indicated with nonzero `failCode`. Known codes map to specific
/// error variants, any other nonzero code to a generic fail-code error.
pub(crate) fn map_response_status(value: Value) -> Result<Dispatch, Error> {
    let fail_code = value.get("failCode").and_then(Value::as_u64).unwrap_or(0);

    if fail_code == 0 {
        return Ok(Dispatch::Body(value));
    }

    let message = envelope_message(&value);

    match num::FromPrimitive::from_u64(fail_code) {
        Some(FailCode::SessionExpired) => Ok(Dispatch::SessionExpired),
        /* {"data":"ACCESS_FREQUENCY_IS_TOO_HIGH","failCode":407,"params":null,"success":false} */
        Some(FailCode::AccessFrequencyIsTooHigh) => Err(Error::RateExceeded(message)),
        Some(FailCode::InvalidAccessToCurrentInterface) => Err(Error::InvalidAccess(message)),
        None => Err(Error::FailCode(fail_code as u32, message)),
    }
}
