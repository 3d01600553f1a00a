use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Login failed. The cause (network, non-2xx, missing session cookie)
    /// is intentionally not differentiated to the caller.
    Login(String),
    /// Network failure or non-2xx HTTP status.
    Transport(String),
    /// Response body was not the JSON we expected.
    InvalidResponse(String, String),
    /// Application-level failure reported through the `failCode` envelope.
    FailCode(u32, String),
    /// Fail code 407, `ACCESS_FREQUENCY_IS_TOO_HIGH`.
    RateExceeded(String),
    /// Fail code 306, invalid access to the current interface.
    InvalidAccess(String),
    WebSocket(String),
    InvalidCurrentLimit(u32),
    Internal,
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::RateExceeded(s) => {
                let error = format!("<html><body><h3>429 Too Many Requests</h3>Charger API response: <code>{}</code></body></html>", s);
                Response::build()
                    .status(Status::TooManyRequests)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            Error::Login(s) => {
                let error = format!("<html><body><h3>403 Forbidden</h3>Error while authenticating to the charger API: <code>{}</code></body></html>", s);
                Response::build()
                    .status(Status::Forbidden)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            Error::InvalidCurrentLimit(value) => {
                let error = format!("<html><body><h3>422 Unprocessable Entity</h3>Current limit <code>{}</code> is outside the accepted [1, 32000] mA range</body></html>", value);
                Response::build()
                    .status(Status::UnprocessableEntity)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            Error::FailCode(code, message) => {
                let error = format!(
                    "<html><body><h3>502 Bad Gateway</h3>Charger API failed with failCode: <code>{}</code>, message: <code>{}</code></body></html>",
                    code, message
                );
                Response::build()
                    .status(Status::BadGateway)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            _ => {
                let error = format!(
                    "<html><body><h3>Unknown exception</h3><code>{:?}</code></body></html>",
                    self
                );
                Response::build()
                    .status(Status::InternalServerError)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
        }
    }
}
