pub mod endpoint;
pub mod error;
pub mod response;

pub use error::Error;

use crate::model::{Credentials, CurrentLimit, Schedule};
use reqwest::Method;
use response::Dispatch;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;

/// Timeout for login and read-only calls.
const READ_TIMEOUT: Duration = Duration::from_millis(1500);
/// Timeout for mutating calls.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Session-holding client for the Zencharger dashboard API.
///
/// Owns the credentials, the cookie jar and the opaque session token
/// obtained at login. The token is re-obtained lazily whenever the server
/// reports it invalid (fail code 305). Read-modify-write operations are
/// serialized through an internal lock so two concurrent current-limit
/// updates cannot lose one of the writes.
pub struct ZenchargerApi {
    host: String,
    password: String,
    client: reqwest::Client,
    session: Mutex<Option<String>>,
    update_lock: Mutex<()>,
}

/// Map a transport-level (non-2xx or network) failure to an error variant.
fn map_api_err(error: reqwest::Error) -> Error {
    match error.status() {
        Some(http::StatusCode::TOO_MANY_REQUESTS) => Error::RateExceeded(error.to_string()),
        Some(http::StatusCode::UNAUTHORIZED) => Error::Login(error.to_string()),
        _ => Error::Transport(error.to_string()),
    }
}

/// Overwrite every active entry limit with `limit`. Entries with
/// `CurrentLimit == 0` denote "no limit set" and are never touched.
fn apply_current_limit(schedule: &mut Schedule, limit: CurrentLimit) {
    for entries in schedule.values_mut() {
        for entry in entries.iter_mut() {
            if entry.current_limit != 0 {
                entry.current_limit = limit.milliamps();
            }
        }
    }
}

impl ZenchargerApi {
    pub fn new(credentials: Credentials) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .cookie_store(true)
            .build()
            .or(Err(Error::Internal))?;

        Ok(Self {
            host: credentials.host,
            password: credentials.password,
            client,
            session: Mutex::new(None),
            update_lock: Mutex::new(()),
        })
    }

    fn url(&self, endpoint: &endpoint::Endpoint) -> String {
        format!("{}{}{}", self.host, endpoint::BASE, endpoint)
    }

    /// Login to the dashboard to obtain a session token.
    ///
    /// The token is the raw `Set-Cookie` header; the cookie jar picks up
    /// the actual cookie for subsequent calls. Any failure (network,
    /// non-2xx, missing cookie header) surfaces as the same generic login
    /// error.
    pub async fn login(&self) -> Result<String, Error> {
        let body = json!({
            "Password": self.password,
            "PersistentSession": true,
        });

        let response = self
            .client
            .post(self.url(endpoint::LOGIN))
            .json(&body)
            .timeout(READ_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Login(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Login(format!("server responded {}", status)));
        }

        match response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            Some(cookie) => {
                let token = String::from(cookie);
                *self.session.lock().await = Some(token.clone());
                Ok(token)
            }
            None => Err(Error::Login(format!(
                "no session cookie received (server responded {})",
                status
            ))),
        }
    }

    /// Session token currently held, logging in first if there is none.
    pub async fn ensure_session(&self) -> Result<String, Error> {
        if let Some(token) = self.session.lock().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    /// Perform `method` against `endpoint`, logging in lazily and
    /// re-issuing the request exactly once after a session-expired fail
    /// code.
    async fn dispatch(
        &self,
        method: Method,
        endpoint: &endpoint::Endpoint,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<Value, Error> {
        for _attempt in 0..2 {
            self.ensure_session().await?;

            let mut request = self
                .client
                .request(method.clone(), self.url(endpoint))
                .timeout(timeout);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(map_api_err)?
                .error_for_status()
                .map_err(map_api_err)?;

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            if !content_type.contains("application/json") {
                return Err(Error::InvalidResponse(
                    content_type,
                    String::from("expected application/json response"),
                ));
            }

            let response_text = response
                .text()
                .await
                .map_err(|e| Error::InvalidResponse(e.to_string(), String::new()))?;

            log::trace!(
                "endpoint: {}, body: {:?}, response_text: {}",
                endpoint,
                body,
                response_text
            );

            let value: Value = serde_json::from_str(&response_text)
                .map_err(|e| Error::InvalidResponse(e.to_string(), response_text))?;

            match response::map_response_status(value)? {
                Dispatch::Body(value) => return Ok(value),
                Dispatch::SessionExpired => {
                    log::debug!("session expired on {}, re-authenticating", endpoint);
                    *self.session.lock().await = None;
                }
            }
        }

        /* Second 305 in a row: the fresh token was rejected as well. */
        Err(Error::FailCode(
            response::FailCode::SessionExpired as u32,
            String::from("session expired again after re-login"),
        ))
    }

    /// Perform a GET call to the API.
    async fn get(&self, endpoint: &endpoint::Endpoint) -> Result<Value, Error> {
        self.dispatch(Method::GET, endpoint, None, READ_TIMEOUT).await
    }

    /// Perform a POST or PATCH call to the API.
    async fn request(
        &self,
        method: Method,
        endpoint: &endpoint::Endpoint,
        body: &Value,
    ) -> Result<Value, Error> {
        self.dispatch(method, endpoint, Some(body), WRITE_TIMEOUT)
            .await
    }

    pub async fn status(&self) -> Result<Value, Error> {
        self.get(endpoint::STATUS).await
    }

    pub async fn schedules(&self) -> Result<Schedule, Error> {
        let mut value = self.get(endpoint::SCHEDULES).await?;

        /* The schedule body is the plain day-to-entries map; a zero
         * `failCode` key, when present, belongs to the envelope. */
        if let Some(object) = value.as_object_mut() {
            object.remove("failCode");
        }

        serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidResponse(e.to_string(), value.to_string()))
    }

    pub async fn update_scheduled_charging(&self, schedule: &Schedule) -> Result<(), Error> {
        let body = serde_json::to_value(schedule).or(Err(Error::Internal))?;
        self.request(Method::POST, endpoint::SCHEDULES, &body)
            .await
            .map(|_| ())
    }

    pub async fn update_user_config(&self, config: &Value) -> Result<(), Error> {
        self.request(Method::PATCH, endpoint::USER_CONFIG, config)
            .await
            .map(|_| ())
    }

    /// Set a new charging current limit.
    ///
    /// Fetches the schedule fresh, overwrites every nonzero entry limit
    /// with the new value, writes the whole schedule back and re-enables
    /// scheduled charging. The vendor offers no transactional update, so
    /// a concurrent external modification between fetch and write-back is
    /// lost (last-writer-wins); calls through the same client instance
    /// are serialized to keep at least those from racing each other.
    pub async fn update_current_limit(&self, limit: CurrentLimit) -> Result<(), Error> {
        let _guard = self.update_lock.lock().await;

        let mut schedule = self.schedules().await?;
        apply_current_limit(&mut schedule, limit);
        self.update_scheduled_charging(&schedule).await?;
        self.update_user_config(&json!({"ScheduledChargingEnable": true}))
            .await
    }
}
