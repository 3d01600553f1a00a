//! Explicit start/stop lifecycle around the API client and its websocket.
//!
//! No surrounding framework is assumed: whoever embeds this crate calls
//! `start` with credentials and holds on to the returned handle, and
//! calls `stop` on the way down to release the websocket connection.

use crate::api::{Error, ZenchargerApi};
use crate::model::{Credentials, LiveData};
use crate::ws::ZenchargerWebSocket;
use tokio::sync::watch;

pub struct Integration {
    api: ZenchargerApi,
    websocket: ZenchargerWebSocket,
}

impl Integration {
    /// Bring the binding up: authenticate and open the live feed.
    ///
    /// A websocket connect failure fails the whole start; the caller
    /// treats that as "not ready, retry later".
    pub async fn start(credentials: Credentials) -> Result<Self, Error> {
        let host = credentials.host.clone();
        let api = ZenchargerApi::new(credentials)?;
        let session_token = api.ensure_session().await?;
        let websocket = ZenchargerWebSocket::connect(&host, &session_token).await?;

        Ok(Self { api, websocket })
    }

    pub fn api(&self) -> &ZenchargerApi {
        &self.api
    }

    /// Follow the websocket live feed.
    pub fn live(&self) -> watch::Receiver<LiveData> {
        self.websocket.live()
    }

    /// Tear the binding down, releasing the websocket connection.
    pub async fn stop(&self) {
        self.websocket.disconnect().await;
    }
}
