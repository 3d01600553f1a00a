//! Websocket companion of the API client.
//!
//! The dashboard pushes live charger readings over a websocket that is
//! authenticated with the same session cookie as the REST API. The reader
//! task publishes every parsed frame on a watch channel; consumers follow
//! the latest value and do not see a backlog.

use crate::api::endpoint;
use crate::api::Error;
use crate::model::LiveData;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

pub struct ZenchargerWebSocket {
    live: watch::Receiver<LiveData>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

/// Derive the live-feed websocket URL from the dashboard host URL.
fn ws_url(host: &str) -> String {
    let ws_host = if let Some(rest) = host.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = host.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("ws://{}", host)
    };
    format!("{}{}{}", ws_host, endpoint::BASE, endpoint::LIVE)
}

/// The session token is the raw `Set-Cookie` header from login; only its
/// leading `name=value` pair goes back out on the handshake.
fn cookie_pair(token: &str) -> &str {
    token.split(';').next().unwrap_or(token).trim()
}

impl ZenchargerWebSocket {
    /// Connect to the live feed with an already-obtained session token.
    ///
    /// A failure here is the "not ready" signal of the lifecycle layer:
    /// the caller is expected to retry the whole start sequence later.
    pub async fn connect(host: &str, session_token: &str) -> Result<Self, Error> {
        let mut request = ws_url(host)
            .into_client_request()
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        let cookie = HeaderValue::from_str(cookie_pair(session_token))
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        request.headers_mut().insert(header::COOKIE, cookie);

        let (mut stream, _) = connect_async(request)
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;

        log::info!("live feed connected to {}", ws_url(host));

        let (live_tx, live_rx) = watch::channel(LiveData::default());
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let reader = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        let _ = stream.send(Message::Close(None)).await;
                        break;
                    }
                    message = stream.next() => match message {
                        Some(Ok(Message::Text(frame))) => {
                            match serde_json::from_str::<LiveData>(&frame) {
                                Ok(data) => {
                                    let _ = live_tx.send(data);
                                }
                                Err(e) => {
                                    log::warn!("unparseable live frame: {} ({})", frame, e);
                                }
                            }
                        }
                        /* pings are answered by tungstenite itself */
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("live feed closed by server");
                            break;
                        }
                        Some(Ok(other)) => {
                            log::debug!("ignoring non-text live frame: {:?}", other);
                        }
                        Some(Err(e)) => {
                            log::error!("live feed read error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            live: live_rx,
            shutdown: Mutex::new(Some(shutdown_tx)),
            reader: Mutex::new(Some(reader)),
        })
    }

    /// Follow the live feed. The receiver always holds the latest sample.
    pub fn live(&self) -> watch::Receiver<LiveData> {
        self.live.clone()
    }

    /// Close the websocket and stop the reader task. Idempotent.
    pub async fn disconnect(&self) {
        if let Some(shutdown) = self.shutdown.lock().await.take() {
            let _ = shutdown.send(());
        }
        if let Some(reader) = self.reader.lock().await.take() {
            let _ = reader.await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ws_url_swaps_scheme() {
        assert_eq!(
            ws_url("https://charger.local"),
            "wss://charger.local/api/v1/ws"
        );
        assert_eq!(
            ws_url("http://192.168.1.40"),
            "ws://192.168.1.40/api/v1/ws"
        );
        assert_eq!(ws_url("charger.local"), "ws://charger.local/api/v1/ws");
    }

    #[test]
    fn cookie_pair_strips_attributes() {
        assert_eq!(
            cookie_pair("sessionId=abc123; Path=/; HttpOnly"),
            "sessionId=abc123"
        );
        assert_eq!(cookie_pair("sessionId=abc123"), "sessionId=abc123");
    }

    #[tokio::test]
    async fn garbage_frames_are_skipped_and_disconnect_is_idempotent() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut stream = tokio_tungstenite::accept_async(tcp).await.unwrap();

            stream
                .send(Message::Text(String::from("not json at all")))
                .await
                .unwrap();
            stream
                .send(Message::Text(String::from(
                    r#"{"Power": 7360.0, "Status": "Charging"}"#,
                )))
                .await
                .unwrap();

            /* hold the socket open until the client closes it */
            while let Some(Ok(message)) = stream.next().await {
                if let Message::Close(_) = message {
                    break;
                }
            }
        });

        let socket = ZenchargerWebSocket::connect(
            &format!("http://{}", addr),
            "sessionId=abc123; Path=/; HttpOnly",
        )
        .await
        .unwrap();

        /* the unparseable frame never reaches the channel; the first
         * observable change is the parsed sample */
        let mut live = socket.live();
        live.changed().await.unwrap();
        let data = live.borrow().clone();
        assert_eq!(data.power, Some(7360.0));
        assert_eq!(data.status.as_deref(), Some("Charging"));

        socket.disconnect().await;
        socket.disconnect().await;

        server.await.unwrap();
    }
}
