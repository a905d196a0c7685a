//! WebSocket transport
//!
//! Connects to `<realtime url><path>?token=<credential>`, sends the auth
//! frame and pumps decoded frames into the connection's event stream.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info};

use crate::application::ports::{ChannelInput, RealtimeConnection, RealtimeTransport};
use crate::domain::{ChannelError, ClientError, ClientResult};
use crate::shared::shutdown::ShutdownSignal;

use super::frames::{decode_frame, Frame};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct WsTransport {
    endpoint: Url,
}

impl WsTransport {
    /// `base_url` may use http(s) or ws(s); `path` is appended to it.
    pub fn new(base_url: &str, path: &str) -> ClientResult<Self> {
        let mut endpoint = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid realtime url '{}': {}", base_url, e)))?;

        let scheme = match endpoint.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ClientError::Config(format!(
                    "unsupported realtime url scheme '{}'",
                    other
                )))
            }
        };
        endpoint
            .set_scheme(scheme)
            .map_err(|_| ClientError::Config(format!("cannot use scheme '{}'", scheme)))?;

        let joined = format!(
            "{}/{}",
            endpoint.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        endpoint.set_path(&joined);

        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, token: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }
}

#[async_trait]
impl RealtimeTransport for WsTransport {
    async fn open(&self, token: &str) -> Result<RealtimeConnection, ChannelError> {
        debug!(endpoint = %self.endpoint, "Establishing WebSocket connection");

        let (stream, _) = match connect_async(self.request_url(token).as_str()).await {
            Ok(ok) => ok,
            Err(WsError::Http(response)) => {
                let status = response.status().as_u16();
                return Err(match status {
                    401 => ChannelError::Auth("Unauthorized: realtime channel requires valid credentials".into()),
                    403 => ChannelError::Auth("Forbidden: access to realtime channel denied".into()),
                    code => ChannelError::Transport(format!("WebSocket HTTP error: {}", code)),
                });
            }
            Err(e) => return Err(ChannelError::Transport(format!("Connection failed: {}", e))),
        };

        let (mut sink, mut source) = stream.split();
        let auth = serde_json::to_string(&Frame::auth(token))
            .map_err(|e| ChannelError::Transport(format!("Failed to encode auth frame: {}", e)))?;
        sink.send(Message::Text(auth))
            .await
            .map_err(|e| ChannelError::Transport(format!("Failed to send auth frame: {}", e)))?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        // Receiver is still held below, the send cannot fail.
        let _ = tx.send(ChannelInput::Connect).await;

        let cancel = ShutdownSignal::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = source.next() => {
                        let input = match message {
                            Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                                Some(input) => input,
                                None => continue,
                            },
                            Some(Ok(Message::Close(frame))) => ChannelInput::Disconnect {
                                reason: frame
                                    .map(|f| f.reason.to_string())
                                    .filter(|r| !r.is_empty())
                                    .unwrap_or_else(|| "server closed connection".to_string()),
                            },
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => ChannelInput::Disconnect { reason: e.to_string() },
                            None => ChannelInput::Disconnect {
                                reason: "connection closed".to_string(),
                            },
                        };
                        let last = matches!(input, ChannelInput::Disconnect { .. });
                        if tx.send(input).await.is_err() || last {
                            break;
                        }
                    }
                    _ = stop.wait() => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            debug!("WebSocket reader stopped");
        });

        info!(endpoint = %self.endpoint, "🔗 WebSocket connected");
        Ok(RealtimeConnection::new(rx, move || {
            cancel.trigger();
        }))
    }
}
