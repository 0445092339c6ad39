use crate::websocket::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    Socket(#[from] tungstenite::Error),
    #[error("invalid event payload: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Socket URL for an API base such as `http://localhost:5000`.
pub fn socket_url(base_url: &str, token: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    match token {
        Some(token) => format!("{base}/ws?token={token}"),
        None => format!("{base}/ws"),
    }
}

pub struct RealtimeClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RealtimeClient {
    pub async fn connect(base_url: &str, token: Option<&str>) -> Result<Self, ClientError> {
        let url = socket_url(base_url, token);
        let (stream, _) = connect_async(url.as_str()).await?;
        tracing::debug!(%url, "realtime socket connected");
        Ok(Self { stream })
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), ClientError> {
        let payload = serde_json::to_string(event)?;
        self.stream.send(WsMessage::Text(payload)).await?;
        Ok(())
    }

    /// Next server event. `None` once the socket is closed.
    ///
    /// Control frames are handled by the transport and skipped here.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>, ClientError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                WsMessage::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                WsMessage::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url() {
        assert_eq!(socket_url("http://localhost:5000/", None), "ws://localhost:5000/ws");
        assert_eq!(
            socket_url("https://api.bagicha.app", Some("abc.def")),
            "wss://api.bagicha.app/ws?token=abc.def"
        );
        assert_eq!(socket_url("ws://127.0.0.1:9000", None), "ws://127.0.0.1:9000/ws");
    }
}
