//! Upstream session management.
//!
//! Opens exactly one realtime connection per browser session, carrying the
//! API credential as a header, and pushes the selected persona's
//! configuration before any relaying starts.

use anyhow::{Context, Result};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::time::Duration;
use teller_core::persona::Persona;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::info;

use super::protocol;

/// The upstream handshake must complete within this window.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const API_VERSION: &str = "2024-10-01-preview";

pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type UpstreamSink = SplitSink<UpstreamStream, WsMessage>;

/// Builds the realtime WebSocket URL from the configured endpoint and
/// deployment name. The credential never appears here.
pub fn realtime_url(endpoint: &str, deployment: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    let ws_endpoint = if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        endpoint.to_string()
    };
    format!("{ws_endpoint}/openai/realtime?api-version={API_VERSION}&deployment={deployment}")
}

/// Connects to the upstream realtime endpoint with the credential as an
/// auxiliary header. Fails if the handshake exceeds `CONNECT_TIMEOUT`.
pub async fn connect(
    endpoint: &str,
    api_key: &str,
    deployment: &str,
) -> Result<UpstreamStream> {
    let url = realtime_url(endpoint, deployment);
    let mut request = url
        .into_client_request()
        .context("invalid upstream realtime URL")?;
    request
        .headers_mut()
        .insert("api-key", api_key.parse().context("API key is not a valid header value")?);

    let (stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(request))
        .await
        .context("upstream connect timed out")?
        .context("failed to connect to upstream realtime endpoint")?;
    info!("connected to upstream realtime endpoint");
    Ok(stream)
}

/// Sends the persona's `session.update`, seeds the intro utterance, and
/// triggers the greeting response.
pub async fn configure_session(sink: &mut UpstreamSink, persona: &Persona) -> Result<()> {
    sink.send(WsMessage::Text(protocol::session_update(persona).into()))
        .await
        .context("failed to send session.update")?;
    sink.send(WsMessage::Text(protocol::intro_item(persona).into()))
        .await
        .context("failed to seed intro utterance")?;
    if persona.vad.auto_respond {
        sink.send(WsMessage::Text(protocol::response_create().into()))
            .await
            .context("failed to trigger greeting response")?;
    }
    info!(role = %persona.role, voice = %persona.voice, "upstream session configured");
    Ok(())
}
