//! WebSocket session lifecycle.
//!
//! Accepts the browser channel, selects the agent persona from the auth
//! state, opens the single upstream connection, configures it, and hands
//! both halves to the relay. One session maps to exactly one upstream
//! connection; closing either side tears down the whole session.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use teller_core::session::SessionContext;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, Instrument};

use super::{protocol, relay, upstream};
use crate::state::AppState;

/// Query parameters accepted on `/ws/chat`. A present, non-empty `jwt`
/// selects the authenticated persona.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub jwt: Option<String>,
}

/// Axum handler to upgrade an HTTP connection to a WebSocket session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// Main handler for an individual browser connection.
#[instrument(name = "ws_session", skip_all, fields(session_id, role))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, params: ConnectParams) {
    let session = Arc::new(SessionContext::new(params.jwt));
    tracing::Span::current().record("session_id", session.session_id.to_string().as_str());
    tracing::Span::current().record("role", session.role.to_string().as_str());
    info!(
        user = %session.user_name,
        authenticated = session.is_authenticated(),
        agent = session.role.describe(),
        "browser connected"
    );

    let persona = Arc::new(state.personas.get(session.role).clone());

    let (browser_tx, browser_rx) = socket.split();
    let browser_tx = Arc::new(Mutex::new(browser_tx));

    // One upstream connection per session, configured before any relaying.
    let upstream_stream = match upstream::connect(
        &state.config.upstream_endpoint,
        &state.config.upstream_api_key,
        &state.config.upstream_deployment,
    )
    .await
    {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = ?e, "upstream connect failed, closing session");
            let mut sink = browser_tx.lock().await;
            let _ = sink
                .send(Message::Text(
                    protocol::session_error("voice service unavailable").into(),
                ))
                .await;
            let _ = sink.close().await;
            return;
        }
    };

    let (mut upstream_tx, upstream_rx) = upstream_stream.split();
    if let Err(e) = upstream::configure_session(&mut upstream_tx, &persona).await {
        error!(error = ?e, "session configuration failed");
        let _ = browser_tx.lock().await.close().await;
        return;
    }
    let upstream_tx = Arc::new(Mutex::new(upstream_tx));

    let relay_span = tracing::info_span!(
        "relay",
        session_id = %session.session_id,
        role = %session.role
    );
    async move {
        if let Err(e) = relay::run(
            state,
            session,
            persona,
            browser_tx,
            browser_rx,
            upstream_tx,
            upstream_rx,
        )
        .await
        {
            error!(error = ?e, "session terminated with error");
        }
        info!("session finished");
    }
    .instrument(relay_span)
    .await;
}
