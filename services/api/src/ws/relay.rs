//! The relay core: two cooperating single-direction pumps per session.
//!
//! The up-pump forwards browser frames to the upstream peer verbatim. The
//! down-pump parses upstream textual events just enough to intercept tool
//! calls; everything else is forwarded as the original frame so ordering and
//! content are preserved bit for bit. The first pump to terminate cancels
//! the other.

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use teller_core::persona::Persona;
use teller_core::session::SessionContext;
use teller_core::tools::ToolOutput;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::protocol::{self, UpstreamEvent, EVT_ERROR, EVT_FUNCTION_CALL_DONE, EVT_SPEECH_STARTED};
use super::upstream::{UpstreamSink, UpstreamStream};
use crate::state::AppState;

/// Both pumps must be torn down within this window once either peer closes.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

type BrowserSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;
type SharedUpstreamSink = Arc<Mutex<UpstreamSink>>;

/// Runs the bidirectional relay until either peer drops, then shuts the
/// other side down.
pub async fn run(
    state: Arc<AppState>,
    session: Arc<SessionContext>,
    persona: Arc<Persona>,
    browser_tx: BrowserSink,
    browser_rx: SplitStream<WebSocket>,
    upstream_tx: SharedUpstreamSink,
    upstream_rx: SplitStream<UpstreamStream>,
) -> Result<()> {
    let outcome = tokio::select! {
        result = pump_up(browser_rx, upstream_tx.clone()) => ("up", result),
        result = pump_down(
            state,
            session,
            persona,
            upstream_rx,
            upstream_tx.clone(),
            browser_tx.clone(),
        ) => ("down", result),
    };

    match &outcome {
        (pump, Ok(reason)) => info!(pump, reason, "relay finished"),
        (pump, Err(e)) => warn!(pump, error = %e, "relay terminated with error"),
    }

    // Losing pump was dropped by the select; close both peers within bound.
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = upstream_tx.lock().await.close().await;
        let _ = browser_tx.lock().await.close().await;
    })
    .await;

    outcome.1.map(|_| ())
}

/// Browser → upstream. Forwards every frame verbatim; no parsing.
async fn pump_up(
    mut browser_rx: SplitStream<WebSocket>,
    upstream_tx: SharedUpstreamSink,
) -> Result<&'static str> {
    while let Some(frame) = browser_rx.next().await {
        let frame = frame.context("error receiving from browser")?;
        match frame {
            Message::Text(text) => {
                upstream_tx
                    .lock()
                    .await
                    .send(WsMessage::text(text.as_str()))
                    .await
                    .context("error forwarding text upstream")?;
            }
            Message::Binary(data) => {
                upstream_tx
                    .lock()
                    .await
                    .send(WsMessage::binary(data))
                    .await
                    .context("error forwarding binary upstream")?;
            }
            Message::Close(_) => return Ok("browser sent close"),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    Ok("browser stream ended")
}

/// Upstream → browser. Intercepts tool calls, forwards everything else.
async fn pump_down(
    state: Arc<AppState>,
    session: Arc<SessionContext>,
    persona: Arc<Persona>,
    mut upstream_rx: SplitStream<UpstreamStream>,
    upstream_tx: SharedUpstreamSink,
    browser_tx: BrowserSink,
) -> Result<&'static str> {
    // Tool executions run concurrently with relaying; dropping this pump
    // (session teardown) aborts whatever is still in flight.
    let mut tool_tasks: JoinSet<()> = JoinSet::new();
    let in_flight: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));

    while let Some(frame) = upstream_rx.next().await {
        let frame = frame.context("error receiving from upstream")?;
        match frame {
            WsMessage::Text(text) => {
                let event = match UpstreamEvent::parse(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "malformed upstream event dropped");
                        continue;
                    }
                };

                if event.kind == EVT_FUNCTION_CALL_DONE {
                    intercept_tool_call(
                        event,
                        &state,
                        &session,
                        &persona,
                        &upstream_tx,
                        &browser_tx,
                        &in_flight,
                        &mut tool_tasks,
                    )
                    .await;
                    continue;
                }

                match event.kind.as_str() {
                    EVT_SPEECH_STARTED => info!("caller started speaking"),
                    EVT_ERROR => error!(details = ?event.error, "upstream reported an error"),
                    other => debug!(event = other, "forwarding upstream event"),
                }
                browser_tx
                    .lock()
                    .await
                    .send(Message::Text(text.as_str().into()))
                    .await
                    .context("error forwarding text to browser")?;
            }
            WsMessage::Binary(data) => {
                browser_tx
                    .lock()
                    .await
                    .send(Message::Binary(data))
                    .await
                    .context("error forwarding binary to browser")?;
            }
            WsMessage::Close(_) => return Ok("upstream sent close"),
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }
    Ok("upstream stream ended")
}

/// Removes a tool-call event from the stream and schedules its execution.
/// The event is never forwarded to the browser.
#[allow(clippy::too_many_arguments)]
async fn intercept_tool_call(
    event: UpstreamEvent,
    state: &Arc<AppState>,
    session: &Arc<SessionContext>,
    persona: &Arc<Persona>,
    upstream_tx: &SharedUpstreamSink,
    browser_tx: &BrowserSink,
    in_flight: &Arc<Mutex<HashSet<String>>>,
    tool_tasks: &mut JoinSet<()>,
) {
    let (Some(call_id), Some(name)) = (event.call_id, event.name) else {
        warn!("tool-call event missing call_id or name, dropped");
        return;
    };
    let arguments = event.arguments.unwrap_or_else(|| "{}".to_string());

    if !in_flight.lock().await.insert(call_id.clone()) {
        warn!(%call_id, "duplicate tool call ignored");
        return;
    }

    let state = state.clone();
    let session = session.clone();
    let persona = persona.clone();
    let upstream_tx = upstream_tx.clone();
    let browser_tx = browser_tx.clone();
    let in_flight = in_flight.clone();
    tool_tasks.spawn(async move {
        if let Err(e) = execute_tool_call(
            state,
            session,
            persona,
            call_id.clone(),
            name,
            arguments,
            upstream_tx,
            browser_tx,
        )
        .await
        {
            error!(%call_id, error = %e, "tool call handling failed");
        }
        in_flight.lock().await.remove(&call_id);
    });
}

/// Dispatches the tool, inserts its output into the upstream conversation,
/// and triggers response generation. For handoffs, additionally notifies the
/// browser after the persona's configured delay so the current utterance can
/// finish.
#[allow(clippy::too_many_arguments)]
async fn execute_tool_call(
    state: Arc<AppState>,
    session: Arc<SessionContext>,
    persona: Arc<Persona>,
    call_id: String,
    name: String,
    arguments: String,
    upstream_tx: SharedUpstreamSink,
    browser_tx: BrowserSink,
) -> Result<()> {
    info!(%call_id, tool = %name, "intercepted tool call");
    let output = state
        .tools
        .dispatch_to_text(&session, &name, &arguments)
        .await;

    {
        // One lock hold guarantees the output lands upstream before the
        // response trigger and before any later frame.
        let mut sink = upstream_tx.lock().await;
        sink.send(WsMessage::text(protocol::function_call_output(
            &call_id,
            output.output_text(),
        )))
        .await
        .context("error sending function_call_output")?;
        sink.send(WsMessage::text(protocol::response_create()))
            .await
            .context("error sending response.create")?;
    }
    info!(%call_id, "tool result sent upstream");

    if let ToolOutput::Handoff(signal) = output {
        tokio::time::sleep(Duration::from_millis(persona.handoff_delay_ms)).await;
        info!(target = %signal.target, "notifying browser of agent handoff");
        browser_tx
            .lock()
            .await
            .send(Message::Text(
                protocol::agent_handoff(signal.target, &signal.message).into(),
            ))
            .await
            .context("error sending agent.handoff to browser")?;
    }
    Ok(())
}
