//! End-to-end relay behaviour against an in-process fake upstream peer.
//!
//! Each test boots the real gateway router on an ephemeral port, points its
//! upstream endpoint at a scripted WebSocket server, and connects a plain
//! WebSocket client where the browser would be.

use futures_util::{SinkExt, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use teller_api::config::Config;
use teller_api::router::create_router;
use teller_api::state::AppState;
use teller_core::backend::AccountApi;
use teller_core::persona::{Persona, PersonaSet};
use teller_core::retrieval::chunker::section_delimiter;
use teller_core::retrieval::RetrievalService;
use teller_core::tools::ToolRegistry;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

const WAIT: Duration = Duration::from_secs(5);

fn persona(role: &str, voice: &str, handoff_delay_ms: u64) -> Persona {
    serde_json::from_value(serde_json::json!({
        "role": role,
        "voice": voice,
        "intro_utterance": "Hello, I just joined the line.",
        "instructions": "You are a helpful bank voice agent.",
        "tools": [
            {
                "name": "search_knowledge_base",
                "description": "Search the help center.",
                "arguments": { "query": { "type": "string", "required": true } }
            }
        ],
        "vad": { "threshold": 0.6, "prefix_padding_ms": 200, "silence_duration_ms": 400 },
        "handoff_delay_ms": handoff_delay_ms
    }))
    .unwrap()
}

fn write_corpus() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("teller-relay-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let corpus = format!(
        "SOURCE: https://help.example.com/freeze\nTITLE: How to freeze your card\n\n\
         You can freeze your card instantly from the app and unfreeze it whenever \
         you like. Freezing blocks all new card transactions right away.\n{}\n\
         SOURCE: https://help.example.com/fees\nTITLE: Fees\n\n\
         There are no monthly fees on the everyday account at all.",
        section_delimiter()
    );
    let path = dir.join("corpus.txt");
    std::fs::write(&path, corpus).unwrap();
    path
}

/// The scripted upstream peer. `received` yields every frame the gateway
/// sends upstream; `script` injects frames as if the model had emitted them.
struct FakeUpstream {
    endpoint: String,
    received: mpsc::UnboundedReceiver<WsMessage>,
    script: mpsc::UnboundedSender<WsMessage>,
}

async fn spawn_fake_upstream() -> FakeUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (recv_tx, received) = mpsc::unbounded_channel();
    let (script, mut script_rx) = mpsc::unbounded_channel::<WsMessage>();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let (mut tx, mut rx) = ws.split();
        loop {
            tokio::select! {
                scripted = script_rx.recv() => match scripted {
                    Some(msg) => {
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                inbound = rx.next() => match inbound {
                    Some(Ok(msg)) => {
                        let closing = matches!(msg, WsMessage::Close(_));
                        let _ = recv_tx.send(msg);
                        if closing {
                            break;
                        }
                    }
                    _ => {
                        let _ = recv_tx.send(WsMessage::Close(None));
                        break;
                    }
                },
            }
        }
    });

    FakeUpstream {
        endpoint: format!("http://{addr}"),
        received,
        script,
    }
}

type Browser = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct Harness {
    upstream: FakeUpstream,
    browser: Browser,
}

async fn start_gateway(jwt: Option<&str>) -> Harness {
    let upstream = spawn_fake_upstream().await;
    let corpus = write_corpus();

    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        upstream_endpoint: upstream.endpoint.clone(),
        upstream_api_key: "test-key".to_string(),
        upstream_deployment: "test-deployment".to_string(),
        embedding_endpoint: None,
        embedding_api_key: None,
        embedding_model: "text-embedding-ada-002".to_string(),
        backend_api_base: "http://127.0.0.1:9".to_string(),
        use_vector_store: false,
        knowledge_base_path: corpus.clone(),
        vector_store_dir: corpus.parent().unwrap().join("index"),
        persona_dir: PathBuf::from("./personas"),
        cors_allowed_origins: Vec::new(),
        log_level: tracing::Level::INFO,
    };

    let personas = PersonaSet::from_personas(
        persona("A", "shimmer", 800),
        persona("B", "alloy", 800),
    )
    .unwrap();
    let retrieval = Arc::new(RetrievalService::keyword_only(&corpus));
    let account = Arc::new(AccountApi::new(config.backend_api_base.clone()));
    let tools = Arc::new(ToolRegistry::standard(retrieval.clone(), account));

    let state = Arc::new(AppState {
        config: Arc::new(config),
        personas: Arc::new(personas),
        retrieval,
        tools,
    });

    let app = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = match jwt {
        Some(token) => format!("ws://{addr}/ws/chat?jwt={token}"),
        None => format!("ws://{addr}/ws/chat"),
    };
    let (browser, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    Harness { upstream, browser }
}

async fn next_upstream_text(upstream: &mut FakeUpstream) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(WAIT, upstream.received.recv())
            .await
            .expect("timed out waiting for upstream frame")
            .expect("upstream channel closed");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn next_browser_text(browser: &mut Browser) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(WAIT, browser.next())
            .await
            .expect("timed out waiting for browser frame")
            .expect("browser stream ended")
            .expect("browser stream errored");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Consumes the session bootstrap messages and returns the `session.update`.
async fn drain_setup(upstream: &mut FakeUpstream) -> serde_json::Value {
    let update = next_upstream_text(upstream).await;
    assert_eq!(update["type"], "session.update");
    let intro = next_upstream_text(upstream).await;
    assert_eq!(intro["type"], "conversation.item.create");
    let trigger = next_upstream_text(upstream).await;
    assert_eq!(trigger["type"], "response.create");
    update
}

fn tool_call_event(call_id: &str, name: &str, arguments: serde_json::Value) -> WsMessage {
    WsMessage::text(
        serde_json::json!({
            "type": "response.function_call_arguments.done",
            "call_id": call_id,
            "name": name,
            "arguments": arguments.to_string(),
        })
        .to_string(),
    )
}

#[tokio::test]
async fn anonymous_session_configures_role_a_persona() {
    let mut harness = start_gateway(None).await;
    let update = drain_setup(&mut harness.upstream).await;
    assert_eq!(update["session"]["voice"], "shimmer");
    assert_eq!(update["session"]["input_audio_format"], "pcm16");
    assert_eq!(update["session"]["turn_detection"]["type"], "server_vad");
}

#[tokio::test]
async fn token_selects_role_b_persona() {
    let mut harness = start_gateway(Some("mock-token")).await;
    let update = drain_setup(&mut harness.upstream).await;
    assert_eq!(update["session"]["voice"], "alloy");
}

#[tokio::test]
async fn browser_frames_are_relayed_verbatim() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    // 200 ms of 24 kHz PCM16 silence, base64-wrapped like the real client.
    use base64::Engine;
    let silence = vec![0u8; 4800 * 2];
    let encoded = base64::engine::general_purpose::STANDARD.encode(&silence);
    let append = serde_json::json!({
        "type": "input_audio_buffer.append",
        "audio": encoded,
    })
    .to_string();
    harness
        .browser
        .send(WsMessage::text(append.clone()))
        .await
        .unwrap();

    let relayed = tokio::time::timeout(WAIT, harness.upstream.received.recv())
        .await
        .unwrap()
        .unwrap();
    match relayed {
        WsMessage::Text(text) => assert_eq!(text.as_str(), append),
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn downstream_events_are_forwarded_unchanged() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    let delta = serde_json::json!({
        "type": "response.audio.delta",
        "delta": "AAAA"
    })
    .to_string();
    harness.upstream.script.send(WsMessage::text(delta)).unwrap();

    let event = next_browser_text(&mut harness.browser).await;
    assert_eq!(event["type"], "response.audio.delta");
    assert_eq!(event["delta"], "AAAA");
}

#[tokio::test]
async fn speech_started_is_forwarded_for_barge_in() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    harness
        .upstream
        .script
        .send(WsMessage::text(
            serde_json::json!({ "type": "input_audio_buffer.speech_started" }).to_string(),
        ))
        .unwrap();

    let event = next_browser_text(&mut harness.browser).await;
    assert_eq!(event["type"], "input_audio_buffer.speech_started");
}

#[tokio::test]
async fn tool_calls_are_intercepted_and_answered_in_order() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    harness
        .upstream
        .script
        .send(tool_call_event(
            "c1",
            "search_knowledge_base",
            serde_json::json!({ "query": "freeze card" }),
        ))
        .unwrap();

    // The gateway must answer with the output first, then the trigger.
    let output = next_upstream_text(&mut harness.upstream).await;
    assert_eq!(output["type"], "conversation.item.create");
    assert_eq!(output["item"]["type"], "function_call_output");
    assert_eq!(output["item"]["call_id"], "c1");
    let text = output["item"]["output"].as_str().unwrap();
    assert!(text.contains("[How to freeze your card]"), "got: {text}");

    let trigger = next_upstream_text(&mut harness.upstream).await;
    assert_eq!(trigger["type"], "response.create");

    // The browser must never observe the intercepted event: the next thing
    // it sees is the marker sent afterwards.
    harness
        .upstream
        .script
        .send(WsMessage::text(
            serde_json::json!({ "type": "response.done" }).to_string(),
        ))
        .unwrap();
    let seen = next_browser_text(&mut harness.browser).await;
    assert_eq!(seen["type"], "response.done");
}

#[tokio::test]
async fn gated_tool_in_anonymous_session_fails_without_backend_contact() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    harness
        .upstream
        .script
        .send(tool_call_event("c2", "get_account_balance", serde_json::json!({})))
        .unwrap();

    let output = next_upstream_text(&mut harness.upstream).await;
    let text = output["item"]["output"].as_str().unwrap();
    // A backend attempt against the unroutable test address would produce a
    // "banking service" error instead; this text proves the auth gate fired.
    assert!(
        text.starts_with("error: authentication required"),
        "got: {text}"
    );
}

#[tokio::test]
async fn missing_query_argument_is_reported_as_tool_output() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    harness
        .upstream
        .script
        .send(tool_call_event("c3", "search_knowledge_base", serde_json::json!({})))
        .unwrap();

    let output = next_upstream_text(&mut harness.upstream).await;
    assert_eq!(
        output["item"]["output"].as_str().unwrap(),
        "error: argument 'query' required"
    );
}

#[tokio::test]
async fn handoff_tool_notifies_browser_after_delay() {
    let mut harness = start_gateway(Some("mock-token")).await;
    drain_setup(&mut harness.upstream).await;

    let started = Instant::now();
    harness
        .upstream
        .script
        .send(tool_call_event(
            "c4",
            "handoff_to_a",
            serde_json::json!({ "reason": "general inquiry" }),
        ))
        .unwrap();

    // Conversation continues normally first.
    let output = next_upstream_text(&mut harness.upstream).await;
    assert_eq!(output["item"]["call_id"], "c4");
    let trigger = next_upstream_text(&mut harness.upstream).await;
    assert_eq!(trigger["type"], "response.create");

    // Then the browser hears about the handoff, after the persona delay.
    let event = next_browser_text(&mut harness.browser).await;
    let elapsed = started.elapsed();
    assert_eq!(event["type"], "agent.handoff");
    assert_eq!(event["target_agent"], "A");
    assert!(
        elapsed >= Duration::from_millis(700),
        "handoff arrived too early: {elapsed:?}"
    );
}

#[tokio::test]
async fn malformed_upstream_json_is_dropped() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    harness
        .upstream
        .script
        .send(WsMessage::text("{this is not json"))
        .unwrap();
    harness
        .upstream
        .script
        .send(WsMessage::text(
            serde_json::json!({ "type": "session.created" }).to_string(),
        ))
        .unwrap();

    let seen = next_browser_text(&mut harness.browser).await;
    assert_eq!(seen["type"], "session.created");
}

#[tokio::test]
async fn browser_close_tears_down_upstream_promptly() {
    let mut harness = start_gateway(None).await;
    drain_setup(&mut harness.upstream).await;

    harness.browser.close(None).await.unwrap();

    let deadline = Duration::from_millis(1500);
    let saw_close = tokio::time::timeout(deadline, async {
        while let Some(msg) = harness.upstream.received.recv().await {
            if matches!(msg, WsMessage::Close(_)) {
                return true;
            }
        }
        true
    })
    .await
    .unwrap_or(false);
    assert!(saw_close, "upstream side was not closed after browser close");
}
