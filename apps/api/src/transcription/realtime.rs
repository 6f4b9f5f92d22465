//! Realtime transcription relay.
//!
//! GET /ws/transcribe upgrades the client connection, opens a streaming
//! connection to Deepgram, forwards binary audio frames upstream and sends
//! non-empty transcripts back to the client as text frames.
//!
//! A client that wants the trailing transcripts sends `{"type":"CloseStream"}`
//! as a text frame and keeps reading until the server closes the socket.
//! Closing the client socket outright also ends the upstream stream.

use axum::{
    extract::{
        ws::{Message as ClientMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        Message as UpstreamMessage,
    },
};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::state::AppState;
use crate::transcription::LANGUAGE;

/// Tells Deepgram to flush pending audio and close the stream.
const CLOSE_STREAM: &str = r#"{"type":"CloseStream"}"#;

#[derive(Debug, Deserialize)]
struct LiveMessage {
    #[serde(rename = "type")]
    message_type: Option<String>,
    channel: Option<LiveChannel>,
}

#[derive(Debug, Deserialize)]
struct LiveChannel {
    #[serde(default)]
    alternatives: Vec<LiveAlternative>,
}

#[derive(Debug, Deserialize)]
struct LiveAlternative {
    #[serde(default)]
    transcript: String,
}

/// Extracts the transcript from a Deepgram live `Results` message.
/// Returns `None` for metadata/keepalive messages and empty transcripts.
pub fn extract_live_transcript(raw: &str) -> Option<String> {
    let message: LiveMessage = serde_json::from_str(raw).ok()?;
    if let Some(kind) = &message.message_type {
        if kind != "Results" {
            return None;
        }
    }
    let transcript = message.channel?.alternatives.into_iter().next()?.transcript;
    if transcript.trim().is_empty() {
        None
    } else {
        Some(transcript)
    }
}

/// True for the client's end-of-audio control message.
fn is_close_stream(raw: &str) -> bool {
    serde_json::from_str::<LiveMessage>(raw)
        .ok()
        .and_then(|m| m.message_type)
        .is_some_and(|kind| kind == "CloseStream")
}

/// Builds the upstream streaming URL including the query parameters.
pub fn live_url(config: &Config) -> String {
    let separator = if config.deepgram_live_url.contains('?') {
        '&'
    } else {
        '?'
    };
    format!(
        "{}{}model={}&language={}&smart_format=true&punctuate=true&diarize=true",
        config.deepgram_live_url, separator, config.deepgram_model, LANGUAGE
    )
}

/// GET /ws/transcribe
pub async fn handle_transcribe_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| relay(socket, state))
}

async fn relay(mut client: WebSocket, state: AppState) {
    let mut request = match live_url(&state.config).into_client_request() {
        Ok(r) => r,
        Err(e) => {
            error!("Invalid Deepgram live URL: {e}");
            let _ = client.send(ClientMessage::Close(None)).await;
            return;
        }
    };
    match HeaderValue::from_str(&format!("Token {}", state.config.deepgram_api_key)) {
        Ok(value) => {
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(e) => {
            error!("Deepgram API key is not a valid header value: {e}");
            let _ = client.send(ClientMessage::Close(None)).await;
            return;
        }
    }

    let upstream = match connect_async(request).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            error!("Could not connect to Deepgram: {e}");
            let _ = client.send(ClientMessage::Close(None)).await;
            return;
        }
    };
    info!("Deepgram live connection opened");

    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    let (mut client_tx, mut client_rx) = client.split();

    let client_to_upstream = async {
        while let Some(message) = client_rx.next().await {
            let forwarded = match message {
                Ok(ClientMessage::Binary(audio)) => UpstreamMessage::Binary(audio),
                Ok(ClientMessage::Text(text)) if is_close_stream(&text) => break,
                Ok(ClientMessage::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Client websocket error: {e}");
                    break;
                }
            };
            if let Err(e) = upstream_tx.send(forwarded).await {
                warn!("Failed to forward audio to Deepgram: {e}");
                return;
            }
        }
        debug!("Client stream ended, closing Deepgram stream");
        let _ = upstream_tx
            .send(UpstreamMessage::Text(CLOSE_STREAM.to_string()))
            .await;
    };

    let upstream_to_client = async {
        while let Some(message) = upstream_rx.next().await {
            match message {
                Ok(UpstreamMessage::Text(raw)) => {
                    if let Some(transcript) = extract_live_transcript(&raw) {
                        if client_tx.send(ClientMessage::Text(transcript)).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(UpstreamMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("Deepgram error: {e}");
                    break;
                }
            }
        }
        let _ = client_tx.send(ClientMessage::Close(None)).await;
    };

    // Once the client stops sending, keep relaying until Deepgram flushes and closes.
    tokio::pin!(upstream_to_client);
    tokio::select! {
        _ = client_to_upstream => (&mut upstream_to_client).await,
        _ = &mut upstream_to_client => {}
    }

    info!("Deepgram live connection closed");
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::{accept_hdr_async, MaybeTlsStream, WebSocketStream};

    use super::*;
    use crate::interview::service::tests::{MockSuggester, MockTranscriber};
    use crate::interview::InterviewService;
    use crate::routes::build_router;

    #[test]
    fn test_extracts_results_transcript() {
        let raw = r#"{
            "type": "Results",
            "is_final": true,
            "channel": { "alternatives": [ { "transcript": "Why do you want this role?", "confidence": 0.98 } ] }
        }"#;
        assert_eq!(
            extract_live_transcript(raw).as_deref(),
            Some("Why do you want this role?")
        );
    }

    #[test]
    fn test_ignores_empty_transcript() {
        let raw = r#"{"type":"Results","channel":{"alternatives":[{"transcript":""}]}}"#;
        assert_eq!(extract_live_transcript(raw), None);
    }

    #[test]
    fn test_ignores_metadata_messages() {
        let raw = r#"{"type":"Metadata","request_id":"abc","channels":1}"#;
        assert_eq!(extract_live_transcript(raw), None);
    }

    #[test]
    fn test_ignores_non_json() {
        assert_eq!(extract_live_transcript("not json"), None);
    }

    #[test]
    fn test_live_url_carries_stream_options() {
        let config = Config::for_tests();
        assert_eq!(
            live_url(&config),
            "wss://api.deepgram.com/v1/listen?model=nova-2&language=en&smart_format=true&punctuate=true&diarize=true"
        );
    }

    #[test]
    fn test_close_stream_control_message() {
        assert!(is_close_stream(CLOSE_STREAM));
        assert!(!is_close_stream(r#"{"type":"KeepAlive"}"#));
        assert!(!is_close_stream("CloseStream"));
    }

    type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// How the fake Deepgram endpoint behaves once a relay connects.
    enum Script {
        /// Answers each audio frame with a metadata message and a transcript,
        /// then flushes one more transcript and closes on `CloseStream`.
        Converse,
        /// Records frames without answering and closes on `CloseStream`.
        Listen,
        /// Sends one transcript and closes without waiting for audio.
        SendThenClose(&'static str),
    }

    struct Upstream {
        authorization: Option<String>,
        uri: String,
        received: Vec<UpstreamMessage>,
    }

    fn results(transcript: &str) -> UpstreamMessage {
        UpstreamMessage::Text(
            json!({
                "type": "Results",
                "is_final": true,
                "channel": { "alternatives": [ { "transcript": transcript, "confidence": 0.9 } ] }
            })
            .to_string(),
        )
    }

    async fn fake_deepgram(script: Script) -> (SocketAddr, JoinHandle<Upstream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut authorization = None;
            let mut uri = String::new();
            let mut ws = accept_hdr_async(
                stream,
                |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    authorization = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    uri = req.uri().to_string();
                    Ok(resp)
                },
            )
            .await
            .unwrap();

            let mut received = Vec::new();
            match script {
                Script::SendThenClose(transcript) => {
                    ws.send(results(transcript)).await.unwrap();
                }
                Script::Converse | Script::Listen => {
                    while let Some(Ok(message)) = ws.next().await {
                        let done = matches!(&message, UpstreamMessage::Text(t) if t == CLOSE_STREAM);
                        let is_audio = matches!(message, UpstreamMessage::Binary(_));
                        received.push(message);
                        if let Script::Converse = script {
                            if is_audio {
                                ws.send(UpstreamMessage::Text(
                                    r#"{"type":"Metadata","request_id":"live-1"}"#.to_string(),
                                ))
                                .await
                                .unwrap();
                                ws.send(results("hello there")).await.unwrap();
                            }
                            if done {
                                ws.send(results("final words")).await.unwrap();
                            }
                        }
                        if done {
                            break;
                        }
                    }
                }
            }

            let _ = ws.close(None).await;
            let _ = tokio::time::timeout(Duration::from_secs(1), async {
                while let Some(Ok(_)) = ws.next().await {}
            })
            .await;

            Upstream {
                authorization,
                uri,
                received,
            }
        });

        (addr, handle)
    }

    async fn serve_relay(live_url: String) -> SocketAddr {
        let mut config = Config::for_tests();
        config.deepgram_live_url = live_url;
        let state = AppState {
            config: Arc::new(config),
            interview: Arc::new(InterviewService::new(
                Arc::new(MockTranscriber::ok()),
                Arc::new(MockSuggester::ok()),
            )),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        addr
    }

    async fn connect_client(addr: SocketAddr) -> ClientSocket {
        let (socket, _) = connect_async(format!("ws://{addr}/ws/transcribe"))
            .await
            .unwrap();
        socket
    }

    /// Collects text frames until the server closes the socket.
    async fn texts_until_closed(client: &mut ClientSocket) -> Vec<String> {
        let collect = async {
            let mut texts = Vec::new();
            while let Some(message) = client.next().await {
                match message {
                    Ok(UpstreamMessage::Text(text)) => texts.push(text),
                    Ok(UpstreamMessage::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            texts
        };
        tokio::time::timeout(Duration::from_secs(5), collect)
            .await
            .expect("server closed the client socket")
    }

    #[tokio::test]
    async fn test_relay_forwards_audio_and_flushes_after_close_stream() {
        let (upstream_addr, upstream) = fake_deepgram(Script::Converse).await;
        let addr = serve_relay(format!("ws://{upstream_addr}/v1/listen")).await;
        let mut client = connect_client(addr).await;

        client
            .send(UpstreamMessage::Binary(vec![1, 2, 3, 4]))
            .await
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(first, UpstreamMessage::Text("hello there".to_string()));

        client
            .send(UpstreamMessage::Text(CLOSE_STREAM.to_string()))
            .await
            .unwrap();
        assert_eq!(texts_until_closed(&mut client).await, vec!["final words"]);

        let upstream = upstream.await.unwrap();
        assert_eq!(upstream.authorization.as_deref(), Some("Token test-deepgram-key"));
        assert!(upstream.uri.starts_with("/v1/listen?model=nova-2&language=en"));
        assert!(upstream.uri.contains("diarize=true"));
        assert_eq!(
            upstream.received,
            vec![
                UpstreamMessage::Binary(vec![1, 2, 3, 4]),
                UpstreamMessage::Text(CLOSE_STREAM.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_client_close_sends_close_stream_upstream() {
        let (upstream_addr, upstream) = fake_deepgram(Script::Listen).await;
        let addr = serve_relay(format!("ws://{upstream_addr}/v1/listen")).await;
        let mut client = connect_client(addr).await;

        client
            .send(UpstreamMessage::Binary(b"pcm-chunk".to_vec()))
            .await
            .unwrap();
        client.close(None).await.unwrap();

        let upstream = tokio::time::timeout(Duration::from_secs(5), upstream)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            upstream.received,
            vec![
                UpstreamMessage::Binary(b"pcm-chunk".to_vec()),
                UpstreamMessage::Text(CLOSE_STREAM.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_client_closed_when_upstream_ends_first() {
        let (upstream_addr, upstream) = fake_deepgram(Script::SendThenClose("only chunk")).await;
        let addr = serve_relay(format!("ws://{upstream_addr}/v1/listen")).await;
        let mut client = connect_client(addr).await;

        assert_eq!(texts_until_closed(&mut client).await, vec!["only chunk"]);
        assert!(upstream.await.unwrap().received.is_empty());
    }

    #[tokio::test]
    async fn test_client_closed_when_upstream_unreachable() {
        let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = unused.local_addr().unwrap();
        drop(unused);

        let addr = serve_relay(format!("ws://{dead_addr}/v1/listen")).await;
        let mut client = connect_client(addr).await;

        assert!(texts_until_closed(&mut client).await.is_empty());
    }
}
