//! Integration tests for the chat completion client: streamed SSE replies are
//! fed through a StreamSession. Uses a minimal in-process HTTP server (no
//! mocks).

use chat_qa_client::{
    ChatRequest, Client, ClientError, MarkerSplitter, Recorder, SamplingSection, StreamSession,
    Transcript,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Read one HTTP request and return its body.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            let start = end + 4;
            if buf.len() >= start + len {
                return String::from_utf8_lossy(&buf[start..start + len]).into_owned();
            }
        }
    }
}

fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::from("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for f in fragments {
        let chunk = serde_json::json!({ "choices": [{ "delta": { "content": f } }] });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Serve one request. `declared_len` lets a test promise more body than it
/// sends, so the connection drops mid-stream.
async fn serve_once(
    listener: TcpListener,
    status: &'static str,
    content_type: &'static str,
    body: String,
    declared_len: Option<usize>,
) -> String {
    let (mut tcp, _) = listener.accept().await.unwrap();
    let request = read_request(&mut tcp).await;
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        declared_len.unwrap_or(body.len())
    );
    tcp.write_all(head.as_bytes()).await.unwrap();
    tcp.write_all(body.as_bytes()).await.unwrap();
    tcp.flush().await.unwrap();
    let _ = tcp.shutdown().await;
    request
}

async fn spawn_server(
    status: &'static str,
    content_type: &'static str,
    body: String,
    declared_len: Option<usize>,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let request = serve_once(listener, status, content_type, body, declared_len).await;
        let _ = tx.send(request);
    });
    (format!("http://127.0.0.1:{}/v1", port), rx)
}

#[tokio::test]
async fn streamed_reasoning_is_split_from_answer() {
    let body = sse_body(&["<think>", "step 1", "</think>", "answer"]);
    let (base_url, request_rx) = spawn_server("200 OK", "text/event-stream", body, None).await;

    let client = Client::new(&base_url, "test-key").expect("client should build");
    let mut transcript = Transcript::new("<think>detailed thinking on</think>");
    transcript.push_user("What is the answer?");

    let fragments = {
        let request = ChatRequest::new("test-model", transcript.messages(), &SamplingSection::default());
        client.stream_chat(&request).await.expect("stream should start")
    };
    let mut recorder = Recorder::default();
    let outcome = StreamSession::new(MarkerSplitter::default(), false)
        .drive(fragments, &mut transcript, &mut recorder)
        .await;

    assert!(outcome.aborted.is_none());
    let previews: Vec<&str> = recorder.previews.iter().map(|v| v.visible.as_str()).collect();
    assert_eq!(previews, ["", "", "", "answer"]);
    assert_eq!(outcome.turn.view.visible, "answer");
    assert_eq!(outcome.turn.view.reasoning.as_deref(), Some("step 1"));
    assert_eq!(
        transcript.messages().last().unwrap().content,
        "<think>step 1</think>answer"
    );

    let sent: serde_json::Value = serde_json::from_str(&request_rx.await.unwrap()).unwrap();
    assert_eq!(sent["model"], "test-model");
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1]["content"], "What is the answer?");
}

#[tokio::test]
async fn reveal_mode_renders_raw_stream() {
    let body = sse_body(&["<think>", "step 1", "</think>", "answer"]);
    let (base_url, _rx) = spawn_server("200 OK", "text/event-stream", body, None).await;

    let client = Client::new(&base_url, "k").unwrap();
    let mut transcript = Transcript::new("sys");
    transcript.push_user("q");
    let fragments = {
        let request = ChatRequest::new("m", transcript.messages(), &SamplingSection::default());
        client.stream_chat(&request).await.unwrap()
    };
    let mut recorder = Recorder::default();
    let outcome = StreamSession::new(MarkerSplitter::default(), true)
        .drive(fragments, &mut transcript, &mut recorder)
        .await;

    assert_eq!(outcome.turn.view.visible, "<think>step 1</think>answer");
    assert_eq!(outcome.turn.view.reasoning, None);
}

#[tokio::test]
async fn dropped_connection_keeps_partial_reply() {
    let body = sse_body(&["Partial", " reply"]);
    // Strip the [DONE] trailer and promise more bytes than are sent.
    let body = body.trim_end_matches("data: [DONE]\n\n").to_string();
    let declared = body.len() + 512;
    let (base_url, _rx) = spawn_server("200 OK", "text/event-stream", body, Some(declared)).await;

    let client = Client::new(&base_url, "k").unwrap();
    let mut transcript = Transcript::new("sys");
    transcript.push_user("q");
    let fragments = {
        let request = ChatRequest::new("m", transcript.messages(), &SamplingSection::default());
        client.stream_chat(&request).await.unwrap()
    };
    let mut recorder = Recorder::default();
    let outcome = StreamSession::new(MarkerSplitter::default(), false)
        .drive(fragments, &mut transcript, &mut recorder)
        .await;

    assert!(outcome.aborted.is_some(), "truncated body should abort the stream");
    assert_eq!(outcome.turn.message.content, "Partial reply");
    assert_eq!(recorder.finished.unwrap().visible, "Partial reply");
    assert_eq!(transcript.len(), 3);
}

#[tokio::test]
async fn error_status_reports_api_message() {
    let body = r#"{"error":{"message":"Invalid API key"}}"#.to_string();
    let (base_url, _rx) = spawn_server("401 Unauthorized", "application/json", body, None).await;

    let client = Client::new(&base_url, "wrong").unwrap();
    let messages = Transcript::new("sys");
    let request = ChatRequest::new("m", messages.messages(), &SamplingSection::default());
    let err = match client.stream_chat(&request).await {
        Ok(_) => panic!("401 should fail"),
        Err(e) => e,
    };
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn complete_returns_whole_answer() {
    let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"<think>look</think>Green."}}]}"#
        .to_string();
    let (base_url, request_rx) = spawn_server("200 OK", "application/json", body, None).await;

    let client = Client::new(&base_url, "k").unwrap();
    let transcript = Transcript::new("sys");
    let request = ChatRequest::new("qa-model", transcript.messages(), &SamplingSection::default());
    let answer = client.complete(&request).await.expect("completion should succeed");
    assert_eq!(answer, "<think>look</think>Green.");

    let sent: serde_json::Value = serde_json::from_str(&request_rx.await.unwrap()).unwrap();
    assert_eq!(sent["stream"], false);
    assert_eq!(sent["model"], "qa-model");
}

#[tokio::test]
async fn unreachable_server_fails_to_start() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = Client::new(&format!("http://127.0.0.1:{}/v1", port), "k").unwrap();
    let transcript = Transcript::new("sys");
    let request = ChatRequest::new("m", transcript.messages(), &SamplingSection::default());
    assert!(matches!(
        client.stream_chat(&request).await,
        Err(ClientError::Http(_))
    ));
}
