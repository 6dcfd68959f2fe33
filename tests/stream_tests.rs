//! Stream normalization integration tests
//!
//! Drives a real HTTP response body through the byte-stream adapter and
//! checks the SSE encoding of the emitted chunks, end to end.

use futures::StreamExt;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use palisade::translate::stream::transcode_byte_stream;
use palisade::translate::{format_sse_chunk, format_sse_done};
use palisade::{StreamChunk, StreamContext};

const SSE_BODY: &str = concat!(
    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Captain: Steady\"}]},\"role\":\"model\"}]}\n\n",
    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" as she goes\"}]}}]}\n\n",
    "data: {broken frame\n\n",
    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\".\"}]},\"finishReason\":\"STOP\"}]}\n\n",
    "data: [DONE]\n\n",
);

#[tokio::test]
async fn http_stream_transcodes_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SSE_BODY, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let response = reqwest::get(format!("{}/stream", server.uri()))
        .await
        .unwrap();
    let chunks: Vec<StreamChunk> = transcode_byte_stream(
        response.bytes_stream(),
        StreamContext::new("req-stream-1", "gemini-2.5-pro"),
    )
    .collect()
    .await;

    // Five frames in: three content chunks out. The broken frame and the
    // [DONE] sentinel are skipped without ending the stream.
    assert_eq!(chunks.len(), 3);

    // First frame had its speaker label stripped
    assert_eq!(chunks[0].choices[0].delta.content.as_deref(), Some("Steady"));
    assert_eq!(
        chunks[1].choices[0].delta.content.as_deref(),
        Some(" as she goes")
    );
    assert_eq!(chunks[2].choices[0].finish_reason.as_deref(), Some("STOP"));

    for chunk in &chunks {
        assert_eq!(chunk.id, "gemini-req-stream-1");
        assert_eq!(chunk.object, "chat.completion.chunk");
        assert_eq!(chunk.model, "gemini-2.5-pro");
    }
}

#[tokio::test]
async fn emitted_chunks_re_encode_as_valid_sse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SSE_BODY, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let response = reqwest::get(format!("{}/stream", server.uri()))
        .await
        .unwrap();
    let chunks: Vec<StreamChunk> = transcode_byte_stream(
        response.bytes_stream(),
        StreamContext::new("req-stream-2", "gemini-2.0-flash"),
    )
    .collect()
    .await;

    // What clients would receive: every chunk as a data event, then [DONE]
    let mut wire = Vec::new();
    for chunk in &chunks {
        wire.extend_from_slice(&format_sse_chunk(chunk));
    }
    wire.extend_from_slice(&format_sse_done());
    let wire = String::from_utf8(wire).unwrap();

    // Each event round-trips as parseable JSON with the normalized shape
    let mut events = 0;
    for line in wire.lines().filter(|l| l.starts_with("data: ")) {
        let payload = line.trim_start_matches("data: ");
        if payload == "[DONE]" {
            continue;
        }
        let json: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(json["object"], "chat.completion.chunk");
        assert_eq!(json["choices"][0]["index"], 0);
        events += 1;
    }
    assert_eq!(events, chunks.len());
    assert!(wire.ends_with("data: [DONE]\n\n"));
}
