use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use reqwest::{Client, Error as ReqwestError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::ports::generation_provider::{
    GenerationChunk, GenerationProvider, GenerationProviderError, GenerationRequest, TokenStream,
};
use crate::domain::value_objects::{MessageSource, ToolCall};

#[derive(Serialize)]
struct HistoryLine<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct GenerationRequestBody<'a> {
    query: &'a str,
    history: Vec<HistoryLine<'a>>,
    sources: &'a [MessageSource],
    mode: &'a str,
}

/// One line of the backend's newline-delimited response.
#[derive(Debug, Default, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    tool_call: Option<ToolCall>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, PartialEq)]
enum LineEvent {
    Chunk(GenerationChunk),
    Done,
}

#[derive(Debug, Clone)]
pub struct GenerationClientConfig {
    pub service_url: String,
    pub connect_timeout: Duration,
}

/// Streams tokens from the external generation backend.
///
/// Only the connect phase has a client-side timeout; per-token waits are bounded by
/// the generation coordinator. Dropping the returned stream closes the request.
pub struct HttpGenerationProvider {
    client: Client,
    config: GenerationClientConfig,
}

impl HttpGenerationProvider {
    pub fn new(config: GenerationClientConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<TokenStream, GenerationProviderError> {
        let body = GenerationRequestBody {
            query: &request.query,
            history: request
                .history
                .iter()
                .map(|entry| HistoryLine {
                    role: entry.role.as_str(),
                    content: &entry.content,
                })
                .collect(),
            sources: &request.sources,
            mode: request.mode.as_str(),
        };

        let response = self
            .client
            .post(&self.config.service_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationProviderError::NetworkError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationProviderError::ApiError(format!(
                "generation service returned {}: {}",
                status, text
            )));
        }

        debug!(sources = request.sources.len(), "generation stream opened");

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| GenerationProviderError::NetworkError(e.to_string()))
        });
        Ok(Box::pin(decode_stream(body)))
    }
}

struct DecodeState<S> {
    body: S,
    buffer: Vec<u8>,
    pending: VecDeque<Result<GenerationChunk, GenerationProviderError>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn handle_line(&mut self, raw: &[u8]) {
        if self.finished {
            return;
        }
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(_) => {
                self.fail(GenerationProviderError::MalformedStream(
                    "line is not valid UTF-8".to_string(),
                ));
                return;
            }
        };

        match parse_line(line) {
            Ok(Some(LineEvent::Chunk(chunk))) => self.pending.push_back(Ok(chunk)),
            Ok(Some(LineEvent::Done)) => self.finished = true,
            Ok(None) => {}
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: GenerationProviderError) {
        self.pending.push_back(Err(error));
        self.finished = true;
    }

    fn drain_lines(&mut self) {
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.handle_line(&line[..line.len() - 1]);
        }
    }
}

/// Turns a chunked byte body into ordered generation chunks.
///
/// Stops at the first `done` marker or error; anything after is ignored.
fn decode_stream<S>(body: S) -> impl Stream<Item = Result<GenerationChunk, GenerationProviderError>> + Send
where
    S: Stream<Item = Result<Vec<u8>, GenerationProviderError>> + Send + Unpin + 'static,
{
    let state = DecodeState {
        body,
        buffer: Vec::with_capacity(4096),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(&bytes);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    warn!(error = %e, "generation stream read error");
                    state.fail(e);
                }
                None => {
                    if !state.buffer.is_empty() {
                        let rest = std::mem::take(&mut state.buffer);
                        state.handle_line(&rest);
                    }
                    state.finished = true;
                }
            }
        }
    })
}

fn parse_line(line: &str) -> Result<Option<LineEvent>, GenerationProviderError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return Ok(None);
    }
    if ["event:", "id:", "retry:"].iter().any(|p| trimmed.starts_with(p)) {
        return Ok(None);
    }

    let data = trimmed
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(trimmed);
    if data.is_empty() {
        return Ok(None);
    }
    if data == "[DONE]" {
        return Ok(Some(LineEvent::Done));
    }

    let frame: StreamFrame = serde_json::from_str(data)
        .map_err(|e| GenerationProviderError::MalformedStream(format!("{}: {}", e, data)))?;

    if let Some(error) = frame.error {
        return Err(GenerationProviderError::ApiError(error));
    }
    if let Some(token) = frame.token {
        return Ok(Some(LineEvent::Chunk(GenerationChunk::Token(token))));
    }
    if let Some(call) = frame.tool_call {
        return Ok(Some(LineEvent::Chunk(GenerationChunk::ToolCall(call))));
    }
    if frame.done {
        return Ok(Some(LineEvent::Done));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode(chunks: &[&str]) -> Vec<Result<GenerationChunk, GenerationProviderError>> {
        let body = stream::iter(
            chunks
                .iter()
                .map(|c| Ok::<_, GenerationProviderError>(c.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        );
        decode_stream(body).collect().await
    }

    fn tokens(items: &[Result<GenerationChunk, GenerationProviderError>]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| match item {
                Ok(GenerationChunk::Token(t)) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let items = decode(&[
            "{\"token\":\"Echo\"}\n{\"tok",
            "en\":\"Mind\"}\n",
            "{\"token\":\" rocks\"}\n{\"done\":true}\n",
        ])
        .await;

        assert_eq!(tokens(&items), vec!["Echo", "Mind", " rocks"]);
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_sse_prefix_and_keepalives_are_tolerated() {
        let items = decode(&[
            ": keep-alive\r\n",
            "event: token\r\ndata: {\"token\":\"a\"}\r\n\r\n",
            "data: {\"token\":\"b\"}\r\n",
            "data: [DONE]\r\n",
        ])
        .await;

        assert_eq!(tokens(&items), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_nothing_after_done_is_delivered() {
        let items = decode(&["{\"token\":\"a\"}\n{\"done\":true}\n{\"token\":\"late\"}\n"]).await;
        assert_eq!(tokens(&items), vec!["a"]);
    }

    #[tokio::test]
    async fn test_error_frame_ends_stream() {
        let items = decode(&["{\"token\":\"a\"}\n{\"error\":\"model overloaded\"}\n{\"token\":\"b\"}\n"]).await;

        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[1],
            Err(GenerationProviderError::ApiError(msg)) if msg == "model overloaded"
        ));
    }

    #[tokio::test]
    async fn test_garbage_line_is_malformed() {
        let items = decode(&["not json\n"]).await;
        assert!(matches!(
            items.as_slice(),
            [Err(GenerationProviderError::MalformedStream(_))]
        ));
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_kept() {
        let items = decode(&["{\"token\":\"a\"}\n{\"token\":\"b\"}"]).await;
        assert_eq!(tokens(&items), vec!["a", "b"]);
    }

    #[test]
    fn test_tool_call_frame() {
        let event = parse_line(r#"{"tool_call":{"id":"1","name":"lookup","arguments":{"q":"x"}}}"#)
            .unwrap()
            .unwrap();
        match event {
            LineEvent::Chunk(GenerationChunk::ToolCall(call)) => {
                assert_eq!(call.name(), Some("lookup"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_token_whitespace_is_preserved() {
        assert_eq!(
            parse_line("data: {\"token\":\"  spaced \"}").unwrap(),
            Some(LineEvent::Chunk(GenerationChunk::Token("  spaced ".to_string())))
        );
    }
}
