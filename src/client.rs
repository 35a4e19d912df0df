//! Chat API client for backend communication.
//!
//! Drives one exchange end to end: posts the conversation history, decodes
//! the SSE response body incrementally, and pushes the growing response
//! text to a display sink.

use crate::config::ClientConfig;
use crate::models::ChatRequest;
use crate::session::ChatSession;
use crate::sink::DisplaySink;
use crate::sse::{is_done, DeltaAccumulator, StreamDemuxer};
use crate::transport::{ChatTransport, ReqwestTransport, TransportError};
use futures::Stream;
use futures_util::{stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

/// Error type for chat client operations
#[derive(Debug, Clone)]
pub enum ChatError {
    /// Transport failed before or during the exchange
    Transport(TransportError),
    /// An exchange is already in flight for this session
    Busy,
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Transport(e) => write!(f, "Transport error: {}", e),
            ChatError::Busy => write!(f, "An exchange is already in flight for this session"),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Transport(e) => Some(e),
            ChatError::Busy => None,
        }
    }
}

impl From<TransportError> for ChatError {
    fn from(e: TransportError) -> Self {
        ChatError::Transport(e)
    }
}

/// Client for the streaming chat backend.
///
/// Per-event parse issues never surface here: a malformed payload is logged
/// and contributes an empty delta, and an unrecognized payload shape is
/// silently skipped. Only transport failures end an exchange early.
pub struct ChatClient {
    /// Endpoint configuration
    config: ClientConfig,
    /// Transport used to reach the backend
    transport: Arc<dyn ChatTransport>,
}

impl ChatClient {
    /// Create a client with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client from a configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: Arc::new(ReqwestTransport::new()),
        }
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::default().with_base_url(base_url))
    }

    /// Create a client with a custom transport.
    ///
    /// Lets tests drive the exchange logic against scripted chunk
    /// sequences without a network.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self { config, transport }
    }

    /// The full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        self.config.chat_url()
    }

    /// Open a streaming exchange and return the raw event payloads.
    ///
    /// Sends the request and demultiplexes the SSE response body into one
    /// item per event payload, ending with a flush of any unterminated
    /// final record. The `[DONE]` sentinel, if the backend sends one, is
    /// yielded like any other payload; callers decide when to stop
    /// consuming.
    ///
    /// # Returns
    /// A stream of `Result<String, ChatError>` payload items
    pub async fn stream(
        &self,
        request: &ChatRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>, ChatError> {
        let chunks = self
            .transport
            .post_chat(&self.config.chat_url(), request)
            .await?;

        let payloads = stream::unfold(
            (chunks, StreamDemuxer::new(), VecDeque::new(), false),
            |(mut chunks, mut demux, mut queue, mut drained)| async move {
                loop {
                    if let Some(payload) = queue.pop_front() {
                        return Some((Ok(payload), (chunks, demux, queue, drained)));
                    }
                    if drained {
                        return None;
                    }

                    match chunks.next().await {
                        Some(Ok(chunk)) => match std::str::from_utf8(&chunk) {
                            Ok(text) => queue.extend(demux.push(text)),
                            Err(e) => tracing::warn!("skipping non-UTF-8 chunk: {}", e),
                        },
                        Some(Err(e)) => {
                            return Some((
                                Err(ChatError::Transport(e)),
                                (chunks, demux, queue, drained),
                            ));
                        }
                        None => {
                            // End of stream: surface a final record that
                            // lacked its trailing blank line.
                            queue.extend(demux.flush());
                            drained = true;
                        }
                    }
                }
            },
        );

        Ok(Box::pin(payloads))
    }

    /// Run one full exchange against the session.
    ///
    /// Records the user turn, streams the response while pushing every
    /// growth of the accumulated text to `sink`, and records the assistant
    /// turn on success. While a response is streaming the session is busy
    /// and further calls are rejected with [`ChatError::Busy`].
    ///
    /// On every error path the session is returned to idle without an
    /// assistant turn, so input can be re-enabled for a retry. Dropping
    /// the returned future mid-stream aborts the transfer and discards the
    /// partial response; a caller that cancels this way must release the
    /// session with [`ChatSession::abort_exchange`].
    ///
    /// # Returns
    /// The complete response text, which the sink has already seen
    pub async fn send_message(
        &self,
        session: &mut ChatSession,
        text: impl Into<String>,
        sink: &mut dyn DisplaySink,
    ) -> Result<String, ChatError> {
        if !session.begin_exchange(text) {
            return Err(ChatError::Busy);
        }

        let request = ChatRequest::new(session.history().to_vec());
        match self.run_exchange(&request, sink).await {
            Ok(response) => {
                session.complete_exchange(response.clone());
                Ok(response)
            }
            Err(e) => {
                tracing::error!("exchange failed: {}", e);
                session.abort_exchange();
                Err(e)
            }
        }
    }

    async fn run_exchange(
        &self,
        request: &ChatRequest,
        sink: &mut dyn DisplaySink,
    ) -> Result<String, ChatError> {
        let mut payloads = self.stream(request).await?;
        let mut accumulator = DeltaAccumulator::new();

        while let Some(item) = payloads.next().await {
            let payload = item?;
            if is_done(&payload) {
                // The content stream is over; payloads after the sentinel
                // are never ingested and the connection is released.
                tracing::debug!("received done sentinel");
                break;
            }

            let delta = accumulator.ingest(&payload);
            if !delta.is_empty() {
                sink.render(accumulator.response());
            }
        }

        Ok(accumulator.into_response())
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;
    use crate::sink::MemorySink;
    use crate::transport::ChunkStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Transport that replays a fixed chunk script.
    struct ScriptedTransport {
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn post_chat(
            &self,
            _url: &str,
            _body: &ChatRequest,
        ) -> Result<ChunkStream, TransportError> {
            let items: Vec<Result<Bytes, TransportError>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    /// Transport that rejects every request with a server error.
    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        async fn post_chat(
            &self,
            _url: &str,
            _body: &ChatRequest,
        ) -> Result<ChunkStream, TransportError> {
            Err(TransportError::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
            })
        }
    }

    /// Transport whose body stream dies after one good chunk.
    struct BrokenStreamTransport;

    #[async_trait]
    impl ChatTransport for BrokenStreamTransport {
        async fn post_chat(
            &self,
            _url: &str,
            _body: &ChatRequest,
        ) -> Result<ChunkStream, TransportError> {
            let items: Vec<Result<Bytes, TransportError>> = vec![
                Ok(Bytes::from_static(b"data: {\"response\":\"partial\"}\n\n")),
                Err(TransportError::Read("connection reset".to_string())),
            ];
            Ok(Box::pin(stream::iter(items)))
        }
    }

    /// Transport that records every request body it sees.
    #[derive(Default)]
    struct RecordingTransport {
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn post_chat(
            &self,
            _url: &str,
            body: &ChatRequest,
        ) -> Result<ChunkStream, TransportError> {
            self.seen.lock().unwrap().push(body.clone());
            let items: Vec<Result<Bytes, TransportError>> =
                vec![Ok(Bytes::from_static(b"data: {\"response\":\"hello\"}\n\n"))];
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn scripted_client(chunks: Vec<&'static str>) -> ChatClient {
        ChatClient::with_transport(
            ClientConfig::default(),
            Arc::new(ScriptedTransport { chunks }),
        )
    }

    #[test]
    fn test_chat_client_default_url() {
        let client = ChatClient::new();
        assert_eq!(client.chat_url(), "http://localhost:8000/api/chat");
    }

    #[test]
    fn test_chat_client_with_base_url() {
        let client = ChatClient::with_base_url("http://localhost:9000");
        assert_eq!(client.chat_url(), "http://localhost:9000/api/chat");
    }

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::Transport(TransportError::Status {
            status: 502,
            message: "Bad Gateway".to_string(),
        });
        let display = format!("{}", err);
        assert!(display.contains("502"));
        assert!(display.contains("Bad Gateway"));
        assert_eq!(
            ChatError::Busy.to_string(),
            "An exchange is already in flight for this session"
        );
    }

    #[test]
    fn test_chat_error_from_transport() {
        let err: ChatError = TransportError::Connect("refused".to_string()).into();
        assert!(matches!(err, ChatError::Transport(_)));
    }

    #[tokio::test]
    async fn test_send_message_accumulates_split_chunks() {
        // Record split inside a JSON payload, across two chunks.
        let client = scripted_client(vec![
            "data: {\"respo",
            "nse\":\"Hel\"}\n\ndata: {\"response\":\"lo\"}\n\n",
        ]);
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let response = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap();

        assert_eq!(response, "Hello");
        assert_eq!(sink.renders, vec!["Hel", "Hello"]);
        assert!(!session.is_busy());
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1], ChatMessage::assistant("Hello"));
    }

    #[tokio::test]
    async fn test_send_message_openai_shape() {
        let client = scripted_client(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        ]);
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let response = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap();

        assert_eq!(response, "Hello");
        assert_eq!(sink.renders, vec!["Hel", "Hello"]);
    }

    #[tokio::test]
    async fn test_done_sentinel_stops_processing() {
        // Payloads queued behind the sentinel are never ingested.
        let client = scripted_client(vec![
            "data: {\"response\":\"keep\"}\n\ndata: [DONE]\n\ndata: {\"response\":\"drop\"}\n\n",
        ]);
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let response = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap();

        assert_eq!(response, "keep");
        assert_eq!(sink.renders, vec!["keep"]);
    }

    #[tokio::test]
    async fn test_unterminated_final_record_flushed() {
        let client = scripted_client(vec!["data: {\"response\":\"tail\"}"]);
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let response = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap();

        assert_eq!(response, "tail");
        assert_eq!(sink.renders, vec!["tail"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_does_not_abort() {
        let client =
            scripted_client(vec!["data: {not json\n\ndata: {\"response\":\"ok\"}\n\n"]);
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let response = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap();

        assert_eq!(response, "ok");
        assert_eq!(sink.renders, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_empty_deltas_cause_no_renders() {
        let client = scripted_client(vec![
            ": keep-alive\n\ndata: {\"usage\":{\"tokens\":3}}\n\ndata: {\"response\":\"x\"}\n\n",
        ]);
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let response = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap();

        assert_eq!(response, "x");
        assert_eq!(sink.renders, vec!["x"]);
    }

    #[tokio::test]
    async fn test_server_error_aborts_exchange() {
        let client =
            ChatClient::with_transport(ClientConfig::default(), Arc::new(FailingTransport));
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let err = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ChatError::Transport(TransportError::Status { status: 500, .. })
        ));
        // Session is idle again; the user turn stays for a retry.
        assert!(!session.is_busy());
        assert_eq!(session.history().len(), 1);
        assert!(sink.renders.is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_aborts_exchange() {
        let client =
            ChatClient::with_transport(ClientConfig::default(), Arc::new(BrokenStreamTransport));
        let mut session = ChatSession::new();
        let mut sink = MemorySink::new();

        let err = client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ChatError::Transport(TransportError::Read(_))
        ));
        // The partial response reached the sink but not the history.
        assert_eq!(sink.renders, vec!["partial"]);
        assert!(!session.is_busy());
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_busy_session_rejected() {
        let client = scripted_client(vec!["data: {\"response\":\"x\"}\n\n"]);
        let mut session = ChatSession::new();
        session.begin_exchange("first");
        let mut sink = MemorySink::new();

        let err = client
            .send_message(&mut session, "second", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Busy));
        // The in-flight exchange is untouched.
        assert!(session.is_busy());
        assert_eq!(session.history().len(), 1);
        assert!(sink.renders.is_empty());
    }

    #[tokio::test]
    async fn test_request_carries_full_history() {
        let transport = Arc::new(RecordingTransport::default());
        let client = ChatClient::with_transport(ClientConfig::default(), transport.clone());
        let mut session = ChatSession::with_system_prompt("be brief");
        let mut sink = MemorySink::new();

        client
            .send_message(&mut session, "hi", &mut sink)
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0], ChatMessage::system("be brief"));
        assert_eq!(seen[0].messages[1], ChatMessage::user("hi"));
    }

    #[tokio::test]
    async fn test_stream_yields_raw_payloads() {
        let client = scripted_client(vec!["data: {\"response\":\"a\"}\n\ndata: [DONE]\n\n"]);
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);

        let mut payloads = client.stream(&request).await.unwrap();
        let mut collected = Vec::new();
        while let Some(item) = payloads.next().await {
            collected.push(item.unwrap());
        }

        assert_eq!(collected, vec!["{\"response\":\"a\"}", "[DONE]"]);
    }
}
