use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub api_key: String,
    pub endpoint: String,
}

impl ProviderConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
        }
    }
}

/// Routing key for one reply stream. Callers mint a fresh id per submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl StreamId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
}

impl ProviderMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub stream_id: StreamId,
    pub model_id: String,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: Option<u64>,
}

impl StreamRequest {
    pub fn new(
        stream_id: StreamId,
        model_id: impl Into<String>,
        messages: Vec<ProviderMessage>,
    ) -> Self {
        Self {
            stream_id,
            model_id: model_id.into(),
            messages,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventPayload {
    Delta(String),
    Done,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub stream_id: StreamId,
    pub payload: StreamEventPayload,
}

pub type ProviderWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProviderError {
    #[snafu(display("missing API key for provider '{provider_id}'"))]
    MissingApiKey {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("stream request {stream_id:?} has no messages"))]
    EmptyMessageSet {
        stage: &'static str,
        stream_id: StreamId,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("completions failed on `{stage}`, {source}"))]
    CompletionsFailed {
        stage: &'static str,
        source: rig::completion::CompletionError,
    },
}

/// Receiving half of a reply stream. Dropping it cancels the worker.
pub struct ProviderEventStream {
    stream_id: StreamId,
    events: mpsc::UnboundedReceiver<StreamEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

pub struct ProviderStreamHandle {
    pub stream: ProviderEventStream,
    pub worker: ProviderWorker,
}

impl ProviderEventStream {
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }
}

impl Drop for ProviderEventStream {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

/// Sending half of a reply stream, bound to one stream id.
///
/// Terminal events consume the sink, so a stream ends at most once.
pub struct StreamSink {
    stream_id: StreamId,
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl StreamSink {
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Returns `false` once the receiving half is gone.
    pub fn delta(&self, text: String) -> bool {
        self.send(StreamEventPayload::Delta(text))
    }

    pub fn finish(self) {
        self.send(StreamEventPayload::Done);
    }

    pub fn fail(self, error: &ProviderError) {
        self.send(StreamEventPayload::Error(error.to_string()));
    }

    fn send(&self, payload: StreamEventPayload) -> bool {
        self.events
            .send(StreamEvent {
                stream_id: self.stream_id,
                payload,
            })
            .is_ok()
    }
}

pub trait LlmProvider: Send + Sync {
    fn id(&self) -> &str;
    fn stream_chat(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle>;
}

/// Pairs a sink with its event stream. The receiver resolves when the stream is dropped.
pub fn make_event_stream(
    stream_id: StreamId,
) -> (StreamSink, ProviderEventStream, oneshot::Receiver<()>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    (
        StreamSink {
            stream_id,
            events: event_tx,
        },
        ProviderEventStream {
            stream_id,
            events: event_rx,
            cancel_tx: Some(cancel_tx),
        },
        cancel_rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_send_order_and_end_once() {
        let (sink, mut stream, _cancel_rx) = make_event_stream(StreamId::new(7));

        assert!(sink.delta("he".to_string()));
        assert!(sink.delta("llo".to_string()));
        sink.finish();

        let mut received = Vec::new();
        while let Some(event) = stream.recv().await {
            assert_eq!(event.stream_id, StreamId::new(7));
            received.push(event.payload);
        }

        assert_eq!(stream.stream_id(), StreamId::new(7));
        assert_eq!(
            received,
            vec![
                StreamEventPayload::Delta("he".to_string()),
                StreamEventPayload::Delta("llo".to_string()),
                StreamEventPayload::Done,
            ]
        );
    }

    #[tokio::test]
    async fn failure_is_reported_as_error_text() {
        let (sink, mut stream, _cancel_rx) = make_event_stream(StreamId::new(2));
        sink.fail(&ProviderError::EmptyMessageSet {
            stage: "test",
            stream_id: StreamId::new(2),
        });

        let event = stream.recv().await.unwrap();
        assert_eq!(
            event.payload,
            StreamEventPayload::Error("stream request StreamId(2) has no messages".to_string())
        );
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_stream_signals_cancellation() {
        let (sink, stream, cancel_rx) = make_event_stream(StreamId::new(1));
        drop(stream);

        assert!(cancel_rx.await.is_ok());
        assert!(!sink.delta("late".to_string()));
    }
}
