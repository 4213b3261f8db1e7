use futures::StreamExt;
use rig::completion::{CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::openai;
use rig::streaming::StreamedAssistantContent;
use snafu::{ResultExt, ensure};
use tokio::sync::oneshot;

use super::provider::{
    CompletionsFailedSnafu, EmptyMessageSetSnafu, HttpClientSnafu, LlmProvider,
    MissingApiKeySnafu, ProviderConfig, ProviderError, ProviderMessage, ProviderResult,
    ProviderStreamHandle, ProviderWorker, Role, StreamRequest, StreamSink, make_event_stream,
};

pub const RIG_OPENAI_PROVIDER_ID: &str = "openai";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

type RigStreamingResponse = rig::streaming::StreamingCompletionResponse<
    rig::providers::openai::responses_api::streaming::StreamingCompletionResponse,
>;

/// How a reply stream ended on the worker side.
#[derive(Debug)]
enum StreamOutcome {
    Finished,
    Cancelled,
    /// The reader went away without cancelling.
    Abandoned,
    Failed(ProviderError),
}

/// OpenAI-compatible chat streaming through rig.
pub struct RigProviderAdapter {
    config: ProviderConfig,
}

impl RigProviderAdapter {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "rig-adapter-new",
                provider_id: config.provider_id.clone(),
            }
        );

        Ok(Self { config })
    }

    fn build_client(config: &ProviderConfig) -> ProviderResult<openai::Client> {
        let mut builder = openai::Client::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }

    /// Rig takes one preamble plus chat turns, so system turns are folded into the
    /// preamble and the remaining turns keep their order.
    fn split_transcript(messages: &[ProviderMessage]) -> (Option<String>, Vec<RigMessage>) {
        let mut system = Vec::new();
        let mut turns = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                Role::System if message.content.trim().is_empty() => {}
                Role::System => system.push(message.content.as_str()),
                Role::User => turns.push(RigMessage::user(message.content.clone())),
                Role::Assistant => turns.push(RigMessage::assistant(message.content.clone())),
            }
        }

        let preamble = (!system.is_empty()).then(|| system.join("\n\n"));
        (preamble, turns)
    }

    async fn open_stream(
        config: &ProviderConfig,
        request: &StreamRequest,
    ) -> ProviderResult<RigStreamingResponse> {
        let (preamble, mut turns) = Self::split_transcript(&request.messages);
        let Some(prompt) = turns.pop() else {
            return EmptyMessageSetSnafu {
                stage: "open-stream-pop-prompt",
                stream_id: request.stream_id,
            }
            .fail();
        };

        let client = Self::build_client(config)?;
        let model = client.completion_model(request.model_id.clone());
        let mut builder = model.completion_request(prompt).messages(turns);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        builder.stream().await.context(CompletionsFailedSnafu {
            stage: "open-stream",
        })
    }

    fn reply_text<R>(content: StreamedAssistantContent<R>) -> Option<String>
    where
        R: Clone + Unpin,
    {
        match content {
            StreamedAssistantContent::Text(text) if !text.text.is_empty() => Some(text.text),
            _ => None,
        }
    }

    async fn forward_replies(
        mut stream: RigStreamingResponse,
        sink: &StreamSink,
        mut cancel_rx: oneshot::Receiver<()>,
    ) -> StreamOutcome {
        loop {
            let next = tokio::select! {
                _ = &mut cancel_rx => {
                    stream.cancel();
                    return StreamOutcome::Cancelled;
                }
                next = stream.next() => next,
            };

            match next {
                None => return StreamOutcome::Finished,
                Some(Err(source)) => {
                    return StreamOutcome::Failed(ProviderError::CompletionsFailed {
                        stage: "stream-chunk",
                        source,
                    });
                }
                Some(Ok(content)) => {
                    if let Some(text) = Self::reply_text(content)
                        && !sink.delta(text)
                    {
                        return StreamOutcome::Abandoned;
                    }
                }
            }
        }
    }

    async fn run_stream_worker(
        config: ProviderConfig,
        request: StreamRequest,
        sink: StreamSink,
        cancel_rx: oneshot::Receiver<()>,
    ) {
        let outcome = match Self::open_stream(&config, &request).await {
            Ok(stream) => Self::forward_replies(stream, &sink, cancel_rx).await,
            Err(error) => StreamOutcome::Failed(error),
        };

        match outcome {
            StreamOutcome::Finished => sink.finish(),
            StreamOutcome::Failed(error) => {
                tracing::warn!(
                    stream_id = ?sink.stream_id(),
                    provider_id = %config.provider_id,
                    model_id = %request.model_id,
                    error = %error,
                    "provider stream failed"
                );
                sink.fail(&error);
            }
            StreamOutcome::Cancelled | StreamOutcome::Abandoned => {
                tracing::debug!(stream_id = ?sink.stream_id(), ?outcome, "provider stream stopped");
            }
        }
    }
}

impl LlmProvider for RigProviderAdapter {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn stream_chat(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle> {
        ensure!(
            !request.messages.is_empty(),
            EmptyMessageSetSnafu {
                stage: "stream-chat",
                stream_id: request.stream_id,
            }
        );

        let (sink, stream, cancel_rx) = make_event_stream(request.stream_id);
        let worker: ProviderWorker = Box::pin(Self::run_stream_worker(
            self.config.clone(),
            request,
            sink,
            cancel_rx,
        ));

        Ok(ProviderStreamHandle { stream, worker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StreamEventPayload, StreamId};

    #[test]
    fn adapter_requires_an_api_key() {
        let result = RigProviderAdapter::new(ProviderConfig::new("openai", "   ", ""));
        assert!(matches!(result, Err(ProviderError::MissingApiKey { .. })));
    }

    #[test]
    fn system_turns_fold_into_the_preamble() {
        let (preamble, turns) = RigProviderAdapter::split_transcript(&[
            ProviderMessage::new(Role::System, "you are helpful"),
            ProviderMessage::new(Role::User, "hi"),
            ProviderMessage::new(Role::System, "   "),
            ProviderMessage::new(Role::Assistant, "hello"),
            ProviderMessage::new(Role::System, "be brief"),
        ]);

        assert_eq!(preamble.as_deref(), Some("you are helpful\n\nbe brief"));
        assert_eq!(turns.len(), 2);

        let (preamble, turns) =
            RigProviderAdapter::split_transcript(&[ProviderMessage::new(Role::User, "hi")]);
        assert_eq!(preamble, None);
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn empty_requests_are_rejected_before_spawning() {
        let adapter =
            RigProviderAdapter::new(ProviderConfig::new("openai", "sk-test", "")).unwrap();
        let result = adapter.stream_chat(StreamRequest::new(
            StreamId::new(1),
            DEFAULT_OPENAI_MODEL,
            Vec::new(),
        ));

        assert!(matches!(
            result,
            Err(ProviderError::EmptyMessageSet { .. })
        ));
    }

    #[tokio::test]
    async fn system_only_transcript_fails_the_stream() {
        let adapter =
            RigProviderAdapter::new(ProviderConfig::new("openai", "sk-test", "")).unwrap();
        let handle = adapter
            .stream_chat(StreamRequest::new(
                StreamId::new(3),
                DEFAULT_OPENAI_MODEL,
                vec![ProviderMessage::new(Role::System, "rules")],
            ))
            .unwrap();
        let mut stream = handle.stream;

        handle.worker.await;

        let event = stream.recv().await.unwrap();
        assert_eq!(event.stream_id, StreamId::new(3));
        assert!(matches!(event.payload, StreamEventPayload::Error(_)));
        assert!(stream.recv().await.is_none());
    }
}
