use std::sync::Arc;

use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;
use sidechat_llm::{
    DEFAULT_OPENAI_MODEL, LlmProvider, ProviderConfig, ProviderEventStream, ProviderMessage,
    ProviderStreamHandle, ProviderWorker, Role as ProviderRole, StreamEvent, StreamEventPayload,
    StreamId, StreamRequest, create_provider,
};
use sidechat_storage::{FileSlotStore, HistoryMirror, HistoryStore, Message, Role};
use sidechat_surface::{
    ChatSurface, ExchangeEvent, ExchangeId, ExchangeRequest, KeyOutcome, KeyPress,
    StreamingChatState,
};

use crate::chat::events::{ClearHistoryClicked, EnterPressed, InputChanged, SendClicked};
use crate::chat::message_list::transcript_rows;
use crate::chat::{MessageInput, MessageList};
use crate::settings::{DEFAULT_ENDPOINT, Settings};

pub type HistorySurface = ChatSurface<StreamingChatState, FileSlotStore>;

const STREAM_CLOSED_EARLY: &str = "provider stream ended before a terminal event";

/// Coordinates the chat surface with the composer, the transcript and the provider.
pub struct ChatView {
    surface: HistorySurface,
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    provider: Option<Arc<dyn LlmProvider>>,
    provider_error: Option<String>,
    model_id: String,
    max_tokens: Option<u64>,
    stream_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    stream_reader_task: Option<Task<()>>,
}

impl ChatView {
    pub fn new(settings: &Settings, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let surface = Self::open_surface(settings);
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));
        let (provider, model_id, provider_error) = Self::initialize_provider(settings);

        cx.subscribe_in(
            &message_input,
            window,
            |this, _, event: &InputChanged, _window, cx| {
                this.surface.on_input_change(event.value.clone());
                cx.notify();
            },
        )
        .detach();

        cx.subscribe_in(
            &message_input,
            window,
            |this, _, _event: &EnterPressed, window, cx| {
                this.handle_enter(window, cx);
            },
        )
        .detach();

        cx.subscribe_in(
            &message_input,
            window,
            |this, _, _event: &SendClicked, window, cx| {
                this.handle_send(window, cx);
            },
        )
        .detach();

        cx.subscribe_in(
            &message_input,
            window,
            |this, _, _event: &ClearHistoryClicked, window, cx| {
                this.clear_history(window, cx);
            },
        )
        .detach();

        let mut this = Self {
            surface,
            message_list,
            message_input,
            provider,
            provider_error,
            model_id,
            max_tokens: settings.max_tokens,
            stream_worker_task: None,
            stream_reader_task: None,
        };
        this.sync_views(window, cx);
        this
    }

    fn open_surface(settings: &Settings) -> HistorySurface {
        let slots = FileSlotStore::new(settings.history_directory());
        tracing::info!(
            directory = ?slots.directory(),
            key = %settings.history_key,
            "opening conversation history"
        );

        let store = HistoryStore::new(slots, settings.history_key.clone());
        ChatSurface::open(
            HistoryMirror::new(store, settings.empty_history_policy()),
            StreamingChatState::new,
        )
    }

    fn initialize_provider(
        settings: &Settings,
    ) -> (Option<Arc<dyn LlmProvider>>, String, Option<String>) {
        let config = settings
            .to_provider_config()
            .map(|config| (config, settings.model.clone()))
            .or_else(|| provider_config_from_env(|name| std::env::var(name).ok()));

        let Some((config, model_id)) = config else {
            tracing::warn!("no api key configured, replies are disabled");
            return (None, settings.model.clone(), None);
        };

        match create_provider(config) {
            Ok(provider) => {
                tracing::info!(provider = provider.id(), model = %model_id, "initialized provider");
                (Some(provider), model_id, None)
            }
            Err(error) => {
                tracing::error!("failed to initialize provider adapter: {error}");
                (None, model_id, Some(format!("Provider error: {error}")))
            }
        }
    }

    fn handle_enter(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        match self.surface.handle_key(&KeyPress::enter()) {
            KeyOutcome::Submitted(request) => self.start_exchange(request, window, cx),
            // Line breaks are typed at the cursor by the composer and arrive as input changes.
            KeyOutcome::NewlineInserted | KeyOutcome::NothingToSubmit | KeyOutcome::Ignored => {}
        }
    }

    fn handle_send(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if let Some(request) = self.surface.submit() {
            self.start_exchange(request, window, cx);
        }
    }

    fn start_exchange(
        &mut self,
        request: ExchangeRequest,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        self.sync_views(window, cx);

        let Some(provider) = self.provider.clone() else {
            let message = match &self.provider_error {
                Some(error) => format!("{error}. Please check settings."),
                None => "Provider is not configured. Please set an API key.".to_string(),
            };
            self.apply_event(
                ExchangeEvent::Failed {
                    exchange: request.exchange,
                    message,
                },
                cx,
            );
            return;
        };

        let mut stream_request = StreamRequest::new(
            StreamId::new(request.exchange.0),
            self.model_id.clone(),
            to_provider_messages(&request.messages),
        );
        if let Some(max_tokens) = self.max_tokens {
            stream_request = stream_request.with_max_tokens(max_tokens);
        }

        match provider.stream_chat(stream_request) {
            Ok(handle) => self.spawn_stream_pipeline(handle, cx),
            Err(error) => self.apply_event(
                ExchangeEvent::Failed {
                    exchange: request.exchange,
                    message: error.to_string(),
                },
                cx,
            ),
        }
    }

    fn spawn_stream_pipeline(&mut self, handle: ProviderStreamHandle, cx: &mut Context<Self>) {
        self.spawn_stream_worker(handle.worker, cx);
        self.spawn_stream_reader(handle.stream, cx);
    }

    fn spawn_stream_worker(&mut self, worker: ProviderWorker, cx: &mut Context<Self>) {
        self.stream_worker_task = Some(Tokio::spawn(cx, worker));
    }

    fn spawn_stream_reader(&mut self, mut stream: ProviderEventStream, cx: &mut Context<Self>) {
        let exchange = ExchangeId::new(stream.stream_id().0);

        self.stream_reader_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = stream.recv().await {
                let _ = this.update(cx, |this, cx| {
                    this.apply_event(to_exchange_event(event), cx);
                });
            }

            let _ = this.update(cx, |this, cx| {
                this.handle_stream_reader_closed(exchange, cx);
            });
        }));
    }

    fn handle_stream_reader_closed(&mut self, exchange: ExchangeId, cx: &mut Context<Self>) {
        self.stream_worker_task = None;
        self.stream_reader_task = None;

        if self.surface.chat().active_exchange() == Some(exchange) {
            self.apply_event(
                ExchangeEvent::Failed {
                    exchange,
                    message: STREAM_CLOSED_EARLY.to_string(),
                },
                cx,
            );
        }
    }

    fn apply_event(&mut self, event: ExchangeEvent, cx: &mut Context<Self>) {
        self.surface.apply_exchange_event(event);
        self.sync_transcript(cx);
    }

    fn clear_history(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        match self.surface.clear_history() {
            Ok(()) => {
                // The exchange is abandoned by now. Dropping the reader drops the event
                // stream, which cancels the worker.
                self.stream_worker_task = None;
                self.stream_reader_task = None;
            }
            Err(error) => {
                // The transcript and any in-flight reply are kept, so the reader must
                // stay alive to finish the exchange.
                tracing::error!("failed to clear conversation history: {error}");
            }
        }
        self.sync_views(window, cx);
    }

    fn sync_views(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let input = self.surface.input().to_string();
        self.message_input.update(cx, |message_input, cx| {
            message_input.set_value(&input, window, cx);
        });
        self.sync_transcript(cx);
    }

    fn sync_transcript(&mut self, cx: &mut Context<Self>) {
        let chat = self.surface.chat();
        let rows = transcript_rows(self.surface.messages(), chat.draft(), chat.last_error());
        let responding = chat.is_responding();

        self.message_list.update(cx, |list, cx| list.set_rows(rows, cx));
        self.message_input.update(cx, |message_input, cx| {
            message_input.set_responding(responding, cx);
        });
        cx.notify();
    }
}

/// Reads an OpenAI-style configuration from the environment when settings carry no key.
fn provider_config_from_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<(ProviderConfig, String)> {
    let read = |name: &str| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let api_key = read("OPENAI_API_KEY")?;
    let model_id = read("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
    let endpoint = read("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    Some((ProviderConfig::new("openai", api_key, endpoint), model_id))
}

fn to_provider_messages(messages: &[Message]) -> Vec<ProviderMessage> {
    messages
        .iter()
        .filter(|message| !message.content.trim().is_empty())
        .filter_map(|message| {
            let role = match &message.role {
                Role::System => ProviderRole::System,
                Role::User => ProviderRole::User,
                Role::Assistant => ProviderRole::Assistant,
                Role::Other(_) => return None,
            };
            Some(ProviderMessage::new(role, message.content.clone()))
        })
        .collect()
}

fn to_exchange_event(event: StreamEvent) -> ExchangeEvent {
    let exchange = ExchangeId::new(event.stream_id.0);
    match event.payload {
        StreamEventPayload::Delta(text) => ExchangeEvent::Delta { exchange, text },
        StreamEventPayload::Done => ExchangeEvent::Done { exchange },
        StreamEventPayload::Error(message) => ExchangeEvent::Failed { exchange, message },
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-view")
            .relative()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .id("chat-view-message-input")
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
    }
}
