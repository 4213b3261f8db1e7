use gpui::*;
use gpui_component::{
    ActiveTheme, Disableable, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    v_flex,
};

use sidechat_surface::{KeyIntent, KeyPress, classify};

use crate::chat::events::{ClearHistoryClicked, EnterPressed, InputChanged, SendClicked};

pub const INPUT_PLACEHOLDER: &str = "Say something...";

/// Composer for the chat surface.
///
/// Owns no conversation state. Every edit is reported as [`InputChanged`] and a plain
/// Enter is forwarded as [`EnterPressed`]. Line breaks are inserted here at the cursor.
pub struct MessageInput {
    input_state: Entity<InputState>,
    is_responding: bool,
    pending_newline: bool,
}

impl EventEmitter<InputChanged> for MessageInput {}
impl EventEmitter<EnterPressed> for MessageInput {}
impl EventEmitter<SendClicked> for MessageInput {}
impl EventEmitter<ClearHistoryClicked> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder(INPUT_PLACEHOLDER)
                .auto_grow(3, 10)
        });

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| match event {
                InputEvent::Change => this.emit_value(cx),
                InputEvent::PressEnter { secondary } => {
                    if *secondary {
                        this.pending_newline = false;
                        return;
                    }

                    if this.pending_newline {
                        // Shift+Enter already inserted its newline in the key handler.
                        this.pending_newline = false;
                    } else {
                        this.trim_trailing_newline(window, cx);
                        this.emit_value(cx);
                        cx.emit(EnterPressed);
                    }
                }
                _ => {}
            },
        )
        .detach();

        Self {
            input_state,
            is_responding: false,
            pending_newline: false,
        }
    }

    fn value(&self, cx: &App) -> String {
        self.input_state.read(cx).value().to_string()
    }

    /// Replaces the composer text when it differs from what is shown.
    pub fn set_value(&mut self, value: &str, window: &mut Window, cx: &mut Context<Self>) {
        if self.value(cx) == value {
            return;
        }

        let value = value.to_string();
        self.input_state.update(cx, |state, cx| {
            state.set_value(value, window, cx);
        });
        cx.notify();
    }

    pub fn set_responding(&mut self, responding: bool, cx: &mut Context<Self>) {
        if self.is_responding == responding {
            return;
        }

        self.is_responding = responding;
        cx.notify();
    }

    fn emit_value(&mut self, cx: &mut Context<Self>) {
        let value = self.value(cx);
        cx.emit(InputChanged { value });
    }

    fn insert_newline(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.pending_newline = true;
        self.input_state.update(cx, |state, cx| {
            state.insert("\n", window, cx);
        });
        cx.notify();
    }

    fn trim_trailing_newline(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            let value = state.value().to_string();
            if let Some(trimmed) = value.strip_suffix('\n') {
                state.set_value(trimmed.to_string(), window, cx);
            }
        });
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .bg(theme.background)
            .gap_2()
            .p_3()
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                        let press = KeyPress::new(
                            event.keystroke.key.as_str(),
                            event.keystroke.modifiers.shift,
                        );
                        if classify(&press) == KeyIntent::InsertNewline {
                            this.insert_newline(window, cx);
                        }
                    }))
                    .child(Input::new(&self.input_state).w_full()),
            )
            .child(
                h_flex()
                    .w_full()
                    .justify_between()
                    .child(
                        Button::new("clear-history")
                            .small()
                            .danger()
                            .icon(IconName::Delete)
                            .child("Clear History")
                            .on_click(cx.listener(|_, _, _window, cx| {
                                cx.emit(ClearHistoryClicked);
                            })),
                    )
                    .child(
                        Button::new("send")
                            .small()
                            .primary()
                            .icon(IconName::ArrowUp)
                            .child("Send")
                            .disabled(self.is_responding)
                            .on_click(cx.listener(|_, _, _window, cx| {
                                cx.emit(SendClicked);
                            })),
                    ),
            )
    }
}
